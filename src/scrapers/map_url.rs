//! Forecast document URL → map image URL.
//!
//! `showforecast.cgi` renders the forecast text when called with `text=yes`
//! and the lightning map image when called with `lightningmap=yes`; the
//! remaining parameters (notably `fcstfile`) select the forecast.

use url::Url;

const TEXT_MODE_KEY: &str = "text";
const IMAGE_MODE_KEY: &str = "lightningmap";
const IMAGE_MODE_VALUE: &str = "yes";

/// Query parameters as an ordered key → single value map.
///
/// A repeated key keeps the position of its first occurrence and the value of
/// its last. Keys and values are kept exactly as written (still percent-encoded),
/// and a bare key without `=` keeps no value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct QueryParams(Vec<(String, Option<String>)>);

impl QueryParams {
    fn parse(query: &str) -> Self {
        let mut params = QueryParams::default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (k, Some(v.to_string())),
                None => (pair, None),
            };
            params.set(key, value);
        }
        params
    }

    fn set(&mut self, key: &str, value: Option<String>) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    fn remove(&mut self, key: &str) {
        self.0.retain(|(k, _)| k != key);
    }

    fn serialize(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| match v {
                Some(v) => format!("{k}={v}"),
                None => k.clone(),
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Rewrite a forecast URL so it fetches the map image instead of the text.
///
/// Drops `text`, sets `lightningmap=yes`, and leaves scheme, host, path,
/// fragment and every other parameter untouched. Total and idempotent.
pub fn to_map_image_url(forecast: &Url) -> Url {
    let mut params = QueryParams::parse(forecast.query().unwrap_or(""));
    params.remove(TEXT_MODE_KEY);
    params.set(IMAGE_MODE_KEY, Some(IMAGE_MODE_VALUE.to_string()));

    let mut image = forecast.clone();
    image.set_query(Some(&params.serialize()));
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(s: &str) -> String {
        to_map_image_url(&Url::parse(s).unwrap()).to_string()
    }

    #[test]
    fn test_text_mode_replaced_by_image_mode() {
        let out = Url::parse(&rewrite("https://x/showforecast.cgi?fcstfile=B&text=yes")).unwrap();
        let pairs: Vec<(String, String)> = out.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("fcstfile".into(), "B".into())));
        assert!(pairs.contains(&("lightningmap".into(), "yes".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "text"));
        assert_eq!(out.as_str(), "https://x/showforecast.cgi?fcstfile=B&lightningmap=yes");
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        for input in [
            "https://x/showforecast.cgi?fcstfile=B&text=yes",
            "https://x/showforecast.cgi?text=yes&fcstfile=2024050106_stormforecast.xml#top",
            "https://x/showforecast.cgi?lightningmap=no&fcstfile=C",
            "https://x/showforecast.cgi",
            "https://x/showforecast.cgi?list&&fcstfile=a%20b",
        ] {
            let once = rewrite(input);
            assert_eq!(rewrite(&once), once, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_rewrite_preserves_everything_else() {
        assert_eq!(
            rewrite("https://www.estofex.org/cgi-bin/polygon/showforecast.cgi?text=yes&fcstfile=a%2Fb.xml&x=1#frag"),
            "https://www.estofex.org/cgi-bin/polygon/showforecast.cgi?fcstfile=a%2Fb.xml&x=1&lightningmap=yes#frag"
        );
    }

    #[test]
    fn test_repeated_keys_last_value_wins() {
        assert_eq!(
            rewrite("https://x/s.cgi?fcstfile=A&text=yes&fcstfile=B&text=no"),
            "https://x/s.cgi?fcstfile=B&lightningmap=yes"
        );
    }

    #[test]
    fn test_existing_image_mode_is_overwritten_in_place() {
        assert_eq!(
            rewrite("https://x/s.cgi?lightningmap=no&fcstfile=C"),
            "https://x/s.cgi?lightningmap=yes&fcstfile=C"
        );
    }

    #[test]
    fn test_url_without_query_gains_image_mode() {
        assert_eq!(rewrite("https://x/s.cgi"), "https://x/s.cgi?lightningmap=yes");
    }

    #[test]
    fn test_query_params_parse_bare_keys() {
        let params = QueryParams::parse("list&fcstfile=A&&");
        assert_eq!(params.serialize(), "list&fcstfile=A");
    }
}
