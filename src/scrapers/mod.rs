//! Forecast discovery against the ESTOFEX site.
//!
//! Discovery runs in three steps, each in its own module:
//!
//! | Step | Module | Notes |
//! |------|--------|-------|
//! | Fetch listing pages | [`estofex`] over [`http`] | One attempt per source, falls through on errors |
//! | Extract forecast links | [`links`] | `<a href>` scan, regex fallback for broken markup |
//! | Derive the image URL | [`map_url`] | `text=yes` → `lightningmap=yes` |
//!
//! All network access goes through the [`http::HttpGet`] trait.

pub mod estofex;
pub mod http;
pub mod links;
pub mod map_url;
