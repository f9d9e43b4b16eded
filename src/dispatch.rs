//! Whether this run should send mail.
//!
//! The map is downloaded on every run, but a scheduler firing hourly would
//! otherwise mail it every hour. The hour gate limits mail to one hour of the
//! day in the reference timezone; `FORCE_SEND` bypasses it.

use crate::config::DispatchSettings;
use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use std::fmt;
use tracing::info;

/// The gate's verdict for one run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// `FORCE_SEND` was set.
    Forced,
    /// No hour gate configured.
    Ungated,
    /// The current hour equals the gate hour.
    InWindow { hour: u32 },
    OutsideWindow { hour: u32, gate: String },
}

impl Decision {
    pub fn proceed(&self) -> bool {
        !matches!(self, Decision::OutsideWindow { .. })
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Forced => write!(f, "forced"),
            Decision::Ungated => write!(f, "ungated"),
            Decision::InWindow { hour } => write!(f, "in window (hour {hour})"),
            Decision::OutsideWindow { hour, gate } => {
                write!(f, "outside window (hour {hour}, gate {gate})")
            }
        }
    }
}

/// Decide for a given hour of the day (0-23).
///
/// The gate matches on the hour only. `"17"` and `"017"` both match 17; a gate
/// that is not a number never matches.
pub fn decide(settings: &DispatchSettings, hour: u32) -> Decision {
    if settings.force_send {
        return Decision::Forced;
    }
    let Some(gate) = settings.hour_gate.as_deref() else {
        return Decision::Ungated;
    };

    if gate.parse::<u32>().is_ok_and(|gate_hour| gate_hour == hour) {
        Decision::InWindow { hour }
    } else {
        Decision::OutsideWindow {
            hour,
            gate: gate.to_string(),
        }
    }
}

/// Decide for the wall-clock time `now`, logging the verdict.
pub fn evaluate(settings: &DispatchSettings, now: &DateTime<Tz>) -> Decision {
    let decision = decide(settings, now.hour());
    info!(
        now = %now.format("%Y-%m-%d %H:%M:%S %Z"),
        %decision,
        proceed = decision.proceed(),
        "Dispatch gate evaluated"
    );
    decision
}
