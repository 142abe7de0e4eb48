//! Field-specific post-processing of a raw report.
//!
//! [`normalize`] is a pure function: it reads a report and returns a new one.
//! The rules touch disjoint fields, so their order does not matter.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::report::{FieldValue, Magnitude, Measurement, Report, Unit};

/// Fields carrying a daemon timestamp.
pub const TIMESTAMP_FIELDS: [&str; 6] = ["APC", "DATE", "STARTTIME", "XONBATT", "XOFFBATT", "END APC"];

/// Duration fields published as whole numbers.
pub const INTEGER_FIELDS: [&str; 2] = ["TIMELEFT", "MINTIMEL"];

/// Name of the derived power field.
pub const CURRENT_POWER_FIELD: &str = "currpwr_calc";

/// Power value used when the inputs for the derived field are missing.
pub const POWER_UNAVAILABLE: i64 = -1;

/// Timestamp layout used by the daemon, e.g. `2024-03-01 10:00:00 +0000`.
const DAEMON_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Normalization switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Add the derived `currpwr_calc` field.
    #[serde(default = "default_true")]
    pub compute_power: bool,

    /// Rewrite timestamp fields as ISO-8601.
    #[serde(default = "default_true")]
    pub iso_timestamps: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            compute_power: true,
            iso_timestamps: true,
        }
    }
}

impl NormalizeOptions {
    pub fn with_compute_power(mut self, enabled: bool) -> Self {
        self.compute_power = enabled;
        self
    }

    pub fn with_iso_timestamps(mut self, enabled: bool) -> Self {
        self.iso_timestamps = enabled;
        self
    }
}

/// Produce the normalized copy of `report`.
pub fn normalize(report: &Report, options: &NormalizeOptions) -> Report {
    let mut normalized: Report = report
        .iter()
        .map(|(name, value)| (name.to_string(), normalize_field(name, value, options)))
        .collect();

    if options.compute_power && !normalized.contains(CURRENT_POWER_FIELD) {
        let power = current_power(report);
        debug!(value = power.value.as_f64(), "Derived current power");
        normalized.insert(CURRENT_POWER_FIELD, FieldValue::Measurement(power));
    }

    normalized
}

fn normalize_field(name: &str, value: &FieldValue, options: &NormalizeOptions) -> FieldValue {
    match value {
        FieldValue::Scalar(text) if options.iso_timestamps && TIMESTAMP_FIELDS.contains(&name) => {
            match to_iso_timestamp(name, text) {
                Ok(iso) => FieldValue::Scalar(iso),
                Err(e) => {
                    warn!(error = %e, "Dropping unparseable timestamp");
                    FieldValue::Unparseable
                }
            }
        }
        FieldValue::Measurement(m) if options.iso_timestamps && INTEGER_FIELDS.contains(&name) => {
            FieldValue::Measurement(Measurement {
                value: m.value.truncate(),
                unit: m.unit,
            })
        }
        other => other.clone(),
    }
}

/// Convert a daemon timestamp to ISO-8601, keeping its UTC offset.
pub fn to_iso_timestamp(field: &str, text: &str) -> Result<String> {
    DateTime::parse_from_str(text.trim(), DAEMON_DATE_FORMAT)
        .map(|dt| dt.to_rfc3339())
        .map_err(|_| Error::DateParse {
            field: field.to_string(),
            value: text.to_string(),
        })
}

/// `NOMPOWER * LOADPCT / 100` in Watts, or the `-1` sentinel when either
/// input is missing or not a measurement.
pub fn current_power(report: &Report) -> Measurement {
    let nominal = report.get("NOMPOWER").and_then(FieldValue::as_measurement);
    let load = report.get("LOADPCT").and_then(FieldValue::as_measurement);

    match (nominal, load) {
        (Some(nominal), Some(load)) => Measurement::new(
            nominal.value.as_f64() * load.value.as_f64() / 100.0,
            Unit::Watts,
        ),
        _ => Measurement::new(Magnitude::Integer(POWER_UNAVAILABLE), Unit::Watts),
    }
}
