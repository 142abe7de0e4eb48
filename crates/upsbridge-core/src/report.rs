//! Status report model.
//!
//! A [`Report`] is the ordered set of fields returned by one `status`
//! request. Field order follows the daemon's response order and survives
//! serialization, so the published JSON reads like `apcaccess` output.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Unit words the status daemon appends to numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Volts,
    Watts,
    Percent,
    Minutes,
    Seconds,
}

impl Unit {
    /// All recognized unit words.
    pub const ALL: [Unit; 5] = [
        Unit::Volts,
        Unit::Watts,
        Unit::Percent,
        Unit::Minutes,
        Unit::Seconds,
    ];

    /// The unit as spelled on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Volts => "Volts",
            Unit::Watts => "Watts",
            Unit::Percent => "Percent",
            Unit::Minutes => "Minutes",
            Unit::Seconds => "Seconds",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = ();

    /// Case-sensitive, matching the daemon's own wording.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL.into_iter().find(|u| u.as_str() == s).ok_or(())
    }
}

/// Numeric part of a measurement.
///
/// Values arrive as decimals; duration fields and the power sentinel are
/// carried as integers so they serialize without a fractional part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Magnitude {
    Integer(i64),
    Float(f64),
}

impl Magnitude {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Magnitude::Integer(v) => v as f64,
            Magnitude::Float(v) => v,
        }
    }

    /// Drop the fractional part, rounding toward zero.
    pub fn truncate(&self) -> Magnitude {
        match *self {
            Magnitude::Integer(v) => Magnitude::Integer(v),
            Magnitude::Float(v) => Magnitude::Integer(v.trunc() as i64),
        }
    }
}

impl From<f64> for Magnitude {
    fn from(v: f64) -> Self {
        Magnitude::Float(v)
    }
}

impl From<i64> for Magnitude {
    fn from(v: i64) -> Self {
        Magnitude::Integer(v)
    }
}

/// A numeric value paired with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: Magnitude,
    pub unit: Unit,
}

impl Measurement {
    pub fn new(value: impl Into<Magnitude>, unit: Unit) -> Self {
        Self {
            value: value.into(),
            unit,
        }
    }
}

/// Value of a single status field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// `{"value": .., "unit": ..}` in the published JSON.
    Measurement(Measurement),
    /// Free-form trimmed text.
    Scalar(String),
    /// A timestamp that could not be parsed; published as `null`.
    Unparseable,
}

impl FieldValue {
    pub fn scalar(text: impl Into<String>) -> Self {
        FieldValue::Scalar(text.into())
    }

    pub fn measurement(value: impl Into<Magnitude>, unit: Unit) -> Self {
        FieldValue::Measurement(Measurement::new(value, unit))
    }

    pub fn is_measurement(&self) -> bool {
        matches!(self, FieldValue::Measurement(_))
    }

    pub fn as_measurement(&self) -> Option<&Measurement> {
        match self {
            FieldValue::Measurement(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

/// Ordered snapshot of the daemon's status fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    fields: IndexMap<String, FieldValue>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. A repeated name keeps its first position but takes the
    /// newer value.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in response order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in response order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl FromIterator<(String, FieldValue)> for Report {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut report = Report::new();
        for (name, value) in iter {
            report.insert(name, value);
        }
        report
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = indexmap::map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
