//! Status line tokenizer.
//!
//! Each response frame carries one `NAME : value` line. The name is
//! everything before the first colon; the value is either a number followed
//! by one of the daemon's unit words, or free text.

use crate::error::{Error, Result};
use crate::report::{FieldValue, Report, Unit};

/// Parse one status line into its field name and typed value.
pub fn parse_line(line: &str) -> Result<(String, FieldValue)> {
    let (name, rest) = line.split_once(':').ok_or_else(|| Error::Parse {
        line: line.to_string(),
        message: "missing ':' separator".to_string(),
    })?;

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Parse {
            line: line.to_string(),
            message: "empty field name".to_string(),
        });
    }

    let rest = rest.trim();
    let value = match split_unit(rest) {
        Some((number, unit)) => {
            let value: f64 = number.parse().map_err(|_| Error::Parse {
                line: line.to_string(),
                message: format!("invalid number {:?} before unit {}", number, unit),
            })?;
            if !value.is_finite() {
                return Err(Error::Parse {
                    line: line.to_string(),
                    message: format!("non-finite number {:?} before unit {}", number, unit),
                });
            }
            FieldValue::measurement(value, unit)
        }
        None => FieldValue::scalar(rest),
    };

    Ok((name.to_string(), value))
}

/// Parse a sequence of lines into a report, failing on the first bad line.
pub fn parse_lines<I, S>(lines: I) -> Result<Report>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = Report::new();
    for line in lines {
        let (name, value) = parse_line(line.as_ref())?;
        report.insert(name, value);
    }
    Ok(report)
}

/// Split `<number><whitespace><unit>` into its parts.
fn split_unit(rest: &str) -> Option<(&str, Unit)> {
    let (number, word) = rest.rsplit_once(char::is_whitespace)?;
    let unit = word.parse::<Unit>().ok()?;
    let number = number.trim_end();
    if number.is_empty() {
        return None;
    }
    Some((number, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_lines() {
        let (name, value) = parse_line("LINEV    : 230.1 Volts").unwrap();
        assert_eq!(name, "LINEV");
        assert_eq!(value, FieldValue::measurement(230.1, Unit::Volts));

        let (_, value) = parse_line("TONBATT  : 0 Seconds\n").unwrap();
        assert_eq!(value, FieldValue::measurement(0.0, Unit::Seconds));

        let (_, value) = parse_line("LOADPCT  : 12.0 Percent").unwrap();
        assert_eq!(value, FieldValue::measurement(12.0, Unit::Percent));
    }

    #[test]
    fn test_various_volts_values() {
        for n in ["0", "1.5", "13.6", "230.1", "-4.25", "1000"] {
            let (_, value) = parse_line(&format!("BATTV: {} Volts", n)).unwrap();
            let expected: f64 = n.parse().unwrap();
            assert_eq!(value, FieldValue::measurement(expected, Unit::Volts));
        }
    }

    #[test]
    fn test_scalar_lines() {
        let (name, value) = parse_line("STATUS   : ONLINE \n").unwrap();
        assert_eq!(name, "STATUS");
        assert_eq!(value, FieldValue::scalar("ONLINE"));

        let (_, value) = parse_line("LASTXFER : Low line voltage").unwrap();
        assert_eq!(value, FieldValue::scalar("Low line voltage"));

        let (_, value) = parse_line("MODEL    : Back-UPS XS  1400U").unwrap();
        assert_eq!(value, FieldValue::scalar("Back-UPS XS  1400U"));
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let (name, value) = parse_line("DATE     : 2024-03-01 10:00:00 +0000").unwrap();
        assert_eq!(name, "DATE");
        assert_eq!(value, FieldValue::scalar("2024-03-01 10:00:00 +0000"));

        let (name, _) = parse_line("END APC  : 2024-03-01 10:00:05 +0000").unwrap();
        assert_eq!(name, "END APC");
    }

    #[test]
    fn test_unit_words_are_case_sensitive() {
        let (_, value) = parse_line("NOTE: 12 volts").unwrap();
        assert_eq!(value, FieldValue::scalar("12 volts"));

        let (_, value) = parse_line("NOTE: Volts").unwrap();
        assert_eq!(value, FieldValue::scalar("Volts"));
    }

    #[test]
    fn test_empty_value_is_empty_scalar() {
        let (name, value) = parse_line("ALARMDEL :").unwrap();
        assert_eq!(name, "ALARMDEL");
        assert_eq!(value, FieldValue::scalar(""));
    }

    #[test]
    fn test_malformed_lines() {
        assert!(matches!(parse_line("no separator here"), Err(Error::Parse { .. })));
        assert!(matches!(parse_line("   : ONLINE"), Err(Error::Parse { .. })));
        assert!(matches!(parse_line("LINEV: abc Volts"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        for line in ["LINEV: NaN Volts", "BATTV: inf Volts", "LOADPCT: -infinity Percent"] {
            assert!(
                matches!(parse_line(line), Err(Error::Parse { .. })),
                "{} should not parse",
                line
            );
        }
        assert!(parse_lines(["LINEV: NaN Volts", "BATTV: inf Volts"]).is_err());
    }

    #[test]
    fn test_parse_lines_fails_fast() {
        let report = parse_lines(["STATUS: ONLINE", "LINEV: 230.1 Volts"]).unwrap();
        assert_eq!(report.len(), 2);

        let err = parse_lines(["STATUS: ONLINE", "garbage", "LINEV: 230.1 Volts"]).unwrap_err();
        assert!(matches!(err, Error::Parse { ref line, .. } if line == "garbage"));
    }
}
