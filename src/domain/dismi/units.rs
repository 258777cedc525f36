//! Textual quantities used in client requests.

use crate::error::{Error, Result};

const BANDWIDTH_UNITS: &[(&str, f64)] = &[
    ("bps", 1.0),
    ("bits/s", 1.0),
    ("kbps", 1e3),
    ("kbits/s", 1e3),
    ("mbps", 1e6),
    ("mbits/s", 1e6),
    ("gbps", 1e9),
    ("gbits/s", 1e9),
    ("tbps", 1e12),
    ("tbits/s", 1e12),
];

const TIME_UNITS: &[(&str, f64)] = &[
    ("us", 1e-6),
    ("ms", 1e-3),
    ("s", 1.0),
    ("m", 60.0),
    ("h", 3600.0),
    ("d", 86400.0),
    ("w", 604800.0),
];

fn split_quantity(input: &str) -> Option<(f64, String)> {
    let trimmed = input.trim();
    let split = trimmed.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
    let (number, unit) = trimmed.split_at(split);
    let value = number.parse::<f64>().ok()?;
    Some((value, unit.trim().to_ascii_lowercase()))
}

fn parse_with(input: &str, units: &[(&str, f64)]) -> Result<f64> {
    let (value, unit) = split_quantity(input).ok_or_else(|| Error::UnknownUnit(input.to_string()))?;
    units
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, factor)| value * factor)
        .ok_or_else(|| Error::UnknownUnit(input.to_string()))
}

/// Parses `<number><unit>` into bits per second, e.g. `10Mbps`.
pub fn parse_bandwidth(input: &str) -> Result<f64> {
    parse_with(input, BANDWIDTH_UNITS)
}

/// Parses `<number><unit>` into seconds, e.g. `20ms`.
pub fn parse_time(input: &str) -> Result<f64> {
    parse_with(input, TIME_UNITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bandwidth_units_are_decimal() {
        assert_eq!(parse_bandwidth("10mbps").unwrap(), 10e6);
        assert_eq!(parse_bandwidth("2.5 Gbits/s").unwrap(), 2.5e9);
        assert_eq!(parse_bandwidth("300bps").unwrap(), 300.0);
    }

    #[test]
    fn time_units_convert_to_seconds() {
        assert!((parse_time("20ms").unwrap() - 0.02).abs() < 1e-12);
        assert_eq!(parse_time("2m").unwrap(), 120.0);
        assert!((parse_time("500us").unwrap() - 0.0005).abs() < 1e-12);
    }

    #[test]
    fn rejects_unknown_units() {
        assert!(matches!(parse_bandwidth("10furlongs"), Err(Error::UnknownUnit(_))));
        assert!(parse_time("ms").is_err(), "Should reject a unit without a number");
    }
}
