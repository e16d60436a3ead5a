//! NMEA field parsing helpers.
//!
//! NMEA fields are comma separated and may be empty (consecutive commas).
//! Empty means "no data", which is distinct from a measured zero, so every
//! helper maps an empty field to `None` rather than a default value.

/// Supported talker ids: GPS, multi-GNSS, GLONASS, Galileo, BeiDou, QZSS.
pub const VALID_TALKER_IDS: [&str; 6] = ["GP", "GN", "GL", "GA", "GB", "GQ"];

/// Parse a field as `f64`; empty or unparseable yields `None`.
pub fn parse_f64(field: &str) -> Option<f64> {
    if field.is_empty() {
        return None;
    }
    field.parse().ok()
}

/// Parse a field as `u32`; empty or unparseable yields `None`.
pub fn parse_u32(field: &str) -> Option<u32> {
    if field.is_empty() {
        return None;
    }
    field.parse().ok()
}

/// Parse a field as an owned string; empty yields `None`.
pub fn parse_string(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

/// Convert an NMEA coordinate (DDMM.MMMM / DDDMM.MMMM plus hemisphere) to
/// signed decimal degrees.
///
/// The two digits before the decimal point are always minutes; everything
/// before them is whole degrees. South and west are negative. Empty value
/// or hemisphere yields `None`.
pub fn to_decimal_degrees(value: &str, hemisphere: &str) -> Option<f64> {
    if value.is_empty() || hemisphere.is_empty() {
        return None;
    }
    let dot = value.find('.')?;
    if dot < 2 {
        return None;
    }
    let degrees: f64 = value[..dot - 2].parse().ok()?;
    let minutes: f64 = value[dot - 2..].parse().ok()?;
    let decimal = degrees + minutes / 60.0;

    match hemisphere {
        "N" | "E" => Some(decimal),
        "S" | "W" => Some(-decimal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_f64_empty_is_none() {
        assert_eq!(parse_f64(""), None);
        assert_eq!(parse_f64("545.4"), Some(545.4));
        // Zero is a measurement, not a missing value
        assert_eq!(parse_f64("0.0"), Some(0.0));
    }

    #[test]
    fn test_parse_u32() {
        assert_eq!(parse_u32("08"), Some(8));
        assert_eq!(parse_u32(""), None);
        assert_eq!(parse_u32("abc"), None);
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(parse_string("123519.00"), Some("123519.00".to_string()));
        assert_eq!(parse_string(""), None);
    }

    #[test]
    fn test_latitude_north() {
        let lat = to_decimal_degrees("4807.038", "N").unwrap();
        assert!((lat - 48.1173).abs() < 1e-6);
    }

    #[test]
    fn test_longitude_west_negative() {
        let lon = to_decimal_degrees("01131.000", "W").unwrap();
        assert!((lon + 11.516_666_7).abs() < 1e-6);
    }

    #[test]
    fn test_empty_coordinate() {
        assert_eq!(to_decimal_degrees("", "N"), None);
        assert_eq!(to_decimal_degrees("4807.038", ""), None);
    }

    #[test]
    fn test_bad_hemisphere() {
        assert_eq!(to_decimal_degrees("4807.038", "Q"), None);
    }

    #[test]
    fn test_no_decimal_point() {
        assert_eq!(to_decimal_degrees("4807", "N"), None);
    }
}
