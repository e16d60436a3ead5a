//! VTG sentence parsing.
//!
//! Field layout (after the sentence id):
//!
//! ```text
//! $GNVTG,054.7,T,034.4,M,005.5,N,010.2,K,A*3B
//!        |     | |     | |     | |     | |
//!        |     | |     | |     | |     | +- FAA mode (NMEA 2.3+)
//!        |     | |     | |     | +-----+- speed km/h
//!        |     | |     | +-----+- speed knots
//!        |     | +-----+- track, magnetic north
//!        +-----+- track, true north
//! ```
//!
//! While stationary the track fields are typically empty; the receiver
//! cannot determine heading without movement.

use crate::error::ParseError;
use crate::nmea::fields::{parse_f64, parse_string};
use crate::nmea::types::VtgData;

/// Basic VTG format has 9 fields; the FAA mode indicator makes 10.
const MIN_FIELDS: usize = 9;

const KMH_PER_MS: f64 = 3.6;

/// Build a `VtgData` from the comma-split fields of a checksum-validated
/// sentence (`fields[0]` is the sentence id).
pub fn from_fields(fields: &[&str]) -> Result<VtgData, ParseError> {
    if fields.len() < MIN_FIELDS {
        return Err(ParseError::FieldCount {
            expected: MIN_FIELDS,
            actual: fields.len(),
        });
    }

    let speed_kmh = parse_f64(fields[7]);
    let mode = fields
        .get(9)
        .and_then(|f| parse_string(f))
        .and_then(|s| s.chars().next());

    Ok(VtgData {
        track_true_deg: parse_f64(fields[1]),
        speed_knots: parse_f64(fields[5]),
        speed_kmh,
        speed_ms: speed_kmh.map(|v| v / KMH_PER_MS),
        mode,
        valid: mode.is_some_and(|m| m != 'N'),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::{parse_sentence, Sentence};

    fn parse(line: &str) -> VtgData {
        match parse_sentence(line).unwrap() {
            Sentence::Vtg(v) => v,
            other => panic!("expected VTG, got {:?}", other),
        }
    }

    #[test]
    fn test_autonomous_mode() {
        let v = parse("$GNVTG,054.7,T,034.4,M,005.5,N,010.2,K,A*3B");
        assert_eq!(v.track_true_deg, Some(54.7));
        assert_eq!(v.speed_knots, Some(5.5));
        assert_eq!(v.speed_kmh, Some(10.2));
        assert!((v.speed_ms.unwrap() - 2.833_333).abs() < 1e-5);
        assert_eq!(v.mode, Some('A'));
        assert!(v.valid);
    }

    #[test]
    fn test_differential_mode() {
        let v = parse("$GNVTG,054.7,T,034.4,M,005.5,N,010.2,K,D*3E");
        assert_eq!(v.mode, Some('D'));
        assert!(v.valid);
    }

    #[test]
    fn test_not_valid_mode() {
        let v = parse("$GNVTG,,T,,M,,N,,K,N*32");
        assert_eq!(v.mode, Some('N'));
        assert!(!v.valid);
        assert_eq!(v.track_true_deg, None);
        assert_eq!(v.speed_ms, None);
    }

    #[test]
    fn test_stationary_empty_track() {
        // Track is empty but speed is measured (near zero, not missing)
        let v = parse("$GNVTG,7.2,T,,M,0.3,N,0.5,K,A*10");
        assert_eq!(v.track_true_deg, Some(7.2));
        assert_eq!(v.speed_kmh, Some(0.5));
        assert!(v.valid);
    }

    #[test]
    fn test_truncated() {
        let err = parse_sentence("$GNVTG,054.7,T*30").unwrap_err();
        assert!(matches!(err, ParseError::FieldCount { .. }));
    }
}
