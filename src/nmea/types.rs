//! Typed records for parsed NMEA sentences.
//!
//! `Option` fields distinguish "field was empty" from "measured zero".
//! The `valid` flags indicate navigation validity, not parse validity: a
//! sentence can parse cleanly and still describe a no-fix state.

use serde::{Deserialize, Serialize};

/// GNSS fix quality indicator from the GGA quality field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum FixQuality {
    /// No fix
    Invalid,
    /// Standard positioning service fix
    Gps,
    /// Differential GPS fix
    Dgps,
    /// RTK with fixed integer ambiguities (cm level)
    RtkFixed,
    /// RTK float solution (dm level, converging)
    RtkFloat,
    /// Dead reckoning
    DeadReckoning,
}

impl FixQuality {
    /// NMEA quality code.
    pub fn code(self) -> u8 {
        match self {
            FixQuality::Invalid => 0,
            FixQuality::Gps => 1,
            FixQuality::Dgps => 2,
            FixQuality::RtkFixed => 4,
            FixQuality::RtkFloat => 5,
            FixQuality::DeadReckoning => 6,
        }
    }

    /// Human-readable label, e.g. "RTK Fixed".
    pub fn label(self) -> &'static str {
        match self {
            FixQuality::Invalid => "Invalid",
            FixQuality::Gps => "GPS",
            FixQuality::Dgps => "DGPS",
            FixQuality::RtkFixed => "RTK Fixed",
            FixQuality::RtkFloat => "RTK Float",
            FixQuality::DeadReckoning => "Dead Reckoning",
        }
    }

    /// Any quality above Invalid counts as a usable fix.
    pub fn is_fix(self) -> bool {
        self != FixQuality::Invalid
    }
}

impl From<u8> for FixQuality {
    /// Unknown codes map to Invalid; an unrecognized quality must never be
    /// presented as a usable fix.
    fn from(code: u8) -> Self {
        match code {
            1 => FixQuality::Gps,
            2 => FixQuality::Dgps,
            4 => FixQuality::RtkFixed,
            5 => FixQuality::RtkFloat,
            6 => FixQuality::DeadReckoning,
            _ => FixQuality::Invalid,
        }
    }
}

impl From<FixQuality> for u8 {
    fn from(q: FixQuality) -> Self {
        q.code()
    }
}

/// Parsed GGA (fix data) sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct GgaData {
    /// UTC time in HHMMSS.ss format as emitted by the receiver
    pub utc_time: Option<String>,
    /// Latitude in decimal degrees, positive north
    pub latitude_deg: Option<f64>,
    /// Longitude in decimal degrees, positive east
    pub longitude_deg: Option<f64>,
    /// Fix quality; an empty field decodes as Invalid
    pub fix_quality: FixQuality,
    /// Satellites used in the solution
    pub num_satellites: Option<u32>,
    /// Horizontal dilution of precision
    pub hdop: Option<f64>,
    /// Altitude above mean sea level, meters
    pub altitude_m: Option<f64>,
    /// Geoid separation, meters
    pub geoid_height_m: Option<f64>,
    /// Navigation validity: true iff fix_quality is above Invalid
    pub valid: bool,
}

/// Parsed VTG (track and ground speed) sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct VtgData {
    /// Track over ground relative to true north, degrees.
    /// Typically empty while stationary.
    pub track_true_deg: Option<f64>,
    /// Ground speed in knots
    pub speed_knots: Option<f64>,
    /// Ground speed in km/h
    pub speed_kmh: Option<f64>,
    /// Ground speed in m/s, derived from the km/h field
    pub speed_ms: Option<f64>,
    /// FAA mode indicator: A autonomous, D differential, E estimated,
    /// N not valid. Absent on pre-2.3 receivers.
    pub mode: Option<char>,
    /// Navigation validity: mode present and not 'N'
    pub valid: bool,
}

/// A parsed sentence, tagged by type.
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Gga(GgaData),
    Vtg(VtgData),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_codes_round_trip() {
        for code in [0u8, 1, 2, 4, 5, 6] {
            assert_eq!(FixQuality::from(code).code(), code);
        }
    }

    #[test]
    fn test_unknown_code_is_invalid() {
        assert_eq!(FixQuality::from(3), FixQuality::Invalid);
        assert_eq!(FixQuality::from(9), FixQuality::Invalid);
    }

    #[test]
    fn test_labels() {
        assert_eq!(FixQuality::RtkFixed.label(), "RTK Fixed");
        assert_eq!(FixQuality::Invalid.label(), "Invalid");
    }

    #[test]
    fn test_is_fix() {
        assert!(!FixQuality::Invalid.is_fix());
        assert!(FixQuality::DeadReckoning.is_fix());
    }
}
