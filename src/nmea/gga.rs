//! GGA sentence parsing.
//!
//! Field layout (after the sentence id):
//!
//! ```text
//! $GNGGA,123519.00,4807.038,N,01131.000,E,1,08,0.9,545.4,M,47.0,M,,*7F
//!        |         |        | |         | | |  |   |     | |
//!        |         |        | |         | | |  |   |     | +- geoid height
//!        |         |        | |         | | |  |   +-----+- altitude MSL
//!        |         |        | |         | | |  +- HDOP
//!        |         |        | |         | | +- satellites in use
//!        |         |        | |         | +- fix quality
//!        |         |        | +---------+- longitude + E/W
//!        |         +--------+- latitude + N/S
//!        +- UTC time HHMMSS.ss
//! ```

use crate::error::ParseError;
use crate::nmea::fields::{parse_f64, parse_string, parse_u32, to_decimal_degrees};
use crate::nmea::types::{FixQuality, GgaData};

/// GGA sentences carry 14 standard fields; some receivers append DGPS
/// station info beyond that.
const MIN_FIELDS: usize = 14;

/// Build a `GgaData` from the comma-split fields of a checksum-validated
/// sentence (`fields[0]` is the sentence id).
pub fn from_fields(fields: &[&str]) -> Result<GgaData, ParseError> {
    if fields.len() < MIN_FIELDS {
        return Err(ParseError::FieldCount {
            expected: MIN_FIELDS,
            actual: fields.len(),
        });
    }

    // An empty quality field means no fix, which is exactly what code 0 says
    let quality_code = parse_u32(fields[6]).unwrap_or(0);
    let fix_quality = FixQuality::from(quality_code.min(u8::MAX as u32) as u8);

    Ok(GgaData {
        utc_time: parse_string(fields[1]),
        latitude_deg: to_decimal_degrees(fields[2], fields[3]),
        longitude_deg: to_decimal_degrees(fields[4], fields[5]),
        fix_quality,
        num_satellites: parse_u32(fields[7]),
        hdop: parse_f64(fields[8]),
        altitude_m: parse_f64(fields[9]),
        geoid_height_m: parse_f64(fields[11]),
        valid: fix_quality.is_fix(),
    })
}
