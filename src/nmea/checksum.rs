//! NMEA checksum validation.
//!
//! NMEA 0183 sentences carry an XOR checksum over all characters between
//! `$` and `*` (exclusive), written as two uppercase hex digits after the
//! `*`.

use crate::error::ParseError;

/// XOR checksum of a sentence content string (the part between `$` and `*`).
pub fn checksum(content: &str) -> u8 {
    content.bytes().fold(0, |acc, b| acc ^ b)
}

/// Validate a sentence's checksum and return its content on success.
///
/// The returned slice is the text between `$` and `*`, ready for field
/// splitting, so callers never re-scan the line.
pub fn validate(sentence: &str) -> Result<&str, ParseError> {
    if !sentence.starts_with('$') {
        return Err(ParseError::Framing);
    }
    let star = sentence.find('*').ok_or(ParseError::Framing)?;
    let content = &sentence[1..star];
    let trailer = sentence
        .get(star + 1..star + 3)
        .ok_or(ParseError::Framing)?;

    let received = u8::from_str_radix(trailer, 16).map_err(|_| ParseError::Framing)?;
    let computed = checksum(content);
    if computed != received {
        return Err(ParseError::Checksum { computed, received });
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_checksum() {
        let content =
            validate("$GNGGA,123519.00,4807.038,N,01131.000,E,1,08,0.9,545.4,M,47.0,M,,*7F")
                .unwrap();
        assert!(content.starts_with("GNGGA,"));
    }

    #[test]
    fn test_wrong_checksum() {
        let err =
            validate("$GNGGA,123519.00,4807.038,N,01131.000,E,1,08,0.9,545.4,M,47.0,M,,*7E")
                .unwrap_err();
        assert_eq!(
            err,
            ParseError::Checksum {
                computed: 0x7F,
                received: 0x7E
            }
        );
    }

    #[test]
    fn test_missing_dollar() {
        assert_eq!(
            validate("GNGGA,123519.00*7F").unwrap_err(),
            ParseError::Framing
        );
    }

    #[test]
    fn test_missing_star() {
        assert_eq!(
            validate("$GNGGA,123519.00").unwrap_err(),
            ParseError::Framing
        );
    }

    #[test]
    fn test_truncated_trailer() {
        assert_eq!(validate("$GNGGA,123519.00*7").unwrap_err(), ParseError::Framing);
    }

    #[test]
    fn test_non_hex_trailer() {
        assert_eq!(
            validate("$GNGGA,123519.00*ZZ").unwrap_err(),
            ParseError::Framing
        );
    }

    #[test]
    fn test_checksum_function() {
        // XOR of "GNVTG,054.7,T,034.4,M,005.5,N,010.2,K,A" is 0x3B
        assert_eq!(checksum("GNVTG,054.7,T,034.4,M,005.5,N,010.2,K,A"), 0x3B);
    }
}
