//! NMEA 0183 sentence parsing.
//!
//! One entry point, [`parse_sentence`], validates the checksum, splits the
//! fields, and dispatches on the sentence id. Checksum validation happens
//! exactly once per line; a failure discards the whole line.

pub mod checksum;
pub mod fields;
pub mod gga;
pub mod types;
pub mod vtg;

pub use types::{FixQuality, GgaData, Sentence, VtgData};

use crate::error::ParseError;
use fields::VALID_TALKER_IDS;

/// Parse one line of receiver output into a typed sentence.
///
/// Returns [`ParseError`] for a bad checksum, an unsupported talker or
/// sentence id, or a truncated field list. A parse error never leaves
/// partial state behind.
pub fn parse_sentence(line: &str) -> Result<Sentence, ParseError> {
    let content = checksum::validate(line.trim())?;

    // NMEA is ASCII; rejecting anything else keeps byte-indexed field
    // slicing below safe
    if !content.is_ascii() {
        return Err(ParseError::Framing);
    }
    let fields: Vec<&str> = content.split(',').collect();

    // Sentence id is 2-char talker + 3-char sentence type, e.g. "GNGGA"
    let id = fields[0];
    if id.len() < 5 || !VALID_TALKER_IDS.contains(&&id[..2]) {
        return Err(ParseError::UnknownSentence(id.to_string()));
    }

    match &id[2..] {
        "GGA" => gga::from_fields(&fields).map(Sentence::Gga),
        "VTG" => vtg::from_fields(&fields).map(Sentence::Vtg),
        _ => Err(ParseError::UnknownSentence(id.to_string())),
    }
}
