//! Error types for TriveniIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// TriveniIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Hardware initialization failed (fatal at startup only)
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Sensor did not signal data-ready within the deadline
    #[error("Sensor data-ready timeout")]
    SensorTimeout,

    /// Bus transaction with the sensor failed
    #[error("Sensor bus fault: {0}")]
    SensorBusFault(String),

    /// Sentence rejected by the parser; the line is discarded whole
    #[error("Sentence rejected: {0}")]
    Parse(#[from] ParseError),

    /// Wire serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Peer closed the connection
    #[error("Transport disconnected")]
    Disconnected,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Reasons an NMEA line is rejected.
///
/// A rejected line is counted and dropped; none of its fields are ever
/// applied to tracker state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Missing `$` start or `*` checksum delimiter, or truncated trailer
    #[error("malformed sentence framing")]
    Framing,

    /// Checksum mismatch
    #[error("checksum mismatch: computed {computed:#04x}, received {received:#04x}")]
    Checksum {
        /// Checksum computed over the sentence content
        computed: u8,
        /// Checksum carried by the sentence
        received: u8,
    },

    /// Sentence id is not a supported talker/sentence combination
    #[error("unknown sentence id: {0}")]
    UnknownSentence(String),

    /// Sentence has fewer fields than the format requires
    #[error("field count mismatch: expected at least {expected}, got {actual}")]
    FieldCount {
        /// Minimum field count for the sentence type
        expected: usize,
        /// Fields actually present
        actual: usize,
    },
}
