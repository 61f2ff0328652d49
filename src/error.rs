//! Error types for the simulator.
//!
//! `DecodeError` never leaves the listener path: a vehicle that fails to
//! decode a signal counts it and keeps listening. `V2vError` covers the
//! fallible operations around the core (configuration, encoding, sinks).

use thiserror::Error;

/// Reasons a received signal could not be turned back into a message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("signal carries fewer than one full byte ({0} samples)")]
    TooShort(usize),

    #[error("decoded bytes are not valid text: {0}")]
    InvalidCharacters(#[from] std::string::FromUtf8Error),

    #[error("decoded text is not a message record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u8),
}

/// The top-level error type for the simulator.
#[derive(Debug, Error)]
pub enum V2vError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid noise distribution: {0}")]
    Noise(String),

    #[error("failed to serialize message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("event log error: {0}")]
    EventLog(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type used across the crate.
pub type V2vResult<T> = Result<T, V2vError>;
