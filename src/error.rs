//! Error taxonomy shared by the fetcher, parsers and display sink.

use thiserror::Error;

/// Failures the core can report.
///
/// Everything except [`Error::IndexEmpty`] is absorbed at the render-cycle
/// boundary and retried on the next tick.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection failure or a non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response did not declare a content length.
    #[error("content length unknown")]
    SizeUnknown,

    /// The declared content length exceeds the caller's bound.
    #[error("content length {len} exceeds limit {max}")]
    TooLarge { len: usize, max: usize },

    /// A buffer of the declared length could not be obtained.
    #[error("could not allocate {0} bytes")]
    AllocationFailed(usize),

    /// The body ended before the declared length was received.
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    /// Malformed JSON or a missing required field.
    #[error("parse error: {0}")]
    Parse(String),

    /// The catalog had no usable entries after load.
    #[error("time index is empty")]
    IndexEmpty,

    /// Image bytes could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The panel refused or failed a refresh.
    #[error("display error: {0}")]
    Display(String),
}

impl Error {
    /// True for the unknown/over-limit length failures.
    pub fn is_size_violation(&self) -> bool {
        matches!(self, Error::SizeUnknown | Error::TooLarge { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

pub type Result<T> = core::result::Result<T, Error>;
