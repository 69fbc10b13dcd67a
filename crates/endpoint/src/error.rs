//! Error types for the endpoint library.

use std::io;

/// Result type alias for the endpoint library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, reading or transporting a
/// [`ServerAddress`](crate::ServerAddress).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input was not of the form `host:port`, or the port was not a valid
    /// unsigned 16-bit number.
    #[error("malformed server address: {0}")]
    MalformedInput(String),

    /// The host could not be resolved to a numeric address.
    #[error("failed to resolve host `{host}`")]
    Resolution {
        host: String,
        #[source]
        source: io::Error,
    },

    /// A concrete value was requested from the empty address.
    #[error("server address is empty")]
    EmptyIdentity,

    /// Reading or writing the wire encoding failed.
    #[error("server address i/o: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn malformed(input: &str, reason: &str) -> Self {
        Error::MalformedInput(format!("{reason}: {input:?}"))
    }

    pub(crate) fn unresolved(host: &str, source: io::Error) -> Self {
        Error::Resolution {
            host: host.to_owned(),
            source,
        }
    }

    pub(crate) fn invalid_data(msg: impl Into<String>) -> Self {
        Error::Io(io::Error::new(io::ErrorKind::InvalidData, msg.into()))
    }

    pub(crate) fn eof(what: &str) -> Self {
        Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("truncated input while reading {what}"),
        ))
    }

    /// True when the input text or decoded port was malformed.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::MalformedInput(_))
    }

    /// True when a host could not be resolved.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Error::Resolution { .. })
    }
}
