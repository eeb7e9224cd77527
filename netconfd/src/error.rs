use thiserror::Error;

pub type DaemonResult<T> = Result<T, DaemonError>;

/// Crate-wide error taxonomy. Framing and JSON-parse failures are fatal to a
/// connection (§7 classes 1-2); everything else is surfaced to the caller as
/// a `REPLY_ERROR` and the connection stays open.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Framing(#[from] FramingError),
    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing session specification.")]
    MissingSession,
    #[error("Invalid session identifier.")]
    UnknownSession,
    #[error("Invalid source repository type requested.")]
    InvalidDatastore,
    #[error("unknown opcode {0}")]
    UnknownOpcode(i64),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Netconf(#[from] netconf_async::error::NetconfClientError),
    #[error("Internal: {0}")]
    Internal(String),
}

/// RFC 6242-style chunked framing violations (§4.1).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum FramingError {
    #[error("expected '\\n' at start of chunk header, found {actual:?}")]
    BadPrefix { actual: Option<u8> },
    #[error("expected '#' after newline, found {actual:?}")]
    BadMarker { actual: Option<u8> },
    #[error("non-digit {actual} in chunk length")]
    BadLength { actual: u8 },
    #[error("chunk length field exceeds 11 digits")]
    LengthTooLong,
    #[error("chunk length must be positive")]
    NonPositiveLength,
    #[error("connection closed mid-frame")]
    ShortRead,
}
