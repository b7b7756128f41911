use thiserror::Error;

/// Errors raised while decoding a request, walking the object store, or
/// driving the server lifecycle.
///
/// Per-op failures (ENOENT, ENOMEM, EOPNOTSUPP, ...) are not represented
/// here: they are plain negative `i32` rvals carried in the reply, since
/// that is what the wire protocol itself carries. This enum covers the
/// codec- and lifecycle-level failures that abort a request or a startup
/// step outright.
#[derive(Error, Debug)]
pub enum OsdsError {
    #[error("buffer too short: {0}")]
    BufferShort(String),

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("unsupported opcode: {0:#06x}")]
    Unsupported(u16),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("codec error: {0}")]
    Denc(#[from] denc::RadosError),

    #[error("messenger error: {0}")]
    Msgr(#[from] msgr2::Error),

    #[error("monitor client error: {0}")]
    MonClient(#[from] monclient::MonClientError),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

impl From<String> for OsdsError {
    fn from(s: String) -> Self {
        OsdsError::Other(s)
    }
}

impl From<&str> for OsdsError {
    fn from(s: &str) -> Self {
        OsdsError::Other(s.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OsdsError>;
