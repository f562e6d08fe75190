// Error taxonomy for the upload path. Only `Transport` is ever retried;
// every other variant is terminal the moment it is produced.

use std::path::PathBuf;
use std::time::Duration;

/// Boxed error type used for transport failures so that both reqwest and
/// plain io errors (in tests) can be carried.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The local source file could not be opened or read.
    #[error("failed to read {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The connection to the backend could not be established or broke
    /// before a response arrived.
    #[error("connection to backend failed: {0}")]
    Transport(#[source] BoxError),

    /// The backend answered with a non-2xx status.
    #[error("backend responded with {status}: {body}")]
    Application { status: u16, body: String },

    /// A transport failure kept happening until the retry budget ran out.
    #[error("{operation} failed after {attempts} attempts in {elapsed:?}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        elapsed: Duration,
        #[source]
        source: Box<UploadError>,
    },

    /// A fresh copy of a chunk body could not be produced.
    #[error("could not clone chunk {name}: {source}")]
    Clone {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected response from backend: {0}")]
    InvalidResponse(String),

    /// The request could not be built or sent for reasons unrelated to the
    /// connection (bad URL, invalid header value, ...).
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

impl UploadError {
    /// Whether this error is a connection-level failure worth retrying.
    pub fn is_transport(&self) -> bool {
        matches!(self, UploadError::Transport(_))
    }

    /// Sort a reqwest error into the transport/terminal buckets.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let connection_level = err.status().is_none()
            && !err.is_builder()
            && !err.is_decode()
            && (err.is_connect() || err.is_timeout() || err.is_request() || err.is_body());
        if connection_level {
            UploadError::Transport(Box::new(err))
        } else if err.is_decode() {
            UploadError::InvalidResponse(err.to_string())
        } else {
            UploadError::Request(err)
        }
    }
}

pub type UploadResult<T> = Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn only_transport_errors_are_retryable() {
        let reset =
            UploadError::Transport(Box::new(io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(reset.is_transport());

        let status = UploadError::Application {
            status: 503,
            body: "busy".into(),
        };
        assert!(!status.is_transport());

        let exhausted = UploadError::RetriesExhausted {
            operation: "chunk 2".into(),
            attempts: 5,
            elapsed: Duration::from_secs(60),
            source: Box::new(reset),
        };
        assert!(!exhausted.is_transport());
    }

    #[test]
    fn local_io_message_names_the_path() {
        let err = UploadError::LocalIo {
            path: PathBuf::from("/tmp/missing.zip"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/tmp/missing.zip"));
    }
}
