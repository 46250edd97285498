//! Error types for camera capture.

use std::fmt;

use thiserror::Error;

/// Errors surfaced to callers of a capture operation.
///
/// Recoverable protocol problems (bad headers, rejected frames, a dropped
/// connection with retries left) never show up here; they are handled inside
/// the session and only logged.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// No access code was supplied.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Connection could not be established or authenticated.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// The overall capture deadline elapsed.
    #[error("timeout: no frame within {0} ms")]
    OperationTimeout(u64),

    /// Every allowed connection attempt ended without a frame.
    #[error("connection lost after {attempts} attempts: {last_error}")]
    ConnectExhausted {
        /// Connection attempts made.
        attempts: u32,
        /// Reason the final attempt ended.
        last_error: String,
    },

    /// Unrecoverable parser fault.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// The caller failed to store a captured frame.
    #[error("persist error: {0}")]
    PersistError(String),

    /// The session was stopped before it settled.
    #[error("capture stopped before completion")]
    Stopped,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of a [`CaptureError`], for callers that branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureErrorKind {
    /// See [`CaptureError::MissingCredential`].
    MissingCredential,
    /// See [`CaptureError::ConnectFailed`].
    ConnectFailed,
    /// See [`CaptureError::OperationTimeout`].
    OperationTimeout,
    /// See [`CaptureError::ConnectExhausted`].
    ConnectExhausted,
    /// See [`CaptureError::DecodeError`].
    DecodeError,
    /// See [`CaptureError::PersistError`].
    PersistError,
    /// See [`CaptureError::Stopped`].
    Stopped,
    /// See [`CaptureError::Io`].
    Io,
}

impl CaptureError {
    /// Kind of this error.
    pub fn kind(&self) -> CaptureErrorKind {
        match self {
            CaptureError::MissingCredential(_) => CaptureErrorKind::MissingCredential,
            CaptureError::ConnectFailed(_) => CaptureErrorKind::ConnectFailed,
            CaptureError::OperationTimeout(_) => CaptureErrorKind::OperationTimeout,
            CaptureError::ConnectExhausted { .. } => CaptureErrorKind::ConnectExhausted,
            CaptureError::DecodeError(_) => CaptureErrorKind::DecodeError,
            CaptureError::PersistError(_) => CaptureErrorKind::PersistError,
            CaptureError::Stopped => CaptureErrorKind::Stopped,
            CaptureError::Io(_) => CaptureErrorKind::Io,
        }
    }
}

impl fmt::Display for CaptureErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureErrorKind::MissingCredential => "MissingCredential",
            CaptureErrorKind::ConnectFailed => "ConnectFailed",
            CaptureErrorKind::OperationTimeout => "OperationTimeout",
            CaptureErrorKind::ConnectExhausted => "ConnectExhausted",
            CaptureErrorKind::DecodeError => "DecodeError",
            CaptureErrorKind::PersistError => "PersistError",
            CaptureErrorKind::Stopped => "Stopped",
            CaptureErrorKind::Io => "Io",
        };
        f.write_str(name)
    }
}

/// Failures of a single transport attempt.
#[derive(Error, Debug)]
pub enum TransportError {
    /// TCP connect failed.
    #[error("connect to {addr} failed: {source}")]
    Connect {
        /// Target address.
        addr: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// TLS setup or handshake failed.
    #[error("TLS handshake failed: {0}")]
    Tls(String),

    /// Writing the authentication record failed.
    #[error("auth write failed: {0}")]
    AuthWrite(std::io::Error),
}

impl TransportError {
    /// Whether the session may retry after this failure.
    ///
    /// An unreachable or handshake-failing printer counts as a dropped
    /// connection; a failed auth write does not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::AuthWrite(_))
    }
}

/// Result type for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;
