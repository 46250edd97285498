#![warn(missing_docs)]

//! Single-frame camera capture for Bambu Lab printers.
//!
//! This crate provides:
//! - The TLS camera transport and its 80-byte auth record
//! - A decoder for the length-prefixed JPEG stream
//! - A capture session with bounded reconnects and an overall timeout
//!
//! # Example
//!
//! ```ignore
//! use bambu_camera::{capture_single_frame, CaptureOptions};
//!
//! let jpeg = capture_single_frame("192.168.1.50", "access_code_here", CaptureOptions::default()).await?;
//! std::fs::write("snapshot.jpg", &jpeg)?;
//! ```

pub mod auth;
pub mod capture;
pub mod config;
pub mod decoder;
pub mod error;
pub mod reconnect;
pub mod session;
pub mod transport;

pub use auth::{auth_record, AUTH_RECORD_LEN};
pub use capture::{capture_single_frame, capture_with};
pub use config::{CameraConfig, CaptureOptions, DEFAULT_PORT, DEFAULT_USERNAME};
pub use decoder::{encode_unit, AssembledFrame, DecoderState, DecoderStats, FrameDecoder};
pub use error::{CaptureError, CaptureErrorKind, Result, TransportError};
pub use reconnect::{ReconnectDecision, ReconnectPolicy};
pub use session::{CaptureResult, CaptureSession, SessionHandle, SessionState};
pub use transport::{authenticate, Connection, Connector, TlsCameraConnector, TransportEvent};
