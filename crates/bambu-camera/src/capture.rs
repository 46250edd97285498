//! One-call capture entry points.

use crate::config::{CameraConfig, CaptureOptions};
use crate::error::{CaptureError, Result};
use crate::session::CaptureSession;
use crate::transport::{Connector, TlsCameraConnector};

/// Capture one JPEG frame from the printer camera at `host`.
///
/// Storing the frame is up to the caller.
pub async fn capture_single_frame(
    host: &str,
    access_code: &str,
    options: CaptureOptions,
) -> Result<Vec<u8>> {
    let config = CameraConfig::from_options(host, access_code, options);
    config.validate()?;
    let connector =
        TlsCameraConnector::new().map_err(|e| CaptureError::ConnectFailed(e.to_string()))?;
    capture_with(config, connector).await
}

/// Capture one frame using a custom connector.
pub async fn capture_with<C: Connector>(config: CameraConfig, connector: C) -> Result<Vec<u8>> {
    CaptureSession::new(config, connector)
        .run()
        .await
        .unwrap_or(Err(CaptureError::Stopped))
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_err;

    use super::*;
    use crate::error::CaptureErrorKind;

    #[tokio::test]
    async fn test_rejects_empty_access_code() {
        let err = assert_err!(
            capture_single_frame("192.168.1.20", "", CaptureOptions::default()).await
        );
        assert_eq!(err.kind(), CaptureErrorKind::MissingCredential);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_printer_exhausts_retries() {
        // Nothing listens on port 1 of the loopback address.
        let options = CaptureOptions {
            port: 1,
            ..Default::default()
        };
        let err = assert_err!(capture_single_frame("127.0.0.1", "12345678", options).await);
        assert!(matches!(
            err,
            CaptureError::ConnectExhausted { attempts: 3, .. } | CaptureError::OperationTimeout(_)
        ));
    }
}
