//! End-to-end capture against a simulated printer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bambu_camera::{
    auth_record, authenticate, capture_with, encode_unit, CameraConfig, CaptureErrorKind,
    CaptureSession, Connection, Connector, TransportError, AUTH_RECORD_LEN,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Printer that checks the auth record, then writes `stream` in small chunks
/// and keeps the connection open.
struct SimulatedPrinter {
    stream: Vec<u8>,
    chunk: usize,
    connects: Arc<AtomicU32>,
}

impl Connector for SimulatedPrinter {
    async fn connect(&self, config: &CameraConfig) -> Result<Connection, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (mut client, mut printer) = tokio::io::duplex(1024);
        let expected = auth_record(&config.username, &config.access_code);
        let stream = self.stream.clone();
        let chunk = self.chunk;

        tokio::spawn(async move {
            let mut record = [0u8; AUTH_RECORD_LEN];
            if printer.read_exact(&mut record).await.is_err() || record != expected {
                return;
            }
            for part in stream.chunks(chunk) {
                if printer.write_all(part).await.is_err() {
                    return;
                }
            }
            // Hold the stream open until the client goes away.
            let mut sink = [0u8; 16];
            while let Ok(n) = printer.read(&mut sink).await {
                if n == 0 {
                    break;
                }
            }
        });

        authenticate(&mut client, &config.username, &config.access_code).await?;
        Ok(Connection::new(client))
    }
}

fn ten_byte_jpeg() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x01, 0x02, 0x03, 0x04, 0xFF, 0xD9]
}

#[tokio::test(start_paused = true)]
async fn captures_frame_once_despite_redelivery() {
    let frame = ten_byte_jpeg();
    let mut stream = encode_unit(&frame);
    stream.extend_from_slice(&encode_unit(&frame));
    let connects = Arc::new(AtomicU32::new(0));
    let printer = SimulatedPrinter {
        stream,
        chunk: 3,
        connects: Arc::clone(&connects),
    };

    let session = CaptureSession::new(CameraConfig::new("printer", "12345678"), printer);
    let handle = session.handle();
    let result = session.run().await.expect("session settles");

    assert_eq!(result.unwrap(), frame);
    assert_eq!(connects.load(Ordering::SeqCst), 1);
    assert!(!handle.stop());
}

#[tokio::test(start_paused = true)]
async fn skips_garbage_units_before_frame() {
    let frame = ten_byte_jpeg();
    let mut stream = vec![0u8; 16]; // zero-length header
    stream.extend_from_slice(&encode_unit(b"not a jpeg"));
    stream.extend_from_slice(&encode_unit(&frame));
    let printer = SimulatedPrinter {
        stream,
        chunk: 7,
        connects: Arc::new(AtomicU32::new(0)),
    };

    let jpeg = capture_with(CameraConfig::new("printer", "code"), printer)
        .await
        .unwrap();
    assert_eq!(jpeg, frame);
}

#[tokio::test(start_paused = true)]
async fn times_out_when_no_valid_frame_arrives() {
    let printer = SimulatedPrinter {
        stream: encode_unit(b"still not a jpeg"),
        chunk: 64,
        connects: Arc::new(AtomicU32::new(0)),
    };
    let config = CameraConfig::new("printer", "code").with_timeout(Duration::from_secs(2));

    let err = capture_with(config, printer).await.unwrap_err();
    assert_eq!(err.kind(), CaptureErrorKind::OperationTimeout);
}
