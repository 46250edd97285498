//! Length-prefixed JPEG frame decoder.
//!
//! The camera stream is a sequence of units, each a 16-byte header followed
//! by a payload. The first four header bytes hold the payload length as a
//! little-endian `u32`; the remaining twelve are not interpreted. A payload
//! is accepted when it is a complete JPEG image (SOI/APP0 prefix, EOI
//! suffix).
//!
//! The decoder does no I/O. Bytes may be fed in chunks of any size and the
//! result is the same as feeding them in one piece.

use tracing::debug;

/// Size of a unit header.
pub const HEADER_LEN: usize = 16;

/// Largest payload length accepted from a header (15 MiB).
pub const MAX_PAYLOAD_LEN: usize = 15 * 1024 * 1024;

/// JPEG start-of-image followed by the APP0 marker.
pub const JPEG_SOI: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

/// JPEG end-of-image marker.
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Parser position within the unit stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    /// Waiting for a complete 16-byte header.
    #[default]
    AwaitingHeader,
    /// Waiting for this many payload bytes.
    AwaitingPayload(usize),
}

/// A payload cut from the stream, with its marker check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledFrame {
    /// Payload bytes.
    pub bytes: Vec<u8>,
    /// Whether the payload is bounded by JPEG markers.
    pub valid: bool,
}

impl AssembledFrame {
    /// Wrap a payload and check its markers.
    pub fn new(bytes: Vec<u8>) -> Self {
        let valid = is_jpeg(&bytes);
        Self { bytes, valid }
    }
}

/// Counters for the decoder's internal diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Headers dropped for a zero or oversized length.
    pub invalid_headers: u64,
    /// Payloads dropped for failing the marker check.
    pub invalid_frames: u64,
    /// Payloads accepted as JPEG frames.
    pub frames_accepted: u64,
}

/// Stateful decoder turning raw stream bytes into JPEG frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    state: DecoderState,
    buffer: Vec<u8>,
    stats: DecoderStats,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and drain complete units.
    ///
    /// Returns the first accepted frame; draining stops there and any
    /// remaining bytes stay buffered. Returns `None` when more data is needed.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        loop {
            match self.state {
                DecoderState::AwaitingHeader => {
                    if self.buffer.len() < HEADER_LEN {
                        return None;
                    }
                    let declared = u32::from_le_bytes([
                        self.buffer[0],
                        self.buffer[1],
                        self.buffer[2],
                        self.buffer[3],
                    ]) as usize;
                    self.buffer.drain(..HEADER_LEN);

                    if declared == 0 || declared > MAX_PAYLOAD_LEN {
                        self.stats.invalid_headers += 1;
                        debug!(declared, "dropping invalid frame header");
                        continue;
                    }
                    self.state = DecoderState::AwaitingPayload(declared);
                }
                DecoderState::AwaitingPayload(len) => {
                    if self.buffer.len() < len {
                        return None;
                    }
                    let payload: Vec<u8> = self.buffer.drain(..len).collect();
                    self.state = DecoderState::AwaitingHeader;

                    let frame = AssembledFrame::new(payload);
                    if frame.valid {
                        self.stats.frames_accepted += 1;
                        debug!(len, "accepted JPEG frame");
                        return Some(frame.bytes);
                    }
                    self.stats.invalid_frames += 1;
                    debug!(len, "dropping payload without JPEG markers");
                }
            }
        }
    }

    /// Current parser state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Diagnostic counters.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Discard buffered bytes and return to header parsing.
    ///
    /// Used when a new connection starts, since a fresh stream never
    /// continues a unit from the previous one.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::AwaitingHeader;
    }
}

/// Whether `bytes` is bounded by the JPEG SOI/APP0 and EOI markers.
pub fn is_jpeg(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.starts_with(&JPEG_SOI) && bytes.ends_with(&JPEG_EOI)
}

/// Encode one stream unit: header for `payload.len()` followed by `payload`.
///
/// The reserved header bytes are left zero.
pub fn encode_unit(payload: &[u8]) -> Vec<u8> {
    let mut unit = vec![0u8; HEADER_LEN];
    unit[0..4].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    unit.extend_from_slice(payload);
    unit
}
