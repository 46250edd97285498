//! Camera stream authentication record.

/// Size of the record sent right after the TLS handshake.
pub const AUTH_RECORD_LEN: usize = 80;

const AUTH_MAGIC: u32 = 0x40;
const AUTH_MESSAGE_TYPE: u32 = 0x3000;
const FIELD_LEN: usize = 32;
const USERNAME_OFFSET: usize = 16;
const ACCESS_CODE_OFFSET: usize = USERNAME_OFFSET + FIELD_LEN;

/// Build the 80-byte authentication record.
///
/// Layout: magic (u32 LE), message type (u32 LE), 8 zero bytes, then the
/// username and access code, each zero-padded to 32 bytes. Longer values
/// are truncated to 32 bytes.
pub fn auth_record(username: &str, access_code: &str) -> [u8; AUTH_RECORD_LEN] {
    let mut record = [0u8; AUTH_RECORD_LEN];
    record[0..4].copy_from_slice(&AUTH_MAGIC.to_le_bytes());
    record[4..8].copy_from_slice(&AUTH_MESSAGE_TYPE.to_le_bytes());
    write_field(&mut record[USERNAME_OFFSET..ACCESS_CODE_OFFSET], username);
    write_field(&mut record[ACCESS_CODE_OFFSET..], access_code);
    record
}

fn write_field(dst: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(dst.len());
    dst[..len].copy_from_slice(&bytes[..len]);
}
