//! Record framing for journal files.
//!
//! Every record is JSON wrapped in a checksummed frame header and a CRC32
//! trailer:
//!
//! ```text
//! [version: 1 byte][length: 4 bytes LE][header crc32: 4 bytes LE]
//! [data: N bytes JSON][crc32: 4 bytes LE]
//! ```
//!
//! The header checksum covers the version and length bytes, so a damaged
//! length is reported as corruption rather than read as a short record.
//!
//! Files start with a 5-byte header: the `GVLT` magic and the codec version.

use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};

use crc32fast::Hasher;
use serde::{de::DeserializeOwned, Serialize};

/// Current codec version.
pub const CODEC_VERSION: u8 = 1;

/// Magic bytes at the start of every GuildVault file.
pub const MAGIC: [u8; 4] = *b"GVLT";

/// Size of the file header in bytes.
pub const HEADER_LEN: u64 = 5;

/// Bytes in front of each record's payload: version, length and header checksum.
pub const FRAME_HEADER_LEN: usize = 1 + 4 + 4;

/// Upper bound on a single record. A full-catalog checkpoint is the largest record we write.
const MAX_RECORD_SIZE: usize = 256 * 1024 * 1024;

fn invalid(message: String) -> IoError {
    IoError::new(ErrorKind::InvalidData, message)
}

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Serializes `value` into one framed record.
pub fn encode<T: Serialize>(value: &T) -> IoResult<Vec<u8>> {
    let data = serde_json::to_vec(value).map_err(|e| invalid(format!("serialization failed: {e}")))?;
    let len = u32::try_from(data.len())
        .map_err(|_| invalid(format!("record of {} bytes is too large", data.len())))?;

    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + data.len() + 4);
    out.push(CODEC_VERSION);
    out.extend_from_slice(&len.to_le_bytes());
    let header_crc = checksum(&out);
    out.extend_from_slice(&header_crc.to_le_bytes());
    out.extend_from_slice(&data);
    out.extend_from_slice(&checksum(&data).to_le_bytes());
    Ok(out)
}

/// Reads one framed record, verifying its checksum.
///
/// # Errors
/// - `UnexpectedEof` if the stream ends mid-record (a torn write)
/// - `InvalidData` with "CRC mismatch" if the frame header or payload was corrupted
/// - `InvalidData` for an unknown version, an oversized length, or bad JSON
pub fn decode<T: DeserializeOwned>(reader: &mut impl Read) -> IoResult<T> {
    let mut header = [0u8; 5];
    reader.read_exact(&mut header)?;
    let mut header_crc = [0u8; 4];
    reader.read_exact(&mut header_crc)?;
    let stored = u32::from_le_bytes(header_crc);
    let computed = checksum(&header);
    if stored != computed {
        return Err(invalid(format!(
            "header CRC mismatch: stored={stored:08x}, computed={computed:08x} (frame corrupted)"
        )));
    }

    let version = header[0];
    if version != CODEC_VERSION {
        return Err(invalid(format!(
            "unsupported codec version: {version} (expected {CODEC_VERSION})"
        )));
    }

    let len = u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if len > MAX_RECORD_SIZE {
        return Err(invalid(format!(
            "record size {len} exceeds maximum {MAX_RECORD_SIZE}"
        )));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data)?;

    let mut crc_bytes = [0u8; 4];
    reader.read_exact(&mut crc_bytes)?;
    let stored = u32::from_le_bytes(crc_bytes);
    let computed = checksum(&data);
    if stored != computed {
        return Err(invalid(format!(
            "CRC mismatch: stored={stored:08x}, computed={computed:08x} (data corrupted)"
        )));
    }

    serde_json::from_slice(&data).map_err(|e| invalid(format!("deserialization failed: {e}")))
}

/// Write the file header (magic + version).
pub fn write_header(writer: &mut impl Write) -> IoResult<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&[CODEC_VERSION])
}

/// Read and validate the file header, returning its version byte.
pub fn read_header(reader: &mut impl Read) -> IoResult<u8> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(invalid(format!(
            "invalid magic bytes: expected {MAGIC:?}, got {magic:?}"
        )));
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    Ok(version[0])
}
