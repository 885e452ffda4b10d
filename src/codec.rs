//! Low-level binary codec for context snapshots.
//!
//! All multi-byte integers are little-endian. Strings are written as a 7-bit
//! continuation varint byte length followed by UTF-8 bytes:
//!
//! ```text
//! [len: 1-5 bytes, low 7 bits first, high bit = more][utf8: len bytes]
//! ```
//!
//! The stream header packs a magic number and a version byte into one `i32`
//! so that a reader can fail fast on foreign data or on snapshots from a
//! newer writer.

use std::io::{ErrorKind, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::config::ContextConfig;
use crate::error::{KnowledgeError, KnowledgeResult};

/// Magic number identifying a serialized context. The low byte is the version.
pub const MAGIC_NUMBER: u32 = 0x5F9A_5100;

/// Current snapshot format version.
pub const SERIALIZED_VERSION: u8 = 3;

/// Highest version that still uses fixed 4-byte primitive lengths.
pub const LAST_FIXED_LENGTH_VERSION: u8 = 2;

const MAGIC_MASK: u32 = 0xFFFF_FF00;
const MAX_VARINT_BYTES: u32 = 5;

/// Maps a read failure to a codec error; a short read means truncated data.
pub(crate) fn read_err(err: std::io::Error) -> KnowledgeError {
    if err.kind() == ErrorKind::UnexpectedEof {
        KnowledgeError::invalid_data("unexpected end of stream")
    } else {
        KnowledgeError::Io(err)
    }
}

/// Writes the stream header for the given version.
pub fn write_header(writer: &mut impl Write, version: u8) -> KnowledgeResult<()> {
    writer.write_u32::<LittleEndian>(MAGIC_NUMBER | u32::from(version))?;
    Ok(())
}

/// Reads and validates the stream header, returning its version.
///
/// # Errors
/// - `InvalidData` if the magic number does not match
/// - `InvalidData` if the version is newer than [`SERIALIZED_VERSION`]
pub fn read_header(reader: &mut impl Read) -> KnowledgeResult<u8> {
    let header = reader.read_u32::<LittleEndian>().map_err(read_err)?;
    if header & MAGIC_MASK != MAGIC_NUMBER {
        return Err(KnowledgeError::invalid_data(format!(
            "stream is not a serialized knowledge context (header {header:#010x})"
        )));
    }

    #[allow(clippy::cast_possible_truncation)]
    let version = (header & 0xFF) as u8;
    if version > SERIALIZED_VERSION {
        return Err(KnowledgeError::invalid_data(format!(
            "stream reports version {version} but this reader supports up to {SERIALIZED_VERSION}"
        )));
    }

    Ok(version)
}

/// Writes an unsigned 7-bit continuation varint.
pub fn write_varint(writer: &mut impl Write, mut value: u32) -> KnowledgeResult<()> {
    while value >= 0x80 {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u8((value as u8) | 0x80)?;
        value >>= 7;
    }
    #[allow(clippy::cast_possible_truncation)]
    writer.write_u8(value as u8)?;
    Ok(())
}

/// Reads an unsigned 7-bit continuation varint of at most five bytes.
pub fn read_varint(reader: &mut impl Read) -> KnowledgeResult<u32> {
    let mut result = 0u32;
    for index in 0..MAX_VARINT_BYTES {
        let byte = reader.read_u8().map_err(read_err)?;
        // The fifth byte may only carry the top four bits.
        if index == MAX_VARINT_BYTES - 1 && byte > 0x0F {
            return Err(KnowledgeError::invalid_data("varint overflows 32 bits"));
        }
        result |= u32::from(byte & 0x7F) << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }

    Err(KnowledgeError::invalid_data("varint longer than 5 bytes"))
}

/// Checks a string length against the configured limit.
///
/// Writers and readers share this check so that anything a context writes,
/// a context with the same limits can read back.
pub fn check_string_len(len: usize, config: &ContextConfig) -> KnowledgeResult<()> {
    if len > config.max_string_bytes {
        return Err(KnowledgeError::invalid_data(format!(
            "string length {len} exceeds maximum {}",
            config.max_string_bytes
        )));
    }
    Ok(())
}

/// Checks a record count against the configured limit.
pub fn check_count(count: usize, config: &ContextConfig) -> KnowledgeResult<()> {
    if count > config.max_record_count {
        return Err(KnowledgeError::invalid_data(format!(
            "record count {count} exceeds maximum {}",
            config.max_record_count
        )));
    }
    Ok(())
}

/// Writes a varint-prefixed UTF-8 string, enforcing the configured size limit.
pub fn write_string(
    writer: &mut impl Write,
    value: &str,
    config: &ContextConfig,
) -> KnowledgeResult<()> {
    check_string_len(value.len(), config)?;
    let len = u32::try_from(value.len())
        .map_err(|_| KnowledgeError::invalid_data("string exceeds 4 GiB"))?;
    write_varint(writer, len)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

/// Reads a varint-prefixed UTF-8 string, enforcing the configured size limit.
pub fn read_string(reader: &mut impl Read, config: &ContextConfig) -> KnowledgeResult<String> {
    let len = read_varint(reader)? as usize;
    check_string_len(len, config)?;

    let bytes = read_bytes(reader, len)?;
    String::from_utf8(bytes)
        .map_err(|e| KnowledgeError::invalid_data(format!("string is not valid UTF-8: {e}")))
}

/// Reads exactly `len` raw bytes.
pub fn read_bytes(reader: &mut impl Read, len: usize) -> KnowledgeResult<Vec<u8>> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(read_err)?;
    Ok(buf)
}

/// Writes a record count as a signed 32-bit integer, enforcing the configured limit.
pub fn write_count(
    writer: &mut impl Write,
    count: usize,
    config: &ContextConfig,
) -> KnowledgeResult<()> {
    check_count(count, config)?;
    let count = i32::try_from(count)
        .map_err(|_| KnowledgeError::invalid_data(format!("record count {count} exceeds i32")))?;
    writer.write_i32::<LittleEndian>(count)?;
    Ok(())
}

/// Reads a record count, rejecting negative or oversized values.
pub fn read_count(reader: &mut impl Read, config: &ContextConfig) -> KnowledgeResult<usize> {
    let raw = reader.read_i32::<LittleEndian>().map_err(read_err)?;
    let count = usize::try_from(raw)
        .map_err(|_| KnowledgeError::invalid_data(format!("negative record count {raw}")))?;
    check_count(count, config)?;
    Ok(count)
}
