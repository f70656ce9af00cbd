// Variable-length integer encoding for container headers
// Format: [num_bytes: u8][value bytes in big-endian]

use std::io::{Cursor, Read, Write};

use crate::error::{CodecError, Result};

/// Write a value with variable-length encoding.
/// Returns number of bytes written.
pub fn write_varint<W: Write>(writer: &mut W, value: u64) -> Result<usize> {
    let no_bytes = (u64::BITS - value.leading_zeros()).div_ceil(8) as u8;

    writer.write_all(&[no_bytes])?;
    for i in (0..no_bytes).rev() {
        writer.write_all(&[(value >> (i * 8)) as u8])?;
    }

    Ok(no_bytes as usize + 1)
}

/// Read a value with variable-length encoding.
/// Returns (value, bytes_read).
pub fn read_varint<R: Read>(reader: &mut R) -> Result<(u64, usize)> {
    let mut no_bytes = [0u8; 1];
    reader.read_exact(&mut no_bytes)?;
    let no_bytes = no_bytes[0];
    if no_bytes > 8 {
        return Err(CodecError::InvalidContainer(format!(
            "varint length byte {no_bytes} exceeds 8"
        )));
    }

    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf[..no_bytes as usize])?;
    let value = buf[..no_bytes as usize]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64);

    Ok((value, no_bytes as usize + 1))
}

/// Read a varint that must fit in 32 bits; `field` names it in errors
pub fn read_varint_u32<R: Read>(reader: &mut R, field: &str) -> Result<u32> {
    let (value, _) = read_varint(reader)?;
    u32::try_from(value).map_err(|_| {
        CodecError::InvalidContainer(format!("{field} value {value} does not fit in 32 bits"))
    })
}

/// Write a varint to a byte vector (convenience wrapper)
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    // Writing into a Vec cannot fail
    let _ = write_varint(&mut buf, value);
    buf
}

/// Read a varint from a byte slice (convenience wrapper)
pub fn decode_varint(bytes: &[u8]) -> Result<(u64, usize)> {
    read_varint(&mut Cursor::new(bytes))
}
