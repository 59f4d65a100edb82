//! Structured binary I/O.
//!
//! [`StructWriter`] and [`StructReader`] read and write fixed-width
//! little-endian primitives and LEB128 varints over any byte stream while
//! tracking position. The writer keeps a running CRC32 of everything it has
//! written.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{CompatError, Result};
use crate::util::varint;

/// A structured writer for binary data.
pub struct StructWriter<W: Write> {
    writer: W,
    hasher: crc32fast::Hasher,
    position: u64,
}

impl<W: Write> StructWriter<W> {
    /// Create a new structured writer.
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            hasher: crc32fast::Hasher::new(),
            position: 0,
        }
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.track(&[value]);
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.track(&value.to_le_bytes());
        Ok(())
    }

    /// Write an i64 value (little-endian).
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.writer.write_i64::<LittleEndian>(value)?;
        self.track(&value.to_le_bytes());
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.track(&value.to_le_bytes());
        Ok(())
    }

    /// Write a variable-length integer.
    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        let encoded = varint::encode_u64(value);
        self.write_raw(&encoded)
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.track(value);
        Ok(())
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Consume the writer, returning the underlying stream and the final checksum.
    pub fn finish(self) -> (W, u32) {
        (self.writer, self.hasher.finalize())
    }

    fn track(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.position += data.len() as u64;
    }
}

/// A structured reader for binary data of known length.
pub struct StructReader<R: Read> {
    reader: R,
    position: u64,
    size: u64,
}

impl<R: Read> StructReader<R> {
    /// Create a new structured reader over `size` bytes of `reader`.
    pub fn new(reader: R, size: u64) -> Self {
        StructReader {
            reader,
            position: 0,
            size,
        }
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let value = self.reader.read_u8()?;
        self.position += 1;
        Ok(value)
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let value = self.reader.read_u32::<LittleEndian>()?;
        self.position += 4;
        Ok(value)
    }

    /// Read an i64 value (little-endian).
    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        let value = self.reader.read_i64::<LittleEndian>()?;
        self.position += 8;
        Ok(value)
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        let value = self.reader.read_u64::<LittleEndian>()?;
        self.position += 8;
        Ok(value)
    }

    /// Read a variable-length integer.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut bytes = Vec::with_capacity(varint::MAX_VARINT_LEN);
        loop {
            let byte = self.read_u8()?;
            bytes.push(byte);
            if byte & 0x80 == 0 || bytes.len() == varint::MAX_VARINT_LEN {
                break;
            }
        }

        let (value, _) = varint::decode_u64(&bytes)?;
        Ok(value)
    }

    /// Skip `length` bytes.
    pub fn skip(&mut self, length: u64) -> Result<()> {
        self.ensure(length)?;
        let copied = std::io::copy(&mut (&mut self.reader).take(length), &mut std::io::sink())?;
        self.position += copied;
        if copied != length {
            return Err(CompatError::other(format!(
                "unexpected end of stream after skipping {copied} of {length} bytes"
            )));
        }
        Ok(())
    }

    /// Current read position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left before the end of the readable region.
    pub fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.position)
    }

    /// Check if we're at the end of the readable region.
    pub fn is_eof(&self) -> bool {
        self.position >= self.size
    }

    fn ensure(&self, length: u64) -> Result<()> {
        if length > self.remaining() {
            return Err(CompatError::other(format!(
                "read of {length} bytes at position {} exceeds size {}",
                self.position, self.size
            )));
        }
        Ok(())
    }
}
