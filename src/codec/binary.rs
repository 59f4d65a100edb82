//! Compact-binary encoding of an index state.
//!
//! A record is a fixed header followed by a body, all little-endian:
//!
//! ```text
//! offset size field
//! 0      1    version         writer format version
//! 1      1    compat_version  oldest reader version able to decode the body
//! 2      4    body_len        number of body bytes after the header
//! 6      4    body_crc32      CRC32 of the body
//! 10     ..   body
//! ```
//!
//! The body holds the fields in [`Field::ALL`] order. Scalars are fixed
//! width; each sequence is a varint count followed by fixed-width elements.
//!
//! The body may evolve in both directions without breaking readers:
//! a reader skips body bytes past the last field it knows (appended by a
//! newer writer), and a field that starts exactly at the end of the body
//! (omitted by an older writer) keeps its default value.

use std::ops::Range;

use log::debug;

use crate::error::{CompatError, Result};
use crate::model::{Field, IndexState, Offset, Timestamp};
use crate::storage::structured::{StructReader, StructWriter};

/// Format version written by this encoder.
pub const INDEX_STATE_VERSION: u8 = 1;

/// Oldest reader version that can decode what this encoder writes.
pub const INDEX_STATE_COMPAT_VERSION: u8 = 1;

/// Size of the envelope header in bytes.
pub const HEADER_LEN: usize = 10;

/// Byte range holding `bitflags` in an encoded record.
pub const BITFLAGS_RANGE: Range<usize> = HEADER_LEN..HEADER_LEN + 4;

/// The fixed header preceding every encoded body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub version: u8,
    pub compat_version: u8,
    pub body_len: u32,
    pub body_crc32: u32,
}

impl EnvelopeHeader {
    fn write_to(&self, writer: &mut StructWriter<Vec<u8>>) -> Result<()> {
        writer.write_u8(self.version)?;
        writer.write_u8(self.compat_version)?;
        writer.write_u32(self.body_len)?;
        writer.write_u32(self.body_crc32)
    }
}

/// Parse the envelope header at the start of `bytes`.
pub fn read_header(bytes: &[u8]) -> Result<EnvelopeHeader> {
    if bytes.len() < HEADER_LEN {
        return Err(CompatError::decode_binary(format!(
            "truncated header: {} of {HEADER_LEN} bytes",
            bytes.len()
        )));
    }

    let mut reader = StructReader::new(&bytes[..HEADER_LEN], HEADER_LEN as u64);
    Ok(EnvelopeHeader {
        version: reader.read_u8()?,
        compat_version: reader.read_u8()?,
        body_len: reader.read_u32()?,
        body_crc32: reader.read_u32()?,
    })
}

/// Wrap an already encoded body and its CRC32 in an envelope.
pub(crate) fn write_envelope(
    version: u8,
    compat_version: u8,
    body: &[u8],
    body_crc32: u32,
) -> Result<Vec<u8>> {
    let body_len = u32::try_from(body.len())
        .map_err(|_| CompatError::other(format!("body of {} bytes is too large", body.len())))?;

    let header = EnvelopeHeader {
        version,
        compat_version,
        body_len,
        body_crc32,
    };

    let mut writer = StructWriter::new(Vec::with_capacity(HEADER_LEN + body.len()));
    header.write_to(&mut writer)?;
    writer.write_raw(body)?;
    Ok(writer.finish().0)
}

/// Encode the body, returning it with its CRC32.
fn encode_body(st: &IndexState) -> Result<(Vec<u8>, u32)> {
    let mut body = StructWriter::new(Vec::new());

    body.write_u32(st.bitflags)?;
    body.write_i64(st.base_offset.value())?;
    body.write_i64(st.max_offset.value())?;
    body.write_i64(st.base_timestamp.value())?;
    body.write_i64(st.max_timestamp.value())?;

    body.write_varint(st.relative_offset_index().len() as u64)?;
    for &value in st.relative_offset_index() {
        body.write_u32(value)?;
    }

    body.write_varint(st.relative_time_index().len() as u64)?;
    for &value in st.relative_time_index() {
        body.write_u32(value)?;
    }

    body.write_varint(st.position_index().len() as u64)?;
    for &value in st.position_index() {
        body.write_u64(value)?;
    }

    Ok(body.finish())
}

/// Encode an index state.
///
/// The state must satisfy every model invariant.
pub fn to_bytes(st: &IndexState) -> Result<Vec<u8>> {
    st.validate()?;
    let (body, body_crc32) = encode_body(st)?;
    write_envelope(INDEX_STATE_VERSION, INDEX_STATE_COMPAT_VERSION, &body, body_crc32)
}

/// Reads body fields, treating a field that starts at the end of the body as absent.
struct BodyDecoder<'a> {
    reader: StructReader<&'a [u8]>,
}

impl<'a> BodyDecoder<'a> {
    fn new(body: &'a [u8]) -> Self {
        BodyDecoder {
            reader: StructReader::new(body, body.len() as u64),
        }
    }

    fn field<T, F>(&mut self, field: Field, read: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut StructReader<&'a [u8]>) -> Result<T>,
    {
        if self.reader.is_eof() {
            debug!("field `{}` absent from body, using default", field.name());
            return Ok(None);
        }

        read(&mut self.reader)
            .map(Some)
            .map_err(|e| CompatError::decode_binary(format!("field `{}`: {e}", field.name())))
    }

    fn sequence<T, F>(&mut self, field: Field, width: u64, read: F) -> Result<Vec<T>>
    where
        F: Fn(&mut StructReader<&'a [u8]>) -> Result<T>,
    {
        let values = self.field(field, |reader| {
            let count = reader.read_varint()?;
            if count
                .checked_mul(width)
                .is_none_or(|needed| needed > reader.remaining())
            {
                return Err(CompatError::other(format!(
                    "count {count} exceeds the {} remaining body bytes",
                    reader.remaining()
                )));
            }

            (0..count).map(|_| read(reader)).collect::<Result<Vec<T>>>()
        })?;

        Ok(values.unwrap_or_default())
    }

    /// Skip body bytes past the last known field, returning how many were skipped.
    fn skip_rest(&mut self) -> Result<u64> {
        let rest = self.reader.remaining();
        self.reader.skip(rest)?;
        Ok(rest)
    }
}

/// Decode an index state from a complete encoded record.
pub fn from_bytes(bytes: &[u8]) -> Result<IndexState> {
    let header = read_header(bytes)?;

    if header.compat_version > INDEX_STATE_VERSION {
        return Err(CompatError::decode_binary(format!(
            "incompatible format: record requires reader version {} but this reader is version {}",
            header.compat_version, INDEX_STATE_VERSION
        )));
    }

    let body_end = HEADER_LEN + header.body_len as usize;
    if bytes.len() < body_end {
        return Err(CompatError::decode_binary(format!(
            "truncated body: expected {} bytes, found {}",
            header.body_len,
            bytes.len() - HEADER_LEN
        )));
    }
    if bytes.len() > body_end {
        return Err(CompatError::decode_binary(format!(
            "{} trailing bytes after record",
            bytes.len() - body_end
        )));
    }

    let body = &bytes[HEADER_LEN..body_end];
    let crc = crc32fast::hash(body);
    if crc != header.body_crc32 {
        return Err(CompatError::decode_binary(format!(
            "checksum mismatch: header {:#010x}, body {:#010x}",
            header.body_crc32, crc
        )));
    }

    debug!(
        "decoding index state body: version={} compat_version={} body_len={}",
        header.version, header.compat_version, header.body_len
    );

    let mut decoder = BodyDecoder::new(body);
    let mut st = IndexState::new();

    if let Some(bitflags) = decoder.field(Field::Bitflags, |r| r.read_u32())? {
        st.bitflags = bitflags;
    }
    if let Some(offset) = decoder.field(Field::BaseOffset, |r| r.read_i64())? {
        st.base_offset = Offset::new(offset);
    }
    if let Some(offset) = decoder.field(Field::MaxOffset, |r| r.read_i64())? {
        st.max_offset = Offset::new(offset);
    }
    if let Some(millis) = decoder.field(Field::BaseTimestamp, |r| r.read_i64())? {
        st.base_timestamp = Timestamp::new(millis);
    }
    if let Some(millis) = decoder.field(Field::MaxTimestamp, |r| r.read_i64())? {
        st.max_timestamp = Timestamp::new(millis);
    }

    let relative_offset_index = decoder.sequence(Field::RelativeOffsetIndex, 4, |r| r.read_u32())?;
    let relative_time_index = decoder.sequence(Field::RelativeTimeIndex, 4, |r| r.read_u32())?;
    let position_index = decoder.sequence(Field::PositionIndex, 8, |r| r.read_u64())?;

    let skipped = decoder.skip_rest()?;
    if skipped > 0 {
        debug!(
            "skipped {skipped} body bytes written by format version {}",
            header.version
        );
    }

    let st = st.with_sequences(relative_offset_index, relative_time_index, position_index);
    st.validate()?;
    Ok(st)
}
