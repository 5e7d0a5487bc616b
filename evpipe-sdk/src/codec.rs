//! Binary codec for [`Event`] records.
//!
//! The layout is the Avro binary encoding of the record schema
//!
//! ```text
//! record Event { long id; string type; map<string> properties; }
//! ```
//!
//! * `long`: zig-zag, then base-128 little-endian varint (max 10 bytes).
//! * `string`: `long` byte length followed by UTF-8 bytes.
//! * `map`: blocks of `long` count followed by entries. A zero count ends
//!   the map. A negative count `-n` is followed by a `long` block size in
//!   bytes and then `n` entries. The byte size is skipped, not checked.
//!
//! Decoding stops once one complete record has been read; anything after
//! it is ignored.

use crate::objects::Event;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;

/// Errors produced while decoding an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("varint exceeds 64 bits")]
    VarintOverflow,
    #[error("negative length: {0}")]
    NegativeLength(i64),
    #[error("invalid utf-8 in string: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Decode one event from `input`.
pub fn decode(input: &[u8]) -> Result<Event, DecodeError> {
    let mut buf = input;
    let id = read_long(&mut buf)?;
    let event_type = read_string(&mut buf)?;
    let properties = read_string_map(&mut buf)?;
    Ok(Event {
        id,
        event_type,
        properties,
    })
}

/// Encode an event. The map is written as a single block with sorted keys.
pub fn encode(event: &Event) -> Bytes {
    let mut buf = BytesMut::with_capacity(encoded_len_hint(event));
    put_long(&mut buf, event.id);
    put_string(&mut buf, &event.event_type);
    if !event.properties.is_empty() {
        put_long(&mut buf, event.properties.len() as i64);
        for (key, value) in &event.properties {
            put_string(&mut buf, key);
            put_string(&mut buf, value);
        }
    }
    put_long(&mut buf, 0);
    buf.freeze()
}

fn encoded_len_hint(event: &Event) -> usize {
    let props: usize = event
        .properties
        .iter()
        .map(|(k, v)| k.len() + v.len() + 4)
        .sum();
    16 + event.event_type.len() + props
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn read_long(buf: &mut &[u8]) -> Result<i64, DecodeError> {
    let mut raw: u64 = 0;
    for shift in (0..64).step_by(7) {
        if !buf.has_remaining() {
            return Err(DecodeError::UnexpectedEof);
        }
        let byte = buf.get_u8();
        // the 10th byte may only carry the top bit
        if shift == 63 && byte > 1 {
            return Err(DecodeError::VarintOverflow);
        }
        raw |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64));
        }
    }
    Err(DecodeError::VarintOverflow)
}

fn read_len(buf: &mut &[u8]) -> Result<usize, DecodeError> {
    let len = read_long(buf)?;
    if len < 0 {
        return Err(DecodeError::NegativeLength(len));
    }
    let len = usize::try_from(len).map_err(|_| DecodeError::UnexpectedEof)?;
    if len > buf.remaining() {
        return Err(DecodeError::UnexpectedEof);
    }
    Ok(len)
}

fn read_string(buf: &mut &[u8]) -> Result<String, DecodeError> {
    let len = read_len(buf)?;
    let s = std::str::from_utf8(&buf[..len])?.to_owned();
    buf.advance(len);
    Ok(s)
}

fn read_string_map(buf: &mut &[u8]) -> Result<BTreeMap<String, String>, DecodeError> {
    let mut map = BTreeMap::new();
    loop {
        let count = read_long(buf)?;
        if count == 0 {
            return Ok(map);
        }

        if count < 0 {
            // block size in bytes, only useful for skipping
            read_long(buf)?;
        }
        let count = count.unsigned_abs();

        // Every entry needs at least two bytes (two empty strings).
        if count > (buf.remaining() / 2) as u64 {
            return Err(DecodeError::UnexpectedEof);
        }

        for _ in 0..count {
            let key = read_string(buf)?;
            let value = read_string(buf)?;
            map.insert(key, value);
        }
    }
}

fn put_long(buf: &mut BytesMut, value: i64) {
    let mut zz = ((value << 1) ^ (value >> 63)) as u64;
    while zz >= 0x80 {
        buf.put_u8((zz as u8 & 0x7f) | 0x80);
        zz >>= 7;
    }
    buf.put_u8(zz as u8);
}

fn put_string(buf: &mut BytesMut, value: &str) {
    put_long(buf, value.len() as i64);
    buf.put_slice(value.as_bytes());
}
