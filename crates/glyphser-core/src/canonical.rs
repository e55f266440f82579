//! Canonical CBOR encoding for deterministic serialization.
//!
//! The encoding is a fixed subset of RFC 8949:
//! - Integers, lengths and counts use the smallest of the five prefix tiers
//! - Definite lengths only
//! - Map entries sorted by the raw bytes of their encoded keys
//! - Floats are always the 9-byte `0xfb` form carrying the IEEE-754 bit pattern
//!
//! **CRITICAL**: This encoding is FROZEN. Every identity in the system is a
//! SHA-256 over these bytes; any change invalidates all pinned digests.

use crate::error::{CoreError, Result};
use crate::value::{CanonicalValue, MapKey};

/// Major types.
pub(crate) mod major {
    pub const UINT: u8 = 0;
    pub const NEGATIVE: u8 = 1;
    pub const BYTES: u8 = 2;
    pub const TEXT: u8 = 3;
    pub const ARRAY: u8 = 4;
    pub const MAP: u8 = 5;
}

const FALSE: u8 = 0xf4;
const TRUE: u8 = 0xf5;
const NULL: u8 = 0xf6;
const FLOAT64: u8 = 0xfb;

/// Encode a value to canonical bytes.
pub fn encode(value: &CanonicalValue) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value(&mut buf, value)?;
    Ok(buf)
}

/// Encode a value and return the lowercase hex of the bytes.
pub fn encode_hex(value: &CanonicalValue) -> Result<String> {
    Ok(hex::encode(encode(value)?))
}

/// Check a value against a pinned hex encoding.
pub fn validate_hex(value: &CanonicalValue, expected_hex: &str) -> Result<()> {
    let actual = encode_hex(value)?;
    if actual != expected_hex {
        return Err(CoreError::EncodingMismatch {
            expected: expected_hex.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Recursively encode a value.
pub(crate) fn encode_value(buf: &mut Vec<u8>, value: &CanonicalValue) -> Result<()> {
    match value {
        CanonicalValue::Null => buf.push(NULL),
        CanonicalValue::Bool(b) => buf.push(if *b { TRUE } else { FALSE }),
        CanonicalValue::Integer(n) => encode_integer(buf, *n)?,
        CanonicalValue::Float(f) => encode_float(buf, *f)?,
        CanonicalValue::Bytes(b) => write_bytes(buf, b),
        CanonicalValue::Text(s) => write_text(buf, s),
        CanonicalValue::Array(items) => {
            write_uint(buf, major::ARRAY, items.len() as u64);
            for item in items {
                encode_value(buf, item)?;
            }
        }
        CanonicalValue::Map(entries) => encode_map(buf, entries)?,
    }
    Ok(())
}

fn encode_key(buf: &mut Vec<u8>, key: &MapKey) -> Result<()> {
    match key {
        MapKey::Null => buf.push(NULL),
        MapKey::Bool(b) => buf.push(if *b { TRUE } else { FALSE }),
        MapKey::Integer(n) => encode_integer(buf, *n)?,
        MapKey::Bytes(b) => write_bytes(buf, b),
        MapKey::Text(s) => write_text(buf, s),
    }
    Ok(())
}

/// Encode an integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, n: i128) -> Result<()> {
    let out_of_range = || CoreError::UnsupportedValue(format!("integer {} out of range", n));
    if n >= 0 {
        let magnitude = u64::try_from(n).map_err(|_| out_of_range())?;
        write_uint(buf, major::UINT, magnitude);
    } else {
        // -1 encodes as 0, -2 as 1, etc.
        let magnitude = u64::try_from(-1 - n).map_err(|_| out_of_range())?;
        write_uint(buf, major::NEGATIVE, magnitude);
    }
    Ok(())
}

fn encode_float(buf: &mut Vec<u8>, f: f64) -> Result<()> {
    if f.is_nan() {
        return Err(CoreError::UnsupportedValue("NaN float".into()));
    }
    buf.push(FLOAT64);
    buf.extend_from_slice(&f.to_bits().to_be_bytes());
    Ok(())
}

/// Encode a map (major type 5).
///
/// Each pair is encoded independently and the pairs are sorted by their key
/// bytes, so the output never depends on insertion order.
fn encode_map(buf: &mut Vec<u8>, entries: &[(MapKey, CanonicalValue)]) -> Result<()> {
    let mut pairs = entries
        .iter()
        .map(|(k, v)| {
            let mut key_bytes = Vec::new();
            encode_key(&mut key_bytes, k)?;
            let mut value_bytes = Vec::new();
            encode_value(&mut value_bytes, v)?;
            Ok((key_bytes, value_bytes))
        })
        .collect::<Result<Vec<_>>>()?;

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(dup) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(CoreError::UnsupportedValue(format!(
            "duplicate map key {}",
            hex::encode(&dup[0].0)
        )));
    }

    write_uint(buf, major::MAP, pairs.len() as u64);
    for (key_bytes, value_bytes) in pairs {
        buf.extend_from_slice(&key_bytes);
        buf.extend_from_slice(&value_bytes);
    }
    Ok(())
}

/// Write a major type with its argument in the smallest tier.
pub(crate) fn write_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
pub(crate) fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_uint(buf, major::BYTES, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
pub(crate) fn write_text(buf: &mut Vec<u8>, s: &str) {
    write_uint(buf, major::TEXT, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}
