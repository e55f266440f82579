//! SHA-256 digests and named schema references.
//!
//! A [`Digest`] is always surfaced as 64 lowercase hex characters. A
//! [`SchemaRef`] is the `sha256:<label>` form persisted records use to name a
//! schema; it is not a computed digest and the two never convert implicitly.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::value::CanonicalValue;

/// Prefix used by persisted records.
pub const SHA256_PREFIX: &str = "sha256:";

/// A 32-byte SHA-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Compute the SHA-256 hash of raw bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        use sha2::Digest as _;
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse exactly 64 lowercase hex characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != 64 || s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(CoreError::InvalidDigest(s.to_string()));
        }
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidDigest(e.to_string()))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Render as `sha256:<hex>`.
    pub fn to_prefixed(&self) -> String {
        format!("{}{}", SHA256_PREFIX, self.to_hex())
    }

    /// Parse either bare hex or `sha256:<hex>`.
    pub fn parse(s: &str) -> Result<Self> {
        Self::from_hex(s.strip_prefix(SHA256_PREFIX).unwrap_or(s))
    }

    /// The zero digest (sentinel value).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Digests embed in canonical values as 32-byte byte strings.
impl From<Digest> for CanonicalValue {
    fn from(d: Digest) -> Self {
        CanonicalValue::bytes(d.0.to_vec())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A named schema reference, persisted as `sha256:<label>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaRef(String);

impl SchemaRef {
    /// Create from a label such as `schema.request.minimal`.
    ///
    /// A label that is itself a 64-char hex string would read as a computed
    /// digest once prefixed, so it is rejected.
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        if label.is_empty() || Digest::from_hex(&label).is_ok() {
            return Err(CoreError::InvalidSchemaRef(label));
        }
        Ok(Self(label))
    }

    /// Parse the persisted `sha256:<label>` form.
    pub fn parse(s: &str) -> Result<Self> {
        let label = s
            .strip_prefix(SHA256_PREFIX)
            .ok_or_else(|| CoreError::InvalidSchemaRef(s.to_string()))?;
        Self::new(label)
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    /// The catalog digest of this schema: SHA-256 of the label bytes.
    pub fn digest(&self) -> Digest {
        Digest::of_bytes(self.0.as_bytes())
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SHA256_PREFIX, self.0)
    }
}

impl From<&SchemaRef> for CanonicalValue {
    fn from(s: &SchemaRef) -> Self {
        CanonicalValue::Text(s.to_string())
    }
}

impl Serialize for SchemaRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SchemaRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SchemaRef::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let d = Digest::of_bytes(b"hello world");
        assert_eq!(
            d.to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_single_byte_flip_changes_digest() {
        let original = Digest::of_bytes(b"hello world");
        let flipped = Digest::of_bytes(b"hello worle");
        assert_ne!(original, flipped);
        assert_eq!(
            flipped.to_hex(),
            "0fc30e735a0228a31cbbb969988b4f50e02e737f979f091d7d224b765443f5d4"
        );
    }

    #[test]
    fn test_hex_roundtrip_and_prefix() {
        let d = Digest::of_bytes(b"x");
        assert_eq!(Digest::from_hex(&d.to_hex()).unwrap(), d);
        assert_eq!(Digest::parse(&d.to_prefixed()).unwrap(), d);
        assert_eq!(format!("{}", d), d.to_hex());
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(Digest::from_hex("abc").is_err());
        assert!(Digest::from_hex(&"G".repeat(64)).is_err());
        assert!(Digest::from_hex(&"AB".repeat(32)).is_err());
    }

    #[test]
    fn test_schema_ref_is_not_a_digest() {
        let schema = SchemaRef::parse("sha256:schema.request.minimal").unwrap();
        assert_eq!(schema.label(), "schema.request.minimal");
        assert_eq!(schema.to_string(), "sha256:schema.request.minimal");
        assert!(Digest::parse(&schema.to_string()).is_err());

        let digest_like = Digest::of_bytes(b"y").to_prefixed();
        assert!(SchemaRef::parse(&digest_like).is_err());
        assert!(SchemaRef::parse("schema.request.minimal").is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let d = Digest::of_bytes(b"z");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", d.to_hex()));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
