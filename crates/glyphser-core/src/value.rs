//! The closed value model accepted by the canonical encoder.
//!
//! Maps are association lists: the order entries were inserted in carries no
//! meaning and never reaches the encoded bytes. Only [`MapKey`] variants may
//! be used as keys, which keeps floats and containers out of key position.

use bytes::Bytes;
use ciborium::value::Value as CborValue;
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};

/// A value in the canonical model.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    /// Signed integer. Encodable range is `-2^64 ..= 2^64 - 1`.
    Integer(i128),
    /// IEEE-754 double. NaN is rejected at encode time.
    Float(f64),
    Bytes(Bytes),
    Text(String),
    Array(Vec<CanonicalValue>),
    Map(Vec<(MapKey, CanonicalValue)>),
}

/// The legal key types of a [`CanonicalValue::Map`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Null,
    Bool(bool),
    Integer(i128),
    Bytes(Bytes),
    Text(String),
}

impl CanonicalValue {
    /// A text value.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// A byte string value.
    pub fn bytes(b: impl Into<Bytes>) -> Self {
        Self::Bytes(b.into())
    }

    /// An empty array.
    pub fn empty_array() -> Self {
        Self::Array(Vec::new())
    }

    /// Start building a map.
    pub fn map() -> MapBuilder {
        MapBuilder::default()
    }

    /// Look up a text key in a map. Returns `None` for non-maps.
    pub fn get(&self, key: &str) -> Option<&CanonicalValue> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, MapKey::Text(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CanonicalValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of an integer or float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Convert to JSON for persistence.
    ///
    /// Byte strings render as `"hex:<lowercase hex>"`. Maps must have text
    /// keys, integers must fit in 64 bits and floats must be finite.
    pub fn to_json(&self) -> Result<JsonValue> {
        Ok(match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Integer(n) => {
                if let Ok(u) = u64::try_from(*n) {
                    JsonValue::from(u)
                } else if let Ok(i) = i64::try_from(*n) {
                    JsonValue::from(i)
                } else {
                    return Err(CoreError::UnsupportedValue(format!(
                        "integer {} does not fit in JSON",
                        n
                    )));
                }
            }
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .ok_or_else(|| {
                    CoreError::UnsupportedValue(format!("float {} has no JSON form", f))
                })?,
            Self::Bytes(b) => JsonValue::String(format!("hex:{}", hex::encode(b))),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(CanonicalValue::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::Map(entries) => {
                let mut object = serde_json::Map::new();
                for (key, value) in entries {
                    let MapKey::Text(name) = key else {
                        return Err(CoreError::UnsupportedValue(format!(
                            "JSON object keys must be text, got {:?}",
                            key
                        )));
                    };
                    object.insert(name.clone(), value.to_json()?);
                }
                JsonValue::Object(object)
            }
        })
    }
}

/// Builder for map values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapBuilder {
    entries: Vec<(MapKey, CanonicalValue)>,
}

impl MapBuilder {
    /// Add an entry. Duplicate keys are reported by the encoder.
    pub fn entry(mut self, key: impl Into<MapKey>, value: impl Into<CanonicalValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Add every entry from an iterator.
    pub fn extend<K, V>(mut self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<MapKey>,
        V: Into<CanonicalValue>,
    {
        self.entries
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn build(self) -> CanonicalValue {
        CanonicalValue::Map(self.entries)
    }
}

impl From<bool> for CanonicalValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for CanonicalValue {
    fn from(n: i64) -> Self {
        Self::Integer(n.into())
    }
}

impl From<u64> for CanonicalValue {
    fn from(n: u64) -> Self {
        Self::Integer(n.into())
    }
}

impl From<i32> for CanonicalValue {
    fn from(n: i32) -> Self {
        Self::Integer(n.into())
    }
}

impl From<f64> for CanonicalValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for CanonicalValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Bytes> for CanonicalValue {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<CanonicalValue>> for CanonicalValue {
    fn from(items: Vec<CanonicalValue>) -> Self {
        Self::Array(items)
    }
}

impl From<MapKey> for CanonicalValue {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Null => Self::Null,
            MapKey::Bool(b) => Self::Bool(b),
            MapKey::Integer(n) => Self::Integer(n),
            MapKey::Bytes(b) => Self::Bytes(b),
            MapKey::Text(s) => Self::Text(s),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MapKey {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for MapKey {
    fn from(n: i64) -> Self {
        Self::Integer(n.into())
    }
}

impl From<u64> for MapKey {
    fn from(n: u64) -> Self {
        Self::Integer(n.into())
    }
}

impl From<bool> for MapKey {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Bytes> for MapKey {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl TryFrom<CanonicalValue> for MapKey {
    type Error = CoreError;

    fn try_from(value: CanonicalValue) -> Result<Self> {
        match value {
            CanonicalValue::Null => Ok(Self::Null),
            CanonicalValue::Bool(b) => Ok(Self::Bool(b)),
            CanonicalValue::Integer(n) => Ok(Self::Integer(n)),
            CanonicalValue::Bytes(b) => Ok(Self::Bytes(b)),
            CanonicalValue::Text(s) => Ok(Self::Text(s)),
            other => Err(CoreError::UnsupportedValue(format!(
                "not a legal map key: {:?}",
                other
            ))),
        }
    }
}

impl TryFrom<JsonValue> for CanonicalValue {
    type Error = CoreError;

    /// Integral JSON numbers become `Integer`, all others `Float`.
    fn try_from(value: JsonValue) -> Result<Self> {
        Ok(match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Self::Integer(u.into())
                } else if let Some(i) = n.as_i64() {
                    Self::Integer(i.into())
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    return Err(CoreError::UnsupportedValue(format!("JSON number {}", n)));
                }
            }
            JsonValue::String(s) => Self::Text(s),
            JsonValue::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(CanonicalValue::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            JsonValue::Object(object) => Self::Map(
                object
                    .into_iter()
                    .map(|(k, v)| Ok((MapKey::Text(k), CanonicalValue::try_from(v)?)))
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }
}

impl TryFrom<CborValue> for CanonicalValue {
    type Error = CoreError;

    /// Tags and non-scalar map keys fall outside the model.
    fn try_from(value: CborValue) -> Result<Self> {
        Ok(match value {
            CborValue::Null => Self::Null,
            CborValue::Bool(b) => Self::Bool(b),
            CborValue::Integer(i) => Self::Integer(i.into()),
            CborValue::Float(f) => Self::Float(f),
            CborValue::Bytes(b) => Self::Bytes(b.into()),
            CborValue::Text(s) => Self::Text(s),
            CborValue::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(CanonicalValue::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            CborValue::Map(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| {
                        let key = MapKey::try_from(CanonicalValue::try_from(k)?)?;
                        Ok((key, CanonicalValue::try_from(v)?))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            CborValue::Tag(tag, _) => {
                return Err(CoreError::UnsupportedValue(format!("CBOR tag {}", tag)))
            }
            other => {
                return Err(CoreError::UnsupportedValue(format!(
                    "CBOR value {:?}",
                    other
                )))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_numbers_keep_integer_and_float_apart() {
        let value: CanonicalValue = serde_json::json!({"x": [0, 1.5, -3]}).try_into().unwrap();
        let items = value.get("x").and_then(CanonicalValue::as_array).unwrap();
        assert_eq!(items[0], CanonicalValue::Integer(0));
        assert_eq!(items[1], CanonicalValue::Float(1.5));
        assert_eq!(items[2], CanonicalValue::Integer(-3));
    }

    #[test]
    fn test_to_json_renders_bytes_as_hex() {
        let value = CanonicalValue::map()
            .entry("blob", CanonicalValue::bytes(vec![0xdeu8, 0xad]))
            .entry("n", 7u64)
            .build();
        assert_eq!(
            value.to_json().unwrap(),
            serde_json::json!({"blob": "hex:dead", "n": 7})
        );
    }

    #[test]
    fn test_to_json_rejects_non_text_keys() {
        let value = CanonicalValue::map().entry(1u64, "one").build();
        assert!(matches!(
            value.to_json(),
            Err(CoreError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn test_cbor_tag_is_unsupported() {
        let tagged = CborValue::Tag(1, Box::new(CborValue::Integer(0.into())));
        assert!(matches!(
            CanonicalValue::try_from(tagged),
            Err(CoreError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn test_cbor_array_key_is_unsupported() {
        let map = CborValue::Map(vec![(CborValue::Array(vec![]), CborValue::Null)]);
        assert!(CanonicalValue::try_from(map).is_err());
    }

    #[test]
    fn test_get_on_non_map() {
        assert!(CanonicalValue::Null.get("a").is_none());
    }
}
