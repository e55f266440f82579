//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use glyphser_core::{CanonicalValue, Digest, MapKey, TraceRecord};

/// Integers across the full encodable range.
pub fn integer() -> impl Strategy<Value = i128> {
    prop_oneof![
        -1000i128..1000,
        (-(1i128 << 64))..(1i128 << 64),
    ]
}

/// Finite or infinite floats. NaN is excluded.
pub fn float() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("NaN is not encodable", |f| !f.is_nan())
}

/// A short text map key.
pub fn text_key() -> impl Strategy<Value = String> {
    "[a-z_]{0,12}".prop_map(String::from)
}

/// Any legal map key.
pub fn map_key() -> impl Strategy<Value = MapKey> {
    prop_oneof![
        Just(MapKey::Null),
        any::<bool>().prop_map(MapKey::Bool),
        integer().prop_map(MapKey::Integer),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(|b| MapKey::Bytes(b.into())),
        text_key().prop_map(MapKey::Text),
    ]
}

fn leaf() -> impl Strategy<Value = CanonicalValue> {
    prop_oneof![
        Just(CanonicalValue::Null),
        any::<bool>().prop_map(CanonicalValue::Bool),
        integer().prop_map(CanonicalValue::Integer),
        float().prop_map(CanonicalValue::Float),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(CanonicalValue::bytes),
        ".{0,24}".prop_map(CanonicalValue::Text),
    ]
}

/// Arbitrary encodable values, nested up to four levels.
///
/// Map keys are text and unique, so every generated value encodes.
pub fn canonical_value() -> impl Strategy<Value = CanonicalValue> {
    leaf().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(CanonicalValue::Array),
            prop::collection::btree_map(text_key(), inner, 0..8).prop_map(|m| {
                CanonicalValue::Map(m.into_iter().map(|(k, v)| (MapKey::Text(k), v)).collect())
            }),
        ]
    })
}

/// A map with unique keys together with the same entries in another order.
pub fn shuffled_map() -> impl Strategy<Value = (CanonicalValue, CanonicalValue)> {
    prop::collection::btree_map(text_key(), leaf(), 0..12)
        .prop_map(|m: BTreeMap<String, CanonicalValue>| {
            m.into_iter()
                .map(|(k, v)| (MapKey::Text(k), v))
                .collect::<Vec<_>>()
        })
        .prop_flat_map(|entries| {
            let shuffled = Just(entries.clone()).prop_shuffle();
            (Just(entries), shuffled)
        })
        .prop_map(|(a, b)| (CanonicalValue::Map(a), CanonicalValue::Map(b)))
}

/// A random digest.
pub fn digest() -> impl Strategy<Value = Digest> {
    any::<[u8; 32]>().prop_map(Digest::from_bytes)
}

/// A dotted operator id such as `Glyphser.Data.NextBatch`.
pub fn operator_id() -> impl Strategy<Value = String> {
    "Glyphser\\.[A-Z][a-z]{1,8}\\.[A-Z][A-Za-z]{1,12}".prop_map(String::from)
}

/// A trace record with a handful of extra fields.
pub fn trace_record() -> impl Strategy<Value = TraceRecord> {
    (
        0u64..1000,
        operator_id(),
        prop::collection::btree_map("[a-z]{1,8}", leaf(), 0..4),
    )
        .prop_map(|(step, operator_id, fields)| {
            fields
                .into_iter()
                .filter(|(name, _)| !matches!(name.as_str(), "step" | "operator_id" | "event_hash"))
                .fold(TraceRecord::new(step, operator_id), |record, (name, value)| {
                    record.with_field(name, value)
                })
        })
}
