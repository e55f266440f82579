//! Golden vectors for cross-implementation verification.
//!
//! Every implementation must reproduce these encodings and digests bit for
//! bit.

use serde::Serialize;

use glyphser_core::{chain, encode_hex, hasher, CanonicalValue, DomainTag};

/// An encoding vector: a value and its canonical bytes.
#[derive(Debug, Clone)]
pub struct EncodingVector {
    pub name: &'static str,
    pub value: CanonicalValue,
    pub expected_hex: &'static str,
}

/// A domain digest vector.
#[derive(Debug, Clone)]
pub struct DigestVector {
    pub name: &'static str,
    pub tag: DomainTag,
    pub payload: CanonicalValue,
    pub expected_hex: &'static str,
}

/// A chain vector: ordered records and the final head.
#[derive(Debug, Clone)]
pub struct ChainVector {
    pub name: &'static str,
    pub records: Vec<CanonicalValue>,
    pub expected_hex: &'static str,
}

fn text_map(entries: &[(&str, CanonicalValue)]) -> CanonicalValue {
    CanonicalValue::map()
        .extend(entries.iter().cloned())
        .build()
}

pub fn encoding_vectors() -> Vec<EncodingVector> {
    let v = |name, value, expected_hex| EncodingVector {
        name,
        value,
        expected_hex,
    };
    vec![
        v("null", CanonicalValue::Null, "f6"),
        v("false", false.into(), "f4"),
        v("true", true.into(), "f5"),
        v("uint_23", 23i64.into(), "17"),
        v("uint_24", 24i64.into(), "1818"),
        v("uint_255", 255i64.into(), "18ff"),
        v("uint_256", 256i64.into(), "190100"),
        v("uint_65536", 65536i64.into(), "1a00010000"),
        v("uint_2_32", (1i64 << 32).into(), "1b0000000100000000"),
        v("uint_max", u64::MAX.into(), "1bffffffffffffffff"),
        v("neg_1", (-1i64).into(), "20"),
        v("neg_25", (-25i64).into(), "3818"),
        v("neg_min", CanonicalValue::Integer(-(1i128 << 64)), "3bffffffffffffffff"),
        v("float_1_5", 1.5f64.into(), "fb3ff8000000000000"),
        v("float_neg_zero", (-0.0f64).into(), "fb8000000000000000"),
        v("text_empty", "".into(), "60"),
        v("bytes", CanonicalValue::bytes(vec![1u8, 2, 3]), "43010203"),
        v(
            "nested_array",
            CanonicalValue::Array(vec![
                1i64.into(),
                CanonicalValue::Array(vec![2i64.into(), 3i64.into()]),
            ]),
            "8201820203",
        ),
        v(
            "map_order_independent",
            text_map(&[("b", 1i64.into()), ("a", 2i64.into())]),
            "a2616102616201",
        ),
        v(
            "map_mixed_keys",
            CanonicalValue::map()
                .entry("a", "text")
                .entry(1i64, "int")
                .entry(bytes_key(), "bytes")
                .build(),
            "a30163696e74410065627974657361616474657874",
        ),
        v(
            "map_nested",
            text_map(&[
                ("z", CanonicalValue::empty_array()),
                (
                    "a",
                    text_map(&[("y", CanonicalValue::Null), ("b", true.into())]),
                ),
            ]),
            "a26161a26162f56179f6617a80",
        ),
    ]
}

fn bytes_key() -> glyphser_core::MapKey {
    glyphser_core::MapKey::Bytes(vec![0u8].into())
}

pub fn digest_vectors() -> Vec<DigestVector> {
    vec![
        DigestVector {
            name: "checkpoint_empty_map",
            tag: DomainTag::Checkpoint,
            payload: CanonicalValue::map().build(),
            expected_hex: "137fc1d54f10d324e8a6ef29654a1b93d7e29a4fcbd4f691e742ebc3b5a0376a",
        },
        DigestVector {
            name: "sig_hello",
            tag: DomainTag::OperatorSignature,
            payload: "hello".into(),
            expected_hex: "89af9e95be944dd956d96e1c7082fa42b6656b9532dcfca4cbcf296c3fc5969c",
        },
        DigestVector {
            name: "trace_chain_genesis",
            tag: DomainTag::TraceChain,
            payload: CanonicalValue::empty_array(),
            expected_hex: "d5a04212dc8be7c8c6eaab3fbaec45f4137bc49be0a0c2357f6df7954677719e",
        },
    ]
}

fn chain_record(operator_id: &str, event_hash: &str) -> CanonicalValue {
    text_map(&[
        ("step", 1i64.into()),
        ("operator_id", operator_id.into()),
        ("event_hash", event_hash.into()),
    ])
}

pub fn chain_vectors() -> Vec<ChainVector> {
    let forward = vec![
        chain_record("Glyphser.Data.NextBatch", "aaa"),
        chain_record("Glyphser.Model.ModelIR_Executor", "bbb"),
    ];
    let mut reversed = forward.clone();
    reversed.reverse();
    vec![
        ChainVector {
            name: "empty",
            records: vec![],
            expected_hex: "d5a04212dc8be7c8c6eaab3fbaec45f4137bc49be0a0c2357f6df7954677719e",
        },
        ChainVector {
            name: "two_records",
            records: forward,
            expected_hex: "9bfbb93582e36eabaff88b2f3d1e891ee79143e160110a4dcd3ccc160e3e94cd",
        },
        ChainVector {
            name: "two_records_reversed",
            records: reversed,
            expected_hex: "1f2c0f91c54f8d5eb8d4abc4c2e4d9232ddca49e02d73605c3f663a090755afd",
        },
    ]
}

/// Outcome of checking one vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorResult {
    pub name: String,
    pub matches: bool,
    pub actual: String,
}

/// Run every vector and report what each produced.
pub fn verify_all_vectors() -> Vec<VectorResult> {
    let result = |name: &str, expected: &str, actual: String| VectorResult {
        name: name.to_string(),
        matches: actual == expected,
        actual,
    };

    let mut results = Vec::new();
    for v in encoding_vectors() {
        let actual = encode_hex(&v.value).unwrap_or_else(|e| e.to_string());
        results.push(result(v.name, v.expected_hex, actual));
    }
    for v in digest_vectors() {
        let actual = hasher::digest(v.tag, &v.payload)
            .map(|d| d.to_hex())
            .unwrap_or_else(|e| e.to_string());
        results.push(result(v.name, v.expected_hex, actual));
    }
    for v in chain_vectors() {
        let actual = chain(&v.records)
            .map(|d| d.to_hex())
            .unwrap_or_else(|e| e.to_string());
        results.push(result(v.name, v.expected_hex, actual));
    }
    results
}
