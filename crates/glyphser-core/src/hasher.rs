//! Domain-separated content hashing.
//!
//! `digest(tag, payload) = SHA-256(encode([tag.as_str(), payload]))`.
//! Checkpoints, certificates, signatures, registry and catalog hashes and
//! every chain link are instances of this one operation.

use crate::canonical::{encode_value, major, write_bytes, write_text, write_uint};
use crate::digest::Digest;
use crate::domain::DomainTag;
use crate::error::{CoreError, Result};
use crate::value::CanonicalValue;

/// Hash `payload` under `tag`.
pub fn digest(tag: DomainTag, payload: &CanonicalValue) -> Result<Digest> {
    let mut buf = Vec::new();
    write_uint(&mut buf, major::ARRAY, 2);
    write_text(&mut buf, tag.as_str());
    encode_value(&mut buf, payload)?;
    Ok(Digest::of_bytes(&buf))
}

/// Recompute a digest and compare it with a pinned hex string.
pub fn verify(tag: DomainTag, payload: &CanonicalValue, expected_hex: &str) -> Result<Digest> {
    let actual = digest(tag, payload)?;
    if actual.to_hex() != expected_hex {
        return Err(CoreError::SignatureMismatch {
            domain: tag.as_str(),
            expected: expected_hex.to_string(),
            actual: actual.to_hex(),
        });
    }
    Ok(actual)
}

/// Hash an array of digests (as 32-byte byte strings) under `tag`.
///
/// Infallible: byte strings are always encodable.
pub fn digest_digests(tag: DomainTag, digests: &[Digest]) -> Digest {
    let mut buf = Vec::new();
    write_uint(&mut buf, major::ARRAY, 2);
    write_text(&mut buf, tag.as_str());
    write_uint(&mut buf, major::ARRAY, digests.len() as u64);
    for d in digests {
        write_bytes(&mut buf, d.as_bytes());
    }
    Digest::of_bytes(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::encode;

    #[test]
    fn test_known_digests() {
        let empty_map = CanonicalValue::map().build();
        assert_eq!(
            digest(DomainTag::Checkpoint, &empty_map).unwrap().to_hex(),
            "137fc1d54f10d324e8a6ef29654a1b93d7e29a4fcbd4f691e742ebc3b5a0376a"
        );
        assert_eq!(
            digest(DomainTag::OperatorSignature, &CanonicalValue::text("hello"))
                .unwrap()
                .to_hex(),
            "89af9e95be944dd956d96e1c7082fa42b6656b9532dcfca4cbcf296c3fc5969c"
        );
    }

    #[test]
    fn test_digest_matches_explicit_pair() {
        let payload = CanonicalValue::map().entry("a", 1i64).build();
        let pair = CanonicalValue::Array(vec![
            CanonicalValue::text("checkpoint"),
            payload.clone(),
        ]);
        let expected = Digest::of_bytes(&encode(&pair).unwrap());
        assert_eq!(digest(DomainTag::Checkpoint, &payload).unwrap(), expected);
    }

    #[test]
    fn test_domains_separate_identical_payloads() {
        let payload = CanonicalValue::text("same");
        let a = digest(DomainTag::Checkpoint, &payload).unwrap();
        let b = digest(DomainTag::ExecutionCertificate, &payload).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_digests_matches_generic_path() {
        let ds = [Digest::of_bytes(b"a"), Digest::of_bytes(b"b")];
        let as_value = CanonicalValue::Array(ds.iter().copied().map(Into::into).collect());
        assert_eq!(
            digest_digests(DomainTag::TraceChain, &ds),
            digest(DomainTag::TraceChain, &as_value).unwrap()
        );
    }

    #[test]
    fn test_verify_reports_domain_on_mismatch() {
        let payload = CanonicalValue::text("hello");
        let ok = "89af9e95be944dd956d96e1c7082fa42b6656b9532dcfca4cbcf296c3fc5969c";
        assert!(verify(DomainTag::OperatorSignature, &payload, ok).is_ok());

        let err = verify(DomainTag::OperatorSignature, &payload, &"0".repeat(64)).unwrap_err();
        match err {
            CoreError::SignatureMismatch { domain, actual, .. } => {
                assert_eq!(domain, "sig");
                assert_eq!(actual, ok);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_payload_propagates() {
        let bad = CanonicalValue::Float(f64::NAN);
        assert!(matches!(
            digest(DomainTag::Checkpoint, &bad),
            Err(CoreError::UnsupportedValue(_))
        ));
    }
}
