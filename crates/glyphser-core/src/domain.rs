//! Domain separation tags.
//!
//! Every identity is `SHA-256(encode([tag, payload]))`. The tag set is closed
//! so two identity kinds can never collide on the same payload.

use std::fmt;

/// Closed set of hashing domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DomainTag {
    /// Links of the trace hash chain.
    TraceChain,
    /// Checkpoint headers.
    Checkpoint,
    /// Execution certificate evidence.
    ExecutionCertificate,
    /// Operator signature digests.
    OperatorSignature,
    /// Operator registry root hash.
    OperatorRegistry,
    /// Digest catalog hash.
    DigestCatalog,
}

impl DomainTag {
    pub const ALL: [DomainTag; 6] = [
        DomainTag::TraceChain,
        DomainTag::Checkpoint,
        DomainTag::ExecutionCertificate,
        DomainTag::OperatorSignature,
        DomainTag::OperatorRegistry,
        DomainTag::DigestCatalog,
    ];

    /// The string written as the first element of the hashed pair.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DomainTag::TraceChain => "trace_chain",
            DomainTag::Checkpoint => "checkpoint",
            DomainTag::ExecutionCertificate => "execution_certificate",
            DomainTag::OperatorSignature => "sig",
            DomainTag::OperatorRegistry => "operator_registry",
            DomainTag::DigestCatalog => "digest_catalog",
        }
    }
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tags_are_pairwise_distinct() {
        let strings: HashSet<&str> = DomainTag::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(strings.len(), DomainTag::ALL.len());
    }

    #[test]
    fn test_tag_strings() {
        assert_eq!(DomainTag::TraceChain.to_string(), "trace_chain");
        assert_eq!(DomainTag::OperatorSignature.as_str(), "sig");
    }
}
