//! Hash-chain accumulator over ordered trace records.
//!
//! ```text
//! h0     = digest(trace_chain, [])
//! r_i    = SHA-256(encode(record_i))
//! h_i    = digest(trace_chain, [h_{i-1}, r_i])
//! ```
//!
//! The record hash is the raw SHA-256 of the canonical encoding, with no
//! domain wrapping. The chain is a value: each append returns a new chain.

use crate::canonical::encode;
use crate::digest::Digest;
use crate::domain::DomainTag;
use crate::error::Result;
use crate::hasher::digest_digests;
use crate::value::CanonicalValue;

/// Raw hash of one record's canonical encoding.
pub fn record_digest(record: &CanonicalValue) -> Result<Digest> {
    Ok(Digest::of_bytes(&encode(record)?))
}

/// One chain link: `digest(trace_chain, [prev, record_hash])`.
pub fn link(prev: &Digest, record_hash: &Digest) -> Digest {
    digest_digests(DomainTag::TraceChain, &[*prev, *record_hash])
}

/// Immutable running state of a hash chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceChain {
    head: Digest,
    len: u64,
}

impl TraceChain {
    /// The empty chain, headed by `digest(trace_chain, [])`.
    pub fn genesis() -> Self {
        Self {
            head: digest_digests(DomainTag::TraceChain, &[]),
            len: 0,
        }
    }

    /// Fold one record into the chain.
    pub fn append(self, record: &CanonicalValue) -> Result<Self> {
        Ok(self.append_digest(&record_digest(record)?))
    }

    /// Fold an already computed record hash into the chain.
    pub fn append_digest(self, record_hash: &Digest) -> Self {
        Self {
            head: link(&self.head, record_hash),
            len: self.len + 1,
        }
    }

    pub fn head(&self) -> Digest {
        self.head
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for TraceChain {
    fn default() -> Self {
        Self::genesis()
    }
}

/// Chain a sequence of records in order and return the final head.
pub fn chain<'a, I>(records: I) -> Result<Digest>
where
    I: IntoIterator<Item = &'a CanonicalValue>,
{
    records
        .into_iter()
        .try_fold(TraceChain::genesis(), |acc, record| acc.append(record))
        .map(|c| c.head())
}
