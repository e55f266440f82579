//! Trace records: one per operator invocation.
//!
//! A record is built once, sealed with its `event_hash` (the raw record hash
//! of the unsealed form), and then folded into the chain in invocation order.

use crate::chain::{record_digest, TraceChain};
use crate::digest::Digest;
use crate::error::{CoreError, Result};
use crate::value::CanonicalValue;

/// An unsealed trace record.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub step: u64,
    pub operator_id: String,
    /// Payload fields beyond `step` and `operator_id`.
    pub fields: Vec<(String, CanonicalValue)>,
}

impl TraceRecord {
    pub fn new(step: u64, operator_id: impl Into<String>) -> Self {
        Self {
            step,
            operator_id: operator_id.into(),
            fields: Vec::new(),
        }
    }

    /// Add a payload field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<CanonicalValue>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// The record as a canonical map.
    pub fn to_value(&self) -> CanonicalValue {
        CanonicalValue::map()
            .entry("step", self.step)
            .entry("operator_id", self.operator_id.as_str())
            .extend(self.fields.iter().map(|(k, v)| (k.as_str(), v.clone())))
            .build()
    }

    /// SHA-256 of the canonical encoding of the unsealed record.
    pub fn event_hash(&self) -> Result<Digest> {
        record_digest(&self.to_value())
    }

    /// Freeze the record together with its event hash.
    pub fn seal(self) -> Result<SealedTraceRecord> {
        let event_hash = self.event_hash()?;
        Ok(SealedTraceRecord {
            record: self,
            event_hash,
        })
    }
}

/// A record carrying its own `event_hash`.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedTraceRecord {
    record: TraceRecord,
    event_hash: Digest,
}

impl SealedTraceRecord {
    pub fn record(&self) -> &TraceRecord {
        &self.record
    }

    pub fn event_hash(&self) -> Digest {
        self.event_hash
    }

    /// The persisted and chained form: the record plus `event_hash` as hex.
    pub fn to_value(&self) -> CanonicalValue {
        match self.record.to_value() {
            CanonicalValue::Map(mut entries) => {
                entries.push(("event_hash".into(), self.event_hash.to_hex().into()));
                CanonicalValue::Map(entries)
            }
            other => other,
        }
    }

    /// Recompute the event hash and compare.
    pub fn verify(&self) -> Result<()> {
        let actual = self.record.event_hash()?;
        if actual != self.event_hash {
            return Err(CoreError::EventHashMismatch {
                step: self.record.step,
                operator_id: self.record.operator_id.clone(),
                expected: self.event_hash.to_hex(),
                actual: actual.to_hex(),
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.to_value().to_json()
    }
}

/// Chain sealed records in order.
pub fn chain_records(records: &[SealedTraceRecord]) -> Result<TraceChain> {
    records
        .iter()
        .try_fold(TraceChain::genesis(), |acc, r| acc.append(&r.to_value()))
}
