//! Batch buffer and flush policy.
//!
//! The live generation is owned exclusively by the ingestion path. A flush
//! swaps it out for a fresh one before any network I/O happens, and the
//! detached [`Generation`] moves into the sender by value, so the producer
//! and the sender never share a buffer.

use std::mem;

use crate::error::{EmitterError, Result};

/// Default flush threshold in bytes.
pub const DEFAULT_THRESHOLD: usize = 512;

/// Decides when the live generation is flushed.
///
/// The threshold is a lower-bound trigger, not a cap: a flush happens once
/// the accumulated size strictly exceeds it, so a batch may overshoot by up
/// to one record. Records are never split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    threshold: usize,
}

impl FlushPolicy {
    /// Create a policy. A zero threshold is rejected.
    pub fn new(threshold: usize) -> Result<Self> {
        if threshold == 0 {
            return Err(EmitterError::InvalidThreshold(0));
        }
        Ok(Self { threshold })
    }

    /// Create a policy from a signed value as read from configuration.
    pub fn from_signed(threshold: i64) -> Result<Self> {
        if threshold <= 0 {
            return Err(EmitterError::InvalidThreshold(threshold));
        }
        Self::new(usize::try_from(threshold).map_err(|_| EmitterError::InvalidThreshold(threshold))?)
    }

    /// Threshold in bytes.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// True if a buffer holding `size` bytes must be flushed.
    pub fn should_flush(&self, size: usize) -> bool {
        size > self.threshold
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Accumulates encoded records between flushes.
///
/// `size()` always equals the sum of the lengths of the records held.
#[derive(Debug, Default)]
pub struct BatchBuffer {
    records: Vec<Vec<u8>>,
    size: usize,
}

impl BatchBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one encoded record.
    pub fn ingest(&mut self, record: Vec<u8>) {
        self.size += record.len();
        self.records.push(record);
    }

    /// Accumulated bytes in the live generation.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of records in the live generation.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Swap out the live generation for an empty one.
    ///
    /// Returns `None` when there is nothing to flush.
    pub fn detach(&mut self) -> Option<Generation> {
        if self.records.is_empty() {
            return None;
        }
        let capacity = self.records.len();
        Some(Generation {
            records: mem::replace(&mut self.records, Vec::with_capacity(capacity)),
            size: mem::take(&mut self.size),
        })
    }
}

/// A detached batch, bounded by two consecutive flushes.
#[derive(Debug)]
pub struct Generation {
    records: Vec<Vec<u8>>,
    size: usize,
}

impl Generation {
    /// Total encoded bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Concatenate the records into one datagram payload.
    pub fn into_datagram(self) -> Vec<u8> {
        let mut datagram = Vec::with_capacity(self.size);
        for record in &self.records {
            datagram.extend_from_slice(record);
        }
        datagram
    }
}
