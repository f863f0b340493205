//! Emitter counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters shared by the ingestion path and the sender.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub records_encoded: AtomicU64,
    pub samples_skipped: AtomicU64,
    pub flushes: AtomicU64,
    pub generations_dropped: AtomicU64,
    pub datagrams_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub send_errors: AtomicU64,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Collect current values into an `EmitterStats` snapshot.
    pub fn collect(&self) -> EmitterStats {
        EmitterStats {
            records_encoded: self.records_encoded.load(Ordering::Relaxed),
            samples_skipped: self.samples_skipped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            generations_dropped: self.generations_dropped.load(Ordering::Relaxed),
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of an emitter's activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterStats {
    /// Frames encoded and appended to the buffer.
    pub records_encoded: u64,
    /// Samples that carried no registered field and produced no record.
    pub samples_skipped: u64,
    /// Generations detached from the buffer.
    pub flushes: u64,
    /// Generations discarded without sending (unbound, disposed, or queue full).
    pub generations_dropped: u64,
    /// Datagrams handed to the socket, counted per destination.
    pub datagrams_sent: u64,
    /// Payload bytes handed to the socket.
    pub bytes_sent: u64,
    /// Per-destination send failures.
    pub send_errors: u64,
}
