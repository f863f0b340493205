//! Error types for the emitter.

use std::io;

use thiserror::Error;

/// Errors surfaced synchronously to the caller configuring or driving an emitter.
///
/// Per-destination send failures are never returned; they are logged and
/// counted in [`EmitterStats`](crate::EmitterStats). Operations after
/// disposal are silent no-ops rather than errors.
#[derive(Debug, Error)]
pub enum EmitterError {
    /// Flush threshold must be a positive byte count.
    #[error("Invalid threshold: {0} (must be greater than zero)")]
    InvalidThreshold(i64),

    /// Send queue capacity must be at least one generation.
    #[error("Invalid queue capacity: {0} (must be greater than zero)")]
    InvalidQueueCapacity(usize),

    /// Port outside the usable range.
    #[error("Invalid port: {0}")]
    InvalidPort(i64),

    /// Destination address could not be parsed, or the local socket cannot reach it.
    #[error("Invalid destination address: {0}")]
    InvalidAddress(String),

    /// Only UDP is supported as a transport.
    #[error("Unsupported protocol: {0} (only udp is supported)")]
    UnsupportedProtocol(String),

    /// `bind` was called outside a Tokio runtime.
    #[error("No Tokio runtime available to run the sender")]
    NoRuntime,

    /// Socket allocation failed.
    #[error("Failed to bind UDP socket: {0}")]
    Bind(#[source] io::Error),

    /// A frame could not be serialized.
    #[error("Failed to encode frame: {0}")]
    Encode(String),

    /// A datagram could not be decoded.
    #[error("Failed to decode frame: {0}")]
    Decode(String),
}

impl EmitterError {
    /// True for errors caused by invalid configuration rather than runtime conditions.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EmitterError::InvalidThreshold(_)
                | EmitterError::InvalidQueueCapacity(_)
                | EmitterError::InvalidPort(_)
                | EmitterError::InvalidAddress(_)
                | EmitterError::UnsupportedProtocol(_)
                | EmitterError::NoRuntime
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EmitterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(EmitterError::InvalidThreshold(0).is_configuration());
        assert!(EmitterError::UnsupportedProtocol("tcp".into()).is_configuration());
        assert!(!EmitterError::Encode("boom".into()).is_configuration());
        assert!(!EmitterError::Bind(io::Error::from(io::ErrorKind::AddrInUse)).is_configuration());
    }

    #[test]
    fn test_messages_are_descriptive() {
        let err = EmitterError::UnsupportedProtocol("tcp".into());
        assert_eq!(err.to_string(), "Unsupported protocol: tcp (only udp is supported)");
    }
}
