//! # retro-exporter-sdk
//!
//! Batching UDP emitter for controller telemetry.
//!
//! An input poller pushes one timestamped sample per tick. The emitter keeps
//! only the registered fields, encodes them as a self-delimiting MessagePack
//! record, and accumulates records until their total size exceeds a
//! threshold. The batch is then handed to a background sender that transmits
//! it as a single datagram to every destination, so the poller never waits
//! on the network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use retro_exporter_sdk::Emitter;
//! use retro_exporter_types::Sample;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Flush once more than 512 bytes are buffered
//!     let mut emitter = Emitter::builder()
//!         .threshold(512)
//!         .output("a", None)
//!         .output("lstick_y_raw", Some("lstick_y"))
//!         .build()?;
//!
//!     emitter.add_destination("127.0.0.1", 8934)?;
//!     emitter.bind()?;
//!
//!     // Called by the poller, once per tick
//!     let sample = Sample::builder()
//!         .timestamp(1)
//!         .field("a", true)
//!         .field("lstick_y_raw", 128i64)
//!         .build();
//!     emitter.push_sample(&sample);
//!
//!     // Send what is left and release the socket
//!     emitter.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery
//!
//! - **Best effort**: plain UDP, no acknowledgement or retransmission
//! - **One flush, one datagram** per destination; records are never split
//! - **Ordered per destination**: a single sender task drains flushes in order
//! - **Never blocks the producer**: a full send queue drops the batch instead

mod buffer;
mod codec;
mod destinations;
mod emitter;
mod error;
mod fields;
mod sender;
mod stats;

pub use buffer::{BatchBuffer, FlushPolicy, Generation, DEFAULT_THRESHOLD};
pub use codec::{decode_datagram, decode_frame, encode_frame};
pub use destinations::{check_family, check_protocol, parse_destination, Destinations, PROTOCOL_UDP};
pub use emitter::{Emitter, EmitterBuilder, LifecycleState, DEFAULT_QUEUE_CAPACITY};
pub use error::{EmitterError, Result};
pub use fields::{FieldMap, FieldSource, SplitFields};
pub use stats::EmitterStats;

// Re-export types for convenience
pub use retro_exporter_types::{Frame, Sample, Value};
