//! # retro-exporter-types
//!
//! Core types for the retro-exporter telemetry stream. This crate defines the
//! sample handed over by an input poller and the frame that ends up on the
//! wire, so producers and receivers can share one schema.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Closed value domain**: A field is a bool, an integer or a float, nothing else
//! - **Schema-less frames**: The field set varies per plotter configuration
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: Serialization via serde (MessagePack on the wire, JSON for tooling)
//!
//! ## Example
//!
//! ```rust
//! use retro_exporter_types::{Frame, Sample, Value};
//!
//! let sample = Sample::builder()
//!     .timestamp(1703160000000)
//!     .field("a", true)
//!     .field("lstick_y_raw", 200i64)
//!     .build();
//!
//! let mut frame = Frame::new(sample.timestamp);
//! frame.insert("lstick_y", sample.fields["lstick_y_raw"]);
//!
//! assert_eq!(frame.get("lstick_y"), Some(&Value::Int(200)));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod frame;
mod sample;
mod value;

pub use frame::*;
pub use sample::*;
pub use value::*;
