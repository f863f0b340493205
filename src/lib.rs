//! # retro-exporter
//!
//! Command-line front end and library glue for streaming controller input
//! telemetry over UDP.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   Sample   ┌──────────────────────────────────────────┐
//! │ SampleSource │──────────▶│ Emitter (retro-exporter-sdk)              │
//! │ lines/synth  │  push()    │  FieldMap → encode → BatchBuffer          │
//! └──────────────┘            │        threshold crossed ▼                │
//!                             │  queue ──▶ sender task ──▶ UDP dest 1..N │
//!                             └──────────────────────────────────────────┘
//!                                                   │ datagrams
//!                                                   ▼
//!                                        ┌─────────────────────┐
//!                                        │ Listener (plot side)│
//!                                        └─────────────────────┘
//! ```
//!
//! - **[`config`]**: Plotter configuration file (export socket, destinations, mappings)
//! - **[`source`]**: Sample sources standing in for the input poller
//! - **[`emit`]**: The producer loop feeding an emitter
//! - **[`listen`]**: Receiver that decodes datagrams back into frames
//!
//! ## Usage
//!
//! ```bash
//! # Export samples read as JSON lines from stdin
//! retro-exporter emit --config plotter.toml
//!
//! # Export a synthetic pad at 60 Hz
//! retro-exporter emit --config plotter.toml --synthetic --period-ms 16
//!
//! # Print what arrives on port 8934
//! retro-exporter listen --port 8934
//! ```

pub mod config;
pub mod emit;
pub mod listen;
pub mod source;

pub use config::{ExportPlan, PlotterConfig};
pub use listen::{ListenSummary, Listener};
pub use source::{LineSource, SampleSource, SyntheticSource};
