//! Sample sources that feed the emitter.
//!
//! The emitter itself does not poll hardware. A source stands in for the
//! input poller: it yields one [`Sample`] per tick and the `emit` command
//! pushes each into the emitter.

mod lines;
mod synthetic;

pub use lines::LineSource;
pub use synthetic::SyntheticSource;

use std::fmt::Debug;
use std::future::Future;

use retro_exporter_types::Sample;

/// Trait for producing samples from various inputs.
///
/// # Example
///
/// ```
/// use retro_exporter::{LineSource, SampleSource};
///
/// # tokio_test::block_on(async {
/// let data = b"{\"t\":1,\"v\":{\"a\":true}}\n";
/// let mut source = LineSource::new(&data[..], "example");
/// let sample = source.next_sample().await.unwrap();
/// assert_eq!(sample.timestamp, 1);
/// # });
/// ```
pub trait SampleSource: Send + Debug {
    /// Wait for the next sample.
    ///
    /// Returns `None` once the source is exhausted.
    fn next_sample(&mut self) -> impl Future<Output = Option<Sample>> + Send;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
