//! Synthetic controller source for exercising a pipeline without hardware.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

use retro_exporter_types::Sample;

use super::SampleSource;

/// Buttons the synthetic pad reports.
pub const BUTTONS: [&str; 6] = ["a", "b", "x", "y", "z", "start"];

/// Generates a pad state every tick: buttons pressed in a rotating pattern,
/// the main stick moving in a circle.
///
/// Field names follow the usual poller layout: buttons as bools, normalized
/// axes `lstick_x`/`lstick_y` as floats in `-1.0..=1.0`, and raw axes
/// `lstick_x_raw`/`lstick_y_raw` as integers in `0..=255`.
#[derive(Debug)]
pub struct SyntheticSource {
    interval: Interval,
    started: Instant,
    tick: u64,
    limit: Option<u64>,
    description: String,
}

impl SyntheticSource {
    /// Emit one sample every `period`, forever or up to `limit` samples.
    pub fn new(period: Duration, limit: Option<u64>) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            started: Instant::now(),
            tick: 0,
            limit,
            description: format!("synthetic: every {:?}", period),
        }
    }

    fn sample_at(&self, tick: u64, elapsed_ms: i64) -> Sample {
        let phase = (tick % 120) as f64 / 120.0 * std::f64::consts::TAU;
        let x = phase.cos();
        let y = phase.sin();

        let mut builder = Sample::builder().timestamp(elapsed_ms);
        for (i, name) in BUTTONS.iter().enumerate() {
            builder = builder.field(*name, (tick / 30) % BUTTONS.len() as u64 == i as u64);
        }
        builder
            .field("lstick_x", x)
            .field("lstick_y", y)
            .field("lstick_x_raw", to_raw(x))
            .field("lstick_y_raw", to_raw(y))
            .build()
    }
}

fn to_raw(axis: f64) -> i64 {
    ((axis + 1.0) * 127.5).round().clamp(0.0, 255.0) as i64
}

impl SampleSource for SyntheticSource {
    async fn next_sample(&mut self) -> Option<Sample> {
        if self.limit.is_some_and(|limit| self.tick >= limit) {
            return None;
        }
        let now = self.interval.tick().await;
        let elapsed_ms = now.duration_since(self.started).as_millis() as i64;
        let sample = self.sample_at(self.tick, elapsed_ms);
        self.tick += 1;
        Some(sample)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
