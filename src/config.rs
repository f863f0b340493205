//! Plotter configuration.
//!
//! A plotter file describes where samples are exported to and which input
//! fields are packed into frames:
//!
//! ```toml
//! name = "WindWaker-MSS"
//!
//! [export]
//! bind = "0.0.0.0"    # local address; "::" to reach IPv6 destinations
//! port = 0            # local port, 0 = ephemeral
//! threshold = 512     # flush once more than this many bytes are buffered
//! protocol = "udp"
//!
//! [[export.dest]]
//! ip = "127.0.0.1"
//! port = 8934
//!
//! [reading]           # the plot reader also receives the stream
//! port = 8934
//!
//! [[mapping]]
//! name = "start"
//! pack = "st"         # emitted key, defaults to name
//! ```
//!
//! Values can be overridden through `RETRO_EXPORTER__*` environment
//! variables (e.g. `RETRO_EXPORTER__EXPORT__THRESHOLD=1024`).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use retro_exporter_sdk::{
    check_family, check_protocol, parse_destination, Emitter, EmitterError, FlushPolicy, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_THRESHOLD, PROTOCOL_UDP,
};
use serde::Deserialize;

/// Default destination port when a `dest` entry omits it.
pub const DEFAULT_DEST_PORT: i64 = 8934;

/// Top-level plotter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlotterConfig {
    /// Display name of the plotter
    #[serde(default)]
    pub name: Option<String>,
    pub export: ExportConfig,
    #[serde(default)]
    pub reading: Option<ReadingConfig>,
    #[serde(default)]
    pub mapping: Vec<MappingConfig>,
}

/// Local socket, flush policy and destinations
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub port: i64,
    #[serde(default = "default_threshold")]
    pub threshold: i64,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    #[serde(default)]
    pub dest: Vec<DestConfig>,
}

/// One export destination
#[derive(Debug, Clone, Deserialize)]
pub struct DestConfig {
    #[serde(default = "default_dest_ip")]
    pub ip: String,
    #[serde(default = "default_dest_port")]
    pub port: i64,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

/// Plot reader endpoint on this host
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingConfig {
    #[serde(default)]
    pub port: i64,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

/// One emitted input field
#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    /// Source field name as reported by the poller
    pub name: String,
    /// Key used on the wire; defaults to `name`
    #[serde(default)]
    pub pack: Option<String>,
}

fn default_bind() -> String {
    Ipv4Addr::UNSPECIFIED.to_string()
}

fn default_threshold() -> i64 {
    DEFAULT_THRESHOLD as i64
}

fn default_protocol() -> String {
    PROTOCOL_UDP.to_string()
}

fn default_dest_ip() -> String {
    Ipv4Addr::LOCALHOST.to_string()
}

fn default_dest_port() -> i64 {
    DEFAULT_DEST_PORT
}

impl PlotterConfig {
    /// Load configuration from a TOML file plus environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("RETRO_EXPORTER").separator("__"))
            .build()
            .with_context(|| format!("failed to read {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("invalid plotter config {}", path.display()))
    }

    /// Local address the emitter binds to.
    pub fn bind_ip(&self) -> Result<IpAddr> {
        self.export
            .bind
            .trim()
            .parse()
            .map_err(|_| EmitterError::InvalidAddress(self.export.bind.clone()))
            .context("export.bind")
    }

    /// Local port the emitter binds to.
    pub fn local_port(&self) -> Result<u16> {
        to_port(self.export.port).context("export.port")
    }

    /// Destinations in the order they will be added.
    ///
    /// Entries with a non-UDP protocol or an out-of-range port are skipped.
    /// A malformed IP address, or one of the wrong family for `export.bind`,
    /// is an error.
    pub fn destinations(&self) -> Result<Vec<SocketAddr>> {
        let bind_ip = self.bind_ip()?;
        let mut out = Vec::new();

        for (i, dest) in self.export.dest.iter().enumerate() {
            if check_protocol(&dest.protocol).is_err() {
                tracing::warn!(index = i, protocol = %dest.protocol, "skipping non-udp destination");
                continue;
            }
            let Ok(port) = to_port(dest.port).and_then(nonzero_port) else {
                tracing::warn!(index = i, port = dest.port, "skipping destination with invalid port");
                continue;
            };
            let addr = parse_destination(&dest.ip, port)
                .and_then(|addr| check_family(bind_ip, addr).map(|()| addr))
                .with_context(|| format!("export.dest[{}]", i))?;
            out.push(addr);
        }

        if let Some(reading) = &self.reading {
            if check_protocol(&reading.protocol).is_err() {
                tracing::warn!(protocol = %reading.protocol, "ignoring non-udp plot reader");
            } else {
                match to_port(reading.port).and_then(nonzero_port) {
                    Ok(port) => {
                        let loopback = match bind_ip {
                            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
                        };
                        out.push(SocketAddr::new(loopback, port));
                    }
                    Err(_) => tracing::warn!(port = reading.port, "ignoring plot reader with invalid port"),
                }
            }
        }

        Ok(out)
    }

    /// Check everything that would make `build_emitter` fail.
    pub fn validate(&self) -> Result<()> {
        self.resolve().map(|_| ())
    }

    /// Build an unbound emitter from this configuration.
    pub fn build_emitter(&self) -> Result<Emitter> {
        self.build_emitter_with(self.resolve()?)
    }

    /// Build an unbound emitter from an already resolved plan.
    pub fn build_emitter_with(&self, resolved: ExportPlan) -> Result<Emitter> {
        let mut builder = Emitter::builder()
            .threshold(resolved.policy.threshold())
            .bind_ip(resolved.bind_ip)
            .port(resolved.port)
            .queue_capacity(self.export.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY));

        for mapping in &self.mapping {
            builder = builder.output(&mapping.name, mapping.pack.as_deref());
        }
        for addr in resolved.destinations {
            builder = builder.destination(addr);
        }

        Ok(builder.build()?)
    }

    /// Validate the configuration and compute the export settings once.
    pub fn resolve(&self) -> Result<ExportPlan> {
        check_protocol(&self.export.protocol).context("export.protocol")?;
        let policy = FlushPolicy::from_signed(self.export.threshold).context("export.threshold")?;
        let bind_ip = self.bind_ip()?;
        let port = self.local_port()?;
        if self.mapping.is_empty() {
            bail!("at least one [[mapping]] entry is required");
        }
        if let Some(i) = self.mapping.iter().position(|m| m.name.trim().is_empty()) {
            bail!("mapping[{}]: name must not be empty", i);
        }
        let destinations = self.destinations()?;

        Ok(ExportPlan {
            policy,
            bind_ip,
            port,
            destinations,
        })
    }
}

/// Validated export settings.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub policy: FlushPolicy,
    pub bind_ip: IpAddr,
    pub port: u16,
    /// Destinations in insertion order, skipped entries removed.
    pub destinations: Vec<SocketAddr>,
}

fn to_port(port: i64) -> std::result::Result<u16, EmitterError> {
    u16::try_from(port).map_err(|_| EmitterError::InvalidPort(port))
}

fn nonzero_port(port: u16) -> std::result::Result<u16, EmitterError> {
    if port == 0 {
        Err(EmitterError::InvalidPort(0))
    } else {
        Ok(port)
    }
}
