use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use retro_exporter::config::DEFAULT_DEST_PORT;
use retro_exporter::emit::pump;
use retro_exporter::listen::json_lines;
use retro_exporter::{LineSource, Listener, PlotterConfig, SyntheticSource};

#[derive(Parser, Debug)]
#[command(name = "retro-exporter")]
#[command(about = "Stream controller input telemetry as batched MessagePack over UDP")]
struct Args {
    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export samples to the destinations of a plotter config
    Emit {
        /// Path to the plotter TOML file
        #[arg(short, long)]
        config: PathBuf,

        /// Newline-delimited JSON samples ("-" for stdin)
        #[arg(short, long, default_value = "-", conflicts_with = "synthetic")]
        input: String,

        /// Generate a synthetic pad instead of reading samples
        #[arg(long)]
        synthetic: bool,

        /// Synthetic sample period in milliseconds
        #[arg(long, default_value = "16", requires = "synthetic")]
        period_ms: u64,

        /// Stop after this many synthetic samples
        #[arg(long, requires = "synthetic")]
        count: Option<u64>,
    },

    /// Receive datagrams and print each frame as a JSON line
    Listen {
        /// UDP port to listen on
        #[arg(short, long, default_value_t = DEFAULT_DEST_PORT as u16)]
        port: u16,

        /// Address to bind
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        bind: IpAddr,
    },

    /// Validate a plotter config and print what it resolves to
    Check {
        /// Path to the plotter TOML file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Check { config } => check(&config),
        Command::Emit { config, input, synthetic, period_ms, count } => {
            let rt = tokio::runtime::Runtime::new()?;
            let synthetic = synthetic.then(|| (Duration::from_millis(period_ms.max(1)), count));
            rt.block_on(emit(&config, &input, synthetic))
        }
        Command::Listen { port, bind } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(listen(SocketAddr::new(bind, port)))
        }
    }
}

/// Validate a plotter config without touching the network
fn check(path: &Path) -> Result<()> {
    let config = PlotterConfig::load(path)?;
    let plan = config.resolve()?;

    println!("plotter:     {}", config.name.as_deref().unwrap_or("(unnamed)"));
    println!("local:       {}", SocketAddr::new(plan.bind_ip, plan.port));
    println!("threshold:   {} bytes", plan.policy.threshold());
    println!("destinations:");
    for addr in &plan.destinations {
        println!("  {}", addr);
    }
    println!("mappings:");
    for mapping in &config.mapping {
        match &mapping.pack {
            Some(pack) if pack != &mapping.name => println!("  {} -> {}", mapping.name, pack),
            _ => println!("  {}", mapping.name),
        }
    }
    Ok(())
}

async fn emit(path: &Path, input: &str, synthetic: Option<(Duration, Option<u64>)>) -> Result<()> {
    let config = PlotterConfig::load(path)?;
    let mut emitter = config.build_emitter()?;
    emitter.bind().context("failed to bind export socket")?;

    tracing::info!(
        plotter = config.name.as_deref().unwrap_or("(unnamed)"),
        local = ?emitter.local_addr(),
        destinations = emitter.destination_count(),
        threshold = emitter.threshold(),
        "exporter started"
    );

    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    let pushed = match synthetic {
        Some((period, count)) => pump(&mut emitter, SyntheticSource::new(period, count), stop).await,
        None if input == "-" => pump(&mut emitter, LineSource::new(tokio::io::stdin(), "stdin"), stop).await,
        None => {
            let file = tokio::fs::File::open(input)
                .await
                .with_context(|| format!("failed to open {}", input))?;
            pump(&mut emitter, LineSource::new(file, input), stop).await
        }
    };

    emitter.flush();
    let stats = emitter.stats();
    emitter.shutdown().await;

    tracing::info!(
        pushed,
        encoded = stats.records_encoded,
        skipped = stats.samples_skipped,
        flushes = stats.flushes,
        dropped = stats.generations_dropped,
        "exporter stopped"
    );
    Ok(())
}

async fn listen(addr: SocketAddr) -> Result<()> {
    let listener = Listener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        stop_tx.send_replace(true);
    });

    let summary = listener.run(stop_rx, json_lines(std::io::stdout().lock())).await?;
    tracing::info!(
        datagrams = summary.datagrams,
        frames = summary.frames,
        malformed = summary.malformed,
        "listener stopped"
    );
    Ok(())
}
