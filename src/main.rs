// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! coalwatch — coal-handling vision monitor
//!
//! Usage:
//!   coalwatch --config config.toml
//!   coalwatch --create-config 4 --config config.toml
//!   coalwatch --config config.toml --headless

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use coalwatch::config::Config;
use coalwatch::error::Result;
use coalwatch::orchestrator::{ModelLoader, Orchestrator, PlcTransportFactory};
use coalwatch::plc::transport::{NullPlcTransport, PlcTransport};
use coalwatch::plc::PlcLinkId;
use coalwatch::predict::noop::NoopPredictor;
use coalwatch::predict::Predictor;

#[derive(Parser)]
#[command(name = "coalwatch", about = "Coal-handling facility vision monitor", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Write a sample configuration with the given number of cameras to
    /// `--config` and exit, instead of starting the monitor.
    #[arg(long, value_name = "NUM_CAMERAS")]
    create_config: Option<u32>,

    /// Run without any interactive console output beyond a periodic
    /// aggregated status line. This is currently the only run mode: the
    /// flag is accepted for forward compatibility with a future console UI.
    #[arg(long)]
    headless: bool,
}

/// Loads [`NoopPredictor`] for every model path, regardless of what the
/// path actually names. Stands in for a real model loader until a
/// production inference engine is wired in (§1, §6): no concrete one ships
/// with this crate.
struct NoopModelLoader;

impl ModelLoader for NoopModelLoader {
    fn load(&self, path: &str) -> Result<Arc<dyn Predictor>> {
        warn!(model_path = %path, "no inference engine is vendored, loading a no-op placeholder model");
        Ok(Arc::new(NoopPredictor::new()))
    }
}

/// Builds [`NullPlcTransport`] for every camera's alarm link. Stands in for
/// a real Siemens S7 client until one is wired in (§1, §6).
struct NullPlcTransportFactory;

impl PlcTransportFactory for NullPlcTransportFactory {
    fn build(&self, link_id: PlcLinkId) -> Box<dyn PlcTransport> {
        warn!(host = %link_id.host, port = link_id.port, "no PLC client is vendored, using a null transport");
        Box::new(NullPlcTransport::new(link_id))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Some(num_cameras) = cli.create_config {
        let sample = Config::sample(num_cameras);
        if let Err(e) = sample.save_to_file(&cli.config) {
            error!(error = %e, "failed to write sample config");
            std::process::exit(1);
        }
        println!("Wrote sample config with {num_cameras} camera(s) to {}", cli.config.display());
        return;
    }

    let config = match Config::from_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    info!(
        cameras = config.cameras.len(),
        models = config.all_model_paths().len(),
        artifacts_dir = ?config.artifacts_dir,
        logs_dir = ?config.logs_dir,
        "starting coalwatch"
    );

    let orchestrator = match Orchestrator::new_with_gstreamer(config, &NoopModelLoader, &NullPlcTransportFactory) {
        Ok(o) => o,
        Err(e) => {
            error!(error = %e, "failed to start orchestrator");
            std::process::exit(1);
        }
    };

    if cli.headless {
        run_status_loop(&orchestrator).await;
    } else {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received ctrl-c, shutting down"),
            Err(e) => error!(error = %e, "signal error"),
        }
    }

    orchestrator.shutdown().await;
}

/// Print an aggregated status line once a second until ctrl-c, matching the
/// teacher's console status cadence.
async fn run_status_loop(orchestrator: &Orchestrator) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c, shutting down");
                break;
            }
            _ = ticker.tick() => {
                let status = orchestrator.status();
                println!(
                    "cameras {}/{} running | {:.1} inf/s | cpu {:.1}% | mem {} MB",
                    status.cameras_running,
                    status.cameras_total,
                    status.total_inferences_per_sec,
                    status.cpu_usage_percent,
                    status.used_memory_mb,
                );
            }
        }
    }
}
