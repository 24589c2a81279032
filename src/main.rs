/*!
 * rtgraph Launcher - Main Entry Point
 *
 * Loads an application description, builds its activities and runs them
 * until interrupted.
 */

use anyhow::{bail, Context, Result};
use clap::Parser;
use rtgraph::core::limits::DEFAULT_STATS_INTERVAL;
use rtgraph::{init_tracing, AppConfig, ComponentRegistry, Launcher, StatisticsTask};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "rtgraph", version, about = "Run a real-time component graph")]
struct Cli {
    /// Application description (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable profiling; statistics are logged every SECS seconds
    #[arg(short, long, value_name = "SECS", num_args = 0..=1, default_missing_value = "5")]
    profiling: Option<u64>,

    /// Print a description skeleton for the components of a library
    #[arg(short, long, value_name = "NAME", conflicts_with = "config")]
    lib: Option<String>,

    /// Wait up to this long for every task to configure before running inline activities
    #[arg(long, value_name = "MS", default_value_t = 0)]
    wait_config_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if let Some(library) = cli.lib.as_deref() {
        return print_skeleton(library);
    }

    let Some(config_path) = cli.config.as_deref() else {
        bail!("nothing to do: pass --config <FILE> or --lib <NAME>");
    };

    let mut config = AppConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if cli.profiling.is_some() {
        config.profiling = true;
    }

    let registry = ComponentRegistry::global();
    let mut launcher = Launcher::new(Arc::clone(&registry), config);
    launcher.create_app().context("creating application")?;
    let launcher = Arc::new(launcher);

    let statistics = launcher.config().profiling.then(|| {
        let interval = cli
            .profiling
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_STATS_INTERVAL);
        StatisticsTask::spawn(Arc::clone(&registry), interval)
    });

    let wait = Duration::from_millis(cli.wait_config_ms);
    let mut runner = {
        let launcher = Arc::clone(&launcher);
        tokio::task::spawn_blocking(move || {
            launcher.start_dedicated()?;
            if !wait.is_zero() {
                launcher.wait_configured(wait);
            }
            launcher.run_inline()
        })
    };

    info!("Application running; press Ctrl+C to exit");

    let interrupted = tokio::select! {
        result = &mut runner => {
            result.context("launcher thread panicked")??;
            false
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl+C")?;
            true
        }
    };

    if !interrupted {
        tokio::signal::ctrl_c().await.context("listening for Ctrl+C")?;
    }

    info!("Interrupt received");
    launcher.kill_app();
    if interrupted {
        if let Err(e) = runner.await.context("launcher thread panicked")? {
            warn!(error = %e, "Inline activity ended with an error");
        }
    }

    if let Some(statistics) = statistics {
        statistics.shutdown().await;
    }

    info!("Application stopped");
    Ok(())
}

fn print_skeleton(library: &str) -> Result<()> {
    let registry = ComponentRegistry::global();
    let current_dir = std::env::current_dir().context("reading current directory")?;

    if !registry.add_library(library, Some(&current_dir)) && !registry.add_library(library, None) {
        bail!("library {} could not be loaded", library);
    }

    let skeleton = AppConfig::skeleton(library, registry.components().into_keys());
    println!("{}", skeleton.to_json()?);
    Ok(())
}
