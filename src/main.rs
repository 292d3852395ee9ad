mod bindings;
mod chord;
mod engine;
mod error;
mod launcher;
mod lock;
mod monitor;
mod platform;
mod power;
mod registrar;
mod target;
mod task;

use clap::Parser;
use engine::Engine;
use platform::{NativeHook, NativeInputApi, NativePowerApi, NativeProcessApi, NativeSessionApi};
use power::ProtectionProfile;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Cadence of the status poll that feeds the wake policy and lock telemetry.
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "wakebind", about = "Hotkey launcher that keeps the machine awake")]
struct Args {
    /// Path to bindings file (default: ~/.config/wakebind/bindings.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Protection profile: light, medium, heavy, or custom
    #[arg(short, long, default_value = "medium")]
    protection: ProtectionProfile,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Flat chord → target table, the whole on-disk surface.
#[derive(Debug, Default, Deserialize)]
struct BindingsFile {
    #[serde(default)]
    bindings: HashMap<String, String>,
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wakebind")
        .join("bindings.toml")
}

fn load_bindings(path: &PathBuf) -> anyhow::Result<BindingsFile> {
    use anyhow::Context;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bindings file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = args.config.unwrap_or_else(default_config_path);
    info!("loading bindings from {}", config_path.display());

    let file = match load_bindings(&config_path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let engine = match build_engine() {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    for (chord, target) in &file.bindings {
        let conflict = engine.check_conflict(chord);
        if conflict.is_conflict {
            warn!("{}", conflict.message);
        }
        if let Err(err) = engine.add_binding(chord, target) {
            warn!(%chord, %target, error = %err, "skipping binding");
        }
    }
    info!("loaded {} bindings", engine.list_bindings().len());

    engine.set_protection_level(args.protection);
    engine.set_degradation_handler(|degradation| {
        error!(
            failed = ?degradation.failed,
            "wakefulness is no longer guaranteed; every mechanism failed"
        );
    });

    match engine.start() {
        Ok(()) => {}
        Err(err @ error::Error::PartialRegistration { .. }) => {
            warn!("{err}");
        }
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }
    info!("listening for hotkeys; press ctrl-c to exit");

    run_status_loop(&engine).await;

    engine.stop();
    engine.allow_sleep();

    let stats = engine.lock_statistics();
    info!(
        lock_count = stats.lock_count,
        currently_locked = stats.currently_locked,
        last_lock = ?stats.last_lock_at,
        total_locked = ?stats.total_locked,
        "session lock summary"
    );
    info!("shut down");
    ExitCode::SUCCESS
}

fn build_engine() -> anyhow::Result<Engine> {
    let hook = Arc::new(NativeHook::new()?);
    Ok(Engine::new(
        hook,
        Arc::new(NativeProcessApi::new()),
        Arc::new(NativePowerApi::new()),
        Arc::new(NativeInputApi::new()),
        Arc::new(NativeSessionApi::new()),
    ))
}

/// Poll running processes and lock state until interrupted. Wakefulness
/// follows process liveness: something running keeps the machine awake,
/// nothing running lets it sleep again.
async fn run_status_loop(engine: &Engine) {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
            _ = tokio::time::sleep(STATUS_POLL_INTERVAL) => {
                let count = engine.running_count();
                if count > 0 {
                    engine.prevent_sleep();
                } else {
                    engine.allow_sleep();
                }

                let locked = engine.poll_lock_state();
                let stats = engine.lock_statistics();
                debug!(
                    running = count,
                    preventing_sleep = engine.is_preventing_sleep(),
                    locked,
                    lock_count = stats.lock_count,
                    "status"
                );
            }
        }
    }
}
