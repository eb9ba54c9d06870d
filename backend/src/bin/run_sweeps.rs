//! Run one reconciliation sweep and print its summary as JSON.
//!
//! Intended for cron hosts that reach the database directly instead of
//! calling the internal HTTP endpoints.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig as _;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use voicepost_backend::inbound::http::session_config::BuildMode;
use voicepost_backend::server::{AppSettings, build_http_state};

/// `run-sweeps` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "run-sweeps",
    about = "Publish due scheduled posts or fail stale generations",
    version
)]
struct CliArgs {
    #[command(subcommand)]
    sweep: Sweep,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Sweep {
    /// Publish scheduled posts whose time has come.
    Scheduled,
    /// Fail posts stuck in generation or publishing past the staleness window.
    StaleGenerations,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    let summary = runtime.block_on(run(args.sweep))?;
    println!("{summary}");
    Ok(())
}

async fn run(sweep: Sweep) -> Result<String> {
    // Settings come from the environment and config file only; the command
    // line belongs to clap.
    let settings = AppSettings::load_from_iter([OsString::from("run-sweeps")])
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    if settings.database_url.is_none() {
        warn!("no database configured; sweeping an empty in-memory store");
    }
    let state = build_http_state(&settings, BuildMode::from_debug_assertions())
        .await
        .wrap_err("failed to assemble application state")?;

    let rendered = match sweep {
        Sweep::Scheduled => {
            let summary = state
                .sweeps
                .sweep_scheduled()
                .await
                .map_err(|err| eyre!("scheduled sweep failed: {err}"))?;
            serde_json::to_string_pretty(&summary)?
        }
        Sweep::StaleGenerations => {
            let summary = state
                .sweeps
                .sweep_stale_generations()
                .await
                .map_err(|err| eyre!("stale generation sweep failed: {err}"))?;
            serde_json::to_string_pretty(&summary)?
        }
    };
    Ok(rendered)
}
