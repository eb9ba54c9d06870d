//! Backend entry-point: loads settings, assembles services and serves HTTP.

use std::env;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultEnv;
use ortho_config::OrthoConfig as _;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use voicepost_backend::inbound::http::health::HealthState;
use voicepost_backend::inbound::http::session_config::{
    BuildMode, key_fingerprint, session_settings_from_env,
};
use voicepost_backend::server::{AppSettings, ServerConfig, build_http_state, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(env::args_os())
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    let mode = BuildMode::from_debug_assertions();
    let session = session_settings_from_env(&DefaultEnv::new(), mode)
        .wrap_err("invalid session configuration")?;
    info!(fingerprint = %key_fingerprint(&session.key), "session key loaded");

    let bind_addr = settings.bind_addr()?;
    let http_state = build_http_state(&settings, mode)
        .await
        .wrap_err("failed to assemble application state")?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        health_state,
        http_state,
        ServerConfig { bind_addr, session },
    )
    .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "server listening");

    server.await.wrap_err("server terminated with an error")
}
