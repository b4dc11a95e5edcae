// Framework bootstrap for the hub server runtime.

use crate::frameworks::config;
use crate::interface_adapters::codec::JsonCodec;
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{HubSettings, spawn_hub};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc, time::Duration};

/// Everything the server needs that is not the listener itself.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub hub: HubSettings,
    pub outbound_capacity: usize,
    pub write_timeout: Duration,
}

impl ServerSettings {
    pub fn from_env() -> Self {
        Self {
            hub: config::hub_settings(),
            outbound_capacity: config::OUTBOUND_CHANNEL_CAPACITY,
            write_timeout: config::write_timeout(),
        }
    }
}

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

pub async fn run(listener: tokio::net::TcpListener, settings: ServerSettings) -> Result<()> {
    let address = listener.local_addr()?;

    // One hub per process; every connection shares it.
    let hub = spawn_hub(settings.hub.clone(), JsonCodec);
    let state = Arc::new(AppState {
        hub,
        outbound_capacity: settings.outbound_capacity,
        write_timeout: settings.write_timeout,
    });

    tracing::info!(
        %address,
        countdown_ticks = settings.hub.countdown.ticks,
        tick_interval_ms = settings.hub.countdown.interval.as_millis() as u64,
        echo_policy = ?settings.hub.echo_policy,
        "listening"
    );

    // Serve app and report errors rather than panicking
    axum::serve(listener, app(state)).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([0, 0, 0, 0], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener, ServerSettings::from_env()).await
}
