//! Buzzer Relay binary entrypoint wiring the button engine, indicator lines and relay loop.

use std::{env, sync::Arc};

use anyhow::Context;
use tokio::{net::TcpListener, sync::watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use buzzer_relay::{
    config::AppConfig,
    error::StartupError,
    hw::{
        console::spawn_console_edges,
        indicator::LogIndicator,
        platform::{associate, check_interlock},
    },
    services::main_loop::MainLoop,
    state::{Engine, indicator::Indicator},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut config = AppConfig::load();
    if let Some(port) = env::var("PORT").ok().and_then(|value| value.parse::<u16>().ok()) {
        config.port = port;
    }

    check_interlock(&config).context("checking safety interlock")?;
    let addr = associate(&config).context("associating with the network")?;

    let engine = Engine::new(&config, |player| {
        Arc::new(LogIndicator::for_player(player)) as Arc<dyn Indicator>
    });
    spawn_console_edges(engine.clone()).context("starting console edge source")?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    info!(%addr, players = config.players.len(), "starting relay");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    MainLoop::new(engine, listener, &config).run(shutdown_rx).await;
    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown requested");
}
