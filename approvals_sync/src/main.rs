use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use approvals_state::{RawEvent, Store, SyncContext, ViewCache};
use clap::Parser;
use tokio::{
    signal,
    sync::{mpsc, watch},
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    app_state::{Published, ServiceState},
    backoff::Backoff,
    cfg::Cfg,
    eth_client::EthClient,
    indexer::{indexer_loop, wait_for_upstream},
    sync_session::fold_loop,
};

mod app_state;
mod backoff;
mod cfg;
mod eth_client;
mod events;
mod http_handler;
mod indexer;
mod sync_session;
#[cfg(test)]
mod testing;

const EVENT_QUEUE: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging: controlled via RUST_LOG, e.g. RUST_LOG=info,approvals_state=debug
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(Cfg::parse());

    // Dialing is part of the retry: an unreachable node never stops the process.
    let eth = wait_for_upstream(|| EthClient::connect(&cfg), Backoff::from_cfg(&cfg)).await;
    if !eth.can_submit() {
        info!("no moderator key; approve/reject disabled");
    }

    let (events_tx, events_rx) = mpsc::channel::<RawEvent>(EVENT_QUEUE);
    let (published_tx, published_rx) = watch::channel(Published::default());

    let state = ServiceState {
        cfg: cfg.clone(),
        eth: eth.clone(),
        events: events_tx.clone(),
        snapshots: published_rx,
        views: Arc::new(Mutex::new(ViewCache::default())),
    };

    // One store per session; restarts always begin from an empty state.
    let store = Store::new(SyncContext::new(eth));
    tokio::spawn(fold_loop(store, events_rx, published_tx, Backoff::from_cfg(&cfg)));

    if let Some(account) = cfg.connected_account {
        events_tx
            .send(RawEvent::account_changed(Some(account)))
            .await
            .context("queue connected account")?;
    }

    let indexer_state = state.clone();
    tokio::spawn(async move {
        if let Err(err) = indexer_loop(indexer_state, events_tx).await {
            error!("indexer stopped: {:#}", err);
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind to address")?;

    axum::serve(listener, http_handler::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

// Graceful shutdown on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
