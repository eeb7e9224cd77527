//! Daemon supervisor (§4.6): binds the listening socket, accepts
//! connections, runs the idle reaper, and drains workers on SIGTERM.

use crate::netconf_client::NetconfDialer;
use crate::registry::{self, Registry};
use crate::{conn, error::DaemonResult};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinSet;

/// Total time allowed for in-flight workers to drain after SIGTERM.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub async fn run(socket_path: &str, dialer: Arc<dyn NetconfDialer>) -> DaemonResult<()> {
    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }
    let listener = UnixListener::bind(socket_path)?;
    info!("listening on {socket_path}");

    let registry = Arc::new(Registry::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut sigterm = signal(SignalKind::terminate())?;

    let mut workers: JoinSet<()> = JoinSet::new();
    let mut reaper = tokio::spawn(registry::run_reaper(registry.clone(), shutdown_rx.clone()));

    loop {
        tokio::select! {
            biased;
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let registry = registry.clone();
                        let dialer = dialer.clone();
                        let shutdown_rx = shutdown_rx.clone();
                        workers.spawn(async move {
                            conn::handle_connection(stream, registry, dialer, shutdown_rx).await;
                        });
                    }
                    Err(err) => {
                        warn!("accept failed: {err}");
                    }
                }
            }
            Some(result) = workers.join_next(), if !workers.is_empty() => {
                if let Err(err) = result {
                    warn!("worker task panicked: {err}");
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(SHUTDOWN_GRACE, drain(&mut workers)).await {
        Ok(()) => info!("all workers drained cleanly"),
        Err(_) => warn!("shutdown grace period elapsed with workers still running"),
    }
    reaper.abort();
    let _ = reaper.await;

    close_all_sessions(&registry).await;
    let _ = std::fs::remove_file(socket_path);
    Ok(())
}

async fn drain(workers: &mut JoinSet<()>) {
    while workers.join_next().await.is_some() {}
}

async fn close_all_sessions(registry: &Arc<Registry>) {
    for key in registry.snapshot_keys().await {
        if let Some(record) = registry.remove(&key).await {
            record.mark_closed();
            let mut session = record.netconf_session.lock().await;
            session.close().await;
        }
    }
}
