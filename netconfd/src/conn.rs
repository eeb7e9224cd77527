//! Per-front-end-connection loop (§4.5): read one framed JSON request,
//! dispatch it, write one framed JSON reply, until the peer hangs up, a
//! framing/parse error occurs, or the supervisor signals shutdown.

use crate::dispatch::dispatch;
use crate::framing;
use crate::netconf_client::NetconfDialer;
use crate::registry::Registry;
use log::{debug, warn};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::watch;

pub async fn handle_connection(
    mut stream: UnixStream,
    registry: Arc<Registry>,
    dialer: Arc<dyn NetconfDialer>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            frame = framing::read_frame(&mut stream) => {
                let payload = match frame {
                    Ok(payload) => payload,
                    Err(err) => {
                        debug!("closing connection: framing error: {err}");
                        break;
                    }
                };
                if payload.is_empty() {
                    break;
                }

                let request: serde_json::Value = match serde_json::from_slice(&payload) {
                    Ok(value) => value,
                    Err(err) => {
                        debug!("closing connection: malformed json: {err}");
                        break;
                    }
                };

                let reply = dispatch(&registry, &dialer, &request).await;
                let encoded = match serde_json::to_vec(&reply) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!("failed to encode reply: {err}");
                        break;
                    }
                };
                if let Err(err) = framing::write_frame(&mut stream, &encoded).await {
                    debug!("closing connection: write error: {err}");
                    break;
                }
            }
        }
    }
    let _ = stream.shutdown().await;
}
