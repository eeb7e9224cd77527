pub mod config;
pub mod conn;
pub mod dispatch;
pub mod error;
pub mod framing;
pub mod netconf_client;
pub mod registry;
pub mod session;
pub mod supervisor;

use error::DaemonResult;
use netconf_client::SshNetconfDialer;
use std::sync::Arc;

/// Library entry point: config and logging are already set up by the
/// binary's `main`. Blocks until SIGTERM triggers a clean shutdown.
pub async fn run(socket_path: &str) -> DaemonResult<()> {
    let dialer: Arc<dyn netconf_client::NetconfDialer> = Arc::new(SshNetconfDialer);
    supervisor::run(socket_path, dialer).await
}
