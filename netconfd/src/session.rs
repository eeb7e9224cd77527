//! The central session entity (§3): one live NETCONF session, its exclusive
//! lock, cached hello, and activity bookkeeping.

use crate::netconf_client::NetconfSession;
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Opaque printable handle a front-end uses to refer to a daemon-held
/// NETCONF session: lowercase hex SHA-1 of (host, port, device session id).
pub type SessionKey = String;

pub fn make_session_key(host: &str, port: &str, device_session_id: u64) -> SessionKey {
    let mut hasher = Sha1::new();
    hasher.update(host.as_bytes());
    hasher.update(port.as_bytes());
    hasher.update(device_session_id.to_string().as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Cached, JSON-serializable description of the peer, rebuilt on connect and
/// on explicit `reload-hello`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceHello {
    pub sid: String,
    pub version: String,
    pub host: String,
    pub port: String,
    pub user: String,
    pub capabilities: Vec<String>,
}

/// Ring buffer of pending notifications (capacity 10), reserved for the
/// notification push subsystem. The history path (`ntf-get-history`) does
/// not consult this queue; it replays directly from the device instead.
const NOTIFICATION_RING_CAPACITY: usize = 10;

pub struct SessionRecord {
    pub netconf_session: Mutex<Box<dyn NetconfSession>>,
    pub hello: Mutex<DeviceHello>,
    last_activity: Mutex<Instant>,
    closed: AtomicBool,
    notifications_subscribed: AtomicBool,
    notifications: Mutex<VecDeque<String>>,
}

impl SessionRecord {
    pub fn new(netconf_session: Box<dyn NetconfSession>, hello: DeviceHello) -> SessionRecord {
        SessionRecord {
            netconf_session: Mutex::new(netconf_session),
            hello: Mutex::new(hello),
            last_activity: Mutex::new(Instant::now()),
            closed: AtomicBool::new(false),
            notifications_subscribed: AtomicBool::new(false),
            notifications: Mutex::new(VecDeque::with_capacity(NOTIFICATION_RING_CAPACITY)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub async fn touch(&self) {
        *self.last_activity.lock().await = Instant::now();
    }

    pub async fn idle_for(&self) -> tokio::time::Duration {
        self.last_activity.lock().await.elapsed()
    }

    pub fn notifications_subscribed(&self) -> bool {
        self.notifications_subscribed.load(Ordering::Acquire)
    }

    pub fn set_notifications_subscribed(&self, subscribed: bool) {
        self.notifications_subscribed
            .store(subscribed, Ordering::Release);
    }

    pub async fn push_notification(&self, content: String) {
        let mut queue = self.notifications.lock().await;
        if queue.len() == NOTIFICATION_RING_CAPACITY {
            queue.pop_front();
        }
        queue.push_back(content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_is_deterministic_lowercase_hex() {
        let key = make_session_key("h", "830", 42);
        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
        assert_eq!(key, make_session_key("h", "830", 42));
    }

    #[test]
    fn session_key_distinguishes_inputs() {
        assert_ne!(
            make_session_key("h1", "830", 42),
            make_session_key("h2", "830", 42)
        );
        assert_ne!(
            make_session_key("h", "830", 42),
            make_session_key("h", "830", 43)
        );
    }
}
