use crate::error::{NetconfClientError, NetconfClientResult};
use crate::message::{
    CopyConfigSource, Datastore, DefaultOperation, ErrorOptionValue, Filter, Hello, Rpc,
    RpcOperation, RpcReply, Source, WithDefaultsValue,
};
use crate::transport::Transport;
use crate::NETCONF_BASE_11_CAP;
use core::time::Duration;
use log::{debug, error, warn};
use quick_xml::de::from_str;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;
#[cfg(feature = "tokio")]
use tokio::runtime::Handle;
#[cfg(feature = "tokio")]
use tokio::sync::mpsc::Sender;
#[cfg(feature = "tokio")]
use tokio::task::block_in_place;
#[cfg(feature = "tokio")]
use tokio::{select, signal};

/// How long `notification_history` waits for the next historical event before
/// giving up, in case a device never sends `<notificationComplete/>`.
#[cfg(feature = "tokio")]
const NOTIFICATION_HISTORY_TIMEOUT: Duration = Duration::from_secs(30);

/// One historical notification: the device-reported event time, as Unix
/// seconds, and the raw `<notification>` XML as received.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub event_time: i64,
    pub content: String,
}

pub struct Connection {
    pub(crate) transport: Box<dyn Transport + Send + 'static>,

    session_id: Option<u64>,
    capabilities: Vec<String>,
    skip_serializing: bool,
    is_closed: bool,
}

impl Connection {
    pub async fn new<T>(transport: T) -> NetconfClientResult<Connection>
    where
        T: Transport + 'static,
    {
        Connection::new_boxed(Box::from(transport)).await
    }

    /// Same as [`Connection::new`] but for a transport that is already
    /// boxed, such as the result of [`Connection::open_side_channel`].
    pub async fn new_boxed(
        transport: Box<dyn Transport + Send + 'static>,
    ) -> NetconfClientResult<Connection> {
        let mut conn = Connection {
            transport,
            session_id: None,
            capabilities: Vec::new(),
            skip_serializing: false,
            is_closed: false,
        };
        let (session_id, capabilities) = conn.hello().await?;
        conn.session_id = session_id;
        conn.capabilities = capabilities;
        Ok(conn)
    }

    pub fn set_skip_serializing(&mut self) {
        self.skip_serializing = true
    }

    pub fn session_id(&self) -> u64 {
        self.session_id.unwrap_or(0)
    }

    /// Capabilities the device advertised in its `<hello>`.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// `"1.1"` if the device advertised base:1.1, else `"1.0"`.
    pub fn negotiated_version(&self) -> &'static str {
        if self
            .capabilities
            .iter()
            .any(|cap| cap == NETCONF_BASE_11_CAP)
        {
            "1.1"
        } else {
            "1.0"
        }
    }

    async fn hello(&mut self) -> NetconfClientResult<(Option<u64>, Vec<String>)> {
        let hello = Hello::new();
        let response = self.transport.write_and_receive(&hello.to_string()).await?;
        debug!("Hello:\n{}", response);

        let hello: Hello = from_str(&response)?;
        if hello.has_capability(NETCONF_BASE_11_CAP) {
            self.transport.upgrade().await;
        }
        Ok((hello.session_id(), hello.capabilities()))
    }

    /// GetConfig implements the `<get-config>` rpc operation defined in [RFC6241 7.1].
    /// `source` is the datastore to query.
    ///
    /// [RFC6241 7.1]: https://www.rfc-editor.org/rfc/rfc6241.html#section-7.1
    pub async fn get_config(
        &mut self,
        datastore: Datastore,
        filter: Option<Filter>,
        defaults: Option<WithDefaultsValue>,
    ) -> NetconfClientResult<String> {
        let get_config =
            Rpc::new_with_operation(RpcOperation::new_get_config(datastore, filter, defaults));
        self.run_rpc(get_config).await
    }

    pub async fn get(
        &mut self,
        filter: Option<Filter>,
        defaults: Option<WithDefaultsValue>,
    ) -> NetconfClientResult<String> {
        let get_config = Rpc::new_with_operation(RpcOperation::new_get(filter, defaults));
        self.run_rpc(get_config).await
    }

    pub async fn validate(&mut self, datastore: Datastore) -> NetconfClientResult<String> {
        let validate = Rpc::new_with_operation(RpcOperation::Validate {
            source: Source { datastore },
        });
        self.run_rpc(validate).await
    }

    /// Implements the `<edit-config>` rpc operation defined in [RFC6241 7.2].
    /// `test-option` is always `test-then-set`.
    ///
    /// [RFC6241 7.2]: https://www.rfc-editor.org/rfc/rfc6241.html#section-7.2
    pub async fn edit_config(
        &mut self,
        target: Datastore,
        config: String,
        default_operation: Option<DefaultOperation>,
        error_option: Option<ErrorOptionValue>,
    ) -> NetconfClientResult<String> {
        let edit_config = Rpc::new_with_operation(RpcOperation::new_edit_config(
            target,
            config,
            default_operation,
            error_option,
        ));
        self.run_rpc(edit_config).await
    }

    /// Implements the `<copy-config>` rpc operation defined in [RFC6241 7.3].
    ///
    /// [RFC6241 7.3]: https://www.rfc-editor.org/rfc/rfc6241.html#section-7.3
    pub async fn copy_config(
        &mut self,
        target: Datastore,
        source: CopyConfigSource,
    ) -> NetconfClientResult<String> {
        let copy_config = Rpc::new_with_operation(RpcOperation::new_copy_config(target, source));
        self.run_rpc(copy_config).await
    }

    /// Implements the `<delete-config>` rpc operation defined in [RFC6241 7.4].
    ///
    /// [RFC6241 7.4]: https://www.rfc-editor.org/rfc/rfc6241.html#section-7.4
    pub async fn delete_config(&mut self, target: Datastore) -> NetconfClientResult<String> {
        let delete_config = Rpc::new_with_operation(RpcOperation::new_delete_config(target));
        self.run_rpc(delete_config).await
    }

    /// Implements the `<lock>` rpc operation defined in [RFC6241 7.5].
    ///
    /// [RFC6241 7.5]: https://www.rfc-editor.org/rfc/rfc6241.html#section-7.5
    pub async fn lock(&mut self, target: Datastore) -> NetconfClientResult<String> {
        let lock = Rpc::new_with_operation(RpcOperation::new_lock(target));
        self.run_rpc(lock).await
    }

    /// Implements the `<unlock>` rpc operation defined in [RFC6241 7.6].
    ///
    /// [RFC6241 7.6]: https://www.rfc-editor.org/rfc/rfc6241.html#section-7.6
    pub async fn unlock(&mut self, target: Datastore) -> NetconfClientResult<String> {
        let unlock = Rpc::new_with_operation(RpcOperation::new_unlock(target));
        self.run_rpc(unlock).await
    }

    /// Implements the `<get-schema>` rpc operation defined in [RFC6022 3.1].
    ///
    /// [RFC6022 3.1]: https://www.rfc-editor.org/rfc/rfc6022.html#section-3.1
    pub async fn get_schema(
        &mut self,
        identifier: String,
        version: Option<String>,
        format: Option<String>,
    ) -> NetconfClientResult<String> {
        let get_schema =
            Rpc::new_with_operation(RpcOperation::new_get_schema(identifier, version, format));
        self.run_rpc(get_schema).await
    }

    /// Sends caller-supplied raw XML as the immediate content of an `<rpc>`
    /// envelope, for operations this client has no typed builder for.
    pub async fn generic(&mut self, content: &str) -> NetconfClientResult<String> {
        let message_id = Uuid::new_v4();
        let rpc = format!(
            "<rpc message-id=\"{}\" xmlns=\"{}\">\n{}\n</rpc>",
            message_id,
            crate::NETCONF_URN,
            content
        );
        let response = self.transport.write_and_receive(&rpc).await?;
        debug!("RPC:\n{}", response);

        if !self.skip_serializing {
            if let Ok(reply) = from_str::<RpcReply>(&response) {
                if reply.has_errors() {
                    return Err(NetconfClientError::Netconf(reply));
                }
            }
        }
        Ok(response)
    }

    /// Opens a second NETCONF subsystem channel over the same transport and
    /// performs its own `<hello>` exchange, without disturbing this
    /// connection's RPC stream. Used for hello-reload and notification
    /// history, both of which must not interleave with in-flight RPCs.
    pub async fn open_side_channel(&self) -> NetconfClientResult<Connection> {
        let side_transport = self.transport.open_side_channel().await?;
        Connection::new_boxed(side_transport).await
    }

    /// Replays historical notifications in `[now + from_offset, now +
    /// to_offset]` (seconds) from a `create-subscription` with explicit
    /// `startTime`/`stopTime`. Intended to be called on a side channel.
    #[cfg(feature = "tokio")]
    pub async fn notification_history(
        &mut self,
        stream: Option<&str>,
        from_offset: i64,
        to_offset: i64,
    ) -> NetconfClientResult<Vec<NotificationEvent>> {
        let now = OffsetDateTime::now_utc();
        let start_time = now + time::Duration::seconds(from_offset);
        let stop_time = now + time::Duration::seconds(to_offset);
        let subscribe = Rpc::new_with_operation(RpcOperation::new_create_subscription_with_times(
            stream, None, start_time, stop_time,
        ));
        self.run_rpc(subscribe).await?;

        let mut events = Vec::new();
        loop {
            match tokio::time::timeout(
                NOTIFICATION_HISTORY_TIMEOUT,
                self.transport.receive(),
            )
            .await
            {
                Ok(Ok(resp)) => {
                    if resp.contains("notificationComplete") {
                        break;
                    }
                    match parse_notification_event_time(&resp) {
                        Some(event_time) => events.push(NotificationEvent {
                            event_time,
                            content: resp,
                        }),
                        None => warn!("Dropping notification without parseable eventTime"),
                    }
                }
                Ok(Err(err)) => return Err(err),
                Err(_) => break,
            }
        }
        Ok(events)
    }

    pub async fn commit(&mut self) -> NetconfClientResult<String> {
        let commit = Rpc::new_with_operation(RpcOperation::new_commit(None, None, None, None));
        self.run_rpc(commit).await
    }

    pub async fn confirmed_commit(
        &mut self,
        confirm_timeout: Option<i32>,
        persist: Option<String>,
        persist_id: Option<String>,
    ) -> NetconfClientResult<String> {
        let commit = Rpc::new_with_operation(RpcOperation::new_commit(
            Some(()),
            confirm_timeout,
            persist,
            persist_id,
        ));
        self.run_rpc(commit).await
    }

    pub async fn close_session(&mut self) -> NetconfClientResult<String> {
        let close_session = Rpc::new_with_operation(RpcOperation::CloseSession);
        self.is_closed = true;
        self.run_rpc(close_session).await
    }

    pub async fn kill_session(&mut self, session_id: u64) -> NetconfClientResult<String> {
        let kill_session = Rpc::new_with_operation(RpcOperation::KillSession { session_id });
        self.is_closed = true;
        self.run_rpc(kill_session).await
    }

    /// Issues the `<create-subscription>` operation as defined in [RFC5277 2.1.1](https://www.rfc-editor.org/rfc/rfc5277.html#section-2.1.1)
    /// for initiating an event notification subscription that will send asynchronous event notifications to the initiator.
    ///
    /// This requires the device to support the [notification capability](https://www.rfc-editor.org/rfc/rfc5277.html#section-3.1.1)
    ///
    /// It is caller responsibility to handle the notifications stream.
    #[cfg(feature = "tokio")]
    pub async fn notification(
        &mut self,
        sender: Sender<String>,
        stream: Option<&str>,
        duration: Option<Duration>,
    ) -> NetconfClientResult<()> {
        let notification = Rpc::new_with_operation(RpcOperation::new_create_subscription(
            stream, None, duration,
        ));
        self.run_rpc(notification).await?;
        self.run_notification_loop(sender).await
    }

    #[cfg(feature = "tokio")]
    async fn run_notification_loop(&mut self, sender: Sender<String>) -> NetconfClientResult<()> {
        select! {
            result = async {
                if let Err(err) = signal::ctrl_c().await {
                    Err(NetconfClientError::Io(err))
                } else {
                    Ok(())
                }
            } => {
                result
            }
            result = async {
                loop {
                    match self.transport.receive().await {
                        Ok(resp) => {
                            if let Err(err) = sender.send(resp).await {
                                break Err(NetconfClientError::new(format!("send error: {}", err)));
                            }
                        }
                        Err(err) => {
                            break Err(err);
                        }
                    };
                }
            } => {
                result
            }
        }
    }

    async fn run_rpc(&mut self, rpc: Rpc) -> NetconfClientResult<String> {
        let response = self.transport.write_and_receive(&rpc.to_string()).await?;
        debug!("RPC:\n{}", response);

        if !self.skip_serializing {
            let reply: RpcReply = from_str(&response)?;
            if reply.has_errors() {
                return Err(NetconfClientError::Netconf(reply));
            }
        }
        Ok(response)
    }
}

#[cfg(feature = "tokio")]
impl Drop for Connection {
    fn drop(&mut self) {
        if !self.is_closed {
            block_in_place(|| {
                Handle::current().block_on(async {
                    if let Err(err) = self.close_session().await {
                        error!("Error closing netconf session: {}", err);
                    }
                });
            });
        }
    }
}

/// Pulls the `<eventTime>` value out of a raw `<notification>` message and
/// parses it as Unix seconds, without deserializing the whole document.
#[cfg(feature = "tokio")]
fn parse_notification_event_time(raw: &str) -> Option<i64> {
    const OPEN: &str = "<eventTime>";
    const CLOSE: &str = "</eventTime>";
    let start = raw.find(OPEN)? + OPEN.len();
    let end = start + raw[start..].find(CLOSE)?;
    OffsetDateTime::parse(raw[start..end].trim(), &Rfc3339)
        .ok()
        .map(|dt| dt.unix_timestamp())
}

#[cfg(all(test, feature = "tokio"))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notification_event_time() {
        let raw = r#"<notification xmlns="urn:ietf:params:xml:ns:netconf:notification:1.0">
  <eventTime>2024-01-01T00:00:00Z</eventTime>
  <my-event/>
</notification>"#;
        assert_eq!(
            parse_notification_event_time(raw),
            Some(1704067200)
        );
    }

    #[test]
    fn test_parse_notification_event_time_missing() {
        let raw = "<notification></notification>";
        assert_eq!(parse_notification_event_time(raw), None);
    }
}
