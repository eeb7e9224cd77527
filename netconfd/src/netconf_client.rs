//! Capability traits the daemon core depends on, plus the SSH-backed
//! implementation wrapping `netconf_async`. The dispatcher never touches SSH
//! or XML wire details directly; it only sees `NetconfSession`.

use crate::error::{DaemonError, DaemonResult};
use crate::session::DeviceHello;
use async_ssh2_lite::{AsyncSession, SessionConfiguration, TokioTcpStream};
use async_trait::async_trait;
use netconf_async::connection::Connection;
use netconf_async::message as nc;
use netconf_async::transport::ssh::SSHTransport;
use std::net::ToSocketAddrs;

pub type NetconfResult<T> = Result<T, netconf_async::error::NetconfClientError>;

/// A configuration datastore or external URL target, as named by the
/// front-end's request. The literal `"url"` token is only valid alongside a
/// companion URL string, folded into `Datastore::Url` at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datastore {
    Running,
    Startup,
    Candidate,
    Url(String),
}

impl Datastore {
    /// Parses the `source`/`target` token. `"url"` requires `url` to be
    /// `Some`; any other value must leave `url` unused.
    pub fn parse(token: &str, url: Option<&str>) -> DaemonResult<Datastore> {
        match token.to_lowercase().as_str() {
            "running" => Ok(Datastore::Running),
            "startup" => Ok(Datastore::Startup),
            "candidate" => Ok(Datastore::Candidate),
            "url" => match url {
                Some(u) => Ok(Datastore::Url(u.to_string())),
                None => Err(DaemonError::InvalidDatastore),
            },
            _ => Err(DaemonError::InvalidDatastore),
        }
    }
}

impl From<Datastore> for nc::Datastore {
    fn from(d: Datastore) -> nc::Datastore {
        match d {
            Datastore::Running => nc::Datastore::Running,
            Datastore::Startup => nc::Datastore::Startup,
            Datastore::Candidate => nc::Datastore::Candidate,
            Datastore::Url(u) => nc::Datastore::Url(u),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultOperation {
    Merge,
    Replace,
    None,
}

impl DefaultOperation {
    pub fn parse(token: &str) -> DaemonResult<DefaultOperation> {
        match token.to_lowercase().as_str() {
            "merge" => Ok(DefaultOperation::Merge),
            "replace" => Ok(DefaultOperation::Replace),
            "none" => Ok(DefaultOperation::None),
            other => Err(DaemonError::BadRequest(format!(
                "unknown default-operation: {other}"
            ))),
        }
    }
}

impl From<DefaultOperation> for nc::DefaultOperation {
    fn from(d: DefaultOperation) -> nc::DefaultOperation {
        match d {
            DefaultOperation::Merge => nc::DefaultOperation::Merge,
            DefaultOperation::Replace => nc::DefaultOperation::Replace,
            DefaultOperation::None => nc::DefaultOperation::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOption {
    StopOnError,
    ContinueOnError,
    RollbackOnError,
}

impl ErrorOption {
    pub fn parse(token: &str) -> DaemonResult<ErrorOption> {
        match token.to_lowercase().as_str() {
            "stop" | "stop-on-error" => Ok(ErrorOption::StopOnError),
            "continue" | "continue-on-error" => Ok(ErrorOption::ContinueOnError),
            "rollback" | "rollback-on-error" => Ok(ErrorOption::RollbackOnError),
            other => Err(DaemonError::BadRequest(format!(
                "unknown error-option: {other}"
            ))),
        }
    }
}

impl From<ErrorOption> for nc::ErrorOptionValue {
    fn from(e: ErrorOption) -> nc::ErrorOptionValue {
        match e {
            ErrorOption::StopOnError => nc::ErrorOptionValue::StopOnError,
            ErrorOption::ContinueOnError => nc::ErrorOptionValue::ContinueOnError,
            ErrorOption::RollbackOnError => nc::ErrorOptionValue::RollbackOnError,
        }
    }
}

/// `copy-config`'s source: either another datastore or inline config content.
/// Exactly one of the two is ever present, enforced by the dispatcher.
#[derive(Debug, Clone)]
pub enum CopySource {
    Datastore(Datastore),
    Config(String),
}

/// Result of a raw `generic` RPC: the device's response, already checked for
/// `rpc-error` by the adapter.
#[derive(Debug, Clone)]
pub struct GenericReply {
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub event_time: i64,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Ok,
    Broken,
}

#[derive(Debug, Clone)]
pub struct DialParams {
    pub host: String,
    pub port: String,
    pub user: String,
    pub pass: String,
    /// Client-advertised capability list from the `connect` request. Accepted
    /// for protocol compatibility; the underlying transport always offers
    /// base:1.0 and base:1.1 regardless of what the caller lists here.
    pub capabilities: Vec<String>,
}

#[async_trait]
pub trait NetconfDialer: Send + Sync {
    async fn dial(&self, params: DialParams) -> NetconfResult<Box<dyn NetconfSession>>;
}

#[async_trait]
pub trait NetconfSession: Send {
    async fn hello(&self) -> DeviceHello;
    async fn get(&mut self, filter: Option<String>) -> NetconfResult<String>;
    async fn get_config(&mut self, source: Datastore, filter: Option<String>) -> NetconfResult<String>;
    async fn edit_config(
        &mut self,
        target: Datastore,
        config: String,
        default_operation: Option<DefaultOperation>,
        error_option: Option<ErrorOption>,
    ) -> NetconfResult<()>;
    async fn copy_config(&mut self, target: Datastore, source: CopySource) -> NetconfResult<()>;
    async fn delete_config(&mut self, target: Datastore) -> NetconfResult<()>;
    async fn lock(&mut self, target: Datastore) -> NetconfResult<()>;
    async fn unlock(&mut self, target: Datastore) -> NetconfResult<()>;
    async fn kill_session(&mut self, session_id: u64) -> NetconfResult<()>;
    async fn get_schema(
        &mut self,
        identifier: String,
        version: Option<String>,
        format: Option<String>,
    ) -> NetconfResult<String>;
    async fn validate(&mut self, target: Datastore) -> NetconfResult<()>;
    async fn generic(&mut self, content: String) -> NetconfResult<GenericReply>;
    async fn reload_hello(&mut self) -> NetconfResult<DeviceHello>;
    async fn notification_history(
        &mut self,
        stream: Option<String>,
        from: i64,
        to: i64,
    ) -> NetconfResult<Vec<NotificationEvent>>;
    fn status(&self) -> SessionStatus;
    async fn close(&mut self);
}

pub struct SshNetconfDialer;

#[async_trait]
impl NetconfDialer for SshNetconfDialer {
    async fn dial(&self, params: DialParams) -> NetconfResult<Box<dyn NetconfSession>> {
        let addr = format!("{}:{}", params.host, params.port);
        let socket_addr = addr
            .to_socket_addrs()
            .map_err(netconf_async::error::NetconfClientError::Io)?
            .next()
            .ok_or_else(|| {
                netconf_async::error::NetconfClientError::new(format!(
                    "could not resolve {addr}"
                ))
            })?;

        let stream = TokioTcpStream::connect(socket_addr)
            .await
            .map_err(netconf_async::error::NetconfClientError::Io)?;

        let mut config = SessionConfiguration::new();
        config.set_timeout(10_000);
        let mut session = AsyncSession::new(stream, config)
            .map_err(netconf_async::error::NetconfClientError::Ssh)?;
        session
            .handshake()
            .await
            .map_err(netconf_async::error::NetconfClientError::Ssh)?;
        session
            .userauth_password(&params.user, &params.pass)
            .await
            .map_err(netconf_async::error::NetconfClientError::Ssh)?;

        let transport = SSHTransport::new_with_session(session).await?;
        let connection = Connection::new(transport).await?;

        let hello = DeviceHello {
            sid: connection.session_id().to_string(),
            version: connection.negotiated_version().to_string(),
            host: params.host,
            port: params.port,
            user: params.user,
            capabilities: connection.capabilities().to_vec(),
        };

        Ok(Box::new(SshNetconfSession {
            connection,
            hello,
            status: SessionStatus::Ok,
        }))
    }
}

pub struct SshNetconfSession {
    connection: Connection,
    hello: DeviceHello,
    status: SessionStatus,
}

impl SshNetconfSession {
    /// Marks the session broken on any transport-level I/O failure; protocol
    /// errors (`rpc-error`) leave the session usable.
    fn note_result<T>(&mut self, result: &NetconfResult<T>) {
        if let Err(netconf_async::error::NetconfClientError::Io(_))
        | Err(netconf_async::error::NetconfClientError::Ssh(_)) = result
        {
            self.status = SessionStatus::Broken;
        }
    }
}

#[async_trait]
impl NetconfSession for SshNetconfSession {
    async fn hello(&self) -> DeviceHello {
        self.hello.clone()
    }

    async fn get(&mut self, filter: Option<String>) -> NetconfResult<String> {
        let filter = filter.map(|f| nc::Filter::subtree(&f));
        let result = self
            .connection
            .get(filter, Some(nc::WithDefaultsValue::ReportAll))
            .await;
        self.note_result(&result);
        result
    }

    async fn get_config(
        &mut self,
        source: Datastore,
        filter: Option<String>,
    ) -> NetconfResult<String> {
        let filter = filter.map(|f| nc::Filter::subtree(&f));
        let result = self
            .connection
            .get_config(source.into(), filter, Some(nc::WithDefaultsValue::ReportAll))
            .await;
        self.note_result(&result);
        result
    }

    async fn edit_config(
        &mut self,
        target: Datastore,
        config: String,
        default_operation: Option<DefaultOperation>,
        error_option: Option<ErrorOption>,
    ) -> NetconfResult<()> {
        let result = self
            .connection
            .edit_config(
                target.into(),
                config,
                default_operation.map(Into::into),
                error_option.map(Into::into),
            )
            .await;
        self.note_result(&result);
        result.map(|_| ())
    }

    async fn copy_config(&mut self, target: Datastore, source: CopySource) -> NetconfResult<()> {
        let source = match source {
            CopySource::Datastore(d) => nc::CopyConfigSource::Datastore(d.into()),
            CopySource::Config(xml) => nc::CopyConfigSource::Config(xml),
        };
        let result = self.connection.copy_config(target.into(), source).await;
        self.note_result(&result);
        result.map(|_| ())
    }

    async fn delete_config(&mut self, target: Datastore) -> NetconfResult<()> {
        let result = self.connection.delete_config(target.into()).await;
        self.note_result(&result);
        result.map(|_| ())
    }

    async fn lock(&mut self, target: Datastore) -> NetconfResult<()> {
        let result = self.connection.lock(target.into()).await;
        self.note_result(&result);
        result.map(|_| ())
    }

    async fn unlock(&mut self, target: Datastore) -> NetconfResult<()> {
        let result = self.connection.unlock(target.into()).await;
        self.note_result(&result);
        result.map(|_| ())
    }

    async fn kill_session(&mut self, session_id: u64) -> NetconfResult<()> {
        let result = self.connection.kill_session(session_id).await;
        self.note_result(&result);
        result.map(|_| ())
    }

    async fn get_schema(
        &mut self,
        identifier: String,
        version: Option<String>,
        format: Option<String>,
    ) -> NetconfResult<String> {
        let result = self
            .connection
            .get_schema(identifier, version, format)
            .await;
        self.note_result(&result);
        result
    }

    async fn validate(&mut self, target: Datastore) -> NetconfResult<()> {
        let result = self.connection.validate(target.into()).await;
        self.note_result(&result);
        result.map(|_| ())
    }

    async fn generic(&mut self, content: String) -> NetconfResult<GenericReply> {
        let result = self.connection.generic(&content).await;
        self.note_result(&result);
        result.map(|raw| GenericReply { raw })
    }

    async fn reload_hello(&mut self) -> NetconfResult<DeviceHello> {
        // The side channel is its own NETCONF session with its own
        // device-assigned session id; only its version/capabilities refresh
        // the cached hello. `sid` stays the primary session's own id, which
        // is what the front-end's SessionKey was derived from.
        let side = self.connection.open_side_channel().await?;
        self.hello = DeviceHello {
            sid: self.connection.session_id().to_string(),
            version: side.negotiated_version().to_string(),
            host: self.hello.host.clone(),
            port: self.hello.port.clone(),
            user: self.hello.user.clone(),
            capabilities: side.capabilities().to_vec(),
        };
        Ok(self.hello.clone())
    }

    async fn notification_history(
        &mut self,
        stream: Option<String>,
        from: i64,
        to: i64,
    ) -> NetconfResult<Vec<NotificationEvent>> {
        let mut side = self.connection.open_side_channel().await?;
        let events = side
            .notification_history(stream.as_deref(), from, to)
            .await?;
        Ok(events
            .into_iter()
            .map(|e| NotificationEvent {
                event_time: e.event_time,
                content: e.content,
            })
            .collect())
    }

    fn status(&self) -> SessionStatus {
        self.status
    }

    async fn close(&mut self) {
        let _ = self.connection.close_session().await;
    }
}
