//! JSON request parsing, opcode routing, and reply marshaling (§4.4).

use crate::error::DaemonError;
use crate::netconf_client::{
    CopySource, DefaultOperation, Datastore, DialParams, ErrorOption, NetconfDialer, SessionStatus,
};
use crate::registry::Registry;
use crate::session::{make_session_key, DeviceHello, SessionRecord};
use netconf_async::error::NetconfClientError;
use serde_json::{json, Value};
use std::sync::Arc;

pub const REPLY_OK: i64 = 0;
pub const REPLY_DATA: i64 = 1;
pub const REPLY_ERROR: i64 = 2;

/// One well-formed request. Unparseable JSON never reaches this type — the
/// connection handler closes the connection instead (§7 class 2).
pub type Reply = Value;

pub async fn dispatch(
    registry: &Arc<Registry>,
    dialer: &Arc<dyn NetconfDialer>,
    request: &Value,
) -> Reply {
    match dispatch_inner(registry, dialer, request).await {
        Ok(reply) => reply,
        Err(reply) => reply,
    }
}

async fn dispatch_inner(
    registry: &Arc<Registry>,
    dialer: &Arc<dyn NetconfDialer>,
    request: &Value,
) -> Result<Reply, Reply> {
    let opcode = request
        .get("type")
        .and_then(Value::as_i64)
        .ok_or_else(|| error_reply(&DaemonError::BadRequest("missing type".into())))?;

    if opcode == 1 {
        return connect(dialer, registry, request).await;
    }

    let key = request
        .get("session")
        .and_then(Value::as_str)
        .ok_or_else(|| error_reply(&DaemonError::MissingSession))?
        .to_string();

    match opcode {
        2 => disconnect(registry, &key).await,
        3 => get(registry, &key, request).await,
        4 => get_config(registry, &key, request).await,
        5 => edit_config(registry, &key, request).await,
        6 => copy_config(registry, &key, request).await,
        7 => delete_config(registry, &key, request).await,
        8 => lock(registry, &key, request).await,
        9 => unlock(registry, &key, request).await,
        10 => kill(registry, &key, request).await,
        11 => info(registry, &key).await,
        12 => generic(registry, &key, request).await,
        13 => get_schema(registry, &key, request).await,
        14 => reload_hello(registry, &key).await,
        15 => notification_history(registry, &key, request).await,
        16 => validate(registry, &key, request).await,
        other => Err(error_reply(&DaemonError::UnknownOpcode(other))),
    }
}

async fn connect(
    dialer: &Arc<dyn NetconfDialer>,
    registry: &Arc<Registry>,
    request: &Value,
) -> Result<Reply, Reply> {
    let host = required_str(request, "host")?;
    let user = required_str(request, "user")?;
    let port = request
        .get("port")
        .and_then(Value::as_str)
        .unwrap_or("830")
        .to_string();
    let pass = request
        .get("pass")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let capabilities = request
        .get("capabilities")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let session = dialer
        .dial(DialParams {
            host: host.clone(),
            port: port.clone(),
            user: user.clone(),
            pass,
            capabilities,
        })
        .await
        .map_err(|err| error_reply(&DaemonError::Netconf(err)))?;

    let hello = session.hello().await;
    let device_session_id: u64 = hello.sid.parse().unwrap_or(0);
    let key = make_session_key(&host, &port, device_session_id);

    let record = Arc::new(SessionRecord::new(session, hello));
    registry.insert(key.clone(), record).await;

    Ok(json!({ "type": REPLY_OK, "session": key }))
}

async fn disconnect(registry: &Arc<Registry>, key: &str) -> Result<Reply, Reply> {
    let record = registry
        .remove(key)
        .await
        .ok_or_else(|| error_reply(&DaemonError::UnknownSession))?;
    record.mark_closed();
    let mut session = record.netconf_session.lock().await;
    session.close().await;
    Ok(ok_reply())
}

async fn lookup_open(registry: &Arc<Registry>, key: &str) -> Result<Arc<SessionRecord>, Reply> {
    let record = registry
        .lookup(key)
        .await
        .ok_or_else(|| error_reply(&DaemonError::UnknownSession))?;
    if record.is_closed() {
        return Err(error_reply(&DaemonError::UnknownSession));
    }
    Ok(record)
}

/// Runs `op` under the record's exclusive lock, refreshing `last_activity`
/// on success and evicting the record from the registry if the adapter
/// reports the transport broken (§4.4 rule 4).
async fn with_session<F, Fut, T>(
    registry: &Arc<Registry>,
    key: &str,
    op: F,
) -> Result<T, Reply>
where
    F: FnOnce(Arc<SessionRecord>) -> Fut,
    Fut: std::future::Future<Output = (Result<T, NetconfClientError>, Arc<SessionRecord>)>,
{
    let record = lookup_open(registry, key).await?;
    let (result, record) = op(record.clone()).await;
    match result {
        Ok(value) => {
            record.touch().await;
            Ok(value)
        }
        Err(err) => {
            let broken = {
                let session = record.netconf_session.lock().await;
                session.status() == SessionStatus::Broken
            };
            if broken {
                if registry.remove(key).await.is_some() {
                    record.mark_closed();
                }
            }
            Err(error_reply(&DaemonError::Netconf(err)))
        }
    }
}

async fn get(registry: &Arc<Registry>, key: &str, request: &Value) -> Result<Reply, Reply> {
    let filter = request
        .get("filter")
        .and_then(Value::as_str)
        .map(str::to_string);
    let data = with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session.get(filter).await;
        drop(session);
        (result, record)
    })
    .await?;
    Ok(data_reply(data))
}

async fn get_config(registry: &Arc<Registry>, key: &str, request: &Value) -> Result<Reply, Reply> {
    let source = parse_datastore(request, "source")?;
    let filter = request
        .get("filter")
        .and_then(Value::as_str)
        .map(str::to_string);
    let data = with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session.get_config(source, filter).await;
        drop(session);
        (result, record)
    })
    .await?;
    Ok(data_reply(data))
}

async fn edit_config(registry: &Arc<Registry>, key: &str, request: &Value) -> Result<Reply, Reply> {
    let target = parse_datastore(request, "target")?;
    let config = required_str(request, "config")?;
    let default_operation = match request.get("default-operation").and_then(Value::as_str) {
        Some(token) => Some(
            DefaultOperation::parse(token).map_err(|err| error_reply(&err))?,
        ),
        None => None,
    };
    let error_option = match request.get("error-option").and_then(Value::as_str) {
        Some(token) => Some(ErrorOption::parse(token).map_err(|err| error_reply(&err))?),
        None => None,
    };
    with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session
            .edit_config(target, config, default_operation, error_option)
            .await;
        drop(session);
        (result, record)
    })
    .await?;
    Ok(ok_reply())
}

async fn copy_config(registry: &Arc<Registry>, key: &str, request: &Value) -> Result<Reply, Reply> {
    let target = parse_datastore(request, "target")?;
    let source = request.get("source").and_then(Value::as_str);
    let config = request.get("config").and_then(Value::as_str);
    let source = match (source, config) {
        (Some(_), Some(_)) => {
            return Err(error_reply(&DaemonError::BadRequest(
                "copy-config: exactly one of source or config must be set".into(),
            )))
        }
        (Some(token), None) => {
            CopySource::Datastore(Datastore::parse(token, request.get("url").and_then(Value::as_str))
                .map_err(|err| error_reply(&err))?)
        }
        (None, Some(xml)) => CopySource::Config(xml.to_string()),
        (None, None) => {
            return Err(error_reply(&DaemonError::BadRequest(
                "copy-config: one of source or config is required".into(),
            )))
        }
    };
    with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session.copy_config(target, source).await;
        drop(session);
        (result, record)
    })
    .await?;
    Ok(ok_reply())
}

async fn delete_config(registry: &Arc<Registry>, key: &str, request: &Value) -> Result<Reply, Reply> {
    let target = parse_datastore(request, "target")?;
    with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session.delete_config(target).await;
        drop(session);
        (result, record)
    })
    .await?;
    Ok(ok_reply())
}

async fn lock(registry: &Arc<Registry>, key: &str, request: &Value) -> Result<Reply, Reply> {
    let target = parse_datastore(request, "target")?;
    with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session.lock(target).await;
        drop(session);
        (result, record)
    })
    .await?;
    Ok(ok_reply())
}

async fn unlock(registry: &Arc<Registry>, key: &str, request: &Value) -> Result<Reply, Reply> {
    let target = parse_datastore(request, "target")?;
    with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session.unlock(target).await;
        drop(session);
        (result, record)
    })
    .await?;
    Ok(ok_reply())
}

async fn kill(registry: &Arc<Registry>, key: &str, request: &Value) -> Result<Reply, Reply> {
    let session_id = request
        .get("session-id")
        .and_then(Value::as_u64)
        .ok_or_else(|| error_reply(&DaemonError::BadRequest("missing session-id".into())))?;
    with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session.kill_session(session_id).await;
        drop(session);
        (result, record)
    })
    .await?;
    Ok(ok_reply())
}

async fn info(registry: &Arc<Registry>, key: &str) -> Result<Reply, Reply> {
    let record = lookup_open(registry, key).await?;
    let hello = record.hello.lock().await.clone();
    Ok(hello_reply(&hello))
}

async fn generic(registry: &Arc<Registry>, key: &str, request: &Value) -> Result<Reply, Reply> {
    let content = required_str(request, "content")?;
    let reply = with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session.generic(content).await;
        drop(session);
        (result, record)
    })
    .await?;
    if reply.raw.trim().is_empty() {
        Ok(ok_reply())
    } else {
        Ok(data_reply(reply.raw))
    }
}

async fn get_schema(registry: &Arc<Registry>, key: &str, request: &Value) -> Result<Reply, Reply> {
    let identifier = required_str(request, "identifier")?;
    let version = request
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string);
    let format = request
        .get("format")
        .and_then(Value::as_str)
        .map(str::to_string);
    let data = with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session.get_schema(identifier, version, format).await;
        drop(session);
        (result, record)
    })
    .await?;
    Ok(data_reply(data))
}

async fn reload_hello(registry: &Arc<Registry>, key: &str) -> Result<Reply, Reply> {
    let record = lookup_open(registry, key).await?;
    let hello = {
        let mut session = record.netconf_session.lock().await;
        session
            .reload_hello()
            .await
            .map_err(|err| error_reply(&DaemonError::Netconf(err)))?
    };
    *record.hello.lock().await = hello.clone();
    record.touch().await;
    Ok(hello_reply(&hello))
}

async fn notification_history(
    registry: &Arc<Registry>,
    key: &str,
    request: &Value,
) -> Result<Reply, Reply> {
    let from = request
        .get("from")
        .and_then(Value::as_i64)
        .ok_or_else(|| error_reply(&DaemonError::BadRequest("missing from".into())))?;
    let to = request
        .get("to")
        .and_then(Value::as_i64)
        .ok_or_else(|| error_reply(&DaemonError::BadRequest("missing to".into())))?;
    let stream = request
        .get("stream")
        .and_then(Value::as_str)
        .map(str::to_string);

    let events = with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session.notification_history(stream, from, to).await;
        drop(session);
        (result, record)
    })
    .await?;

    let notifications: Vec<Value> = events
        .into_iter()
        .map(|event| json!({ "eventtime": event.event_time, "content": event.content }))
        .collect();
    Ok(json!({ "notifications": notifications }))
}

async fn validate(registry: &Arc<Registry>, key: &str, request: &Value) -> Result<Reply, Reply> {
    let target = parse_datastore(request, "target")?;
    with_session(registry, key, |record| async move {
        let mut session = record.netconf_session.lock().await;
        let result = session.validate(target).await;
        drop(session);
        (result, record)
    })
    .await?;
    Ok(ok_reply())
}

fn required_str(request: &Value, field: &str) -> Result<String, Reply> {
    request
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| error_reply(&DaemonError::BadRequest(format!("missing {field}"))))
}

fn parse_datastore(request: &Value, field: &str) -> Result<Datastore, Reply> {
    let token = required_str(request, field)?;
    let url = request.get("url").and_then(Value::as_str);
    Datastore::parse(&token, url).map_err(|err| error_reply(&err))
}

fn ok_reply() -> Reply {
    json!({ "type": REPLY_OK })
}

fn data_reply(data: String) -> Reply {
    json!({ "type": REPLY_DATA, "data": data })
}

fn hello_reply(hello: &DeviceHello) -> Reply {
    json!({
        "sid": hello.sid,
        "version": hello.version,
        "host": hello.host,
        "port": hello.port,
        "user": hello.user,
        "capabilities": hello.capabilities,
    })
}

/// Builds the `REPLY_ERROR` envelope, including any RFC 6241 structured
/// fields the adapter surfaced on a `rpc-error` (§6).
fn error_reply(err: &DaemonError) -> Reply {
    log::warn!("request failed: {err}");
    let mut reply = json!({ "type": REPLY_ERROR, "error-message": err.to_string() });
    if let DaemonError::Netconf(NetconfClientError::Netconf(rpc_reply)) = err {
        if let Some(e) = rpc_reply.first_error() {
            let obj = reply.as_object_mut().unwrap();
            obj.insert("error-type".into(), json!(e.error_type()));
            obj.insert("error-tag".into(), json!(e.tag()));
            obj.insert("error-severity".into(), json!(e.severity()));
            if let Some(app_tag) = e.app_tag() {
                obj.insert("error-app-tag".into(), json!(app_tag));
            }
            if let Some(path) = e.path() {
                obj.insert("error-path".into(), json!(path));
            }
            if let Some(message) = e.message() {
                obj.insert("error-message".into(), json!(message));
            }
            if let Some(bad_attribute) = e.bad_attribute() {
                obj.insert("bad-attribute".into(), json!(bad_attribute));
            }
            if let Some(bad_element) = e.bad_element() {
                obj.insert("bad-element".into(), json!(bad_element));
            }
            if let Some(bad_namespace) = e.bad_namespace() {
                obj.insert("bad-namespace".into(), json!(bad_namespace));
            }
            if let Some(session_id) = e.session_id() {
                obj.insert("session-id".into(), json!(session_id));
            }
        }
    }
    reply
}
