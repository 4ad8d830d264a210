//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC 2.0 calls to the command handlers. A
//! `subscribe_events` call turns the connection into a one-way stream of
//! event notifications.
//!
//! Callers name themselves with a `caller` parameter and nothing checks the
//! claim. The weight-source allow-list and the admin check therefore hold
//! only against callers that do not know an authorized account id. This is
//! not authentication: keep the socket local and restrict who can open it
//! with file permissions.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use accrual_engine::AccrualError;

use crate::commands;
use crate::events::EventFilter;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    #[serde(default)]
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RpcError {
    /// Stable numeric code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, detail: Option<String>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: detail.map(|d| serde_json::json!({"detail": d})),
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(-32602, "INVALID_PARAMS", Some(detail.to_string()))
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(-32603, "INTERNAL_ERROR", Some(detail.to_string()))
    }

    // Accrual errors

    /// Caller lacks the required role (-32010).
    pub fn unauthorized(detail: String) -> Self {
        Self::new(-32010, "UNAUTHORIZED", Some(detail))
    }

    /// Checked arithmetic failed (-32020).
    pub fn arithmetic(detail: String) -> Self {
        Self::new(-32020, "ARITHMETIC_FAULT", Some(detail))
    }

    /// A token transfer was rejected (-32030).
    pub fn transfer_failed(detail: String) -> Self {
        Self::new(-32030, "TRANSFER_FAILED", Some(detail))
    }

    /// Engine bookkeeping is inconsistent (-32040).
    pub fn invariant_violation(detail: String) -> Self {
        Self::new(-32040, "INVARIANT_VIOLATION", Some(detail))
    }

    /// Engine wiring is inconsistent (-32050).
    pub fn misconfigured(detail: String) -> Self {
        Self::new(-32050, "MISCONFIGURED", Some(detail))
    }
}

impl From<AccrualError> for RpcError {
    fn from(err: AccrualError) -> Self {
        let detail = err.to_string();
        match err {
            AccrualError::Unauthorized { .. } => Self::unauthorized(detail),
            AccrualError::Arithmetic(_) => Self::arithmetic(detail),
            AccrualError::TransferFailed(_) => Self::transfer_failed(detail),
            AccrualError::InvariantViolation(_) => Self::invariant_violation(detail),
            AccrualError::Misconfigured(_) => Self::misconfigured(detail),
        }
    }
}

impl From<accrual_db::DbError> for RpcError {
    fn from(err: accrual_db::DbError) -> Self {
        Self::internal_error(&format!("db error: {err}"))
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

async fn write_json<W: AsyncWrite + Unpin, T: Serialize>(
    writer: &mut W,
    value: &T,
) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }

        let request = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => request,
            Err(_) => {
                let response =
                    RpcResponse::error(serde_json::Value::Null, RpcError::parse_error());
                write_json(&mut writer, &response).await?;
                continue;
            }
        };

        if request.method == "subscribe_events" {
            let filter: EventFilter = match serde_json::from_value(request.params.clone()) {
                Ok(f) => f,
                Err(_) if request.params.is_null() => EventFilter::default(),
                Err(e) => {
                    let response = RpcResponse::error(
                        request.id,
                        RpcError::invalid_params(&e.to_string()),
                    );
                    write_json(&mut writer, &response).await?;
                    continue;
                }
            };
            let mut rx = state.event_bus.subscribe();
            let ack = RpcResponse::success(
                request.id,
                serde_json::json!({"subscribed": true, "sequence": state.event_bus.sequence()}),
            );
            write_json(&mut writer, &ack).await?;

            // The connection only carries notifications from here on; further
            // input is discarded and EOF ends the subscription.
            let mut discard = [0u8; 256];
            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Ok(event) if filter.matches(&event) => {
                            let notification = serde_json::json!({
                                "jsonrpc": "2.0",
                                "method": "event",
                                "params": event,
                            });
                            write_json(&mut writer, &notification).await?;
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event subscriber lagging");
                        }
                        Err(RecvError::Closed) => return Ok(()),
                    },
                    read = reader.read(&mut discard) => {
                        if read? == 0 {
                            return Ok(());
                        }
                    }
                }
            }
        }

        let response = dispatch_request(state.clone(), request).await;
        write_json(&mut writer, &response).await?;
    }

    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();

    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }

    debug!(method, "dispatching RPC");

    let params = &request.params;
    let result = match method {
        // Accrual
        "set_weight" => commands::accrual::set_weight(&state, params).await,
        "claim" => commands::accrual::claim(&state, params).await,
        "update_pool" => commands::accrual::update_pool(&state, params).await,
        "pending_reward" => commands::accrual::pending_reward(&state, params).await,
        "reward_rate" => commands::accrual::reward_rate(&state).await,
        "get_global_state" => commands::accrual::get_global_state(&state).await,
        "get_participant" => commands::accrual::get_participant(&state, params).await,
        "get_vault_balance" => commands::accrual::get_vault_balance(&state).await,

        // Administration
        "grant_weight_source" => commands::admin::grant_weight_source(&state, params).await,
        "revoke_weight_source" => commands::admin::revoke_weight_source(&state, params).await,
        "get_weight_sources" => commands::admin::get_weight_sources(&state).await,
        "fund_source" => commands::admin::fund_source(&state, params).await,
        "set_source_rate" => commands::admin::set_source_rate(&state, params).await,

        // Diagnostics
        "current_block" => commands::diagnostics::current_block(&state).await,
        "get_notifications" => commands::diagnostics::get_notifications(&state, params).await,
        "export_diagnostics" => commands::diagnostics::export_diagnostics(&state).await,
        "shutdown" => commands::diagnostics::shutdown(&state).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
