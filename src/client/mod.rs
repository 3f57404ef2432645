//! MCP client for the local automation server.
//!
//! One HTTP POST per call, JSON-RPC envelope in, JSON-RPC envelope out. The
//! session id handed out by `initialize` travels in the `Mcp-Session-Id`
//! header on every later request. There is no retry and no backoff: a call
//! either succeeds within the configured timeout or fails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn, Instrument};
use url::Url;

use crate::error::{Error, Result};
use crate::shared::http_constants::{
    ACCEPT, ACCEPT_STREAMABLE, MCP_PROTOCOL_VERSION, MCP_SESSION_ID, TEXT_EVENT_STREAM,
};
use crate::shared::logging::probe_span;
use crate::shared::sse_parser;
use crate::types::{
    CallToolRequest, CallToolResult, ClientCapabilities, Implementation, InitializeRequest,
    InitializeResult, JSONRPCRequest, JSONRPCResponse, ListToolsResult, RequestId,
};

pub mod feeds;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct McpConfig {
    /// Endpoint of the automation server, e.g. `http://localhost:18060/mcp`
    pub url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// Name/version announced in `clientInfo`
    pub client_info: Implementation,
    /// Protocol version announced in `initialize`
    pub protocol_version: String,
}

impl McpConfig {
    /// Configuration for `url` with default timeout and client info.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            timeout: Duration::from_millis(crate::DEFAULT_REQUEST_TIMEOUT_MS),
            client_info: Implementation::default(),
            protocol_version: crate::LATEST_PROTOCOL_VERSION.to_string(),
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the announced client name.
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_info.name = name.into();
        self
    }
}

/// MCP client.
///
/// # Examples
///
/// ```rust,no_run
/// use dataprobe::client::{McpClient, McpConfig};
/// use serde_json::json;
///
/// # async fn example() -> dataprobe::Result<()> {
/// let config = McpConfig::new("http://localhost:18060/mcp".parse()?);
/// let mut client = McpClient::new(config)?;
/// client.initialize().await?;
///
/// if let Some(feeds) = client.try_call_tool_json("search_feeds", json!({"keyword": "ootd"})).await {
///     println!("{feeds}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct McpClient {
    config: McpConfig,
    http: reqwest::Client,
    session_id: Option<String>,
    server: Option<InitializeResult>,
    next_id: AtomicU64,
}

impl McpClient {
    /// Create a client. No request is sent until [`Self::initialize`] or a
    /// tool call.
    pub fn new(config: McpConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            http,
            session_id: None,
            server: None,
            next_id: AtomicU64::new(1),
        })
    }

    /// Create a client that reuses an existing session id.
    pub fn with_session(config: McpConfig, session_id: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.session_id = Some(session_id.into());
        Ok(client)
    }

    /// Session id assigned by the server, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Server handshake result, once initialized.
    pub fn server(&self) -> Option<&InitializeResult> {
        self.server.as_ref()
    }

    /// Endpoint this client talks to.
    pub fn url(&self) -> &Url {
        &self.config.url
    }

    /// Open a session.
    ///
    /// A server that does not hand out a session id is treated as stateless;
    /// later calls simply go without the header.
    pub async fn initialize(&mut self) -> Result<&InitializeResult> {
        let params = self.initialize_params();
        let (response, headers) = self.post("initialize", Some(params)).await?;

        self.session_id = headers
            .get(MCP_SESSION_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        match &self.session_id {
            Some(id) => info!(session_id = %id, "MCP session opened"),
            None => warn!("server did not return an Mcp-Session-Id header"),
        }

        let result = response.into_result()?;
        let server: InitializeResult = serde_json::from_value(result).unwrap_or_else(|e| {
            debug!("unrecognised initialize result: {}", e);
            InitializeResult::default()
        });

        self.notify_initialized().await;
        Ok(&*self.server.insert(server))
    }

    /// Health check: true when the server answers `initialize` with 200.
    pub async fn ping(&self) -> bool {
        let request = JSONRPCRequest::new(
            self.next_request_id(),
            "initialize",
            Some(self.initialize_params()),
        );
        let sent = self
            .http
            .post(self.config.url.clone())
            .header(ACCEPT, ACCEPT_STREAMABLE)
            .json(&request)
            .send()
            .await;
        match sent {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("ping failed: {}", e);
                false
            },
        }
    }

    /// List the tools the server exposes.
    pub async fn list_tools(&self) -> Result<ListToolsResult> {
        let (response, _) = self.post::<Value>("tools/list", None).await?;
        Ok(serde_json::from_value(response.into_result()?)?)
    }

    /// Call a named tool.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let span = probe_span("tool", name);
        async {
            let params = CallToolRequest {
                name: name.to_string(),
                arguments,
            };
            let (response, _) = self.post("tools/call", Some(params)).await?;
            let result: CallToolResult = serde_json::from_value(response.into_result()?)?;
            debug!(is_error = result.is_error, "tool call returned");
            Ok::<_, Error>(result)
        }
        .instrument(span)
        .await
    }

    /// Call a tool and decode the JSON document embedded in its content.
    pub async fn call_tool_json(&self, name: &str, arguments: Value) -> Result<Value> {
        self.call_tool(name, arguments).await?.payload()
    }

    /// Call a tool, logging any failure and returning `None` instead.
    ///
    /// HTTP errors, JSON-RPC `error` members, transport failures and
    /// undecodable content all end up here as a warning.
    pub async fn try_call_tool_json(&self, name: &str, arguments: Value) -> Option<Value> {
        match self.call_tool_json(name, arguments).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(tool = name, "tool call failed: {}", e);
                None
            },
        }
    }

    fn initialize_params(&self) -> InitializeRequest {
        InitializeRequest {
            protocol_version: self.config.protocol_version.clone(),
            capabilities: ClientCapabilities::default(),
            client_info: self.config.client_info.clone(),
        }
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::from(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn notify_initialized(&self) {
        let notification = serde_json::json!({
            "jsonrpc": crate::types::JSONRPC_VERSION,
            "method": "notifications/initialized",
        });
        let request = self.request_builder().json(&notification);
        if let Err(e) = request.send().await {
            debug!("initialized notification not delivered: {}", e);
        }
    }

    fn request_builder(&self) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .post(self.config.url.clone())
            .header(ACCEPT, ACCEPT_STREAMABLE);
        if let Some(session_id) = &self.session_id {
            builder = builder
                .header(MCP_SESSION_ID, session_id)
                .header(MCP_PROTOCOL_VERSION, &self.config.protocol_version);
        }
        builder
    }

    async fn post<P: Serialize>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<(JSONRPCResponse, HeaderMap)> {
        let id = self.next_request_id();
        let request = JSONRPCRequest::new(id.clone(), method, params);
        debug!(%id, method, "sending request");

        let response = self
            .request_builder()
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, self.config.timeout))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, self.config.timeout))?;

        if status != StatusCode::OK {
            return Err(Error::status(status.as_u16(), body));
        }

        let is_sse = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains(TEXT_EVENT_STREAM));

        let message = if is_sse {
            decode_sse_response(&body, &id)?
        } else {
            serde_json::from_str(&body).map_err(|e| {
                Error::Transport(crate::error::TransportError::Deserialization(e.to_string()))
            })?
        };
        Ok((message, headers))
    }
}

/// Pick the JSON-RPC response out of an SSE body.
///
/// Prefers the message whose id matches the request; falls back to the first
/// message that looks like a response.
fn decode_sse_response(body: &str, id: &RequestId) -> Result<JSONRPCResponse> {
    let responses: Vec<JSONRPCResponse> = sse_parser::parse_events(body)
        .into_iter()
        .filter(sse_parser::SseEvent::is_message)
        .filter_map(|event| serde_json::from_str::<JSONRPCResponse>(&event.data).ok())
        .filter(|message| message.result.is_some() || message.error.is_some())
        .collect();

    let position = responses
        .iter()
        .position(|message| message.id.as_ref() == Some(id))
        .unwrap_or(0);
    responses
        .into_iter()
        .nth(position)
        .ok_or_else(|| Error::parse("event stream carried no JSON-RPC response"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sse_response_matches_request_id() {
        let body = concat!(
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n\n",
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"content\":\"[]\"}}\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"content\":\"{}\"}}\n\n",
        );
        let response = decode_sse_response(body, &RequestId::from(2i64)).unwrap();
        assert_eq!(response.result, Some(json!({"content": "{}"})));
    }

    #[test]
    fn sse_without_response_is_an_error() {
        let body = "event: endpoint\ndata: /mcp?session=1\n\n";
        assert!(decode_sse_response(body, &RequestId::from(1i64)).is_err());
    }

    #[test]
    fn request_ids_increase() {
        let client = McpClient::new(McpConfig::new("http://localhost:1/mcp".parse().unwrap())).unwrap();
        assert_eq!(client.next_request_id(), RequestId::from(1i64));
        assert_eq!(client.next_request_id(), RequestId::from(2i64));
    }

    #[test]
    fn config_builders() {
        let config = McpConfig::new("http://localhost:18060/mcp".parse().unwrap())
            .with_timeout(Duration::from_secs(10))
            .with_client_name("trend-analyzer");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.client_info.name, "trend-analyzer");
        assert_eq!(config.protocol_version, "2025-06-18");
    }
}
