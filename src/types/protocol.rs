//! MCP payloads used by the client.
//!
//! Only the handshake, `tools/list` and `tools/call` shapes are modelled.
//! Servers disagree on how tool output is carried: some put a JSON document
//! straight into `result.content` as a string, others follow the MCP content
//! array (`[{"type": "text", "text": "..."}]`). [`ToolContent`] accepts both.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, ErrorCode, Result};

/// Implementation information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    /// Implementation name
    pub name: String,
    /// Implementation version
    pub version: String,
}

impl Default for Implementation {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Capabilities announced during `initialize`.
///
/// The automation server only looks at the keys, so every capability is an
/// empty object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Tool calling
    pub tools: Value,
    /// Log forwarding
    pub logging: Value,
    /// Resource access
    pub resources: Value,
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        let empty = || Value::Object(serde_json::Map::new());
        Self {
            tools: empty(),
            logging: empty(),
            resources: empty(),
        }
    }
}

/// Initialize request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    /// Protocol version the client wants to use
    pub protocol_version: String,
    /// Client capabilities
    pub capabilities: ClientCapabilities,
    /// Client implementation info
    pub client_info: Implementation,
}

/// Initialize response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Negotiated protocol version
    #[serde(default)]
    pub protocol_version: String,
    /// Server capabilities, kept raw
    #[serde(default)]
    pub capabilities: Value,
    /// Server implementation info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<Implementation>,
    /// Optional instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// `tools/call` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolRequest {
    /// Tool name
    pub name: String,
    /// Tool arguments
    pub arguments: Value,
}

/// Tool description from `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Tool name
    pub name: String,
    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the arguments
    #[serde(default)]
    pub input_schema: Value,
}

/// `tools/list` result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    /// Available tools
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
    /// Cursor for the next page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Content item in tool results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Content {
    /// Text content
    Text {
        /// The text content
        text: String,
    },
    /// Image content
    #[serde(rename_all = "camelCase")]
    Image {
        /// Base64-encoded image data
        data: String,
        /// MIME type
        mime_type: String,
    },
    /// Any other content kind
    #[serde(other)]
    Unsupported,
}

/// The `content` member of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolContent {
    /// A JSON document serialized into a string
    Embedded(String),
    /// MCP content array
    Items(Vec<Content>),
}

/// `tools/call` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Tool output
    #[serde(default)]
    pub content: Option<ToolContent>,
    /// Whether the tool call represents an error
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// All text fragments of the result, in order.
    pub fn texts(&self) -> Vec<&str> {
        match &self.content {
            Some(ToolContent::Embedded(text)) => vec![text.as_str()],
            Some(ToolContent::Items(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Content::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Decode the JSON document carried by the result.
    ///
    /// An embedded string must parse as JSON. For content arrays the first
    /// text item that parses wins; when none does, the first text is returned
    /// as a JSON string so plain-text tools remain usable.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dataprobe::types::CallToolResult;
    /// use serde_json::json;
    ///
    /// let result: CallToolResult = serde_json::from_value(json!({
    ///     "content": "[{\"title\": \"hello\"}]"
    /// })).unwrap();
    /// assert_eq!(result.payload().unwrap(), json!([{"title": "hello"}]));
    ///
    /// let result: CallToolResult = serde_json::from_value(json!({
    ///     "content": [{"type": "text", "text": "{\"feeds\": []}"}]
    /// })).unwrap();
    /// assert_eq!(result.payload().unwrap(), json!({"feeds": []}));
    /// ```
    pub fn payload(&self) -> Result<Value> {
        if self.is_error {
            return Err(Error::protocol(ErrorCode::TOOL_ERROR, self.texts().join("\n")));
        }
        match &self.content {
            None => Err(Error::parse("tool result has no content")),
            Some(ToolContent::Embedded(text)) => serde_json::from_str(text)
                .map_err(|e| Error::parse(format!("embedded tool content is not JSON: {e}"))),
            Some(ToolContent::Items(_)) => {
                let texts = self.texts();
                if let Some(value) = texts
                    .iter()
                    .find_map(|text| serde_json::from_str::<Value>(text).ok())
                {
                    return Ok(value);
                }
                texts
                    .first()
                    .map(|text| Value::String((*text).to_string()))
                    .ok_or_else(|| Error::parse("tool result has no text content"))
            },
        }
    }
}
