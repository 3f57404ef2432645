//! Constants for HTTP headers and content types used by the probes.

// Header Names
/// MCP session ID header name. Header lookups are case-insensitive, the
/// automation server spells it `Mcp-Session-Id`.
pub const MCP_SESSION_ID: &str = "mcp-session-id";

/// MCP protocol version header name
pub const MCP_PROTOCOL_VERSION: &str = "mcp-protocol-version";

/// HTTP Accept header name
pub const ACCEPT: &str = "Accept";

/// HTTP Referer header name, required by some quote endpoints
pub const REFERER: &str = "Referer";

// Content Types
/// Server-Sent Events content type value
pub const TEXT_EVENT_STREAM: &str = "text/event-stream";

/// Accept header value for streamable HTTP (both JSON and SSE)
pub const ACCEPT_STREAMABLE: &str = "application/json, text/event-stream";

/// Browser-like user agent for public quote endpoints
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko)";
