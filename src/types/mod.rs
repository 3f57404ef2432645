//! Wire types for the MCP automation server.

pub mod jsonrpc;
pub mod protocol;

pub use jsonrpc::{JSONRPCError, JSONRPCRequest, JSONRPCResponse, RequestId, JSONRPC_VERSION};
pub use protocol::{
    CallToolRequest, CallToolResult, ClientCapabilities, Content, Implementation,
    InitializeRequest, InitializeResult, ListToolsResult, ToolContent, ToolInfo,
};
