//! Shared plumbing used by the MCP client and the quote providers.

pub mod http_constants;
pub mod logging;
pub mod sse_parser;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use sse_parser::{SseEvent, SseParser};
