//! # dataprobe
//!
//! Small data probes behind one CLI:
//!
//! - **Feeds**: call tools on a local MCP automation server over HTTP
//!   (JSON-RPC envelopes, `Mcp-Session-Id` sessions) and summarize the
//!   returned posts by keyword category.
//! - **Sales**: read-only queries over a retail app's SQLite export, plus
//!   summaries of hand-entered daily totals.
//! - **Quotes**: real-time A-share quotes from public endpoints, parsed
//!   positionally, with simple price levels and indicators.
//! - **Reports**: timestamped JSON, CSV and Markdown files.
//!
//! Every workflow is fetch, compute, print, save.
//!
//! ## Quick Start
//!
//! ### Calling a tool
//!
//! ```rust,no_run
//! use dataprobe::client::{McpClient, McpConfig};
//! use dataprobe::analysis::{extract_feeds, FeedSummary, KeywordCounter, KeywordDictionary};
//! use serde_json::json;
//!
//! # async fn example() -> dataprobe::Result<()> {
//! let mut client = McpClient::new(McpConfig::new(dataprobe::DEFAULT_MCP_URL.parse()?))?;
//! client.initialize().await?;
//!
//! let payload = client.call_tool_json("search_feeds", json!({"keyword": "穿搭"})).await?;
//! let feeds = extract_feeds(&payload);
//! let summary = FeedSummary::build(&feeds, KeywordCounter::new(KeywordDictionary::post_copy()));
//! println!("{} feeds, {} likes", summary.total_feeds, summary.total_likes);
//! # Ok(())
//! # }
//! ```
//!
//! ### Fetching a quote
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use dataprobe::quotes::{QuoteProvider, SinaProvider, Symbol};
//!
//! # async fn example() -> dataprobe::Result<()> {
//! let provider = SinaProvider::new("https://hq.sinajs.cn", Duration::from_secs(10))?;
//! let quote = provider.fetch(&Symbol::parse("300809")?).await?;
//! println!("{} {:.2} ({:+.2}%)", quote.name, quote.price, quote.change_percent().unwrap_or(0.0));
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod client;
pub mod config;
pub mod error;
pub mod quotes;
pub mod report;
pub mod sales;
pub mod shared;
pub mod types;

// Re-export commonly used types
pub use client::{McpClient, McpConfig};
pub use config::AppConfig;
pub use error::{Error, ErrorCode, Result};
pub use report::{MarkdownDoc, ReportWriter};
pub use types::{CallToolResult, Content, RequestId};

/// MCP protocol version announced in `initialize`.
///
/// ```rust
/// assert_eq!(dataprobe::LATEST_PROTOCOL_VERSION, "2025-06-18");
/// ```
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Default per-request timeout for the MCP client, in milliseconds.
///
/// ```rust
/// use std::time::Duration;
/// use dataprobe::DEFAULT_REQUEST_TIMEOUT_MS;
///
/// assert_eq!(Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS), Duration::from_secs(30));
/// ```
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Endpoint of a locally running automation server.
pub const DEFAULT_MCP_URL: &str = "http://localhost:18060/mcp";
