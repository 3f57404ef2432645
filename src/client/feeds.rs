//! Feed tools exposed by the automation server.

use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::McpClient;
use crate::analysis::feeds::{dedupe_by_id, extract_feeds, Feed};
use crate::error::Result;

/// Keyword search plan: one `search_feeds` call per keyword.
#[derive(Debug, Clone)]
pub struct FeedSearch {
    /// Search keywords, in order
    pub keywords: Vec<String>,
    /// Optional sort order passed through to the server (e.g. `hot`)
    pub sort: Option<String>,
    /// Feeds kept per keyword
    pub limit: usize,
    /// Pause between consecutive calls
    pub pause: Duration,
    /// Fall back to `list_feeds` when every search comes back empty
    pub fallback_to_list: bool,
}

impl FeedSearch {
    /// Search `keywords` with a one-second pause and ten feeds per keyword.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            sort: None,
            limit: 10,
            pause: Duration::from_secs(1),
            fallback_to_list: true,
        }
    }

    /// Set the sort order.
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Set the per-keyword limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the pause between calls.
    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

impl McpClient {
    /// `search_feeds` for one keyword.
    pub async fn search_feeds(&self, keyword: &str, sort: Option<&str>) -> Result<Vec<Feed>> {
        let mut arguments = Map::new();
        arguments.insert("keyword".into(), Value::from(keyword));
        if let Some(sort) = sort {
            arguments.insert("sort".into(), Value::from(sort));
        }
        let payload = self
            .call_tool_json("search_feeds", Value::Object(arguments))
            .await?;
        Ok(extract_feeds(&payload))
    }

    /// `list_feeds`: the server's home feed.
    pub async fn list_feeds(&self) -> Result<Vec<Feed>> {
        let payload = self.call_tool_json("list_feeds", json!({})).await?;
        Ok(extract_feeds(&payload))
    }

    /// `get_feed_detail` for a feed found by a search.
    pub async fn get_feed_detail(&self, feed_id: &str, xsec_token: &str) -> Result<Value> {
        self.call_tool_json(
            "get_feed_detail",
            json!({ "feed_id": feed_id, "xsec_token": xsec_token }),
        )
        .await
    }

    /// Run a [`FeedSearch`].
    ///
    /// Failed searches are logged and skipped; the result is deduplicated by
    /// feed id, first occurrence wins.
    pub async fn collect_feeds(&self, search: &FeedSearch) -> Vec<Feed> {
        let mut collected = Vec::new();

        for (i, keyword) in search.keywords.iter().enumerate() {
            if i > 0 && !search.pause.is_zero() {
                tokio::time::sleep(search.pause).await;
            }
            match self.search_feeds(keyword, search.sort.as_deref()).await {
                Ok(mut feeds) => {
                    feeds.truncate(search.limit);
                    info!(keyword = %keyword, found = feeds.len(), "search finished");
                    collected.extend(feeds);
                },
                Err(e) => warn!(keyword = %keyword, "search failed: {}", e),
            }
        }

        if collected.is_empty() && search.fallback_to_list {
            info!("searches returned nothing, falling back to list_feeds");
            match self.list_feeds().await {
                Ok(feeds) => collected = feeds,
                Err(e) => warn!("list_feeds failed: {}", e),
            }
        }

        dedupe_by_id(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_builder() {
        let search = FeedSearch::new(["ootd", "穿搭"])
            .sort("hot")
            .limit(3)
            .pause(Duration::ZERO);
        assert_eq!(search.keywords.len(), 2);
        assert_eq!(search.sort.as_deref(), Some("hot"));
        assert_eq!(search.limit, 3);
        assert!(search.fallback_to_list);
    }
}
