//! Feed extraction and summaries.
//!
//! The automation server returns posts in two shapes: a flat one
//! (`title`, `content`, `likes`) and the raw note-card one
//! (`noteCard.displayTitle`, `noteCard.interactInfo.likedCount`, ...).
//! [`Feed::from_value`] reduces either to the same struct.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::keywords::{KeywordCounter, KeywordDictionary, KeywordHit};
use super::stats;

lazy_static! {
    static ref CJK_RUN: Regex = Regex::new(r"[\u{4e00}-\u{9fff}]{2,}").expect("valid regex");
}

/// A post reduced to what the reports need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Note id, empty when the server omits it
    pub id: String,
    /// Display title
    pub title: String,
    /// Description text
    pub body: String,
    /// Author nickname
    pub author: String,
    /// Like count, `万`/`千` suffixes already expanded
    pub likes: u64,
    /// Token required by `get_feed_detail`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xsec_token: Option<String>,
}

fn text_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_str)
}

fn count_at(value: &Value, path: &[&str]) -> Option<u64> {
    let found = path.iter().try_fold(value, |v, key| v.get(key))?;
    match found {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => Some(stats::parse_count(s)),
        _ => None,
    }
}

impl Feed {
    /// Build a feed from either server shape. Returns `None` for values
    /// that are not objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let id = text_at(value, &["id"])
            .or_else(|| text_at(value, &["noteCard", "noteId"]))
            .unwrap_or_default()
            .to_string();
        let xsec_token = text_at(value, &["xsecToken"])
            .or_else(|| text_at(value, &["xsec_token"]))
            .map(str::to_string);

        let feed = match value.get("noteCard") {
            Some(card) => Self {
                id,
                title: text_at(card, &["displayTitle"])
                    .or_else(|| text_at(card, &["title"]))
                    .unwrap_or_default()
                    .to_string(),
                body: text_at(card, &["desc"]).unwrap_or_default().to_string(),
                author: text_at(card, &["user", "nickname"])
                    .or_else(|| text_at(card, &["user", "nickName"]))
                    .unwrap_or_default()
                    .to_string(),
                likes: count_at(card, &["interactInfo", "likedCount"]).unwrap_or(0),
                xsec_token,
            },
            None => Self {
                id,
                title: text_at(value, &["title"]).unwrap_or_default().to_string(),
                body: text_at(value, &["content"])
                    .or_else(|| text_at(value, &["desc"]))
                    .unwrap_or_default()
                    .to_string(),
                author: text_at(value, &["author"])
                    .or_else(|| text_at(value, &["user", "nickname"]))
                    .unwrap_or_default()
                    .to_string(),
                likes: count_at(value, &["likes"]).unwrap_or(0),
                xsec_token,
            },
        };
        Some(feed)
    }

    /// Title and body joined for keyword matching.
    pub fn full_text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }
}

/// Pull feeds out of a tool payload: a bare array or `{"feeds": [...]}`.
pub fn extract_feeds(value: &Value) -> Vec<Feed> {
    let items = match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get("feeds").and_then(Value::as_array),
        _ => None,
    };
    items
        .map(|items| items.iter().filter_map(Feed::from_value).collect())
        .unwrap_or_default()
}

/// Feeds whose title or author mentions `account`.
pub fn filter_by_author(feeds: &[Feed], account: &str) -> Vec<Feed> {
    feeds
        .iter()
        .filter(|f| f.title.contains(account) || f.author.contains(account))
        .cloned()
        .collect()
}

/// Drop feeds whose id was already seen; feeds without an id are kept.
pub fn dedupe_by_id(feeds: Vec<Feed>) -> Vec<Feed> {
    let mut seen = std::collections::HashSet::new();
    feeds
        .into_iter()
        .filter(|f| f.id.is_empty() || seen.insert(f.id.clone()))
        .collect()
}

/// Category count with its share of all category hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    /// Category name
    pub category: String,
    /// Keyword hits in the category
    pub count: usize,
    /// Share of all hits, in percent
    pub percentage: f64,
}

/// Aggregate view over a set of feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSummary {
    /// Feeds summarized
    pub total_feeds: usize,
    /// Likes over all feeds
    pub total_likes: u64,
    /// Mean likes per feed, 0 when there are no feeds
    pub avg_likes: f64,
    /// Most likes on one feed
    pub max_likes: u64,
    /// 0 when there are no feeds
    pub min_likes: u64,
    /// 90th percentile of likes, 0 when there are no feeds
    pub p90_likes: f64,
    /// Most frequent keywords
    pub keywords: Vec<KeywordHit>,
    /// Categories by keyword hits
    pub categories: Vec<CategoryShare>,
    /// Titles per content type, each title counted once
    pub content_types: IndexMap<String, usize>,
    /// CJK words from titles with their frequency
    pub words: Vec<(String, usize)>,
    /// Titles matching each title pattern
    pub title_patterns: IndexMap<String, usize>,
    /// Most liked feeds first
    pub top_feeds: Vec<Feed>,
}

impl FeedSummary {
    /// Keywords kept in the ranking
    pub const TOP_KEYWORDS: usize = 20;
    /// Words kept in the ranking
    pub const TOP_WORDS: usize = 20;
    /// Feeds kept as examples
    pub const TOP_FEEDS: usize = 5;

    /// Summarize `feeds`, matching keywords with `counter`.
    pub fn build(feeds: &[Feed], mut counter: KeywordCounter) -> Self {
        counter.observe_all(feeds.iter().map(Feed::full_text));

        let likes: Vec<u64> = feeds.iter().map(|f| f.likes).collect();
        let total_likes: u64 = likes.iter().sum();
        let like_values: Vec<f64> = likes.iter().map(|&l| l as f64).collect();

        let category_total = counter.total() as f64;
        let categories = counter
            .ranked_categories()
            .into_iter()
            .map(|(category, count)| CategoryShare {
                percentage: stats::round2(stats::percentage(count as f64, category_total)),
                category,
                count,
            })
            .collect();

        let mut top_feeds = feeds.to_vec();
        top_feeds.sort_by(|a, b| b.likes.cmp(&a.likes));
        top_feeds.truncate(Self::TOP_FEEDS);

        Self {
            total_feeds: feeds.len(),
            total_likes,
            avg_likes: stats::round2(
                stats::ratio(total_likes as f64, feeds.len() as f64).unwrap_or(0.0),
            ),
            max_likes: likes.iter().copied().max().unwrap_or(0),
            min_likes: likes.iter().copied().min().unwrap_or(0),
            p90_likes: stats::round2(stats::percentile(&like_values, 90.0).unwrap_or(0.0)),
            keywords: counter.top_keywords(Self::TOP_KEYWORDS),
            categories,
            content_types: KeywordDictionary::content_types()
                .classify_all(feeds.iter().map(|f| f.title.as_str())),
            words: word_frequency(feeds.iter().map(|f| f.title.as_str()), Self::TOP_WORDS),
            title_patterns: KeywordDictionary::title_patterns()
                .document_frequency(feeds.iter().map(|f| f.title.as_str())),
            top_feeds,
        }
    }
}

/// Most frequent runs of two or more CJK ideographs.
pub fn word_frequency<'a, I>(texts: I, top: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for text in texts {
        for word in CJK_RUN.find_iter(text) {
            *counts.entry(word.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(word, count)| (word.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(top);
    ranked
}
