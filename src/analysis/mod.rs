//! Pure computations over fetched data: keyword counting, feed summaries,
//! descriptive statistics and price indicators.

pub mod feeds;
pub mod indicators;
pub mod keywords;
pub mod stats;

pub use feeds::{extract_feeds, filter_by_author, Feed, FeedSummary};
pub use indicators::{Alert, BandPosition, MaAlignment, MacdCross, RsiStatus, TrendSnapshot};
pub use keywords::{KeywordCounter, KeywordDictionary, KeywordHit, UNCLASSIFIED};
