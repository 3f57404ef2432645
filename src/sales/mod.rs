//! Sales data: the SQLite export of the shop app and hand-entered daily
//! snapshots.

pub mod db;
pub mod products;
pub mod summary;

pub use db::{
    day_range_ms, month_range_ms, parse_month, parse_year_month, CustomerRecord, CustomerSummary,
    MonthComparison, MsRange, PriceStats, ProductRecord, SalesDb, SkuRecord,
};
pub use products::ProductBreakdown;
pub use summary::{
    EstimatedProfit, PerformanceRating, ProductSale, SalesSnapshot, SalesSummary, Share,
};
