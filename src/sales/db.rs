//! Read-only access to the retail app's SQLite export.
//!
//! Tables of interest: `spu` (products), `sku` (variants) and `customer`.
//! Timestamps such as `spu.createdDate` are Unix milliseconds.

use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate, TimeZone};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OpenFlags, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::stats;
use crate::error::{Error, Result};

/// Half-open `[start, end)` range of Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsRange {
    /// Inclusive start
    pub start: i64,
    /// Exclusive end
    pub end: i64,
}

impl MsRange {
    /// Whether `ms` falls inside the range.
    pub fn contains(&self, ms: i64) -> bool {
        self.start <= ms && ms < self.end
    }
}

fn local_midnight_ms(date: NaiveDate) -> Result<i64> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::validation(format!("no midnight on {date}")))?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| Error::validation(format!("{date} has no local midnight")))
}

/// The calendar month `year-month` in local time.
pub fn month_range_ms(year: i32, month: u32) -> Result<MsRange> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::validation(format!("invalid month {year}-{month:02}")))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| Error::validation(format!("month after {year}-{month:02} out of range")))?;

    Ok(MsRange {
        start: local_midnight_ms(first)?,
        end: local_midnight_ms(next)?,
    })
}

/// One local calendar day.
pub fn day_range_ms(date: NaiveDate) -> Result<MsRange> {
    let next = date
        .succ_opt()
        .ok_or_else(|| Error::validation(format!("day after {date} out of range")))?;
    Ok(MsRange {
        start: local_midnight_ms(date)?,
        end: local_midnight_ms(next)?,
    })
}

/// Parse `YYYY-MM` into `(year, month)`.
pub fn parse_year_month(text: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", text.trim()), "%Y-%m-%d")
        .map_err(|e| Error::validation(format!("expected YYYY-MM, got {text:?}: {e}")))?;
    Ok((date.year(), date.month()))
}

/// Parse `YYYY-MM` into a month range.
pub fn parse_month(text: &str) -> Result<MsRange> {
    let (year, month) = parse_year_month(text)?;
    month_range_ms(year, month)
}

fn name_pattern(name_filter: Option<&str>) -> String {
    format!("%{}%", name_filter.unwrap_or_default())
}

/// A row of `spu`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Row id
    pub id: String,
    /// Shop article code
    pub code: String,
    /// Product name, `<seller>订<description>` for pre-orders
    pub name: String,
    /// `purPrice`, 0 when missing
    pub purchase_price: f64,
    /// `stdprice1`, 0 when missing
    pub sale_price: f64,
    /// `createdDate`, Unix ms
    pub created_ms: i64,
}

/// A row of `sku`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuRecord {
    /// Row id
    pub id: String,
    /// `tenantSpuId`
    pub spu_id: String,
    /// `purPrice`, 0 when missing
    pub purchase_price: f64,
    /// `stdprice1`, 0 when missing
    pub sale_price: f64,
}

/// A row of `customer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Customer name
    pub name: String,
    /// Phone number as stored
    pub phone: String,
    /// Raw `createdDate` column text
    pub created: String,
}

/// Price statistics over products with both prices set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    /// Products with both prices set
    pub count: u64,
    /// Mean purchase price
    pub avg_purchase: Option<f64>,
    /// Mean sale price
    pub avg_sale: Option<f64>,
    /// Lowest sale price
    pub min_sale: Option<f64>,
    /// Highest sale price
    pub max_sale: Option<f64>,
}

/// One year's figures for the same calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthComparison {
    /// Year
    pub year: i32,
    /// Products created in the month
    pub total: u64,
    /// Of those, products with both prices set
    pub priced: u64,
    /// Mean purchase price over products that have one
    pub avg_purchase: Option<f64>,
    /// Mean sale price over products that have one
    pub avg_sale: Option<f64>,
    /// Gross margin of the two means, percent
    pub avg_margin: Option<f64>,
}

/// Customer table overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    /// Rows in `customer`
    pub total: u64,
    /// Distinct customer names
    pub distinct_names: u64,
    /// Most recently inserted first
    pub recent: Vec<CustomerRecord>,
}

fn text(value: SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => f.to_string(),
        SqlValue::Text(s) => s,
        SqlValue::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
    }
}

fn number(value: SqlValue) -> f64 {
    match value {
        SqlValue::Integer(i) => i as f64,
        SqlValue::Real(f) => f,
        SqlValue::Text(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<ProductRecord> {
    Ok(ProductRecord {
        id: text(row.get(0)?),
        code: text(row.get(1)?),
        name: text(row.get(2)?),
        purchase_price: number(row.get(3)?),
        sale_price: number(row.get(4)?),
        created_ms: number(row.get(5)?) as i64,
    })
}

/// Read-only handle on the sales database.
#[derive(Debug)]
pub struct SalesDb {
    path: PathBuf,
    conn: Connection,
}

impl SalesDb {
    /// Open `path` read-only. The file must exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::not_found(format!(
                "database {} does not exist",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        info!(path = %path.display(), "opened sales database");
        Ok(Self { path, conn })
    }

    /// Path the database was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// User tables, sorted by name.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn checked_table(&self, table: &str) -> Result<String> {
        if self.table_names()?.iter().any(|t| t == table) {
            Ok(format!("\"{}\"", table.replace('"', "\"\"")))
        } else {
            Err(Error::not_found(format!("table {table}")))
        }
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> Result<u64> {
        let quoted = self.checked_table(table)?;
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {quoted}"), [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Column names of `table`, in declaration order.
    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        let quoted = self.checked_table(table)?;
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({quoted})"))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Columns whose name mentions a date or time.
    pub fn date_columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(self
            .columns(table)?
            .into_iter()
            .filter(|c| {
                let lower = c.to_lowercase();
                lower.contains("date") || lower.contains("time")
            })
            .collect())
    }

    /// Products created in `[start_ms, end_ms)`, newest first, optionally
    /// restricted to names containing `name_filter`.
    pub fn products_created_between(
        &self,
        start_ms: i64,
        end_ms: i64,
        name_filter: Option<&str>,
    ) -> Result<Vec<ProductRecord>> {
        let pattern = name_pattern(name_filter);
        let mut stmt = self.conn.prepare(
            "SELECT id, code, name, purPrice, stdprice1, createdDate FROM spu \
             WHERE createdDate >= ?1 AND createdDate < ?2 AND name LIKE ?3 \
             ORDER BY createdDate DESC",
        )?;
        let products = stmt
            .query_map(params![start_ms, end_ms, pattern], product_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(start_ms, end_ms, found = products.len(), "queried products");
        Ok(products)
    }

    /// Price statistics over products in `range` with both prices above 0,
    /// restricted like [`products_created_between`](Self::products_created_between).
    pub fn product_price_stats(
        &self,
        range: MsRange,
        name_filter: Option<&str>,
    ) -> Result<PriceStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*), AVG(purPrice), AVG(stdprice1), MIN(stdprice1), MAX(stdprice1) FROM spu \
             WHERE createdDate >= ?1 AND createdDate < ?2 AND name LIKE ?3 \
             AND purPrice > 0 AND stdprice1 > 0",
            params![range.start, range.end, name_pattern(name_filter)],
            |row| {
                Ok(PriceStats {
                    count: row.get::<_, i64>(0)?.max(0) as u64,
                    avg_purchase: row.get(1)?,
                    avg_sale: row.get(2)?,
                    min_sale: row.get::<_, Option<f64>>(3)?,
                    max_sale: row.get::<_, Option<f64>>(4)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// The same calendar `month` in each of `years`, in the order given.
    pub fn month_comparison(
        &self,
        month: u32,
        years: &[i32],
        name_filter: Option<&str>,
    ) -> Result<Vec<MonthComparison>> {
        let mut stmt = self.conn.prepare(
            "SELECT COUNT(*), \
                    COUNT(CASE WHEN purPrice > 0 AND stdprice1 > 0 THEN 1 END), \
                    AVG(CASE WHEN purPrice > 0 THEN purPrice END), \
                    AVG(CASE WHEN stdprice1 > 0 THEN stdprice1 END) \
             FROM spu WHERE createdDate >= ?1 AND createdDate < ?2 AND name LIKE ?3",
        )?;
        let pattern = name_pattern(name_filter);

        let mut rows = Vec::with_capacity(years.len());
        for &year in years {
            let range = month_range_ms(year, month)?;
            let (total, priced, avg_purchase, avg_sale) =
                stmt.query_row(params![range.start, range.end, pattern], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                    ))
                })?;
            let avg_margin = match (avg_purchase, avg_sale) {
                (Some(purchase), Some(sale)) => stats::gross_margin(purchase, sale).map(stats::round2),
                _ => None,
            };
            debug!(year, month, total, "compared month");
            rows.push(MonthComparison {
                year,
                total: total.max(0) as u64,
                priced: priced.max(0) as u64,
                avg_purchase: avg_purchase.map(stats::round2),
                avg_sale: avg_sale.map(stats::round2),
                avg_margin,
            });
        }
        Ok(rows)
    }

    /// Total and distinct customers plus the five most recent.
    pub fn customer_summary(&self) -> Result<CustomerSummary> {
        let (total, distinct_names) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT name) FROM customer",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        let mut stmt = self
            .conn
            .prepare("SELECT name, phone, createdDate FROM customer ORDER BY ROWID DESC LIMIT 5")?;
        let recent = stmt
            .query_map([], |row| {
                Ok(CustomerRecord {
                    name: text(row.get(0)?),
                    phone: text(row.get(1)?),
                    created: text(row.get(2)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(CustomerSummary {
            total: total.max(0) as u64,
            distinct_names: distinct_names.max(0) as u64,
            recent,
        })
    }

    /// Variants of product `spu_id`.
    pub fn skus_for_product(&self, spu_id: &str) -> Result<Vec<SkuRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tenantSpuId, purPrice, stdprice1 FROM sku WHERE tenantSpuId = ?1 ORDER BY id",
        )?;
        let skus = stmt
            .query_map(params![spu_id], |row| {
                Ok(SkuRecord {
                    id: text(row.get(0)?),
                    spu_id: text(row.get(1)?),
                    purchase_price: number(row.get(2)?),
                    sale_price: number(row.get(3)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(skus)
    }
}
