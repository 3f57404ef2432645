//! Tencent quotes (`qt.gtimg.cn`).
//!
//! Response: `v_sz300809="51~name~code~price~prev_close~open~volume~...";`
//! with at least 49 `~`-separated fields. Volume is in lots, amount in
//! units of 10 000 yuan, market caps in units of 100 million yuan.

use std::time::Duration;

use async_trait::async_trait;

use super::{
    field_f64, get_text, http_client, quoted_payload, required_f64, BookLevel, ProviderKind,
    Quote, QuoteProvider, Symbol,
};
use crate::error::{Error, Result};

/// Default endpoint.
pub const DEFAULT_BASE_URL: &str = "https://qt.gtimg.cn";

const MIN_FIELDS: usize = 49;
const TEN_THOUSAND: f64 = 1e4;
const HUNDRED_MILLION: f64 = 1e8;

fn optional(fields: &[&str], index: usize) -> Option<f64> {
    fields.get(index).and_then(|raw| field_f64(raw))
}

fn ladder(fields: &[&str], start: usize) -> Vec<BookLevel> {
    (0..5)
        .filter_map(|i| {
            Some(BookLevel {
                price: optional(fields, start + 2 * i)?,
                volume: optional(fields, start + 2 * i + 1)?,
            })
        })
        .collect()
}

/// Parse a Tencent response body for `symbol`.
pub fn parse_tencent(symbol: &Symbol, body: &str) -> Result<Quote> {
    let payload = quoted_payload(body, &format!("v_{symbol}"))?;
    if payload.is_empty() {
        return Err(Error::not_found(format!("tencent has no data for {symbol}")));
    }
    let fields: Vec<&str> = payload.split('~').collect();
    if fields.len() < MIN_FIELDS {
        return Err(Error::parse(format!(
            "tencent record has {} fields, expected at least {MIN_FIELDS}",
            fields.len()
        )));
    }
    if fields[2].trim() != symbol.code {
        return Err(Error::parse(format!(
            "tencent record is for {}, expected {}",
            fields[2], symbol.code
        )));
    }

    Ok(Quote {
        name: fields[1].trim().to_string(),
        price: required_f64(&fields, 3, "price")?,
        previous_close: required_f64(&fields, 4, "previous close")?,
        open: required_f64(&fields, 5, "open")?,
        volume: required_f64(&fields, 6, "volume")?,
        high: required_f64(&fields, 33, "high")?,
        low: required_f64(&fields, 34, "low")?,
        amount: required_f64(&fields, 37, "amount")? * TEN_THOUSAND,
        bids: ladder(&fields, 9),
        asks: ladder(&fields, 19),
        turnover_rate: optional(&fields, 38),
        pe: optional(&fields, 39),
        float_market_cap: optional(&fields, 44).map(|v| v * HUNDRED_MILLION),
        total_market_cap: optional(&fields, 45).map(|v| v * HUNDRED_MILLION),
        pb: optional(&fields, 46),
        limit_up: optional(&fields, 47),
        limit_down: optional(&fields, 48),
        quote_time: Some(fields[30].trim().to_string()).filter(|t| !t.is_empty()),
        ..Quote::empty(ProviderKind::Tencent, symbol)
    })
}

/// Tencent quote provider.
#[derive(Debug, Clone)]
pub struct TencentProvider {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl TencentProvider {
    /// Provider against `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(base_url)?;
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl QuoteProvider for TencentProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tencent
    }

    async fn fetch(&self, symbol: &Symbol) -> Result<Quote> {
        let request = self.http.get(format!("{}/q={symbol}", self.base_url));
        let body = get_text(request, self.timeout).await?;
        parse_tencent(symbol, &body)
    }
}
