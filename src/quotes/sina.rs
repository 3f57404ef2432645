//! Sina Finance quotes (`hq.sinajs.cn`).
//!
//! Response: `var hq_str_sz300809="name,open,prev_close,price,...";`, at
//! least 32 comma-separated fields. Volume is in shares. The endpoint
//! refuses requests without a `Referer`.

use std::time::Duration;

use async_trait::async_trait;

use super::{
    get_text, http_client, quoted_payload, required_f64, BookLevel, ProviderKind, Quote,
    QuoteProvider, Symbol,
};
use crate::error::{Error, Result};
use crate::shared::http_constants::REFERER;

/// Default endpoint.
pub const DEFAULT_BASE_URL: &str = "https://hq.sinajs.cn";

const SINA_REFERER: &str = "https://finance.sina.com.cn";
const MIN_FIELDS: usize = 32;

fn ladder(fields: &[&str], start: usize) -> Vec<BookLevel> {
    (0..5)
        .filter_map(|i| {
            let volume = super::field_f64(fields.get(start + 2 * i)?)?;
            let price = super::field_f64(fields.get(start + 2 * i + 1)?)?;
            Some(BookLevel { price, volume })
        })
        .collect()
}

/// Parse a Sina response body for `symbol`.
pub fn parse_sina(symbol: &Symbol, body: &str) -> Result<Quote> {
    let payload = quoted_payload(body, &format!("hq_str_{symbol}"))?;
    if payload.is_empty() {
        return Err(Error::not_found(format!("sina has no data for {symbol}")));
    }
    let fields: Vec<&str> = payload.split(',').collect();
    if fields.len() < MIN_FIELDS {
        return Err(Error::parse(format!(
            "sina record has {} fields, expected at least {MIN_FIELDS}",
            fields.len()
        )));
    }

    Ok(Quote {
        name: fields[0].trim().to_string(),
        open: required_f64(&fields, 1, "open")?,
        previous_close: required_f64(&fields, 2, "previous close")?,
        price: required_f64(&fields, 3, "price")?,
        high: required_f64(&fields, 4, "high")?,
        low: required_f64(&fields, 5, "low")?,
        volume: required_f64(&fields, 8, "volume")?,
        amount: required_f64(&fields, 9, "amount")?,
        bids: ladder(&fields, 10),
        asks: ladder(&fields, 20),
        quote_time: Some(format!("{} {}", fields[30].trim(), fields[31].trim())),
        ..Quote::empty(ProviderKind::Sina, symbol)
    })
}

/// Sina quote provider.
#[derive(Debug, Clone)]
pub struct SinaProvider {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SinaProvider {
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
impl QuoteProvider for SinaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Sina
    }

    async fn fetch(&self, symbol: &Symbol) -> Result<Quote> {
        let request = self
            .http
            .get(format!("{}/list={symbol}", self.base_url))
            .header(REFERER, SINA_REFERER);
        let body = get_text(request, self.timeout).await?;
        parse_sina(symbol, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "var hq_str_sz300809=\"华辰装备,25.100,25.000,25.500,25.880,24.900,25.490,25.500,5324100,135800000.000,1200,25.490,800,25.480,500,25.470,300,25.460,200,25.450,1000,25.500,600,25.510,400,25.520,300,25.530,100,25.540,2026-02-13,15:00:03,00\";\n";

    #[test]
    fn parses_fixture() {
        let symbol = Symbol::parse("300809").unwrap();
        let quote = parse_sina(&symbol, FIXTURE).unwrap();
        assert_eq!(quote.name, "华辰装备");
        assert_eq!(quote.price, 25.5);
        assert_eq!(quote.previous_close, 25.0);
        assert_eq!(quote.volume, 5_324_100.0);
        assert_eq!(quote.bids.len(), 5);
        assert_eq!(quote.bids[0], BookLevel { price: 25.49, volume: 1200.0 });
        assert_eq!(quote.asks[4].price, 25.54);
        assert_eq!(quote.quote_time.as_deref(), Some("2026-02-13 15:00:03"));
        assert!((quote.change_percent().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_payload_is_not_found() {
        let symbol = Symbol::parse("300809").unwrap();
        let err = parse_sina(&symbol, "var hq_str_sz300809=\"\";").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn short_record_is_parse_error() {
        let symbol = Symbol::parse("300809").unwrap();
        let err = parse_sina(&symbol, "var hq_str_sz300809=\"a,1,2,3\";").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn other_symbol_is_parse_error() {
        let symbol = Symbol::parse("600519").unwrap();
        assert!(matches!(parse_sina(&symbol, FIXTURE), Err(Error::Parse(_))));
    }
}
