//! Eastmoney quotes (`push2.eastmoney.com`) and daily history
//! (`push2his.eastmoney.com`).
//!
//! Both endpoints answer JSON with `rc == 0` on success. With `fltt=2`
//! prices come back as decimals; missing values are sent as `"-"`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use super::{
    field_f64, get_text, http_client, DailyBar, ProviderKind, Quote, QuoteProvider, Symbol,
};
use crate::error::{Error, Result};

/// Default quote endpoint.
pub const DEFAULT_BASE_URL: &str = "https://push2.eastmoney.com";

/// Default history endpoint.
pub const DEFAULT_HISTORY_URL: &str = "https://push2his.eastmoney.com";

const QUOTE_FIELDS: &str =
    "f43,f44,f45,f46,f47,f48,f51,f52,f57,f58,f60,f116,f117,f162,f167,f168,f169,f170";

fn envelope_data(body: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::parse(format!("eastmoney response is not JSON: {e}")))?;
    match value.get("rc").and_then(Value::as_i64) {
        Some(0) => {},
        other => return Err(Error::parse(format!("eastmoney rc = {other:?}"))),
    }
    match value.get("data") {
        Some(data) if data.is_object() => Ok(data.clone()),
        _ => Err(Error::not_found("eastmoney returned no data")),
    }
}

fn number(data: &Value, key: &str) -> Option<f64> {
    match data.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => field_f64(s),
        _ => None,
    }
}

fn required(data: &Value, key: &str) -> Result<f64> {
    number(data, key).ok_or_else(|| Error::parse(format!("eastmoney field {key} missing")))
}

/// Parse an Eastmoney `stock/get` response for `symbol`.
pub fn parse_eastmoney(symbol: &Symbol, body: &str) -> Result<Quote> {
    let data = envelope_data(body)?;

    Ok(Quote {
        name: data
            .get("f58")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        price: required(&data, "f43")?,
        high: required(&data, "f44")?,
        low: required(&data, "f45")?,
        open: required(&data, "f46")?,
        volume: required(&data, "f47")?,
        amount: required(&data, "f48")?,
        previous_close: required(&data, "f60")?,
        limit_up: number(&data, "f51"),
        limit_down: number(&data, "f52"),
        total_market_cap: number(&data, "f116"),
        float_market_cap: number(&data, "f117"),
        pe: number(&data, "f162"),
        pb: number(&data, "f167"),
        turnover_rate: number(&data, "f168"),
        ..Quote::empty(ProviderKind::Eastmoney, symbol)
    })
}

/// Parse a `stock/kline/get` response into daily bars, oldest first.
///
/// Each kline is `date,open,close,high,low,volume,amount[,...]`.
pub fn parse_klines(body: &str) -> Result<Vec<DailyBar>> {
    let data = envelope_data(body)?;
    let klines = data
        .get("klines")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::parse("eastmoney history has no klines"))?;

    klines
        .iter()
        .map(|line| {
            let line = line
                .as_str()
                .ok_or_else(|| Error::parse("kline is not a string"))?;
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() < 7 {
                return Err(Error::parse(format!("short kline {line:?}")));
            }
            let date = NaiveDate::parse_from_str(parts[0], "%Y-%m-%d")
                .map_err(|e| Error::parse(format!("kline date {:?}: {e}", parts[0])))?;
            let at = |i: usize, what: &str| super::required_f64(&parts, i, what);
            Ok(DailyBar {
                date,
                open: at(1, "open")?,
                close: at(2, "close")?,
                high: at(3, "high")?,
                low: at(4, "low")?,
                volume: at(5, "volume")?,
                amount: at(6, "amount")?,
            })
        })
        .collect()
}

/// Eastmoney quote provider.
#[derive(Debug, Clone)]
pub struct EastmoneyProvider {
    http: reqwest::Client,
    base_url: String,
    history_url: String,
    timeout: Duration,
}

impl EastmoneyProvider {
    /// Provider against `base_url`, history from the default endpoint.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(base_url)?;
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            history_url: DEFAULT_HISTORY_URL.to_string(),
            timeout,
        })
    }

    /// Use `history_url` for daily bars.
    pub fn with_history_url(mut self, history_url: &str) -> Result<Self> {
        url::Url::parse(history_url)?;
        self.history_url = history_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// The last `days` daily bars, forward-adjusted.
    pub async fn daily_bars(&self, symbol: &Symbol, days: u32) -> Result<Vec<DailyBar>> {
        let limit = days.to_string();
        let request = self
            .http
            .get(format!("{}/api/qt/stock/kline/get", self.history_url))
            .query(&[
                ("secid", symbol.eastmoney_secid().as_str()),
                ("fields1", "f1,f2,f3"),
                ("fields2", "f51,f52,f53,f54,f55,f56,f57"),
                ("klt", "101"),
                ("fqt", "1"),
                ("end", "20500101"),
                ("lmt", limit.as_str()),
            ]);
        let body = get_text(request, self.timeout).await?;
        parse_klines(&body)
    }
}

#[async_trait]
impl QuoteProvider for EastmoneyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Eastmoney
    }

    async fn fetch(&self, symbol: &Symbol) -> Result<Quote> {
        let request = self
            .http
            .get(format!("{}/api/qt/stock/get", self.base_url))
            .query(&[
                ("secid", symbol.eastmoney_secid().as_str()),
                ("fields", QUOTE_FIELDS),
                ("fltt", "2"),
                ("invt", "2"),
            ]);
        let body = get_text(request, self.timeout).await?;
        parse_eastmoney(symbol, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_quote() {
        let body = json!({
            "rc": 0,
            "data": {
                "f43": 25.5, "f44": 25.88, "f45": 24.9, "f46": 25.1, "f47": 53241,
                "f48": 135800000.0, "f51": 27.5, "f52": 22.5, "f57": "300809",
                "f58": "华辰装备", "f60": 25.0, "f162": "-", "f167": 3.21, "f168": 2.13,
                "f169": 0.5, "f170": 2.0
            }
        })
        .to_string();
        let symbol = Symbol::parse("300809").unwrap();
        let quote = parse_eastmoney(&symbol, &body).unwrap();
        assert_eq!(quote.name, "华辰装备");
        assert_eq!(quote.volume, 53241.0);
        assert_eq!(quote.pe, None);
        assert_eq!(quote.turnover_rate, Some(2.13));
        assert!((quote.change() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn nonzero_rc() {
        let symbol = Symbol::parse("300809").unwrap();
        let err = parse_eastmoney(&symbol, r#"{"rc": 102, "data": null}"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        let err = parse_eastmoney(&symbol, r#"{"rc": 0, "data": null}"#).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(parse_eastmoney(&symbol, "<html>").is_err());
    }

    #[test]
    fn parses_klines() {
        let body = json!({
            "rc": 0,
            "data": {
                "code": "300809",
                "klines": [
                    "2026-02-12,24.80,25.00,25.20,24.60,48000,120000000.00,2.40",
                    "2026-02-13,25.10,25.50,25.88,24.90,53241,135800000.00,3.92"
                ]
            }
        })
        .to_string();
        let bars = parse_klines(&body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2026, 2, 13).unwrap());
        assert_eq!(bars[1].close, 25.5);
        assert_eq!(bars[0].high, 25.2);
    }

    #[test]
    fn bad_kline() {
        let body = json!({"rc": 0, "data": {"klines": ["2026-02-13,1,2"]}}).to_string();
        assert!(matches!(parse_klines(&body), Err(Error::Parse(_))));
    }
}
