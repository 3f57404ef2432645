//! Real-time stock quotes from public endpoints.
//!
//! Each provider answers in its own format: Sina and Tencent send a
//! JavaScript assignment wrapping a delimited record, Eastmoney sends JSON.
//! The parsers are plain functions over the response body so they can be
//! tested against captured payloads; the [`QuoteProvider`] implementations
//! only add the HTTP round trip.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Instrument};

use crate::error::{Error, Result};
use crate::shared::http_constants::BROWSER_USER_AGENT;
use crate::shared::logging::probe_span;

pub mod eastmoney;
pub mod sina;
pub mod symbol;
pub mod tencent;

pub use eastmoney::{parse_eastmoney, parse_klines, EastmoneyProvider};
pub use sina::{parse_sina, SinaProvider};
pub use symbol::{Exchange, Symbol};
pub use tencent::{parse_tencent, TencentProvider};

/// Quote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// hq.sinajs.cn
    Sina,
    /// qt.gtimg.cn
    Tencent,
    /// push2.eastmoney.com
    Eastmoney,
}

impl ProviderKind {
    /// Every provider, in the order they are tried.
    pub const ALL: [Self; 3] = [Self::Sina, Self::Tencent, Self::Eastmoney];

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sina => "sina",
            Self::Tencent => "tencent",
            Self::Eastmoney => "eastmoney",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sina" => Ok(Self::Sina),
            "tencent" | "qq" => Ok(Self::Tencent),
            "eastmoney" | "em" => Ok(Self::Eastmoney),
            other => Err(Error::validation(format!("unknown quote provider {other:?}"))),
        }
    }
}

/// One level of the order book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Price
    pub price: f64,
    /// Volume at that price
    pub volume: f64,
}

/// A real-time quote.
///
/// Volumes are reported as the provider sends them: shares for Sina, lots
/// of 100 shares for Tencent and Eastmoney. Amounts are always in yuan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Where the quote came from
    pub provider: ProviderKind,
    /// Normalised symbol, e.g. `sz300809`
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Last price
    pub price: f64,
    /// Opening price
    pub open: f64,
    /// Previous close
    pub previous_close: f64,
    /// Day high
    pub high: f64,
    /// Day low
    pub low: f64,
    /// Traded volume
    pub volume: f64,
    /// Traded amount, yuan
    pub amount: f64,
    /// Five best bids, best first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bids: Vec<BookLevel>,
    /// Five best asks, best first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub asks: Vec<BookLevel>,
    /// Turnover rate, percent
    pub turnover_rate: Option<f64>,
    /// Price/earnings ratio
    pub pe: Option<f64>,
    /// Price/book ratio
    pub pb: Option<f64>,
    /// Float market cap, yuan
    pub float_market_cap: Option<f64>,
    /// Total market cap, yuan
    pub total_market_cap: Option<f64>,
    /// Limit-up price
    pub limit_up: Option<f64>,
    /// Limit-down price
    pub limit_down: Option<f64>,
    /// Exchange timestamp as sent by the provider
    pub quote_time: Option<String>,
    /// When the quote was fetched
    pub fetched_at: DateTime<Local>,
}

impl Quote {
    pub(crate) fn empty(provider: ProviderKind, symbol: &Symbol) -> Self {
        Self {
            provider,
            symbol: symbol.to_string(),
            name: String::new(),
            price: 0.0,
            open: 0.0,
            previous_close: 0.0,
            high: 0.0,
            low: 0.0,
            volume: 0.0,
            amount: 0.0,
            bids: Vec::new(),
            asks: Vec::new(),
            turnover_rate: None,
            pe: None,
            pb: None,
            float_market_cap: None,
            total_market_cap: None,
            limit_up: None,
            limit_down: None,
            quote_time: None,
            fetched_at: Local::now(),
        }
    }

    /// Price change against the previous close.
    pub fn change(&self) -> f64 {
        self.price - self.previous_close
    }

    /// Price change in percent, `None` without a previous close.
    pub fn change_percent(&self) -> Option<f64> {
        crate::analysis::stats::ratio(self.change(), self.previous_close).map(|r| r * 100.0)
    }

    /// Day range as a percentage of the previous close.
    pub fn amplitude(&self) -> Option<f64> {
        crate::analysis::stats::ratio(self.high - self.low, self.previous_close)
            .map(|r| r * 100.0)
    }
}

/// Parse a numeric field; empty or `-` means missing.
pub(crate) fn field_f64(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a field that must be present.
pub(crate) fn required_f64(fields: &[&str], index: usize, what: &str) -> Result<f64> {
    fields
        .get(index)
        .and_then(|raw| field_f64(raw))
        .ok_or_else(|| Error::parse(format!("field {index} ({what}) is not a number")))
}

/// Body of `var x="...";` style responses.
pub(crate) fn quoted_payload<'a>(body: &'a str, marker: &str) -> Result<&'a str> {
    let start = body
        .find(marker)
        .ok_or_else(|| Error::parse(format!("response does not contain {marker}")))?;
    let rest = &body[start + marker.len()..];
    let open = rest
        .find('"')
        .ok_or_else(|| Error::parse("missing opening quote"))?;
    let rest = &rest[open + 1..];
    let close = rest
        .find('"')
        .ok_or_else(|| Error::parse("missing closing quote"))?;
    Ok(&rest[..close])
}

/// Source of real-time quotes.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Which provider this is.
    fn kind(&self) -> ProviderKind;

    /// Fetch the current quote for `symbol`.
    async fn fetch(&self, symbol: &Symbol) -> Result<Quote>;
}

/// HTTP client shared by the providers.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .build()?)
}

/// Send `request` and return the decoded body of a successful response.
pub(crate) async fn get_text(request: reqwest::RequestBuilder, timeout: Duration) -> Result<String> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::from_reqwest(e, timeout))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::from_reqwest(e, timeout))?;
    if !status.is_success() {
        return Err(Error::status(status.as_u16(), body));
    }
    Ok(body)
}

/// Ask every provider in turn; failures are logged and skipped.
pub async fn fetch_all(providers: &[Box<dyn QuoteProvider>], symbol: &Symbol) -> Vec<Quote> {
    let mut quotes = Vec::with_capacity(providers.len());
    for provider in providers {
        let kind = provider.kind();
        let span = probe_span("quote", kind.as_str());
        match provider.fetch(symbol).instrument(span).await {
            Ok(quote) => {
                info!(provider = %kind, %symbol, price = quote.price, "quote fetched");
                quotes.push(quote);
            },
            Err(e) => warn!(provider = %kind, %symbol, "quote failed: {}", e),
        }
    }
    quotes
}

/// Build the providers named in `kinds` from `config`.
pub fn build_providers(
    kinds: &[ProviderKind],
    config: &crate::config::QuotesConfig,
) -> Result<Vec<Box<dyn QuoteProvider>>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    kinds
        .iter()
        .map(|kind| -> Result<Box<dyn QuoteProvider>> {
            Ok(match kind {
                ProviderKind::Sina => Box::new(SinaProvider::new(&config.sina_url, timeout)?),
                ProviderKind::Tencent => {
                    Box::new(TencentProvider::new(&config.tencent_url, timeout)?)
                },
                ProviderKind::Eastmoney => Box::new(
                    EastmoneyProvider::new(&config.eastmoney_url, timeout)?
                        .with_history_url(&config.eastmoney_history_url)?,
                ),
            })
        })
        .collect()
}

/// Support/resistance levels and buy zones derived from the day's range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevels {
    /// Low minus 10% of the range
    pub support_1: f64,
    /// Low minus 20% of the range
    pub support_2: f64,
    /// High plus 10% of the range
    pub resistance_1: f64,
    /// High plus 20% of the range
    pub resistance_2: f64,
    /// Whether the price is below the previous close
    pub falling: bool,
    /// Cautious buy zone `(from, to)`
    pub conservative_zone: (f64, f64),
    /// Moderate buy zone `(from, to)`
    pub moderate_zone: (f64, f64),
    /// Suggested stop loss
    pub stop_loss: f64,
    /// Suggested target
    pub target: f64,
}

impl PriceLevels {
    /// Levels for `quote`.
    pub fn from_quote(quote: &Quote) -> Self {
        use crate::analysis::stats::round2;

        let range = quote.high - quote.low;
        let support_1 = round2(quote.low - range * 0.1);
        let support_2 = round2(quote.low - range * 0.2);
        let resistance_1 = round2(quote.high + range * 0.1);
        let resistance_2 = round2(quote.high + range * 0.2);
        let price = quote.price;
        let falling = price < quote.previous_close;

        let (conservative_zone, moderate_zone) = if falling {
            ((support_2, support_1), (support_1, price))
        } else {
            ((round2(price * 0.98), price), (price, resistance_1))
        };

        Self {
            support_1,
            support_2,
            resistance_1,
            resistance_2,
            falling,
            conservative_zone,
            moderate_zone,
            stop_loss: support_2,
            target: resistance_2,
        }
    }
}

/// One day of price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Trading day
    pub date: NaiveDate,
    /// Open
    pub open: f64,
    /// Close
    pub close: f64,
    /// High
    pub high: f64,
    /// Low
    pub low: f64,
    /// Volume, lots
    pub volume: f64,
    /// Amount, yuan
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(price: f64, previous_close: f64, high: f64, low: f64) -> Quote {
        let symbol = Symbol::parse("300809").unwrap();
        Quote {
            price,
            previous_close,
            high,
            low,
            ..Quote::empty(ProviderKind::Sina, &symbol)
        }
    }

    #[test]
    fn change_and_amplitude() {
        let q = quote(11.0, 10.0, 11.5, 9.5);
        assert!((q.change() - 1.0).abs() < 1e-9);
        assert!((q.change_percent().unwrap() - 10.0).abs() < 1e-9);
        assert!((q.amplitude().unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(quote(1.0, 0.0, 1.0, 1.0).change_percent(), None);
    }

    #[test]
    fn levels_when_falling() {
        let levels = PriceLevels::from_quote(&quote(9.8, 10.0, 10.5, 9.5));
        assert!(levels.falling);
        assert_eq!(levels.support_1, 9.4);
        assert_eq!(levels.support_2, 9.3);
        assert_eq!(levels.resistance_2, 10.7);
        assert_eq!(levels.conservative_zone, (9.3, 9.4));
        assert_eq!(levels.moderate_zone, (9.4, 9.8));
        assert_eq!(levels.stop_loss, 9.3);
    }

    #[test]
    fn levels_when_rising() {
        let levels = PriceLevels::from_quote(&quote(10.0, 9.0, 10.5, 9.5));
        assert!(!levels.falling);
        assert_eq!(levels.conservative_zone, (9.8, 10.0));
        assert_eq!(levels.moderate_zone, (10.0, 10.6));
    }

    #[test]
    fn provider_names() {
        assert_eq!("Sina".parse::<ProviderKind>().unwrap(), ProviderKind::Sina);
        assert_eq!("em".parse::<ProviderKind>().unwrap(), ProviderKind::Eastmoney);
        assert!("yahoo".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn quoted_payload_extraction() {
        let body = "var hq_str_sz300809=\"a,b\";\n";
        assert_eq!(quoted_payload(body, "hq_str_sz300809").unwrap(), "a,b");
        assert!(quoted_payload(body, "hq_str_sh600519").is_err());
    }

    #[test]
    fn missing_fields() {
        assert_eq!(field_f64("-"), None);
        assert_eq!(field_f64(" 1.5 "), Some(1.5));
        assert!(required_f64(&["x"], 0, "price").is_err());
        assert!(required_f64(&[], 3, "price").is_err());
    }
}
