//! A-share symbols.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Listing exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    /// Shanghai
    Sh,
    /// Shenzhen
    Sz,
    /// Beijing
    Bj,
}

impl Exchange {
    /// Lowercase prefix used by the quote endpoints.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Sh => "sh",
            Self::Sz => "sz",
            Self::Bj => "bj",
        }
    }

    /// Guess the exchange from the first digit of a code.
    pub fn infer(code: &str) -> Option<Self> {
        match code.chars().next()? {
            '6' | '9' => Some(Self::Sh),
            '0' | '2' | '3' => Some(Self::Sz),
            '4' | '8' => Some(Self::Bj),
            _ => None,
        }
    }
}

/// Exchange plus six-digit code.
///
/// ```rust
/// use dataprobe::quotes::{Exchange, Symbol};
///
/// let symbol = Symbol::parse("300809").unwrap();
/// assert_eq!(symbol.exchange, Exchange::Sz);
/// assert_eq!(symbol.to_string(), "sz300809");
/// assert_eq!(Symbol::parse("SH600519").unwrap().eastmoney_secid(), "1.600519");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// Exchange
    pub exchange: Exchange,
    /// Six-digit code
    pub code: String,
}

impl Symbol {
    /// Parse `300809`, `sz300809` or `SH600519`.
    pub fn parse(input: &str) -> Result<Self> {
        let lowered = input.trim().to_ascii_lowercase();
        let (exchange, code) = match lowered.get(..2) {
            Some("sh") => (Some(Exchange::Sh), &lowered[2..]),
            Some("sz") => (Some(Exchange::Sz), &lowered[2..]),
            Some("bj") => (Some(Exchange::Bj), &lowered[2..]),
            _ => (None, lowered.as_str()),
        };

        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::validation(format!(
                "{input:?} is not a six-digit stock code"
            )));
        }
        let exchange = exchange
            .or_else(|| Exchange::infer(code))
            .ok_or_else(|| Error::validation(format!("cannot infer exchange for {code}")))?;

        Ok(Self {
            exchange,
            code: code.to_string(),
        })
    }

    /// `secid` query parameter for Eastmoney: `1.` for Shanghai, `0.` otherwise.
    pub fn eastmoney_secid(&self) -> String {
        let market = match self.exchange {
            Exchange::Sh => 1,
            Exchange::Sz | Exchange::Bj => 0,
        };
        format!("{market}.{}", self.code)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.exchange.prefix(), self.code)
    }
}

impl FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
