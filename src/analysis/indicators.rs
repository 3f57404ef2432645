//! Technical indicators over daily closing prices.
//!
//! Inputs are closes in chronological order (oldest first).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::stats;

/// Trading days per year used to annualise volatility.
pub const TRADING_DAYS: f64 = 252.0;

/// Annual risk-free rate used by [`sharpe_ratio`].
pub const RISK_FREE_RATE: f64 = 0.02;

/// Annualised 20-day volatility, percent, above which a series is flagged.
pub const HIGH_VOLATILITY: f64 = 50.0;

/// Simple moving average of the last `window` closes.
pub fn sma(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    stats::mean(&closes[closes.len() - window..])
}

/// Relative strength index over the last `period` changes, using plain
/// rolling means of gains and losses.
///
/// `None` with too little data or a completely flat window.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() <= period {
        return None;
    }
    let window = &closes[closes.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(g, l), delta| {
            if delta > 0.0 {
                (g + delta, l)
            } else {
                (g, l - delta)
            }
        });
    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    match (avg_gain > 0.0, avg_loss > 0.0) {
        (false, false) => None,
        (_, false) => Some(100.0),
        _ => Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss)),
    }
}

/// Daily simple returns.
pub fn returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|pair| pair[0] != 0.0)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect()
}

/// Annualised volatility in percent over the last `window` returns.
pub fn annualized_volatility(closes: &[f64], window: usize) -> Option<f64> {
    let returns = returns(closes);
    let tail = &returns[returns.len().saturating_sub(window)..];
    stats::sample_std_dev(tail).map(|sd| sd * TRADING_DAYS.sqrt() * 100.0)
}

/// Exponential moving average of every prefix, seeded with the first value
/// and smoothed by `2 / (span + 1)`.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    for &value in values {
        let next = match out.last() {
            Some(&prev) => alpha * value + (1.0 - alpha) * prev,
            None => value,
        };
        out.push(next);
    }
    out
}

/// Which side of its signal line the MACD sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdCross {
    /// MACD above the signal line
    Golden,
    /// MACD at or below the signal line
    Death,
}

/// MACD(12, 26, 9) at the last close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    /// EMA12 - EMA26
    pub macd: f64,
    /// EMA9 of the MACD line
    pub signal: f64,
    /// MACD - signal
    pub histogram: f64,
    /// Position against the signal line
    pub cross: MacdCross,
}

/// MACD(12, 26, 9); `None` with fewer than 26 closes.
pub fn macd(closes: &[f64]) -> Option<Macd> {
    if closes.len() < 26 {
        return None;
    }
    let fast = ema_series(closes, 12);
    let slow = ema_series(closes, 26);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = *ema_series(&line, 9).last()?;
    let macd = *line.last()?;
    Some(Macd {
        macd,
        signal,
        histogram: macd - signal,
        cross: if macd > signal { MacdCross::Golden } else { MacdCross::Death },
    })
}

/// Where the last close sits against the bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPosition {
    /// Above the upper band
    AboveUpper,
    /// Between the bands
    Inside,
    /// Below the lower band
    BelowLower,
}

/// Bollinger bands at the last close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bollinger {
    /// Middle band plus `width` standard deviations
    pub upper: f64,
    /// Moving average
    pub middle: f64,
    /// Middle band minus `width` standard deviations
    pub lower: f64,
    /// `(close - lower) / (upper - lower)`; `None` when the bands meet
    pub percent_b: Option<f64>,
    /// Position of the last close
    pub position: BandPosition,
}

/// Bollinger bands over the last `window` closes, `width` sample standard
/// deviations wide.
pub fn bollinger(closes: &[f64], window: usize, width: f64) -> Option<Bollinger> {
    let middle = sma(closes, window)?;
    let sd = stats::sample_std_dev(&closes[closes.len() - window..])?;
    let close = *closes.last()?;
    let (upper, lower) = (middle + width * sd, middle - width * sd);

    let position = if close > upper {
        BandPosition::AboveUpper
    } else if close < lower {
        BandPosition::BelowLower
    } else {
        BandPosition::Inside
    };
    Some(Bollinger {
        upper,
        middle,
        lower,
        percent_b: (upper > lower).then(|| (close - lower) / (upper - lower)),
        position,
    })
}

/// Annualised Sharpe ratio of daily returns against [`RISK_FREE_RATE`].
///
/// `None` with fewer than two returns or no variation.
pub fn sharpe_ratio(closes: &[f64]) -> Option<f64> {
    let returns = returns(closes);
    let sd = stats::sample_std_dev(&returns)?;
    if sd == 0.0 {
        return None;
    }
    let daily_rf = RISK_FREE_RATE / TRADING_DAYS;
    let excess = stats::mean(&returns)? - daily_rf;
    Some(TRADING_DAYS.sqrt() * excess / sd)
}

/// Last volume over the mean of the last `window` volumes.
pub fn volume_ratio(volumes: &[f64], window: usize) -> Option<f64> {
    let average = sma(volumes, window)?;
    stats::ratio(*volumes.last()?, average)
}

/// Largest peak-to-trough decline in percent.
pub fn max_drawdown(closes: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst: f64 = 0.0;
    for &close in closes {
        peak = peak.max(close);
        if peak > 0.0 {
            worst = worst.max(1.0 - close / peak);
        }
    }
    worst * 100.0
}

/// Ordering of the short, medium and long moving averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaAlignment {
    /// MA5 > MA20 > MA60
    Bullish,
    /// MA5 < MA20 < MA60
    Bearish,
    /// Anything else
    Mixed,
}

impl MaAlignment {
    /// Classify three moving averages.
    pub fn classify(ma5: f64, ma20: f64, ma60: f64) -> Self {
        if ma5 > ma20 && ma20 > ma60 {
            Self::Bullish
        } else if ma5 < ma20 && ma20 < ma60 {
            Self::Bearish
        } else {
            Self::Mixed
        }
    }
}

/// RSI reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiStatus {
    /// Above 70
    Overbought,
    /// Below 30
    Oversold,
    /// In between
    Neutral,
}

impl RsiStatus {
    /// Classify an RSI value.
    pub fn classify(rsi: f64) -> Self {
        if rsi > 70.0 {
            Self::Overbought
        } else if rsi < 30.0 {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }
}

/// Indicator snapshot at the last close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    /// Last close
    pub close: f64,
    /// 5-day moving average
    pub ma5: Option<f64>,
    /// 10-day moving average
    pub ma10: Option<f64>,
    /// 20-day moving average
    pub ma20: Option<f64>,
    /// 60-day moving average
    pub ma60: Option<f64>,
    /// RSI(14)
    pub rsi14: Option<f64>,
    /// Annualised volatility over 20 days, percent
    pub volatility_20d: Option<f64>,
    /// Annualised volatility over 60 days, percent
    pub volatility_60d: Option<f64>,
    /// Annualised volatility over 120 days, percent
    pub volatility_120d: Option<f64>,
    /// Close before the last one
    pub previous_close: Option<f64>,
    /// MACD(12, 26, 9)
    pub macd: Option<Macd>,
    /// Bollinger bands (20, 2)
    pub bollinger: Option<Bollinger>,
    /// Annualised Sharpe ratio over the whole series
    pub sharpe_ratio: Option<f64>,
    /// Last volume over its 20-day mean
    pub volume_ratio: Option<f64>,
    /// Max drawdown over the whole series, percent
    pub max_drawdown: f64,
    /// Lowest close over the last 50 days
    pub support: f64,
    /// Highest close over the last 50 days
    pub resistance: f64,
    /// Moving average ordering, when MA60 is available
    pub alignment: Option<MaAlignment>,
    /// RSI classification
    pub rsi_status: Option<RsiStatus>,
}

impl TrendSnapshot {
    /// Days looked back for support and resistance.
    pub const LOOKBACK: usize = 50;

    /// Compute the snapshot from closes alone, `None` for an empty series.
    pub fn from_closes(closes: &[f64]) -> Option<Self> {
        Self::from_series(closes, &[])
    }

    /// Compute the snapshot from closes and the matching volumes.
    pub fn from_series(closes: &[f64], volumes: &[f64]) -> Option<Self> {
        let close = *closes.last()?;
        let recent = &closes[closes.len().saturating_sub(Self::LOOKBACK)..];
        let (ma5, ma20, ma60) = (sma(closes, 5), sma(closes, 20), sma(closes, 60));
        let rsi14 = rsi(closes, 14);

        Some(Self {
            close,
            ma5,
            ma10: sma(closes, 10),
            ma20,
            ma60,
            rsi14,
            volatility_20d: annualized_volatility(closes, 20),
            volatility_60d: annualized_volatility(closes, 60),
            volatility_120d: annualized_volatility(closes, 120),
            previous_close: closes.len().checked_sub(2).map(|i| closes[i]),
            macd: macd(closes),
            bollinger: bollinger(closes, 20, 2.0),
            sharpe_ratio: sharpe_ratio(closes),
            volume_ratio: volume_ratio(volumes, 20),
            max_drawdown: max_drawdown(closes),
            support: stats::min(recent).unwrap_or(close),
            resistance: stats::max(recent).unwrap_or(close),
            alignment: match (ma5, ma20, ma60) {
                (Some(a), Some(b), Some(c)) => Some(MaAlignment::classify(a, b, c)),
                _ => None,
            },
            rsi_status: rsi14.map(RsiStatus::classify),
        })
    }

    /// Day-over-day change of the last close, percent.
    pub fn change_percent(&self) -> Option<f64> {
        let previous = self.previous_close.filter(|p| *p != 0.0)?;
        Some((self.close / previous - 1.0) * 100.0)
    }

    /// Conditions worth a warning: a move of at least `move_threshold`
    /// percent, an RSI extreme, or 20-day volatility above
    /// [`HIGH_VOLATILITY`].
    pub fn alerts(&self, move_threshold: f64) -> Vec<Alert> {
        let mut alerts = Vec::new();
        if let Some(change_percent) = self.change_percent() {
            if change_percent.abs() >= move_threshold {
                alerts.push(Alert::PriceMove { change_percent });
            }
        }
        if let (Some(status @ (RsiStatus::Overbought | RsiStatus::Oversold)), Some(value)) =
            (self.rsi_status, self.rsi14)
        {
            alerts.push(Alert::Rsi { status, value });
        }
        if let Some(volatility) = self.volatility_20d.filter(|v| *v > HIGH_VOLATILITY) {
            alerts.push(Alert::HighVolatility { volatility });
        }
        alerts
    }
}

/// A warning raised by [`TrendSnapshot::alerts`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    /// Large day-over-day move
    PriceMove {
        /// Percent change
        change_percent: f64,
    },
    /// Overbought or oversold
    Rsi {
        /// Classification
        status: RsiStatus,
        /// RSI(14)
        value: f64,
    },
    /// Annualised 20-day volatility above [`HIGH_VOLATILITY`]
    HighVolatility {
        /// Volatility, percent
        volatility: f64,
    },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriceMove { change_percent } => write!(f, "price moved {change_percent:+.2}%"),
            Self::Rsi { status, value } => write!(f, "RSI {value:.1} ({status:?})"),
            Self::HighVolatility { volatility } => write!(f, "high volatility {volatility:.1}%"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_needs_full_window() {
        assert_eq!(sma(&[1.0, 2.0, 3.0], 2), Some(2.5));
        assert_eq!(sma(&[1.0], 2), None);
        assert_eq!(sma(&[1.0], 0), None);
    }

    #[test]
    fn rsi_extremes() {
        let rising: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(rsi(&rising, 14), Some(100.0));
        assert_eq!(rsi(&[5.0; 20], 14), None);
        assert_eq!(rsi(&rising[..10], 14), None);
    }

    #[test]
    fn rsi_balanced_is_fifty() {
        let zigzag: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let value = rsi(&zigzag, 14).unwrap();
        assert!((value - 50.0).abs() < 1e-9);
        assert_eq!(RsiStatus::classify(value), RsiStatus::Neutral);
    }

    #[test]
    fn drawdown_from_peak() {
        let dd = max_drawdown(&[100.0, 120.0, 90.0, 130.0]);
        assert!((dd - 25.0).abs() < 1e-9);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn flat_series_has_no_volatility() {
        assert_eq!(annualized_volatility(&[10.0; 30], 20), Some(0.0));
        assert_eq!(annualized_volatility(&[10.0, 11.0], 20), None);
    }

    #[test]
    fn alignment() {
        assert_eq!(MaAlignment::classify(3.0, 2.0, 1.0), MaAlignment::Bullish);
        assert_eq!(MaAlignment::classify(1.0, 2.0, 3.0), MaAlignment::Bearish);
        assert_eq!(MaAlignment::classify(2.0, 3.0, 1.0), MaAlignment::Mixed);
    }

    #[test]
    fn ema_seeds_with_first_value() {
        assert_eq!(ema_series(&[], 3), Vec::<f64>::new());
        let ema = ema_series(&[2.0, 4.0, 4.0], 3);
        assert_eq!(ema, vec![2.0, 3.0, 3.5]);
    }

    #[test]
    fn macd_follows_the_trend() {
        let rising: Vec<f64> = (1..=60).map(f64::from).collect();
        let up = macd(&rising).unwrap();
        assert!(up.macd > 0.0);
        assert_eq!(up.cross, MacdCross::Golden);
        assert!((up.histogram - (up.macd - up.signal)).abs() < 1e-12);

        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        assert_eq!(macd(&falling).unwrap().cross, MacdCross::Death);
        assert!(macd(&rising[..25]).is_none());
    }

    #[test]
    fn bollinger_position() {
        let mut spike = vec![10.0; 19];
        spike.push(20.0);
        let bands = bollinger(&spike, 20, 2.0).unwrap();
        assert!((bands.middle - 10.5).abs() < 1e-12);
        assert!((bands.upper - (10.5 + 2.0 * 5.0_f64.sqrt())).abs() < 1e-9);
        assert_eq!(bands.position, BandPosition::AboveUpper);

        let zigzag: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 10.0 } else { 12.0 }).collect();
        let bands = bollinger(&zigzag, 20, 2.0).unwrap();
        assert_eq!(bands.position, BandPosition::Inside);
        let b = bands.percent_b.unwrap();
        assert!(b > 0.5 && b < 1.0, "percent b {b}");

        let flat = bollinger(&[10.0; 20], 20, 2.0).unwrap();
        assert_eq!(flat.percent_b, None);
        assert_eq!(flat.position, BandPosition::Inside);
        assert!(bollinger(&[10.0; 19], 20, 2.0).is_none());
    }

    #[test]
    fn sharpe_sign() {
        let mut gaining = vec![100.0];
        let mut losing = vec![100.0];
        for i in 0..40 {
            let (up, down) = if i % 2 == 0 { (1.02, 0.98) } else { (0.99, 1.01) };
            gaining.push(gaining[i] * up);
            losing.push(losing[i] * down);
        }
        assert!(sharpe_ratio(&gaining).unwrap() > 0.0);
        assert!(sharpe_ratio(&losing).unwrap() < 0.0);
        assert_eq!(sharpe_ratio(&[10.0; 30]), None);
        assert_eq!(sharpe_ratio(&[10.0, 11.0]), None);
    }

    #[test]
    fn volume_against_average() {
        let mut volumes = vec![100.0; 19];
        volumes.push(300.0);
        assert!((volume_ratio(&volumes, 20).unwrap() - 300.0 / 110.0).abs() < 1e-12);
        assert_eq!(volume_ratio(&volumes[..10], 20), None);
        assert_eq!(volume_ratio(&[0.0; 20], 20), None);
    }

    #[test]
    fn alerts_on_a_runaway_series() {
        let rising: Vec<f64> = (1..=20).map(f64::from).collect();
        let snapshot = TrendSnapshot::from_closes(&rising).unwrap();
        let alerts = snapshot.alerts(5.0);

        assert!(matches!(alerts[0], Alert::PriceMove { change_percent } if (change_percent - 100.0 / 19.0).abs() < 1e-9));
        assert!(alerts.contains(&Alert::Rsi { status: RsiStatus::Overbought, value: 100.0 }));
        assert!(matches!(alerts.last(), Some(Alert::HighVolatility { .. })));
        assert!(snapshot.alerts(6.0).iter().all(|a| !matches!(a, Alert::PriceMove { .. })));
    }

    #[test]
    fn quiet_series_has_no_alerts() {
        let snapshot = TrendSnapshot::from_series(&[10.0; 30], &[500.0; 30]).unwrap();
        assert!(snapshot.alerts(5.0).is_empty());
        assert_eq!(snapshot.change_percent(), Some(0.0));
        assert_eq!(snapshot.volume_ratio, Some(1.0));
        assert_eq!(snapshot.volatility_120d, Some(0.0));
        assert_eq!(snapshot.macd.map(|m| m.cross), Some(MacdCross::Death));
    }

    #[test]
    fn snapshot_on_short_series() {
        let snapshot = TrendSnapshot::from_closes(&[10.0, 12.0, 11.0]).unwrap();
        assert_eq!(snapshot.close, 11.0);
        assert_eq!(snapshot.support, 10.0);
        assert_eq!(snapshot.resistance, 12.0);
        assert_eq!(snapshot.ma5, None);
        assert_eq!(snapshot.alignment, None);
        assert_eq!(snapshot.previous_close, Some(12.0));
        assert_eq!(snapshot.macd, None);
        assert_eq!(snapshot.volume_ratio, None);
        assert!(TrendSnapshot::from_closes(&[]).is_none());
    }
}
