use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Asset;

/// 24h ticker for one pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub asset: Asset,
    pub ask_price: Decimal,
    pub bid_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub last_price: Decimal,
    pub volume: Decimal,
}

/// Free/locked balance of one account asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Venue asset code (not restricted to the tradable universe)
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// A single candlestick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Condensed view of a kline series, sized for the advice prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KlineSummary {
    pub candles: usize,
    pub first_open: Decimal,
    pub last_close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
    /// Percentage change from first open to last close
    pub change_pct: Decimal,
}

impl KlineSummary {
    pub fn from_klines(klines: &[Kline]) -> Option<Self> {
        let first = klines.first()?;
        let last = klines.last()?;

        let high = klines.iter().map(|k| k.high).max().unwrap_or(first.high);
        let low = klines.iter().map(|k| k.low).min().unwrap_or(first.low);
        let volume = klines.iter().map(|k| k.volume).sum();
        let change_pct = if first.open.is_zero() {
            Decimal::ZERO
        } else {
            ((last.close - first.open) / first.open * Decimal::ONE_HUNDRED).round_dp(2)
        };

        Some(Self {
            candles: klines.len(),
            first_open: first.open,
            last_close: last.close,
            high,
            low,
            volume,
            change_pct,
        })
    }
}

/// News headline for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
}
