//! Per-cycle state snapshot handed to the advisor

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::NewsSource;
use crate::domain::{Asset, Headline, KlineSummary, OpenOrder, SymbolResults, Ticker};
use crate::error::{PrinterError, Result};
use crate::exchange::Venue;
use crate::ledger::{TradeLedger, TradeRecord};
use crate::portfolio::{free_cash, PortfolioValuator, Position};

/// Everything the advisor gets to see in one cycle
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub taken_at: DateTime<Utc>,
    pub tickers: SymbolResults<Ticker>,
    /// Free quote-currency balance
    pub free_cash: Decimal,
    pub positions: SymbolResults<Position>,
    pub open_orders: Vec<OpenOrder>,
    pub news: SymbolResults<Vec<Headline>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<SymbolResults<KlineSummary>>,
    pub recent_trades: Vec<TradeRecord>,
}

impl StateSnapshot {
    /// Every per-symbol failure across the snapshot, labelled by kind
    pub fn unavailable(&self) -> Vec<(&'static str, Asset, &str)> {
        let mut out = Vec::new();
        for (kind, failures) in [
            ("ticker", self.tickers.failures()),
            ("position", self.positions.failures()),
            ("news", self.news.failures()),
        ] {
            out.extend(failures.iter().map(|f| (kind, f.asset, f.reason.as_str())));
        }
        if let Some(history) = &self.history {
            out.extend(
                history
                    .failures()
                    .iter()
                    .map(|f| ("history", f.asset, f.reason.as_str())),
            );
        }
        out
    }
}

#[derive(Debug, Clone)]
struct HistorySettings {
    interval: String,
    limit: u16,
}

/// Gathers a [`StateSnapshot`] from the venue and news source
pub struct SnapshotCollector {
    venue: Arc<dyn Venue>,
    news: Arc<dyn NewsSource>,
    history: Option<HistorySettings>,
}

impl SnapshotCollector {
    pub fn new(venue: Arc<dyn Venue>, news: Arc<dyn NewsSource>) -> Self {
        Self {
            venue,
            news,
            history: None,
        }
    }

    /// Also attach a kline summary per asset
    pub fn with_history(mut self, interval: impl Into<String>, limit: u16) -> Self {
        self.history = Some(HistorySettings {
            interval: interval.into(),
            limit,
        });
        self
    }

    /// Assemble the snapshot.
    ///
    /// Balance and open-order reads are required; any per-symbol lookup
    /// (ticker, price, news, history) may fail on its own and is reported
    /// in the snapshot instead.
    pub async fn collect(&self, ledger: &TradeLedger) -> Result<StateSnapshot> {
        let venue = self.venue.as_ref();

        let mut tickers = SymbolResults::new();
        for asset in Asset::ALL {
            tickers.push(asset, venue.ticker(asset).await);
        }
        log_failures("ticker", &tickers);

        let balances = venue
            .account_balances()
            .await
            .map_err(|e| PrinterError::Snapshot(format!("account balances: {}", e)))?;
        let positions = PortfolioValuator::positions(venue, &balances).await;

        let open_orders = venue
            .open_orders()
            .await
            .map_err(|e| PrinterError::Snapshot(format!("open orders: {}", e)))?;

        let mut news = SymbolResults::new();
        for asset in Asset::ALL {
            news.push(asset, self.news.headlines(asset).await);
        }
        log_failures("news", &news);

        let history = match &self.history {
            Some(settings) => Some(self.collect_history(settings).await),
            None => None,
        };

        debug!(
            "Snapshot: {} tickers, {} positions, {} open orders",
            tickers.len(),
            positions.len(),
            open_orders.len()
        );

        Ok(StateSnapshot {
            taken_at: Utc::now(),
            tickers,
            free_cash: free_cash(&balances),
            positions,
            open_orders,
            news,
            history,
            recent_trades: ledger.recent(),
        })
    }

    async fn collect_history(&self, settings: &HistorySettings) -> SymbolResults<KlineSummary> {
        let mut history = SymbolResults::new();
        for asset in Asset::ALL {
            match self
                .venue
                .klines(asset, &settings.interval, settings.limit)
                .await
            {
                Ok(klines) => match KlineSummary::from_klines(&klines) {
                    Some(summary) => history.insert(asset, summary),
                    None => history.fail(asset, "no candles returned"),
                },
                Err(e) => history.fail(asset, e.to_string()),
            }
        }
        log_failures("history", &history);
        history
    }
}

fn log_failures<T>(kind: &str, results: &SymbolResults<T>) {
    for failure in results.failures() {
        warn!(
            kind,
            symbol = %failure.asset,
            "Lookup failed: {}",
            failure.reason
        );
    }
}
