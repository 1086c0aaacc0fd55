//! Bounded record of recent trades, fed back to the advisor as memory

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::command::{Command, Operation};
use crate::domain::Asset;

/// Number of trades the ledger keeps
pub const LEDGER_CAPACITY: usize = 10;

/// One executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub action: Operation,
    pub symbol: Asset,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Decimal>,
    pub time: DateTime<Utc>,
    /// Account value taken after the trade; absent if valuation failed
    pub portfolio_value_usd: Option<Decimal>,
}

impl TradeRecord {
    /// Build a record for a trade command. Returns `None` for cancels and no-ops.
    pub fn for_command(
        command: &Command,
        time: DateTime<Utc>,
        portfolio_value_usd: Option<Decimal>,
    ) -> Option<Self> {
        Some(Self {
            action: command.operation(),
            symbol: command.asset()?,
            amount: command.quote_amount()?,
            limit: command.limit_price(),
            time,
            portfolio_value_usd,
        })
    }
}

/// FIFO ledger holding at most [`LEDGER_CAPACITY`] trades
#[derive(Debug, Clone)]
pub struct TradeLedger {
    entries: VecDeque<TradeRecord>,
    capacity: usize,
}

impl Default for TradeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::with_capacity(LEDGER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a trade, evicting the oldest once over capacity
    pub fn record(&mut self, entry: TradeRecord) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Current entries, oldest first
    pub fn recent(&self) -> Vec<TradeRecord> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradeRecord> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&TradeRecord> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
