use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Asset, Balance, Kline, OpenOrder, OrderAck, OrderId, Ticker};
use crate::error::Result;

/// Spot venue the trading loop reads from and trades on.
///
/// Every call is a single request; implementations do not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Venue: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_dry_run(&self) -> bool;

    async fn ticker(&self, asset: Asset) -> Result<Ticker>;

    async fn account_balances(&self) -> Result<Vec<Balance>>;

    async fn open_orders(&self) -> Result<Vec<OpenOrder>>;

    async fn klines(&self, asset: Asset, interval: &str, limit: u16) -> Result<Vec<Kline>>;

    /// Market buy sized in quote currency
    async fn market_buy(&self, asset: Asset, quote_amount: Decimal) -> Result<OrderAck>;

    async fn limit_buy(&self, asset: Asset, quantity: Decimal, price: Decimal) -> Result<OrderAck>;

    /// Market sell sized in quote currency
    async fn market_sell(&self, asset: Asset, quote_amount: Decimal) -> Result<OrderAck>;

    async fn limit_sell(&self, asset: Asset, quantity: Decimal, price: Decimal)
        -> Result<OrderAck>;

    async fn cancel_order(&self, order_id: &OrderId) -> Result<OrderAck>;
}
