//! Turns a parsed directive into exactly one venue operation

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::command::{Command, CommandError, Directive};
use crate::domain::OrderAck;
use crate::error::{PrinterError, Result};
use crate::exchange::Venue;
use crate::ledger::{TradeLedger, TradeRecord};
use crate::portfolio::PortfolioValuator;

/// What happened to one directive
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Invalid command; nothing was sent to the venue
    Rejected {
        directive: Directive,
        error: CommandError,
    },
    /// Venue accepted the operation (no ack for a no-op)
    Executed {
        command: Command,
        ack: Option<OrderAck>,
        portfolio_value: Option<Decimal>,
    },
    /// Venue refused or the request failed
    Failed {
        command: Command,
        error: String,
        portfolio_value: Option<Decimal>,
    },
}

impl DispatchOutcome {
    /// Account value taken after the operation, if one was taken
    pub fn portfolio_value(&self) -> Option<Decimal> {
        match self {
            DispatchOutcome::Rejected { .. } => None,
            DispatchOutcome::Executed {
                portfolio_value, ..
            }
            | DispatchOutcome::Failed {
                portfolio_value, ..
            } => *portfolio_value,
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, DispatchOutcome::Executed { .. })
    }
}

pub struct OrderDispatcher {
    venue: Arc<dyn Venue>,
}

impl OrderDispatcher {
    pub fn new(venue: Arc<dyn Venue>) -> Self {
        Self { venue }
    }

    /// Validate, execute, value the account and record the trade.
    ///
    /// Venue errors are logged and returned in the outcome, never retried.
    pub async fn dispatch(&self, directive: &Directive, ledger: &mut TradeLedger) -> DispatchOutcome {
        let command = match Command::try_from(directive) {
            Ok(command) => command,
            Err(error) => {
                warn!(directive = %directive, "Invalid command: {}", error);
                return DispatchOutcome::Rejected {
                    directive: directive.clone(),
                    error,
                };
            }
        };

        info!(
            operation = %command.operation(),
            dry_run = self.venue.is_dry_run(),
            "Executing {}",
            command
        );

        let result = self.execute(&command).await;
        let portfolio_value = self.portfolio_value().await;

        match result {
            Ok(ack) => {
                if let Some(record) = TradeRecord::for_command(&command, Utc::now(), portfolio_value)
                {
                    ledger.record(record);
                }
                if let Some(ack) = &ack {
                    info!(
                        order_id = %ack.order_id,
                        status = %ack.status,
                        "{} accepted",
                        command.operation()
                    );
                }
                DispatchOutcome::Executed {
                    command,
                    ack,
                    portfolio_value,
                }
            }
            Err(e) => {
                error!(
                    operation = %command.operation(),
                    symbol = ?command.asset(),
                    amount = ?command.quote_amount(),
                    limit = ?command.limit_price(),
                    venue_error = e.is_venue_error(),
                    "Venue operation failed: {}",
                    e
                );
                DispatchOutcome::Failed {
                    command,
                    error: e.to_string(),
                    portfolio_value,
                }
            }
        }
    }

    async fn execute(&self, command: &Command) -> Result<Option<OrderAck>> {
        let venue = self.venue.as_ref();

        let ack = match command {
            Command::BuyAtMarket {
                asset,
                quote_amount,
            } => venue.market_buy(*asset, *quote_amount).await?,
            Command::SellAtMarket {
                asset,
                quote_amount,
            } => venue.market_sell(*asset, *quote_amount).await?,
            Command::BuyAtLimit {
                asset, limit_price, ..
            } => {
                let quantity = limit_quantity(command)?;
                venue.limit_buy(*asset, quantity, *limit_price).await?
            }
            Command::SellAtLimit {
                asset, limit_price, ..
            } => {
                let quantity = limit_quantity(command)?;
                venue.limit_sell(*asset, quantity, *limit_price).await?
            }
            Command::CancelOrder { order_id } => venue.cancel_order(order_id).await?,
            Command::NoOp => return Ok(None),
        };

        Ok(Some(ack))
    }

    async fn portfolio_value(&self) -> Option<Decimal> {
        match PortfolioValuator::valuate(self.venue.as_ref()).await {
            Ok(valuation) => {
                info!(
                    free_cash = %valuation.free_cash,
                    positions = valuation.positions.len(),
                    "Portfolio value in USD: {}",
                    valuation.total_usd
                );
                Some(valuation.total_usd)
            }
            Err(e) => {
                warn!("Portfolio valuation failed: {}", e);
                None
            }
        }
    }
}

fn limit_quantity(command: &Command) -> Result<Decimal> {
    command
        .limit_quantity()
        .ok_or_else(|| PrinterError::Internal(format!("no placeable quantity for {}", command)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{parse_directive, Operation};
    use crate::domain::{Asset, Balance, OrderId, Ticker};
    use crate::exchange::MockVenue;
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;

    fn account(venue: &mut MockVenue) {
        venue.expect_is_dry_run().return_const(false);
        venue.expect_account_balances().returning(|| {
            Ok(vec![
                Balance {
                    asset: "USDT".to_string(),
                    free: dec!(970),
                    locked: dec!(0),
                },
                Balance {
                    asset: "BTC".to_string(),
                    free: dec!(0.0005),
                    locked: dec!(0),
                },
            ])
        });
        venue.expect_ticker().returning(|asset| {
            Ok(Ticker {
                asset,
                ask_price: dec!(60000),
                bid_price: dec!(60000),
                high_price: dec!(60000),
                low_price: dec!(60000),
                last_price: dec!(60000),
                volume: dec!(1),
            })
        });
    }

    fn directive(line: &str) -> Directive {
        parse_directive(line).unwrap()
    }

    #[tokio::test]
    async fn test_market_buy_records_one_trade() {
        let mut venue = MockVenue::new();
        account(&mut venue);
        venue
            .expect_market_buy()
            .with(eq(Asset::Btc), eq(dec!(30)))
            .times(1)
            .returning(|asset, _| Ok(OrderAck::new(OrderId::new("1"), "FILLED").with_asset(asset)));

        let dispatcher = OrderDispatcher::new(Arc::new(venue));
        let mut ledger = TradeLedger::new();

        let outcome = dispatcher
            .dispatch(&directive(r#"buy_crypto_price("BTC", 30)"#), &mut ledger)
            .await;

        assert!(outcome.is_executed());
        assert_eq!(outcome.portfolio_value(), Some(dec!(1000)));
        assert_eq!(ledger.len(), 1);
        let entry = ledger.latest().unwrap();
        assert_eq!(entry.action, Operation::BuyCryptoPrice);
        assert_eq!(entry.symbol, Asset::Btc);
        assert_eq!(entry.amount, dec!(30));
        assert_eq!(entry.limit, None);
        assert_eq!(entry.portfolio_value_usd, Some(dec!(1000)));
    }

    #[tokio::test]
    async fn test_limit_buy_places_derived_quantity() {
        let mut venue = MockVenue::new();
        account(&mut venue);
        venue
            .expect_limit_buy()
            .with(eq(Asset::Eth), eq(dec!(0.05)), eq(dec!(2000)))
            .times(1)
            .returning(|_, _, _| Ok(OrderAck::new(OrderId::new("2"), "NEW")));

        let dispatcher = OrderDispatcher::new(Arc::new(venue));
        let mut ledger = TradeLedger::new();

        dispatcher
            .dispatch(&directive("buy_crypto_limit(\"ETH\", 100, 2000)"), &mut ledger)
            .await;

        assert_eq!(ledger.latest().unwrap().limit, Some(dec!(2000)));
    }

    #[tokio::test]
    async fn test_limit_sell_places_derived_quantity() {
        let mut venue = MockVenue::new();
        account(&mut venue);
        venue
            .expect_limit_sell()
            .with(eq(Asset::Sol), eq(dec!(3.333333)), eq(dec!(3)))
            .times(1)
            .returning(|_, _, _| Ok(OrderAck::new(OrderId::new("4"), "NEW")));

        let dispatcher = OrderDispatcher::new(Arc::new(venue));
        let mut ledger = TradeLedger::new();

        let outcome = dispatcher
            .dispatch(&directive("sell_crypto_limit(\"SOL\", 10, 3)"), &mut ledger)
            .await;

        assert!(outcome.is_executed());
        assert_eq!(ledger.len(), 1);
        let entry = ledger.latest().unwrap();
        assert_eq!(entry.action, Operation::SellCryptoLimit);
        assert_eq!(entry.symbol, Asset::Sol);
        assert_eq!(entry.amount, dec!(10));
        assert_eq!(entry.limit, Some(dec!(3)));
    }

    #[tokio::test]
    async fn test_market_sell_records_one_trade() {
        let mut venue = MockVenue::new();
        account(&mut venue);
        venue
            .expect_market_sell()
            .with(eq(Asset::Eth), eq(dec!(40)))
            .times(1)
            .returning(|asset, _| Ok(OrderAck::new(OrderId::new("5"), "FILLED").with_asset(asset)));

        let dispatcher = OrderDispatcher::new(Arc::new(venue));
        let mut ledger = TradeLedger::new();

        let outcome = dispatcher
            .dispatch(&directive("sell_crypto_price(\"ETH\", 40)"), &mut ledger)
            .await;

        assert!(outcome.is_executed());
        assert_eq!(ledger.len(), 1);
        let entry = ledger.latest().unwrap();
        assert_eq!(entry.action, Operation::SellCryptoPrice);
        assert_eq!(entry.symbol, Asset::Eth);
        assert_eq!(entry.amount, dec!(40));
        assert_eq!(entry.limit, None);
    }

    #[tokio::test]
    async fn test_noop_values_but_records_nothing() {
        let mut venue = MockVenue::new();
        account(&mut venue);

        let dispatcher = OrderDispatcher::new(Arc::new(venue));
        let mut ledger = TradeLedger::new();

        let outcome = dispatcher.dispatch(&directive("do_nothing()"), &mut ledger).await;

        assert!(outcome.is_executed());
        assert_eq!(outcome.portfolio_value(), Some(dec!(1000)));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_passes_id_and_records_nothing() {
        let mut venue = MockVenue::new();
        account(&mut venue);
        venue
            .expect_cancel_order()
            .withf(|id| id.as_str() == "12345")
            .times(1)
            .returning(|id| Ok(OrderAck::new(id.clone(), "CANCELED")));

        let dispatcher = OrderDispatcher::new(Arc::new(venue));
        let mut ledger = TradeLedger::new();

        let outcome = dispatcher
            .dispatch(&directive("cancel_order(\"12345\")"), &mut ledger)
            .await;

        assert!(outcome.is_executed());
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_commands_never_reach_the_venue() {
        // No expectations: any venue call panics
        let dispatcher = OrderDispatcher::new(Arc::new(MockVenue::new()));
        let mut ledger = TradeLedger::new();

        for line in [
            "hodl(\"BTC\")",
            "buy_crypto_price(\"BTC\")",
            "buy_crypto_price(\"BNB\", 30)",
            "sell_crypto_price(\"ETH\", lots)",
            "sell_crypto_limit(\"ETH\", -5, 2000)",
        ] {
            let outcome = dispatcher.dispatch(&directive(line), &mut ledger).await;
            assert!(
                matches!(outcome, DispatchOutcome::Rejected { .. }),
                "{} was not rejected",
                line
            );
            assert_eq!(outcome.portfolio_value(), None);
        }
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_venue_failure_is_logged_not_recorded() {
        let mut venue = MockVenue::new();
        account(&mut venue);
        venue.expect_market_sell().times(1).returning(|_, _| {
            Err(PrinterError::VenueRequest {
                endpoint: "/api/v3/order".to_string(),
                status: 400,
                message: "-2010 Account has insufficient balance".to_string(),
            })
        });

        let dispatcher = OrderDispatcher::new(Arc::new(venue));
        let mut ledger = TradeLedger::new();

        let outcome = dispatcher
            .dispatch(&directive("sell_crypto_price(\"SOL\", 50)"), &mut ledger)
            .await;

        assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
        assert_eq!(outcome.portfolio_value(), Some(dec!(1000)));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_failed_valuation_still_records_trade() {
        let mut venue = MockVenue::new();
        venue.expect_is_dry_run().return_const(false);
        venue
            .expect_account_balances()
            .returning(|| Err(PrinterError::RateLimited("418".to_string())));
        venue
            .expect_market_buy()
            .returning(|_, _| Ok(OrderAck::new(OrderId::new("3"), "FILLED")));

        let dispatcher = OrderDispatcher::new(Arc::new(venue));
        let mut ledger = TradeLedger::new();

        dispatcher
            .dispatch(&directive("buy_crypto_price(\"ADA\", 10)"), &mut ledger)
            .await;

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.latest().unwrap().portfolio_value_usd, None);
    }
}
