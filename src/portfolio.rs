//! Portfolio valuation: free cash plus mark-to-market holdings, in USD

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::domain::{Asset, Balance, SymbolResults, QUOTE_CURRENCY};
use crate::error::Result;
use crate::exchange::Venue;

/// Decimal places of reported USD values
pub const USD_DECIMALS: u32 = 2;

/// A held asset valued at its mark price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub asset: Asset,
    pub quantity: Decimal,
    pub mark_price: Decimal,
}

impl Position {
    pub fn new(asset: Asset, quantity: Decimal, mark_price: Decimal) -> Self {
        Self {
            asset,
            quantity,
            mark_price,
        }
    }

    /// Quantity × mark price, rounded to cents
    pub fn market_value(&self) -> Decimal {
        (self.quantity * self.mark_price).round_dp(USD_DECIMALS)
    }
}

/// Total account value. Each position is rounded to cents before summing.
pub fn valuate<'a, I>(positions: I, free_cash: Decimal) -> Decimal
where
    I: IntoIterator<Item = &'a Position>,
{
    let holdings: Decimal = positions.into_iter().map(Position::market_value).sum();
    (holdings + free_cash).round_dp(USD_DECIMALS)
}

/// Free quote-currency balance, zero when the account has none
pub fn free_cash(balances: &[Balance]) -> Decimal {
    balances
        .iter()
        .find(|b| b.asset == QUOTE_CURRENCY)
        .map(|b| b.free)
        .unwrap_or(Decimal::ZERO)
}

/// Account value at one point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Valuation {
    pub free_cash: Decimal,
    pub positions: SymbolResults<Position>,
    pub total_usd: Decimal,
}

/// Enumerates positions and values the account against a venue
pub struct PortfolioValuator;

impl PortfolioValuator {
    /// Price every non-zero universe balance.
    ///
    /// A failed price lookup drops that asset and is kept as a failure; the
    /// other assets are still priced.
    pub async fn positions(venue: &dyn Venue, balances: &[Balance]) -> SymbolResults<Position> {
        let mut positions = SymbolResults::new();

        for balance in balances.iter().filter(|b| b.free > Decimal::ZERO) {
            let Ok(asset) = balance.asset.parse::<Asset>() else {
                continue;
            };

            match venue.ticker(asset).await {
                Ok(ticker) => {
                    positions.insert(asset, Position::new(asset, balance.free, ticker.last_price))
                }
                Err(e) => {
                    warn!("Could not price {}: {}", asset.pair(), e);
                    positions.fail(asset, e.to_string());
                }
            }
        }

        positions
    }

    /// Fresh valuation: one balance read, one price lookup per held asset
    pub async fn valuate(venue: &dyn Venue) -> Result<Valuation> {
        let balances = venue.account_balances().await?;
        Ok(Self::valuate_balances(venue, &balances).await)
    }

    pub async fn valuate_balances(venue: &dyn Venue, balances: &[Balance]) -> Valuation {
        let cash = free_cash(balances);
        let positions = Self::positions(venue, balances).await;
        let total_usd = valuate(positions.values(), cash);

        Valuation {
            free_cash: cash,
            positions,
            total_usd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Ticker;
    use crate::error::PrinterError;
    use crate::exchange::MockVenue;
    use rust_decimal_macros::dec;

    fn balance(asset: &str, free: Decimal) -> Balance {
        Balance {
            asset: asset.to_string(),
            free,
            locked: Decimal::ZERO,
        }
    }

    fn ticker(asset: Asset, last: Decimal) -> Ticker {
        Ticker {
            asset,
            ask_price: last,
            bid_price: last,
            high_price: last,
            low_price: last,
            last_price: last,
            volume: dec!(1),
        }
    }

    #[test]
    fn rounds_each_position_before_summing() {
        let positions = vec![
            Position::new(Asset::Btc, dec!(0.001), dec!(10.005)), // 0.010005 -> 0.01
            Position::new(Asset::Eth, dec!(0.001), dec!(10.005)),
        ];
        assert_eq!(valuate(&positions, dec!(100)), dec!(100.02));
    }

    #[test]
    fn valuation_is_monotonic_in_quantity() {
        let mut positions = vec![
            Position::new(Asset::Btc, dec!(0.5), dec!(64000)),
            Position::new(Asset::Shib, dec!(1000000), dec!(0.0000183)),
        ];
        let mut previous = valuate(&positions, dec!(50));

        for step in 1..50 {
            positions[1].quantity += Decimal::from(step * 1000);
            let total = valuate(&positions, dec!(50));
            assert!(total >= previous, "{total} < {previous}");
            previous = total;
        }
    }

    #[test]
    fn free_cash_defaults_to_zero() {
        assert_eq!(free_cash(&[balance("BTC", dec!(1))]), Decimal::ZERO);
        assert_eq!(free_cash(&[balance("USDT", dec!(42.5))]), dec!(42.5));
    }

    #[tokio::test]
    async fn failed_price_lookup_only_drops_that_symbol() {
        let mut venue = MockVenue::new();
        venue.expect_account_balances().returning(|| {
            Ok(vec![
                balance("USDT", dec!(100)),
                balance("BTC", dec!(0.01)),
                balance("ETH", dec!(2)),
                balance("BNB", dec!(5)),
                balance("SOL", Decimal::ZERO),
            ])
        });
        venue.expect_ticker().returning(|asset| match asset {
            Asset::Btc => Ok(ticker(Asset::Btc, dec!(60000))),
            Asset::Eth => Err(PrinterError::VenueRequest {
                endpoint: "/api/v3/ticker/24hr".to_string(),
                status: 400,
                message: "-1121 Invalid symbol.".to_string(),
            }),
            other => panic!("unexpected ticker lookup for {other}"),
        });

        let valuation = PortfolioValuator::valuate(&venue).await.unwrap();

        assert_eq!(valuation.positions.len(), 1);
        assert!(valuation.positions.get(Asset::Eth).is_none());
        assert_eq!(valuation.positions.failures()[0].asset, Asset::Eth);
        assert_eq!(valuation.total_usd, dec!(700));
    }
}
