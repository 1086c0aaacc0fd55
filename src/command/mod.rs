//! Trade commands emitted by the advisor
//!
//! Advisor text goes through two steps:
//! 1. [`parse_advice`] turns text into a [`Directive`] (grammar only)
//! 2. [`Command::try_from`] checks the operation name, arity, symbol and
//!    numbers, producing a closed [`Command`] the dispatcher can match on

pub mod grammar;

pub use grammar::{parse_advice, parse_directive, Directive, ParseError};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{Asset, OrderId};

/// Decimal places of a limit order quantity
pub const QUANTITY_DECIMALS: u32 = 6;

/// Operation names the advisor may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    BuyCryptoPrice,
    BuyCryptoLimit,
    SellCryptoPrice,
    SellCryptoLimit,
    CancelOrder,
    DoNothing,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::BuyCryptoPrice,
        Operation::BuyCryptoLimit,
        Operation::SellCryptoPrice,
        Operation::SellCryptoLimit,
        Operation::CancelOrder,
        Operation::DoNothing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::BuyCryptoPrice => "buy_crypto_price",
            Operation::BuyCryptoLimit => "buy_crypto_limit",
            Operation::SellCryptoPrice => "sell_crypto_price",
            Operation::SellCryptoLimit => "sell_crypto_limit",
            Operation::CancelOrder => "cancel_order",
            Operation::DoNothing => "do_nothing",
        }
    }

    /// Number of positional arguments
    pub fn arity(&self) -> usize {
        match self {
            Operation::BuyCryptoPrice | Operation::SellCryptoPrice => 2,
            Operation::BuyCryptoLimit | Operation::SellCryptoLimit => 3,
            Operation::CancelOrder => 1,
            Operation::DoNothing => 0,
        }
    }

    /// Signature shown to the advisor, e.g. `buy_crypto_limit(symbol, amount, limit)`
    pub fn signature(&self) -> &'static str {
        match self {
            Operation::BuyCryptoPrice => "buy_crypto_price(symbol, amount)",
            Operation::BuyCryptoLimit => "buy_crypto_limit(symbol, amount, limit)",
            Operation::SellCryptoPrice => "sell_crypto_price(symbol, amount)",
            Operation::SellCryptoLimit => "sell_crypto_limit(symbol, amount, limit)",
            Operation::CancelOrder => "cancel_order(orderId)",
            Operation::DoNothing => "do_nothing()",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = CommandError;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let name = raw.trim();
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| CommandError::UnknownOperation(name.to_string()))
    }
}

/// A directive that parsed but cannot be executed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("{operation} takes {expected} argument(s), got {got}")]
    Arity {
        operation: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("{field} is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: Decimal },

    #[error("quantity rounds to zero: {quote_amount} at limit {limit_price}")]
    ZeroQuantity {
        quote_amount: Decimal,
        limit_price: Decimal,
    },

    #[error("quantity out of range: {quote_amount} at limit {limit_price}")]
    QuantityOverflow {
        quote_amount: Decimal,
        limit_price: Decimal,
    },
}

/// Validated trade command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    BuyAtMarket {
        asset: Asset,
        quote_amount: Decimal,
    },
    BuyAtLimit {
        asset: Asset,
        quote_amount: Decimal,
        limit_price: Decimal,
    },
    SellAtMarket {
        asset: Asset,
        quote_amount: Decimal,
    },
    SellAtLimit {
        asset: Asset,
        quote_amount: Decimal,
        limit_price: Decimal,
    },
    CancelOrder {
        order_id: OrderId,
    },
    NoOp,
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Command::BuyAtMarket { .. } => Operation::BuyCryptoPrice,
            Command::BuyAtLimit { .. } => Operation::BuyCryptoLimit,
            Command::SellAtMarket { .. } => Operation::SellCryptoPrice,
            Command::SellAtLimit { .. } => Operation::SellCryptoLimit,
            Command::CancelOrder { .. } => Operation::CancelOrder,
            Command::NoOp => Operation::DoNothing,
        }
    }

    pub fn asset(&self) -> Option<Asset> {
        match self {
            Command::BuyAtMarket { asset, .. }
            | Command::BuyAtLimit { asset, .. }
            | Command::SellAtMarket { asset, .. }
            | Command::SellAtLimit { asset, .. } => Some(*asset),
            Command::CancelOrder { .. } | Command::NoOp => None,
        }
    }

    pub fn quote_amount(&self) -> Option<Decimal> {
        match self {
            Command::BuyAtMarket { quote_amount, .. }
            | Command::BuyAtLimit { quote_amount, .. }
            | Command::SellAtMarket { quote_amount, .. }
            | Command::SellAtLimit { quote_amount, .. } => Some(*quote_amount),
            Command::CancelOrder { .. } | Command::NoOp => None,
        }
    }

    pub fn limit_price(&self) -> Option<Decimal> {
        match self {
            Command::BuyAtLimit { limit_price, .. } | Command::SellAtLimit { limit_price, .. } => {
                Some(*limit_price)
            }
            _ => None,
        }
    }

    /// Base-asset quantity a limit command places
    pub fn limit_quantity(&self) -> Option<Decimal> {
        match self {
            Command::BuyAtLimit {
                quote_amount,
                limit_price,
                ..
            }
            | Command::SellAtLimit {
                quote_amount,
                limit_price,
                ..
            } => limit_quantity(*quote_amount, *limit_price),
            _ => None,
        }
    }

    /// Buys and sells are recorded in the ledger; cancels and no-ops are not
    pub fn is_trade(&self) -> bool {
        self.asset().is_some()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::BuyAtMarket {
                asset,
                quote_amount,
            }
            | Command::SellAtMarket {
                asset,
                quote_amount,
            } => write!(f, "{}({}, {})", self.operation(), asset, quote_amount),
            Command::BuyAtLimit {
                asset,
                quote_amount,
                limit_price,
            }
            | Command::SellAtLimit {
                asset,
                quote_amount,
                limit_price,
            } => write!(
                f,
                "{}({}, {}, {})",
                self.operation(),
                asset,
                quote_amount,
                limit_price
            ),
            Command::CancelOrder { order_id } => write!(f, "{}({})", self.operation(), order_id),
            Command::NoOp => write!(f, "{}()", self.operation()),
        }
    }
}

impl TryFrom<&Directive> for Command {
    type Error = CommandError;

    fn try_from(directive: &Directive) -> std::result::Result<Self, Self::Error> {
        let operation: Operation = directive.operation.parse()?;
        let args = &directive.args;

        if args.len() != operation.arity() {
            return Err(CommandError::Arity {
                operation: operation.name(),
                expected: operation.arity(),
                got: args.len(),
            });
        }

        let command = match operation {
            Operation::BuyCryptoPrice => Command::BuyAtMarket {
                asset: parse_asset(&args[0])?,
                quote_amount: parse_positive("amount", &args[1])?,
            },
            Operation::SellCryptoPrice => Command::SellAtMarket {
                asset: parse_asset(&args[0])?,
                quote_amount: parse_positive("amount", &args[1])?,
            },
            Operation::BuyCryptoLimit => Command::BuyAtLimit {
                asset: parse_asset(&args[0])?,
                quote_amount: parse_positive("amount", &args[1])?,
                limit_price: parse_positive("limit", &args[2])?,
            },
            Operation::SellCryptoLimit => Command::SellAtLimit {
                asset: parse_asset(&args[0])?,
                quote_amount: parse_positive("amount", &args[1])?,
                limit_price: parse_positive("limit", &args[2])?,
            },
            Operation::CancelOrder => Command::CancelOrder {
                order_id: OrderId::new(args[0].as_str()),
            },
            Operation::DoNothing => Command::NoOp,
        };

        if let (Some(quote_amount), Some(limit_price)) =
            (command.quote_amount(), command.limit_price())
        {
            match limit_quantity(quote_amount, limit_price) {
                None => {
                    return Err(CommandError::QuantityOverflow {
                        quote_amount,
                        limit_price,
                    })
                }
                Some(quantity) if quantity.is_zero() => {
                    return Err(CommandError::ZeroQuantity {
                        quote_amount,
                        limit_price,
                    })
                }
                Some(_) => {}
            }
        }

        Ok(command)
    }
}

impl TryFrom<Directive> for Command {
    type Error = CommandError;

    fn try_from(directive: Directive) -> std::result::Result<Self, Self::Error> {
        Command::try_from(&directive)
    }
}

/// `quote_amount / limit_price` rounded to the venue's quantity granularity.
/// `None` when the quotient does not fit in a `Decimal`.
pub fn limit_quantity(quote_amount: Decimal, limit_price: Decimal) -> Option<Decimal> {
    quote_amount
        .checked_div(limit_price)
        .map(|quantity| quantity.round_dp(QUANTITY_DECIMALS))
}

fn parse_asset(raw: &str) -> std::result::Result<Asset, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::UnknownSymbol(raw.to_string()))
}

fn parse_positive(field: &'static str, raw: &str) -> std::result::Result<Decimal, CommandError> {
    let cleaned = raw.trim().trim_start_matches('$').replace('_', "");
    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| CommandError::InvalidNumber {
            field,
            value: raw.to_string(),
        })?;

    if value <= Decimal::ZERO {
        return Err(CommandError::NotPositive { field, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn command(line: &str) -> std::result::Result<Command, CommandError> {
        let directive = parse_directive(line).expect("line should parse");
        Command::try_from(&directive)
    }

    #[test]
    fn market_buy_from_advice() {
        assert_eq!(
            command(r#"buy_crypto_price("BTC", 30)"#).unwrap(),
            Command::BuyAtMarket {
                asset: Asset::Btc,
                quote_amount: dec!(30),
            }
        );
    }

    #[test]
    fn limit_buy_quantity_is_rounded_to_six_places() {
        let cmd = command(r#"buy_crypto_limit("ETH", 100, 2000)"#).unwrap();
        assert_eq!(cmd.limit_quantity(), Some(dec!(0.05)));

        let cmd = command("sell_crypto_limit(SOL, 10, 3)").unwrap();
        assert_eq!(cmd.limit_quantity(), Some(dec!(3.333333)));
    }

    #[test]
    fn every_operation_accepts_exactly_its_arity() {
        let sample_args = ["BTC", "10", "20"];
        for op in Operation::ALL {
            for count in 0..=3 {
                let args: Vec<String> = if op == Operation::CancelOrder {
                    (0..count).map(|i| format!("{}", 100 + i)).collect()
                } else {
                    sample_args[..count].iter().map(|s| s.to_string()).collect()
                };
                let directive = Directive::new(op.name(), args);
                let result = Command::try_from(&directive);

                if count == op.arity() {
                    assert_eq!(result.unwrap().operation(), op);
                } else {
                    assert!(
                        matches!(result, Err(CommandError::Arity { .. })),
                        "{op} with {count} args"
                    );
                }
            }
        }
    }

    #[test]
    fn unknown_operation_is_rejected() {
        assert_eq!(
            command(r#"short_crypto("BTC", 10)"#).unwrap_err(),
            CommandError::UnknownOperation("short_crypto".to_string())
        );
    }

    #[test]
    fn arguments_are_validated() {
        assert!(matches!(
            command(r#"buy_crypto_price("BNB", 10)"#),
            Err(CommandError::UnknownSymbol(_))
        ));
        assert!(matches!(
            command(r#"buy_crypto_price("BTC", "ten")"#),
            Err(CommandError::InvalidNumber { field: "amount", .. })
        ));
        assert!(matches!(
            command(r#"sell_crypto_limit("BTC", 10, 0)"#),
            Err(CommandError::NotPositive { field: "limit", .. })
        ));
        assert!(matches!(
            command(r#"buy_crypto_price("BTC", -5)"#),
            Err(CommandError::NotPositive { .. })
        ));
        assert!(matches!(
            command(r#"buy_crypto_limit("BTC", 0.000001, 70000)"#),
            Err(CommandError::ZeroQuantity { .. })
        ));
    }

    #[test]
    fn tiny_limit_price_is_rejected_not_panicking() {
        let result = command(r#"buy_crypto_limit("BTC", 1000, 0.000000000000000000000000001)"#);
        assert_eq!(
            result,
            Err(CommandError::QuantityOverflow {
                quote_amount: dec!(1000),
                limit_price: dec!(0.000000000000000000000000001),
            })
        );
        assert_eq!(limit_quantity(dec!(1000), dec!(0.000000000000000000000000001)), None);
        assert_eq!(limit_quantity(dec!(10), dec!(3)), Some(dec!(3.333333)));
    }

    #[test]
    fn dollar_amounts_are_accepted() {
        assert_eq!(
            command(r#"sell_crypto_price("doge", "$12.50")"#).unwrap(),
            Command::SellAtMarket {
                asset: Asset::Doge,
                quote_amount: dec!(12.50),
            }
        );
    }

    #[test]
    fn only_buys_and_sells_are_trades() {
        assert!(command("buy_crypto_price(BTC, 1)").unwrap().is_trade());
        assert!(!command("cancel_order(12345)").unwrap().is_trade());
        assert!(!command("do_nothing()").unwrap().is_trade());
    }

    #[test]
    fn display_renders_directive_form() {
        let cmd = command(r#"buy_crypto_limit("ETH", 100, 2000)"#).unwrap();
        assert_eq!(cmd.to_string(), "buy_crypto_limit(ETH, 100, 2000)");
    }
}
