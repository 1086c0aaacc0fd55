pub mod agent;
pub mod collector;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod ledger;
pub mod logging;
pub mod portfolio;
pub mod signing;
pub mod trader;

pub use agent::{Advisor, OpenAiAdvisor};
pub use collector::{NewsApiClient, NewsSource, SnapshotCollector, StateSnapshot};
pub use command::{parse_advice, parse_directive, Command, Directive, Operation, ParseError};
pub use config::{AppConfig, Credentials};
pub use dispatcher::{DispatchOutcome, OrderDispatcher};
pub use error::{PrinterError, Result};
pub use exchange::{BinanceVenue, Venue};
pub use ledger::{TradeLedger, TradeRecord};
pub use portfolio::{PortfolioValuator, Position, Valuation};
pub use trader::{CycleOutcome, CycleReport, Trader};
