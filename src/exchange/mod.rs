pub mod binance;
mod traits;

pub use binance::BinanceVenue;
#[cfg(test)]
pub use traits::MockVenue;
pub use traits::Venue;
