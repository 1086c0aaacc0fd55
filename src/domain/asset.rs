use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quote currency every trade and valuation is denominated in
pub const QUOTE_CURRENCY: &str = "USDT";

/// Tradable universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Btc,
    Eth,
    Xrp,
    Sol,
    Doge,
    Ada,
    Avax,
    Link,
    Shib,
    Xlm,
    Xtz,
}

impl Asset {
    pub const ALL: [Asset; 11] = [
        Asset::Btc,
        Asset::Eth,
        Asset::Xrp,
        Asset::Sol,
        Asset::Doge,
        Asset::Ada,
        Asset::Avax,
        Asset::Link,
        Asset::Shib,
        Asset::Xlm,
        Asset::Xtz,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Btc => "BTC",
            Asset::Eth => "ETH",
            Asset::Xrp => "XRP",
            Asset::Sol => "SOL",
            Asset::Doge => "DOGE",
            Asset::Ada => "ADA",
            Asset::Avax => "AVAX",
            Asset::Link => "LINK",
            Asset::Shib => "SHIB",
            Asset::Xlm => "XLM",
            Asset::Xtz => "XTZ",
        }
    }

    /// Venue trading pair against the quote currency, e.g. `BTCUSDT`
    pub fn pair(&self) -> String {
        format!("{}{}", self.as_str(), QUOTE_CURRENCY)
    }

    /// Reverse of [`Asset::pair`]
    pub fn from_pair(pair: &str) -> Option<Asset> {
        pair.strip_suffix(QUOTE_CURRENCY)
            .and_then(|base| base.parse().ok())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Asset {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let upper = raw.trim().to_ascii_uppercase();
        Asset::ALL
            .iter()
            .copied()
            .find(|asset| asset.as_str() == upper)
            .ok_or_else(|| format!("'{}' is not a tradable symbol", raw.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("btc".parse::<Asset>().unwrap(), Asset::Btc);
        assert_eq!(" Doge ".parse::<Asset>().unwrap(), Asset::Doge);
        assert!("BNB".parse::<Asset>().is_err());
    }

    #[test]
    fn pair_round_trips_through_venue_symbol() {
        assert_eq!(Asset::Shib.pair(), "SHIBUSDT");
        assert_eq!(Asset::from_pair("XTZUSDT"), Some(Asset::Xtz));
        assert_eq!(Asset::from_pair("BTCBUSD"), None);
    }
}
