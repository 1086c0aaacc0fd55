//! Binance spot REST adapter
//!
//! Public market data goes through unsigned GETs; account and order
//! endpoints are HMAC-SHA256 signed. In dry-run mode reads still hit the
//! venue while order placement and cancellation are only logged.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Venue;
use crate::config::VenueConfig;
use crate::domain::{
    Asset, Balance, Kline, OpenOrder, OrderAck, OrderId, OrderSide, OrderType, Ticker,
};
use crate::error::{PrinterError, Result};
use crate::signing::{ApiCredentials, HmacAuth};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerResponse {
    ask_price: Decimal,
    bid_price: Decimal,
    high_price: Decimal,
    low_price: Decimal,
    last_price: Decimal,
    volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    balances: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    asset: String,
    free: Decimal,
    locked: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenOrderResponse {
    symbol: String,
    order_id: u64,
    side: OrderSide,
    #[serde(rename = "type")]
    order_type: String,
    price: Decimal,
    orig_qty: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    symbol: String,
    order_id: u64,
    #[serde(default)]
    client_order_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    executed_qty: Option<Decimal>,
    #[serde(default)]
    cummulative_quote_qty: Option<Decimal>,
}

impl OrderResponse {
    fn into_ack(self) -> OrderAck {
        OrderAck {
            order_id: OrderId::new(self.order_id.to_string()),
            client_order_id: self.client_order_id,
            asset: Asset::from_pair(&self.symbol),
            status: self.status.unwrap_or_else(|| "UNKNOWN".to_string()),
            executed_qty: self.executed_qty,
            quote_qty: self.cummulative_quote_qty,
            acknowledged_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: i64,
    msg: String,
}

/// How an order is sized
#[derive(Debug, Clone, Copy)]
enum OrderSize {
    /// Quote-currency amount (market orders)
    Quote(Decimal),
    /// Base quantity at a limit price
    Limit { quantity: Decimal, price: Decimal },
}

/// Binance spot REST client
pub struct BinanceVenue {
    http: Client,
    base_url: String,
    recv_window_ms: u64,
    auth: HmacAuth,
    dry_run: bool,
}

impl BinanceVenue {
    pub fn new(config: &VenueConfig, credentials: ApiCredentials, dry_run: bool) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PrinterError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        if !credentials.is_configured() {
            warn!("Venue credentials missing; signed endpoints will be rejected");
        }

        Ok(Self {
            http,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
            recv_window_ms: config.recv_window_ms,
            auth: HmacAuth::new(credentials),
            dry_run,
        })
    }

    fn encode(params: &[(&str, String)]) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}?{}", self.base_url, path, Self::encode(params));
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        Self::decode(path, response).await
    }

    async fn signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let mut all: Vec<(&str, String)> = params.to_vec();
        all.push(("recvWindow", self.recv_window_ms.to_string()));
        all.push(("timestamp", Utc::now().timestamp_millis().to_string()));

        let query = self.auth.signed_query(&Self::encode(&all))?;
        let url = format!("{}{}?{}", self.base_url, path, query);
        debug!("{} {}{}", method, self.base_url, path);

        let response = self
            .http
            .request(method, &url)
            .headers(self.auth.build_headers()?)
            .send()
            .await?;
        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(endpoint: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
            return Err(PrinterError::RateLimited(format!("{} returned {}", endpoint, status)));
        }

        let body = response.text().await?;
        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(err) => format!("{} {}", err.code, err.msg),
                Err(_) => body,
            };
            return Err(PrinterError::VenueRequest {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn place_order(&self, asset: Asset, side: OrderSide, size: OrderSize) -> Result<OrderAck> {
        let client_order_id = Uuid::new_v4().to_string();
        let mut params: Vec<(&str, String)> = vec![
            ("symbol", asset.pair()),
            ("side", side.to_string()),
            ("newClientOrderId", client_order_id.clone()),
        ];

        match size {
            OrderSize::Quote(amount) => {
                params.push(("type", OrderType::Market.to_string()));
                params.push(("quoteOrderQty", amount.normalize().to_string()));
            }
            OrderSize::Limit { quantity, price } => {
                params.push(("type", OrderType::Limit.to_string()));
                params.push(("timeInForce", "GTC".to_string()));
                params.push(("quantity", quantity.normalize().to_string()));
                params.push(("price", price.normalize().to_string()));
            }
        }

        if self.dry_run {
            info!("[dry-run] {} {} {:?} not sent", side, asset.pair(), size);
            let mut ack = OrderAck::new(OrderId::new(format!("dry-run-{}", client_order_id)), "DRY_RUN")
                .with_asset(asset);
            ack.client_order_id = Some(client_order_id);
            return Ok(ack);
        }

        let response: OrderResponse = self
            .signed_request(Method::POST, "/api/v3/order", &params)
            .await?;
        Ok(response.into_ack())
    }
}

/// Parse one kline row: `[openTime, open, high, low, close, volume, ...]`
fn parse_kline_row(row: &[serde_json::Value]) -> Option<Kline> {
    let decimal = |idx: usize| -> Option<Decimal> {
        row.get(idx)?
            .as_str()
            .and_then(|s| Decimal::from_str(s).ok())
    };

    let open_ms = row.first()?.as_i64()?;
    Some(Kline {
        open_time: Utc.timestamp_millis_opt(open_ms).single()?,
        open: decimal(1)?,
        high: decimal(2)?,
        low: decimal(3)?,
        close: decimal(4)?,
        volume: decimal(5)?,
    })
}

#[async_trait]
impl Venue for BinanceVenue {
    fn name(&self) -> &'static str {
        "binance"
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    async fn ticker(&self, asset: Asset) -> Result<Ticker> {
        let raw: TickerResponse = self
            .public_get("/api/v3/ticker/24hr", &[("symbol", asset.pair())])
            .await?;

        Ok(Ticker {
            asset,
            ask_price: raw.ask_price,
            bid_price: raw.bid_price,
            high_price: raw.high_price,
            low_price: raw.low_price,
            last_price: raw.last_price,
            volume: raw.volume,
        })
    }

    async fn account_balances(&self) -> Result<Vec<Balance>> {
        let account: AccountResponse = self
            .signed_request(Method::GET, "/api/v3/account", &[])
            .await?;

        Ok(account
            .balances
            .into_iter()
            .map(|b| Balance {
                asset: b.asset,
                free: b.free,
                locked: b.locked,
            })
            .collect())
    }

    async fn open_orders(&self) -> Result<Vec<OpenOrder>> {
        let orders: Vec<OpenOrderResponse> = self
            .signed_request(Method::GET, "/api/v3/openOrders", &[])
            .await?;

        Ok(orders
            .into_iter()
            .map(|o| OpenOrder {
                id: OrderId::new(o.order_id.to_string()),
                symbol: o.symbol,
                side: o.side,
                order_type: o.order_type,
                price: o.price,
                quantity: o.orig_qty,
            })
            .collect())
    }

    async fn klines(&self, asset: Asset, interval: &str, limit: u16) -> Result<Vec<Kline>> {
        let rows: Vec<Vec<serde_json::Value>> = self
            .public_get(
                "/api/v3/klines",
                &[
                    ("symbol", asset.pair()),
                    ("interval", interval.to_string()),
                    ("limit", limit.min(1000).to_string()),
                ],
            )
            .await?;

        let klines: Vec<Kline> = rows.iter().filter_map(|row| parse_kline_row(row)).collect();
        if klines.len() < rows.len() {
            warn!(
                "Dropped {} malformed kline rows for {}",
                rows.len() - klines.len(),
                asset
            );
        }
        Ok(klines)
    }

    async fn market_buy(&self, asset: Asset, quote_amount: Decimal) -> Result<OrderAck> {
        self.place_order(asset, OrderSide::Buy, OrderSize::Quote(quote_amount))
            .await
    }

    async fn limit_buy(&self, asset: Asset, quantity: Decimal, price: Decimal) -> Result<OrderAck> {
        self.place_order(asset, OrderSide::Buy, OrderSize::Limit { quantity, price })
            .await
    }

    async fn market_sell(&self, asset: Asset, quote_amount: Decimal) -> Result<OrderAck> {
        self.place_order(asset, OrderSide::Sell, OrderSize::Quote(quote_amount))
            .await
    }

    async fn limit_sell(
        &self,
        asset: Asset,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderAck> {
        self.place_order(asset, OrderSide::Sell, OrderSize::Limit { quantity, price })
            .await
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<OrderAck> {
        // The venue cancels by (pair, id), so find the pair first.
        let order = self
            .open_orders()
            .await?
            .into_iter()
            .find(|o| &o.id == order_id)
            .ok_or_else(|| PrinterError::OrderNotFound(order_id.to_string()))?;

        if self.dry_run {
            info!("[dry-run] cancel {} on {} not sent", order_id, order.symbol);
            let mut ack = OrderAck::new(order_id.clone(), "DRY_RUN");
            ack.asset = Asset::from_pair(&order.symbol);
            return Ok(ack);
        }

        let response: OrderResponse = self
            .signed_request(
                Method::DELETE,
                "/api/v3/order",
                &[
                    ("symbol", order.symbol.clone()),
                    ("orderId", order_id.to_string()),
                ],
            )
            .await?;
        Ok(response.into_ack())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn parses_kline_rows() {
        let row = vec![
            json!(1_700_000_000_000_i64),
            json!("100.5"),
            json!("110.0"),
            json!("99.1"),
            json!("105.25"),
            json!("1234.5"),
            json!(1_700_000_599_999_i64),
        ];
        let kline = parse_kline_row(&row).unwrap();
        assert_eq!(kline.open, dec!(100.5));
        assert_eq!(kline.close, dec!(105.25));
        assert_eq!(kline.volume, dec!(1234.5));
        assert_eq!(kline.open_time.timestamp_millis(), 1_700_000_000_000);

        assert!(parse_kline_row(&[json!("bad")]).is_none());
    }

    #[test]
    fn decodes_ticker_with_string_numbers() {
        let raw: TickerResponse = serde_json::from_value(json!({
            "symbol": "BTCUSDT",
            "askPrice": "64000.10",
            "bidPrice": "63999.90",
            "highPrice": "65000.00",
            "lowPrice": "62000.00",
            "lastPrice": "64000.00",
            "volume": "1520.334"
        }))
        .unwrap();
        assert_eq!(raw.ask_price, dec!(64000.10));
        assert_eq!(raw.volume, dec!(1520.334));
    }

    #[test]
    fn order_response_becomes_ack() {
        let raw: OrderResponse = serde_json::from_value(json!({
            "symbol": "ETHUSDT",
            "orderId": 28,
            "clientOrderId": "6gCrw2kRUAF9CvJDGP16IP",
            "status": "NEW",
            "executedQty": "0.00000000",
            "cummulativeQuoteQty": "0.00000000"
        }))
        .unwrap();
        let ack = raw.into_ack();
        assert_eq!(ack.order_id.as_str(), "28");
        assert_eq!(ack.asset, Some(Asset::Eth));
        assert_eq!(ack.status, "NEW");
    }

    #[test]
    fn encodes_params_in_order() {
        let query = BinanceVenue::encode(&[
            ("symbol", "BTCUSDT".to_string()),
            ("quoteOrderQty", "30".to_string()),
        ]);
        assert_eq!(query, "symbol=BTCUSDT&quoteOrderQty=30");
    }

    #[tokio::test]
    async fn dry_run_orders_are_not_sent() {
        let config = VenueConfig::default();
        let venue = BinanceVenue::new(&config, ApiCredentials::new("k", "s"), true).unwrap();

        let ack = venue.limit_buy(Asset::Eth, dec!(0.05), dec!(2000)).await.unwrap();
        assert_eq!(ack.status, "DRY_RUN");
        assert!(ack.order_id.as_str().starts_with("dry-run-"));
        assert_eq!(ack.asset, Some(Asset::Eth));
    }
}
