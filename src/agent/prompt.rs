//! Renders the state snapshot into an advice request

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use super::AdvicePrompt;
use crate::collector::StateSnapshot;
use crate::command::Operation;
use crate::domain::{Asset, QUOTE_CURRENCY};
use crate::error::Result;

/// Closing line of every request
pub const RESPONSE_INSTRUCTION: &str = "Respond with exactly ONE line containing ONE command \
in this format: command(\"symbol\", amount[, limit]). Example: buy_crypto_price(\"BTC\", 30)";

/// Builds the system and user messages for one cycle
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, snapshot: &StateSnapshot) -> Result<AdvicePrompt> {
        let state = serde_json::to_string_pretty(&render_state(snapshot))?;

        Ok(AdvicePrompt {
            system: format!("{}\n\nCurrent state:\n{}", preamble(snapshot.taken_at), state),
            user: command_menu(),
        })
    }
}

fn preamble(now: DateTime<Utc>) -> String {
    let universe = Asset::ALL
        .iter()
        .map(Asset::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut text = format!(
        "You manage a {quote} spot account and decide one action every cycle.\n\
         Tradable assets: {universe}. Amounts are in {quote}.\n\
         Base every decision on the data below: market tickers, free balance, positions, \
         open orders, news headlines and your own recent trades. \
         Keep a cash reserve and avoid overtrading.\n\n\
         Available commands:\n",
        quote = QUOTE_CURRENCY,
    );
    for op in Operation::ALL {
        text.push_str("- ");
        text.push_str(op.signature());
        text.push('\n');
    }
    text.push('\n');
    text.push_str(RESPONSE_INSTRUCTION);
    text.push_str(&format!("\n\nThe current date and time is {}.", now.to_rfc3339()));
    text
}

fn command_menu() -> String {
    let mut text = String::from("What is the most profitable action given this state?\n\n");
    for op in Operation::ALL {
        let meaning = match op {
            Operation::BuyCryptoPrice => "buy `amount` dollars of `symbol` at market",
            Operation::BuyCryptoLimit => "place a limit buy of `amount` dollars of `symbol` at `limit`",
            Operation::SellCryptoPrice => "sell `amount` dollars of `symbol` at market",
            Operation::SellCryptoLimit => {
                "place a limit sell of `amount` dollars of `symbol` at `limit`"
            }
            Operation::CancelOrder => "cancel the open order with that id",
            Operation::DoNothing => "keep everything as it is",
        };
        text.push_str(&format!("{}: {}\n", op.signature(), meaning));
    }
    text.push('\n');
    text.push_str(RESPONSE_INSTRUCTION);
    text
}

fn render_state(snapshot: &StateSnapshot) -> Value {
    let crypto_info: Vec<Value> = snapshot
        .tickers
        .values()
        .map(|t| {
            json!({
                "symbol": t.asset,
                "ask_price": t.ask_price,
                "bid_price": t.bid_price,
                "high_price": t.high_price,
                "low_price": t.low_price,
                "last_price": t.last_price,
                "volume": t.volume,
            })
        })
        .collect();

    let positions: Vec<Value> = snapshot
        .positions
        .values()
        .map(|p| {
            json!({
                "symbol": p.asset,
                "quantity": p.quantity.round_dp(4),
                "price": p.mark_price.round_dp(2),
                "value_usd": p.market_value(),
            })
        })
        .collect();

    let open_orders: Vec<Value> = snapshot
        .open_orders
        .iter()
        .map(|o| {
            json!({
                "id": o.id,
                "symbol": o.symbol,
                "type": o.order_type,
                "side": o.side,
                "quantity": o.quantity,
                "price": o.price,
            })
        })
        .collect();

    let news: Map<String, Value> = snapshot
        .news
        .iter()
        .filter(|(_, headlines)| !headlines.is_empty())
        .map(|(asset, headlines)| (asset.to_string(), json!(headlines)))
        .collect();

    let mut state = json!({
        "crypto_info": crypto_info,
        "balance": snapshot.free_cash,
        "positions": positions,
        "news": news,
        "open_orders": open_orders,
        "past_trades": snapshot.recent_trades,
    });

    if let Some(history) = &snapshot.history {
        let summaries: Map<String, Value> = history
            .iter()
            .map(|(asset, summary)| (asset.to_string(), json!(summary)))
            .collect();
        state["history"] = Value::Object(summaries);
    }

    let unavailable: Vec<Value> = snapshot
        .unavailable()
        .into_iter()
        .map(|(kind, asset, reason)| json!({ "kind": kind, "symbol": asset, "reason": reason }))
        .collect();
    if !unavailable.is_empty() {
        state["unavailable"] = Value::Array(unavailable);
    }

    state
}
