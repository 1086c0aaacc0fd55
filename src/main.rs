use anyhow::{anyhow, Context};
use cryptoprinter::agent::OpenAiAdvisor;
use cryptoprinter::collector::{NewsApiClient, SnapshotCollector};
use cryptoprinter::config::{AppConfig, Credentials};
use cryptoprinter::dispatcher::OrderDispatcher;
use cryptoprinter::exchange::{BinanceVenue, Venue};
use cryptoprinter::logging::init_logging;
use cryptoprinter::trader::Trader;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Credentials may live in a local .env file
    let _ = dotenvy::dotenv();

    let config = AppConfig::load().context("failed to load configuration")?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("config: {}", e);
        }
        return Err(anyhow!("invalid configuration ({} error(s))", errors.len()));
    }

    let _log_guard = init_logging(&config.logging);

    let credentials = Credentials::from_env().context("missing credentials")?;
    if credentials.news_api_key.is_empty() {
        warn!("{} not set, prompts will carry no news", Credentials::NEWS_KEY_VAR);
    }

    let venue: Arc<dyn Venue> = Arc::new(
        BinanceVenue::new(&config.venue, credentials.venue, config.trading.dry_run)
            .context("failed to build venue client")?,
    );
    let advisor = Arc::new(
        OpenAiAdvisor::new(config.advisor.clone(), credentials.advisor_api_key)
            .context("failed to build advisor client")?,
    );
    let news = Arc::new(
        NewsApiClient::new(config.news.clone(), credentials.news_api_key)
            .context("failed to build news client")?,
    );

    let mut collector = SnapshotCollector::new(venue.clone(), news);
    if config.trading.include_history {
        collector = collector.with_history(
            config.trading.kline_interval.clone(),
            config.trading.kline_limit,
        );
    }

    let mut trader = Trader::new(
        collector,
        advisor,
        OrderDispatcher::new(venue.clone()),
        config.trading.interval(),
    );

    info!(
        venue = venue.name(),
        model = %config.advisor.model,
        dry_run = config.trading.dry_run,
        "Starting trading loop"
    );

    tokio::select! {
        result = trader.run() => {
            if let Err(e) = result {
                error!("Trading loop stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
