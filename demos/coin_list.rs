use coin_market_sdk::{CoinGeckoSource, CoinListController, CoinListState};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const ROWS: usize = 15;

fn print_table(state: &CoinListState) {
    println!(
        "{:>4}  {:<8} {:<20} {:>14} {:>9}",
        "#", "SYMBOL", "NAME", "PRICE (USD)", "24H %"
    );
    println!("{:-<60}", "");

    for (index, coin) in state.coins.iter().take(ROWS).enumerate() {
        let change = coin
            .price_change_24h()
            .map(|c| format!("{:+.2}", c))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:>4}  {:<8} {:<20} {:>14.2} {:>9}",
            coin.market_cap_rank.unwrap_or(index as u32 + 1),
            coin.display_symbol(),
            coin.name,
            coin.current_price,
            change
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // COIN_MARKETS_URL points the source at a different markets endpoint
    let source = Arc::new(CoinGeckoSource::new()?);
    println!("Coin Market SDK demo");
    println!("Endpoint: {}", source.endpoint().base_url());
    println!("Request:  {}", source.endpoint().url()?);
    println!("==================================");

    let controller = Arc::new(CoinListController::new(source));

    let start = Instant::now();
    controller.initialize().await;
    let state = controller.state();

    if let Some(err) = &state.last_error {
        eprintln!("Initial load failed: {}", err);
    } else {
        println!("Loaded {} coins in {:?}\n", state.coins.len(), start.elapsed());
        print_table(&state);
    }

    // Pull-to-refresh: fire and observe through the watch channel
    let mut updates = controller.subscribe();
    controller.spawn_refresh().await?;

    if updates.has_changed()? {
        let state = updates.borrow_and_update().clone();
        println!("\nAfter refresh (generation {}):", state.generation);
        if let Some(err) = &state.last_error {
            println!("  refresh failed, keeping previous list: {}", err);
        } else {
            print_table(&state);
        }
    }

    let health = controller.health_check().await;
    let metrics = controller.fetch_metrics().await;

    println!("\n{:-<60}", "");
    println!(
        "Health: {:?} ({})",
        health.status,
        health.message.unwrap_or_default()
    );
    println!(
        "Source {}: p50={:.0}ms, p99={:.0}ms, success_rate={:.1}%",
        metrics.source_name,
        metrics.latency_p50_ms,
        metrics.latency_p99_ms,
        metrics.success_rate * 100.0
    );

    Ok(())
}
