//! # Coin Market SDK
//!
//! Fetches the top cryptocurrency markets from CoinGecko and keeps them in an
//! observable, ordered coin list for a presentation layer (GUI, terminal
//! dashboard, test harness) to render.
//!
//! ## Usage
//!
//! ```no_run
//! use coin_market_sdk::{CoinGeckoSource, CoinListController};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(CoinGeckoSource::new()?);
//! let controller = Arc::new(CoinListController::new(source));
//!
//! // Construction does nothing; the owner triggers the first fetch
//! controller.initialize().await;
//!
//! let mut updates = controller.subscribe();
//! controller.spawn_refresh(); // e.g. on pull-to-refresh
//!
//! updates.changed().await?;
//! for coin in updates.borrow().coins.iter() {
//!     println!("{:<6} {:>12.2}", coin.display_symbol(), coin.current_price);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! CoinListController::load() / refresh()
//!     ↓
//! spawned task → MarketDataSource::fetch_coins()
//!     ↓                (CoinGeckoSource: GET markets, status 200, JSON decode)
//! CoinStore (one watch::Sender::send_modify per completed fetch)
//!     ↓
//! Your code (coins(), subscribe(), subscribe_events())
//! ```
//!
//! ## Error Handling
//!
//! `fetch_coins` returns a [`FetchError`]; the controller never does. A failed
//! fetch leaves the published list as it was:
//!
//! ```no_run
//! use coin_market_sdk::{CoinListController, FixtureSource, FetchError};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let source = Arc::new(FixtureSource::failing(FetchError::bad_status(500)));
//! let controller = CoinListController::new(source);
//!
//! controller.load().await;
//! assert!(controller.coins().is_empty());
//! if let Some(err) = controller.last_error() {
//!     eprintln!("Coin list unavailable: {}", err);
//! }
//! # }
//! ```
//!
//! ## Configuration
//!
//! The endpoint and query are constants (see [`constants`]). Setting
//! `COIN_MARKETS_URL` replaces the base URL for [`CoinGeckoSource::new`].

pub mod constants;
pub mod controller;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod source;
pub mod sources;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use controller::CoinListController;
pub use endpoint::MarketsEndpoint;
pub use error::FetchError;
pub use metrics::FetchMetrics;
pub use source::MarketDataSource;
pub use sources::{CoinGeckoSource, FixtureSource};
pub use store::CoinListState;
pub use types::{
    Coin, CoinListEvent, ComponentHealth, HealthStatus, LoadPhase, RefreshPolicy, Sparkline,
};
