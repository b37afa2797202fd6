//! Source abstraction for fetching the coin market list

use crate::{error::FetchError, types::Coin};
use async_trait::async_trait;

/// Trait for market data sources
///
/// The controller only talks to this trait, so the HTTP-backed source and the
/// fixture used in tests are interchangeable at construction time.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetches the current coin list
    ///
    /// # Returns
    /// The coins in upstream order, or the classified failure. Implementations
    /// perform no retries.
    async fn fetch_coins(&self) -> Result<Vec<Coin>, FetchError>;

    /// Returns the name of this source
    fn source_name(&self) -> &'static str;
}
