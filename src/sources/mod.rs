//! Market data source implementations

pub mod coingecko;
pub mod fixture;

pub use coingecko::CoinGeckoSource;
pub use fixture::FixtureSource;
