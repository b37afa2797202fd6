//! Constants for the coin market client
//!
//! The endpoint and its query are fixed here. The only runtime knob is the
//! `COIN_MARKETS_URL` environment variable, which swaps the base URL while
//! keeping the query intact.

/// CoinGecko markets endpoint (without query)
pub const COINGECKO_MARKETS_URL: &str = "https://api.coingecko.com/api/v3/coins/markets";

/// Fixed query sent with every markets request, in order
pub const MARKETS_QUERY: &[(&str, &str)] = &[
    ("vs_currency", "usd"),
    ("order", "market_cap_desc"),
    ("per_page", "100"),
    ("page", "1"),
    ("sparkline", "true"),
    ("price_change_percentage", "24h,1h"),
];

/// Environment variable overriding the markets base URL
pub const MARKETS_URL_ENV: &str = "COIN_MARKETS_URL";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coin-market-sdk/0.1.0";

/// Buffered events per subscriber before lagging receivers start dropping
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Maximum number of fetch samples kept for latency percentiles
pub const METRICS_WINDOW: usize = 100;
