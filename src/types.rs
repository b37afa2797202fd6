//! Types for the coin market client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One market snapshot row from the markets endpoint
///
/// Only the first five fields are required. The optional ones are requested by
/// the fixed query and decoded when present; any other field in the payload is
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// Exchange-assigned slug (e.g. "bitcoin")
    pub id: String,

    /// Ticker, usually lowercase upstream (e.g. "btc")
    pub symbol: String,

    /// Human-readable name
    pub name: String,

    /// Icon URL, not validated
    pub image: String,

    /// Price in USD at fetch time
    pub current_price: f64,

    #[serde(default)]
    pub market_cap: Option<f64>,

    #[serde(default)]
    pub market_cap_rank: Option<u32>,

    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,

    #[serde(default)]
    pub price_change_percentage_1h_in_currency: Option<f64>,

    /// Seven-day price series (requested with `sparkline=true`)
    #[serde(default)]
    pub sparkline_in_7d: Option<Sparkline>,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Seven-day sparkline attached to a coin
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sparkline {
    #[serde(default)]
    pub price: Vec<f64>,
}

impl Coin {
    /// Creates a coin with only the required fields set
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        name: impl Into<String>,
        image: impl Into<String>,
        current_price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            image: image.into(),
            current_price,
            market_cap: None,
            market_cap_rank: None,
            price_change_percentage_24h: None,
            price_change_percentage_1h_in_currency: None,
            sparkline_in_7d: None,
            last_updated: None,
        }
    }

    /// Ticker normalized for display (uppercase)
    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }

    /// 24h price change percentage, if the upstream sent one
    pub fn price_change_24h(&self) -> Option<f64> {
        self.price_change_percentage_24h
    }

    /// Seven-day price series, empty when not provided
    pub fn sparkline(&self) -> &[f64] {
        self.sparkline_in_7d
            .as_ref()
            .map(|s| s.price.as_slice())
            .unwrap_or(&[])
    }
}

/// Whether the controller currently has a fetch in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    /// No fetch running
    Idle,
    /// At least one fetch running
    Loading,
}

/// How the controller resolves overlapping fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// A response started before the currently published list is dropped
    #[default]
    DiscardStale,
    /// Whichever fetch completes last is published
    LastWriteWins,
}

/// Coin list events for subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoinListEvent {
    /// A new coin list was published
    CoinsUpdated {
        id: Uuid,
        generation: u64,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A fetch failed; the published list is unchanged
    FetchFailed {
        id: Uuid,
        generation: u64,
        error_kind: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A successful response arrived after a newer list was published
    StaleResponseDiscarded {
        id: Uuid,
        generation: u64,
        published_generation: u64,
        timestamp: DateTime<Utc>,
    },
}

impl CoinListEvent {
    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            CoinListEvent::CoinsUpdated { id, .. } => *id,
            CoinListEvent::FetchFailed { id, .. } => *id,
            CoinListEvent::StaleResponseDiscarded { id, .. } => *id,
        }
    }

    /// Generation of the fetch that produced this event
    pub fn generation(&self) -> u64 {
        match self {
            CoinListEvent::CoinsUpdated { generation, .. } => *generation,
            CoinListEvent::FetchFailed { generation, .. } => *generation,
            CoinListEvent::StaleResponseDiscarded { generation, .. } => *generation,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            CoinListEvent::CoinsUpdated { .. } => "COINS_UPDATED",
            CoinListEvent::FetchFailed { .. } => "FETCH_FAILED",
            CoinListEvent::StaleResponseDiscarded { .. } => "STALE_RESPONSE_DISCARDED",
        }
    }
}

impl std::fmt::Display for CoinListEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoinListEvent::CoinsUpdated {
                generation, count, ..
            } => write!(f, "Coins updated: {} coins (generation {})", count, generation),
            CoinListEvent::FetchFailed {
                generation,
                error_message,
                ..
            } => write!(f, "Fetch {} failed: {}", generation, error_message),
            CoinListEvent::StaleResponseDiscarded {
                generation,
                published_generation,
                ..
            } => write!(
                f,
                "Discarded response {} (generation {} already published)",
                generation, published_generation
            ),
        }
    }
}

/// Overall component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// A list is published and the last fetch succeeded
    Healthy,
    /// A list is published but the last fetch failed
    Degraded,
    /// Nothing has been published yet
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
