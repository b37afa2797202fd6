//! CoinGecko markets source implementation

use crate::{
    constants::USER_AGENT,
    endpoint::MarketsEndpoint,
    error::FetchError,
    source::MarketDataSource,
    types::Coin,
};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};

/// CoinGecko markets source
///
/// Holds no state between calls besides the injected HTTP client, so one
/// instance can be shared across concurrent fetches.
#[derive(Debug, Clone)]
pub struct CoinGeckoSource {
    client: Client,
    endpoint: MarketsEndpoint,
}

impl CoinGeckoSource {
    /// Creates a source against the endpoint from the environment
    ///
    /// No request timeout is set; the transport default applies.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, MarketsEndpoint::from_env()))
    }

    /// Creates a source from an explicitly constructed client and endpoint
    pub fn with_client(client: Client, endpoint: MarketsEndpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &MarketsEndpoint {
        &self.endpoint
    }
}

/// Accepts exactly HTTP 200
fn check_status(status: StatusCode) -> Result<(), FetchError> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(FetchError::bad_status(status.as_u16()))
    }
}

/// Decodes a markets payload, keeping upstream order
pub(crate) fn decode_coins(body: &str) -> Result<Vec<Coin>, FetchError> {
    let coins: Vec<Coin> = serde_json::from_str(body)
        .map_err(|e| FetchError::decode(format!("Failed to parse markets response: {}", e)))?;

    if let Some(index) = coins.iter().position(|coin| coin.id.is_empty()) {
        return Err(FetchError::decode(format!(
            "Coin at index {} has an empty id",
            index
        )));
    }

    Ok(coins)
}

#[async_trait]
impl MarketDataSource for CoinGeckoSource {
    async fn fetch_coins(&self) -> Result<Vec<Coin>, FetchError> {
        let url = self.endpoint.url()?;
        tracing::debug!(url = %url, "Fetching coin markets");

        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(FetchError::transport)?;

        let status = response.status();
        check_status(status)?;

        let body = response.text().await.map_err(|e| FetchError::BadResponse {
            status: Some(status.as_u16()),
            message: format!("Failed to read response body: {}", e),
        })?;

        let coins = decode_coins(&body)?;

        tracing::debug!(count = coins.len(), "Decoded coin markets");

        Ok(coins)
    }

    fn source_name(&self) -> &'static str {
        "coingecko"
    }
}
