//! Markets endpoint configuration

use crate::{
    constants::{COINGECKO_MARKETS_URL, MARKETS_QUERY, MARKETS_URL_ENV},
    error::FetchError,
};
use reqwest::Url;

/// Base URL plus the query sent with every markets request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketsEndpoint {
    base_url: String,
    query: Vec<(String, String)>,
}

impl MarketsEndpoint {
    /// Creates an endpoint for `base_url` with the fixed markets query
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            query: MARKETS_QUERY
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Uses `COIN_MARKETS_URL` as the base URL when set, CoinGecko otherwise
    pub fn from_env() -> Self {
        match std::env::var(MARKETS_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                tracing::debug!(base_url = %url, "Using markets URL from environment");
                Self::new(url.trim())
            }
            _ => Self::default(),
        }
    }

    /// Replaces a query parameter, or appends it when absent
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.query.iter_mut().find(|(k, _)| *k == key) {
            Some(pair) => pair.1 = value,
            None => self.query.push((key, value)),
        }
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Builds the request target
    ///
    /// Fails with `InvalidUrl` before any I/O if the base URL does not parse
    /// or is not http(s).
    pub fn url(&self) -> Result<Url, FetchError> {
        let url = Url::parse_with_params(&self.base_url, &self.query)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(FetchError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                self.base_url, scheme
            ))),
        }
    }
}

impl Default for MarketsEndpoint {
    fn default() -> Self {
        Self::new(COINGECKO_MARKETS_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url_carries_fixed_query() {
        let endpoint = MarketsEndpoint::default();
        assert_eq!(endpoint.base_url(), COINGECKO_MARKETS_URL);

        let url = endpoint.url().unwrap();
        assert_eq!(url.host_str(), Some("api.coingecko.com"));
        assert_eq!(url.path(), "/api/v3/coins/markets");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let expected: Vec<(String, String)> = MARKETS_QUERY
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn test_with_query_replaces_existing_pair() {
        let endpoint = MarketsEndpoint::default()
            .with_query("per_page", "10")
            .with_query("locale", "en");
        assert_eq!(endpoint.query().len(), MARKETS_QUERY.len() + 1);
        assert!(endpoint
            .query()
            .contains(&("per_page".to_string(), "10".to_string())));
        assert_eq!(
            endpoint.query().last(),
            Some(&("locale".to_string(), "en".to_string()))
        );
    }

    #[test]
    fn test_unparseable_base_url_is_invalid() {
        let err = MarketsEndpoint::new("not a url").url().unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn test_non_http_scheme_is_invalid() {
        let err = MarketsEndpoint::new("ftp://example.com/markets")
            .url()
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_url");
    }
}
