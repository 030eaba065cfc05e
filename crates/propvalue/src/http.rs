//! Outbound HTTP seam shared by every external data provider.
//!
//! Providers never construct their own client; they receive an
//! [`HttpFetcher`] so tests can substitute canned responses.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Status code and decoded JSON body from a provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Value,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("response from {url} was not valid JSON: {reason}")]
    Decode { url: String, reason: String },
}

/// JSON GET capability injected into address and price providers.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<FetchResponse, FetchError>;
}

/// Production fetcher backed by a single pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("propvalue/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| FetchError::Transport {
                url: "<client>".to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<FetchResponse, FetchError> {
        debug!(%url, "outbound provider request");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|err| FetchError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|err| FetchError::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

        // Error pages from some providers are HTML or empty; keep the status.
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(body) => body,
                Err(err) if (200..300).contains(&status) => {
                    return Err(FetchError::Decode {
                        url: url.to_string(),
                        reason: err.to_string(),
                    })
                }
                Err(_) => Value::String(text),
            }
        };

        Ok(FetchResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Route-table fetcher: exact URL match, unknown URLs fail as transport errors.
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        routes: HashMap<String, FetchResponse>,
        calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl FakeFetcher {
        pub(crate) fn with(mut self, url: &str, status: u16, body: Value) -> Self {
            self.routes
                .insert(url.to_string(), FetchResponse { status, body });
            self
        }

        pub(crate) fn calls(&self) -> Vec<(String, Vec<(String, String)>)> {
            self.calls.lock().expect("calls mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl HttpFetcher for FakeFetcher {
        async fn get_json(
            &self,
            url: &str,
            query: &[(&str, String)],
        ) -> Result<FetchResponse, FetchError> {
            self.calls.lock().expect("calls mutex poisoned").push((
                url.to_string(),
                query
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.clone()))
                    .collect(),
            ));

            self.routes
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Transport {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                })
        }
    }
}
