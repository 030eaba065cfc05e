#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use propvalue::config::ProvidersConfig;
use propvalue::http::{FetchError, FetchResponse, HttpFetcher};
use serde_json::Value;

pub const PAF: &str = "http://paf.test";
pub const GEO: &str = "http://geo.test";
pub const GEOCODE: &str = "http://geocode.test";
pub const HPI: &str = "http://hpi.test";

/// Canned responses keyed by URL; anything unrouted behaves like a dropped connection.
#[derive(Default)]
pub struct StubFetcher {
    routes: HashMap<String, FetchResponse>,
    requested: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn route(mut self, url: impl Into<String>, status: u16, body: Value) -> Self {
        self.routes.insert(url.into(), FetchResponse { status, body });
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("request log poisoned").clone()
    }
}

#[async_trait]
impl HttpFetcher for StubFetcher {
    async fn get_json(
        &self,
        url: &str,
        _query: &[(&str, String)],
    ) -> Result<FetchResponse, FetchError> {
        self.requested
            .lock()
            .expect("request log poisoned")
            .push(url.to_string());
        self.routes
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Transport {
                url: url.to_string(),
                reason: "connection reset by peer".to_string(),
            })
    }
}

pub fn providers_config(geocoding_key: Option<&str>) -> ProvidersConfig {
    ProvidersConfig {
        paf_api_key: Some("paf-test-key".to_string()),
        geocoding_api_key: geocoding_key.map(str::to_string),
        paf_base_url: PAF.to_string(),
        postcodes_base_url: GEO.to_string(),
        geocoding_base_url: GEOCODE.to_string(),
        hpi_base_url: HPI.to_string(),
        ..ProvidersConfig::default()
    }
}
