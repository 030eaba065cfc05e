//! Wires the address chain and price retriever from [`ProvidersConfig`].

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::address::{
    AddressProvider, AddressResolver, GeocodingProvider, GeographyProvider, PafProvider,
};
use crate::config::ProvidersConfig;
use crate::error::AppError;
use crate::http::{FetchError, HttpFetcher, ReqwestFetcher};
use crate::postcode::normalize;
use crate::pricing::{
    calculate_offer, OfferCalculationResult, PriceDataRetriever, PropertyPriceData, PropertyType,
    ValuationError,
};

/// Estimate plus cash offer for one property, as returned by the quick-quote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub postcode: String,
    pub property_type: PropertyType,
    pub bedrooms: u8,
    pub price: PropertyPriceData,
    pub offer: OfferCalculationResult,
}

pub struct ValuationPipeline {
    pub resolver: Arc<AddressResolver>,
    pub pricing: Arc<PriceDataRetriever>,
}

impl ValuationPipeline {
    /// Build against the real providers with a shared reqwest client.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, FetchError> {
        let fetcher: Arc<dyn HttpFetcher> = Arc::new(ReqwestFetcher::new(config.http_timeout)?);
        Ok(Self::with_fetcher(fetcher, config))
    }

    pub fn with_fetcher(fetcher: Arc<dyn HttpFetcher>, config: &ProvidersConfig) -> Self {
        let geography = Arc::new(GeographyProvider::new(
            fetcher.clone(),
            config.postcodes_base_url.clone(),
        ));

        let mut resolver = AddressResolver::new(config.guard);
        for name in &config.order {
            let provider: Arc<dyn AddressProvider> = match name.as_str() {
                "paf" => Arc::new(PafProvider::new(
                    fetcher.clone(),
                    config.paf_base_url.clone(),
                    config.paf_api_key.clone(),
                )),
                "geography" => geography.clone(),
                "geocoding" => Arc::new(GeocodingProvider::new(
                    fetcher.clone(),
                    config.geocoding_base_url.clone(),
                    config.geocoding_api_key.clone(),
                )),
                // config validation rejects anything else
                _ => continue,
            };
            resolver = resolver.with_provider(provider);
        }
        info!(providers = ?resolver.provider_names(), "address chain configured");

        let pricing = PriceDataRetriever::new(fetcher, geography, config.hpi_base_url.clone());

        Self {
            resolver: Arc::new(resolver),
            pricing: Arc::new(pricing),
        }
    }

    /// Price a property and derive the cash offer without recording a lead.
    pub async fn estimate(
        &self,
        raw_postcode: &str,
        property_type: PropertyType,
        bedrooms: u8,
    ) -> Result<Estimate, AppError> {
        let postcode = normalize(raw_postcode)?;
        let price = self
            .pricing
            .price_data(postcode.as_str(), property_type, bedrooms)
            .await;
        let market_value = i64::try_from(price.average_price)
            .map_err(|_| ValuationError::invalid("estimate exceeds supported range"))?;
        let offer = calculate_offer(market_value)?;

        Ok(Estimate {
            postcode: postcode.to_string(),
            property_type,
            bedrooms,
            price,
            offer,
        })
    }
}
