use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::guard::{GuardPolicy, ProviderGuard};
use super::{AddressProvider, FormattedAddress, LookupError};
use crate::postcode::normalize;

/// Addresses plus the provider that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub provider: &'static str,
    pub addresses: Vec<FormattedAddress>,
}

struct GuardedProvider {
    provider: Arc<dyn AddressProvider>,
    guard: ProviderGuard,
}

/// Ordered fallback chain over the configured address providers.
pub struct AddressResolver {
    policy: GuardPolicy,
    providers: Vec<GuardedProvider>,
}

impl AddressResolver {
    pub fn new(policy: GuardPolicy) -> Self {
        Self {
            policy,
            providers: Vec::new(),
        }
    }

    /// Append a provider at the lowest priority.
    pub fn with_provider(mut self, provider: Arc<dyn AddressProvider>) -> Self {
        let guard = ProviderGuard::new(provider.name(), self.policy);
        self.providers.push(GuardedProvider { provider, guard });
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .map(|entry| entry.provider.name())
            .collect()
    }

    /// Try each provider in order and return the first non-empty answer.
    ///
    /// A malformed postcode stops the chain. Otherwise, once every provider
    /// has been tried, a denial wins over "no data", which wins over
    /// transport failures, so operators see misconfigured keys first.
    pub async fn resolve(&self, raw: &str) -> Result<Resolution, LookupError> {
        let mut denied: Option<LookupError> = None;
        let mut last_failure: Option<LookupError> = None;
        let mut saw_no_data = false;

        for entry in &self.providers {
            let name = entry.provider.name();
            match self.attempt(entry, raw).await {
                Ok(addresses) if !addresses.is_empty() => {
                    info!(provider = name, count = addresses.len(), "addresses resolved");
                    return Ok(Resolution {
                        provider: name,
                        addresses,
                    });
                }
                Ok(_) | Err(LookupError::NoAddressesFound { .. }) => {
                    debug!(provider = name, "provider had no addresses, falling through");
                    saw_no_data = true;
                }
                Err(err @ LookupError::InvalidPostcodeFormat { .. }) => return Err(err),
                Err(err @ LookupError::RequestDenied { .. }) => {
                    warn!(provider = name, error = %err, "provider denied request");
                    denied.get_or_insert(err);
                }
                Err(err) => {
                    warn!(provider = name, error = %err, "provider failed, falling through");
                    last_failure = Some(err);
                }
            }
        }

        if let Some(err) = denied {
            return Err(err);
        }
        match last_failure {
            Some(err) if !saw_no_data => Err(err),
            _ => Err(LookupError::NoAddressesFound {
                postcode: display_postcode(raw),
            }),
        }
    }

    /// Invoke one named strategy, bypassing the rest of the chain.
    pub async fn resolve_with(&self, name: &str, raw: &str) -> Result<Resolution, LookupError> {
        let entry = self
            .providers
            .iter()
            .find(|entry| entry.provider.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| LookupError::UnknownProvider {
                name: name.to_string(),
            })?;

        let addresses = self.attempt(entry, raw).await?;
        Ok(Resolution {
            provider: entry.provider.name(),
            addresses,
        })
    }

    async fn attempt(
        &self,
        entry: &GuardedProvider,
        raw: &str,
    ) -> Result<Vec<FormattedAddress>, LookupError> {
        let name = entry.provider.name();
        if !entry.provider.is_configured() {
            return entry.provider.lookup(raw).await;
        }
        if let Err(rejection) = entry.guard.admit() {
            return Err(LookupError::AddressLookupFailed {
                provider: name,
                reason: rejection.to_string(),
            });
        }

        let outcome = entry.provider.lookup(raw).await;
        match &outcome {
            Err(LookupError::AddressLookupFailed { .. }) | Err(LookupError::RequestDenied { .. }) => {
                entry.guard.record_failure()
            }
            _ => entry.guard.record_success(),
        }
        outcome
    }
}

fn display_postcode(raw: &str) -> String {
    normalize(raw)
        .map(|postcode| postcode.to_string())
        .unwrap_or_else(|_| raw.trim().to_string())
}
