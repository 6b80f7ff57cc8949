use std::collections::HashMap;
use std::sync::Arc;

use courier_core::{DeliveryProvider, ProviderError, ProviderKey, ProviderResolver};
use tracing::debug;

use crate::kwik::{KwikConfig, KwikProvider};
use crate::manual::ManualProvider;

/// The one place courier integrations are registered.
///
/// Keys without a registered provider resolve to [`ManualProvider`], so
/// dispatch code never has to special-case "no provider".
pub struct ProviderFactory {
    manual: Arc<dyn DeliveryProvider>,
    providers: HashMap<ProviderKey, Arc<dyn DeliveryProvider>>,
}

impl ProviderFactory {
    /// Only the manual provider.
    pub fn manual_only() -> Self {
        Self {
            manual: Arc::new(ManualProvider::new()),
            providers: HashMap::new(),
        }
    }

    /// Builds every configured integration up front. A present but
    /// incomplete Kwik section is an operator error and fails here.
    pub fn from_config(kwik: Option<KwikConfig>) -> Result<Self, ProviderError> {
        let mut factory = Self::manual_only();
        if let Some(config) = kwik {
            let provider = KwikProvider::new(config)?;
            factory = factory.register(ProviderKey::Kwik, Arc::new(provider));
        }
        Ok(factory)
    }

    pub fn register(mut self, key: ProviderKey, provider: Arc<dyn DeliveryProvider>) -> Self {
        self.providers.insert(key, provider);
        self
    }
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::manual_only()
    }
}

impl ProviderResolver for ProviderFactory {
    fn is_configured(&self, key: &ProviderKey) -> bool {
        !key.requires_credentials() || self.providers.contains_key(key)
    }

    fn resolve(&self, key: &ProviderKey) -> Arc<dyn DeliveryProvider> {
        match self.providers.get(key) {
            Some(provider) => provider.clone(),
            None => {
                if *key != ProviderKey::Manual {
                    debug!("No provider registered for {}, falling back to manual", key);
                }
                self.manual.clone()
            }
        }
    }
}
