//! Runtime selection of the provider implementation.

use fleetscale_core::{FleetConfig, ProviderIdentity};

use crate::digitalocean::DigitalOceanProvider;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{ActionOutcome, CreateRequest, FleetMember, Provider};

/// Every concrete provider this build supports, behind one `Provider` impl.
pub enum Backend {
    DigitalOcean(DigitalOceanProvider),
}

impl Backend {
    /// Build the backend for `identity` from its configuration section.
    pub fn from_config(identity: ProviderIdentity, config: &FleetConfig) -> ProviderResult<Self> {
        match identity {
            ProviderIdentity::DigitalOcean => {
                let section = config.digitalocean(identity)?.clone();
                Ok(Backend::DigitalOcean(DigitalOceanProvider::new(section)?))
            }
            other => Err(ProviderError::Unsupported(other)),
        }
    }
}

impl Provider for Backend {
    fn identity(&self) -> ProviderIdentity {
        match self {
            Backend::DigitalOcean(p) => p.identity(),
        }
    }

    async fn create(&self, request: &CreateRequest) -> ProviderResult<ActionOutcome> {
        match self {
            Backend::DigitalOcean(p) => p.create(request).await,
        }
    }

    async fn list_all(&self) -> ProviderResult<Vec<FleetMember>> {
        match self {
            Backend::DigitalOcean(p) => p.list_all().await,
        }
    }

    async fn destroy(&self, id: &str) -> ProviderResult<ActionOutcome> {
        match self {
            Backend::DigitalOcean(p) => p.destroy(id).await,
        }
    }
}
