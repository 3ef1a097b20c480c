//! The provider capability trait and the values it exchanges.

use std::future::Future;

use fleetscale_core::ProviderIdentity;
use serde::{Deserialize, Serialize};

use crate::error::ProviderResult;

/// What the orchestrator asks a provider to build.
///
/// Only the name is decided by the decision engine. Size, image, region and
/// the like come from the provider's own configuration section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub name: String,
}

/// Result of a create or destroy call the provider answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// One instance as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetMember {
    /// Provider-assigned identifier, used for `destroy`.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub private_addresses: Vec<String>,
    #[serde(default)]
    pub public_addresses: Vec<String>,
}

impl FleetMember {
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            private_addresses: Vec::new(),
            public_addresses: Vec::new(),
        }
    }
}

/// Create/list/destroy capability over one cloud backend.
pub trait Provider: Send + Sync {
    fn identity(&self) -> ProviderIdentity;

    fn create(
        &self,
        request: &CreateRequest,
    ) -> impl Future<Output = ProviderResult<ActionOutcome>> + Send;

    /// Every instance visible to the credentials, matching the fleet
    /// grammar or not.
    fn list_all(&self) -> impl Future<Output = ProviderResult<Vec<FleetMember>>> + Send;

    fn destroy(&self, id: &str) -> impl Future<Output = ProviderResult<ActionOutcome>> + Send;
}

impl<P: Provider> Provider for std::sync::Arc<P> {
    fn identity(&self) -> ProviderIdentity {
        (**self).identity()
    }

    fn create(
        &self,
        request: &CreateRequest,
    ) -> impl Future<Output = ProviderResult<ActionOutcome>> + Send {
        (**self).create(request)
    }

    fn list_all(&self) -> impl Future<Output = ProviderResult<Vec<FleetMember>>> + Send {
        (**self).list_all()
    }

    fn destroy(&self, id: &str) -> impl Future<Output = ProviderResult<ActionOutcome>> + Send {
        (**self).destroy(id)
    }
}
