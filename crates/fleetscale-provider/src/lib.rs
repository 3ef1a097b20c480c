//! fleetscale-provider — the provider capability consumed by the decision engine.
//!
//! A `Provider` can create an instance by name, list every instance it
//! owns, and destroy one by id. The orchestrator only ever talks to the
//! trait; `Backend` picks the concrete implementation from a
//! `ProviderIdentity` at startup.
//!
//! | Identity | Implementation |
//! |---|---|
//! | `digitalocean` | [`DigitalOceanProvider`] (REST v2 over `reqwest`) |

pub mod backend;
pub mod digitalocean;
pub mod error;
pub mod provider;

pub use backend::Backend;
pub use digitalocean::DigitalOceanProvider;
pub use error::{ProviderError, ProviderResult};
pub use provider::{ActionOutcome, CreateRequest, FleetMember, Provider};
