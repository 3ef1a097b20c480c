//! Hands the post-scaling membership to the load balancer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use fleetscale_autoscale::{FleetNaming, ScaleAction, ScaledCallback};
use fleetscale_balancer::{Balancer, BalancerTarget};
use fleetscale_provider::{FleetMember, Provider};
use tracing::{error, info};

pub struct FleetRefresher<P> {
    provider: P,
    naming: FleetNaming,
    balancer: Option<Balancer>,
}

impl<P: Provider + 'static> FleetRefresher<P> {
    pub fn new(provider: P, naming: FleetNaming, balancer: Option<Balancer>) -> Self {
        Self {
            provider,
            naming,
            balancer,
        }
    }

    /// One target per private address of every fleet member.
    pub fn targets(&self, members: &[FleetMember]) -> Vec<BalancerTarget> {
        self.naming
            .fleet(members)
            .flat_map(|m| {
                m.private_addresses
                    .iter()
                    .map(move |addr| BalancerTarget::new(m.name.clone(), addr.clone()))
            })
            .collect()
    }

    /// Current balancer targets, straight from the provider.
    pub async fn current_targets(&self) -> anyhow::Result<Vec<BalancerTarget>> {
        let members = self.provider.list_all().await?;
        Ok(self.targets(&members))
    }

    /// Wait for the fleet to settle, then rewrite and reload the balancer.
    /// Failures are logged; the decision loop carries on regardless.
    pub async fn refresh(&self, action: &ScaleAction) {
        if let Some(ref balancer) = self.balancer {
            tokio::time::sleep(balancer.settle()).await;
        }

        let targets = match self.current_targets().await {
            Ok(targets) => targets,
            Err(e) => {
                error!(?action, error = %e, "failed to list fleet for balancer refresh");
                return;
            }
        };

        match self.balancer {
            Some(ref balancer) => {
                if let Err(e) = balancer.refresh(&targets).await {
                    error!(?action, error = %e, "balancer refresh failed");
                }
            }
            None => {
                let addresses: Vec<&str> = targets.iter().map(|t| t.address.as_str()).collect();
                info!(?action, ?addresses, "fleet changed, no balancer configured");
            }
        }
    }

    /// Wrap into the autoscaler's post-scaling callback.
    pub fn into_callback(self) -> ScaledCallback {
        let this = Arc::new(self);
        Box::new(move |action| {
            let this = Arc::clone(&this);
            let fut: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(async move {
                this.refresh(&action).await;
            });
            fut
        })
    }
}
