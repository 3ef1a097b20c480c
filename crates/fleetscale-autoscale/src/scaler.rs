//! Per-event scaling decisions with a persisted dwell window.
//!
//! Each telemetry event is classified, checked against the host's debounce
//! record, and, once a crossing has lasted `time_threshold` seconds, turned
//! into a create or destroy call on the provider. Events are handled one at
//! a time; the provider call is awaited before the next event is looked at.

use std::future::Future;
use std::pin::Pin;

use fleetscale_core::{Direction, EpochSecs, ScalingConfig, TelemetryEvent, epoch_secs};
use fleetscale_provider::{CreateRequest, FleetMember, Provider};
use fleetscale_state::DebounceStore;
use tokio::sync::{mpsc, watch};
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::error::{AutoscaleResult, NamingError};
use crate::naming::FleetNaming;
use crate::threshold::{ThresholdEvaluator, utilization};

/// A provider action that completed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleAction {
    Created { name: String },
    Destroyed { id: String, name: String },
}

/// What `decide` did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Utilization is inside the band; any record for the host was dropped.
    WithinBand { cleared: bool },
    /// First crossing for this host; the dwell window starts now.
    Observing(Direction),
    /// Same crossing as before, dwell time not yet reached.
    Dwelling { direction: Direction, elapsed: EpochSecs },
    /// Crossing flipped to the other edge; original timestamp kept.
    DirectionChanged(Direction),
    /// The provider action succeeded and the record was cleared.
    Scaled(ScaleAction),
    /// Dwell time reached but the action did not happen. The record is
    /// kept, so the next qualifying event tries again.
    ActionFailed { direction: Direction, reason: String },
}

impl Decision {
    pub fn is_scaled(&self) -> bool {
        matches!(self, Decision::Scaled(_))
    }
}

/// Callback invoked after every successful scaling action.
///
/// Awaited inline, so the next event waits for it to finish.
pub type ScaledCallback = Box<dyn Fn(ScaleAction) -> BoxFuture + Send + Sync>;

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The decision engine for one fleet.
pub struct Autoscaler<P> {
    config: ScalingConfig,
    evaluator: ThresholdEvaluator,
    naming: FleetNaming,
    store: DebounceStore,
    provider: P,
    /// Dwell time in the signed unit of `elapsed`.
    dwell: EpochSecs,
    /// Span every decision is recorded under.
    span: Span,
    on_scaled: Option<ScaledCallback>,
}

impl<P: Provider> Autoscaler<P> {
    pub fn new(config: ScalingConfig, naming: FleetNaming, store: DebounceStore, provider: P) -> Self {
        let dwell = EpochSecs::try_from(config.time_threshold).unwrap_or(EpochSecs::MAX);
        Self {
            evaluator: ThresholdEvaluator::new(&config),
            config,
            naming,
            store,
            provider,
            dwell,
            span: Span::none(),
            on_scaled: None,
        }
    }

    /// Record all decision logging under `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Set the callback run after each successful scaling action.
    pub fn with_on_scaled(mut self, f: ScaledCallback) -> Self {
        self.on_scaled = Some(f);
        self
    }

    pub fn store(&self) -> &DebounceStore {
        &self.store
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Handle one telemetry event observed at `now`.
    pub async fn decide(&self, event: &TelemetryEvent, now: EpochSecs) -> AutoscaleResult<Decision> {
        self.decide_inner(event, now)
            .instrument(self.span.clone())
            .await
    }

    async fn decide_inner(&self, event: &TelemetryEvent, now: EpochSecs) -> AutoscaleResult<Decision> {
        let host = event.host.as_str();
        let cpu = utilization(event.reading);

        let Some(direction) = self.evaluator.classify(event.reading).direction() else {
            info!(%host, cpu, "no scaling needed");
            let cleared = self.store.remove(host)?;
            return Ok(Decision::WithinBand { cleared });
        };

        let Some(record) = self.store.get(host)? else {
            debug!(%host, cpu, %direction, timestamp = event.timestamp, "threshold crossed, observing");
            self.store.put(host, event.timestamp, direction)?;
            return Ok(Decision::Observing(direction));
        };

        let elapsed = record.elapsed(now);
        if elapsed >= self.dwell && record.direction == direction {
            info!(%host, cpu, %direction, elapsed, "threshold held past dwell time, scaling");
            return match self.scale(direction).await {
                Ok(action) => {
                    self.store.remove(host)?;
                    Ok(Decision::Scaled(action))
                }
                Err(reason) => Ok(Decision::ActionFailed { direction, reason }),
            };
        }

        if record.direction != direction {
            debug!(%host, cpu, from = %record.direction, to = %direction, "threshold direction changed");
            self.store.update_direction(host, direction)?;
            return Ok(Decision::DirectionChanged(direction));
        }

        debug!(%host, cpu, %direction, elapsed, threshold = self.config.time_threshold, "not long enough to scale");
        Ok(Decision::Dwelling { direction, elapsed })
    }

    /// Run the provider action for `direction`. Errors are reported as a
    /// reason string; none of them abort the decision.
    async fn scale(&self, direction: Direction) -> Result<ScaleAction, String> {
        match direction {
            Direction::Max => self.scale_up().await,
            Direction::Min => self.scale_down().await,
        }
    }

    async fn scale_up(&self) -> Result<ScaleAction, String> {
        let members = self.list_members().await?;
        let name = self.naming.next_name(members.iter().map(|m| m.name.as_str()));
        debug!(%name, "built instance name");

        match self.provider.create(&CreateRequest { name: name.clone() }).await {
            Ok(outcome) if outcome.success => {
                info!(%name, provider = %self.provider.identity(), "scaled up");
                Ok(ScaleAction::Created { name })
            }
            Ok(outcome) => {
                error!(%name, message = %outcome.message, "failed to scale up");
                Err(outcome.message)
            }
            Err(e) => {
                error!(%name, error = %e, "failed to scale up");
                Err(e.to_string())
            }
        }
    }

    async fn scale_down(&self) -> Result<ScaleAction, String> {
        let members = self.list_members().await?;
        let victim = match self.naming.select_for_removal(&members, self.config.min_servers) {
            Ok(Some(member)) => member,
            Ok(None) => {
                debug!("no member carries the highest sequence number, nothing to remove");
                return Err("no fleet member selected for removal".to_string());
            }
            Err(e @ NamingError::CannotScaleDown { .. }) => {
                warn!(error = %e, "cannot scale down");
                return Err(e.to_string());
            }
            Err(e) => return Err(e.to_string()),
        };

        info!(name = %victim.name, id = %victim.id, "removing server");
        match self.provider.destroy(&victim.id).await {
            Ok(outcome) if outcome.success => {
                info!(name = %victim.name, provider = %self.provider.identity(), "scaled down");
                Ok(ScaleAction::Destroyed {
                    id: victim.id.clone(),
                    name: victim.name.clone(),
                })
            }
            Ok(outcome) => {
                error!(name = %victim.name, message = %outcome.message, "failed to scale down");
                Err(outcome.message)
            }
            Err(e) => {
                error!(name = %victim.name, error = %e, "failed to scale down");
                Err(e.to_string())
            }
        }
    }

    async fn list_members(&self) -> Result<Vec<FleetMember>, String> {
        self.provider.list_all().await.map_err(|e| {
            error!(error = %e, "failed to list fleet");
            e.to_string()
        })
    }

    /// Consume telemetry until the channel closes or shutdown is signalled.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<TelemetryEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            min_cpu = self.config.min_cpu_utilization,
            max_cpu = self.config.max_cpu_utilization,
            time_threshold = self.config.time_threshold,
            min_servers = self.config.min_servers,
            "autoscaler started"
        );

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("telemetry channel closed");
                        break;
                    };
                    self.handle(event).await;
                }
                _ = shutdown.changed() => {
                    info!("autoscaler shutting down");
                    break;
                }
            }
        }
    }

    async fn handle(&self, event: TelemetryEvent) {
        match self.decide(&event, epoch_secs()).await {
            Ok(Decision::Scaled(action)) => {
                if let Some(ref on_scaled) = self.on_scaled {
                    on_scaled(action).await;
                }
            }
            Ok(decision) => {
                debug!(host = %event.host, ?decision, "event handled");
            }
            Err(e) => {
                error!(host = %event.host, error = %e, "scaling decision failed");
            }
        }
    }
}
