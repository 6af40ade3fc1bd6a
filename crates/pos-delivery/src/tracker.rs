//! The reusable at-least-once delivery core (spec §4.6): one instance per
//! producer service (cart, terminal). Tracks per-destination delivery
//! status, publishes through a circuit breaker, and runs a periodic
//! republish sweep for anything still outstanding.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use crate::config::DeliveryTrackerConfig;
use chrono::{DateTime, Utc};
use pos_core::event::SerializedEvent;
use pos_core::event_bus::{EventBus, EventBusError};
use pos_domain::enums::{DeliveryOverallStatus, ServiceStatus};
use pos_postgres::delivery_status::{DeliveryStatusError, DeliveryStatusRepository, DeliveryStatusRow};
use pos_postgres::failed_publish::FailedPublishQueue;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by the delivery tracker.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery status error: {0}")]
    Status(#[from] DeliveryStatusError),
    #[error("publish rejected: circuit breaker is open")]
    CircuitOpen,
    #[error("publish failed: {0}")]
    Publish(EventBusError),
}

/// Computes the overall status for one event from its per-destination rows
/// (spec §4.6 step 4). Returns `None` if the event has no tracked rows at
/// all.
#[must_use]
pub fn overall_status(rows: &[DeliveryStatusRow]) -> Option<DeliveryOverallStatus> {
    if rows.is_empty() {
        return None;
    }

    let delivered = rows.iter().filter(|r| r.status == ServiceStatus::Delivered).count();
    let failed = rows.iter().filter(|r| r.status == ServiceStatus::Failed).count();

    if delivered == rows.len() {
        Some(DeliveryOverallStatus::Delivered)
    } else if delivered > 0 {
        Some(DeliveryOverallStatus::PartiallyDelivered)
    } else if failed == rows.len() {
        Some(DeliveryOverallStatus::Failed)
    } else {
        Some(DeliveryOverallStatus::Published)
    }
}

struct CachedEvent {
    topic: String,
    event: SerializedEvent,
    cached_at: DateTime<Utc>,
}

/// The delivery tracker. Holds the per-destination status repository, the
/// broker transport (wrapped by a circuit breaker), the failed-publish
/// queue for operator visibility, and a bounded in-memory cache of recently
/// published payloads so the republish sweep can resend without re-reading
/// the event store.
pub struct DeliveryTracker {
    status: DeliveryStatusRepository,
    failed_queue: FailedPublishQueue,
    event_bus: Arc<dyn EventBus>,
    breaker: CircuitBreaker,
    config: DeliveryTrackerConfig,
    cache: Arc<RwLock<HashMap<String, CachedEvent>>>,
}

impl DeliveryTracker {
    #[must_use]
    pub fn new(
        status: DeliveryStatusRepository,
        failed_queue: FailedPublishQueue,
        event_bus: Arc<dyn EventBus>,
        config: DeliveryTrackerConfig,
    ) -> Self {
        let breaker = CircuitBreaker::new(config.circuit_breaker.clone());
        Self {
            status,
            failed_queue,
            event_bus,
            breaker,
            config,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers a pending row for every destination, then publishes
    /// through the circuit breaker. Matches spec §4.6's event lifecycle
    /// steps 1-2: the caller is expected to have already written the
    /// business fact in the same DB transaction as the `register` call
    /// (this method only covers the publish, which must happen after
    /// commit).
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::CircuitOpen`] if the breaker has tripped,
    /// or [`DeliveryError::Publish`] if the broker call itself fails. In
    /// both cases every destination is marked `failed` so the republish
    /// sweep picks the event up later.
    pub async fn publish(
        &self,
        event_id: &str,
        topic: &str,
        event: SerializedEvent,
        destinations: &[&str],
    ) -> Result<(), DeliveryError> {
        self.status.register(event_id, destinations).await?;

        self.cache.write().await.insert(
            event_id.to_string(),
            CachedEvent {
                topic: topic.to_string(),
                event: event.clone(),
                cached_at: Utc::now(),
            },
        );

        match self.breaker.call(|| self.event_bus.publish(topic, &event)).await {
            Ok(()) => {
                metrics::counter!("delivery.publish.ok").increment(1);
                Ok(())
            },
            Err(CircuitBreakerError::Open) => {
                metrics::counter!("delivery.publish.circuit_open").increment(1);
                self.fail_all(event_id, destinations).await?;
                Err(DeliveryError::CircuitOpen)
            },
            Err(CircuitBreakerError::Inner(err)) => {
                metrics::counter!("delivery.publish.error").increment(1);
                self.fail_all(event_id, destinations).await?;
                Err(DeliveryError::Publish(err))
            },
        }
    }

    async fn fail_all(&self, event_id: &str, destinations: &[&str]) -> Result<(), DeliveryStatusError> {
        for destination in destinations {
            self.status.mark_failed(event_id, destination).await?;
        }
        Ok(())
    }

    /// Applies a consumer's delivery-status callback (spec §4.6 step 3):
    /// `{event_id, service, status}`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryStatusError`] on database failure.
    pub async fn acknowledge(&self, event_id: &str, destination: &str, received: bool) -> Result<(), DeliveryStatusError> {
        if received {
            self.status.mark_delivered(event_id, destination).await
        } else {
            self.status.mark_failed(event_id, destination).await
        }
    }

    /// The overall status for one event (spec §4.6 step 4).
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryStatusError`] on database failure.
    pub async fn status_for(&self, event_id: &str) -> Result<Option<DeliveryOverallStatus>, DeliveryStatusError> {
        let rows = self.status.rows_for_event(event_id).await?;
        Ok(overall_status(&rows))
    }

    /// Runs one pass of the republish sweep (spec §4.6 "Republish sweep").
    ///
    /// Rows younger than `undelivered_check_interval` are never considered
    /// (the repository query excludes them). Rows older than
    /// `undelivered_check_failed_period` are recorded in the failed-publish
    /// queue as a warning before the sweep still republishes them.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryStatusError`] if the outstanding-rows query fails.
    pub async fn sweep_once(&self) -> Result<usize, DeliveryStatusError> {
        let now = Utc::now();
        let created_before = now
            - chrono::Duration::from_std(self.config.undelivered_check_interval)
                .unwrap_or(chrono::Duration::zero());
        let lookback = now
            - chrono::Duration::from_std(self.config.undelivered_check_period).unwrap_or(chrono::Duration::zero());

        let rows = self.status.list_stale_outstanding(created_before, 500).await?;
        let rows: Vec<_> = rows.into_iter().filter(|r| r.created_at >= lookback).collect();

        let mut by_event: HashMap<String, Vec<DeliveryStatusRow>> = HashMap::new();
        for row in rows {
            by_event.entry(row.event_id.clone()).or_default().push(row);
        }

        let failed_period = chrono::Duration::from_std(self.config.undelivered_check_failed_period)
            .unwrap_or(chrono::Duration::zero());

        let mut republished = 0usize;
        for (event_id, event_rows) in by_event {
            let oldest = event_rows.iter().map(|r| r.created_at).min().unwrap_or(now);

            if now - oldest > failed_period {
                tracing::warn!(event_id = %event_id, "delivery overdue past failed period, still republishing");
                metrics::counter!("delivery.sweep.overdue").increment(1);
            }

            self.evict_expired_cache(lookback).await;

            let cached = self.cache.read().await.get(&event_id).map(|c| (c.topic.clone(), c.event.clone()));
            let Some((topic, event)) = cached else {
                tracing::warn!(event_id = %event_id, "no cached payload for stale event, cannot republish");
                continue;
            };

            match self.breaker.call(|| self.event_bus.publish(&topic, &event)).await {
                Ok(()) => {
                    republished += 1;
                    metrics::counter!("delivery.sweep.republished").increment(1);
                },
                Err(_) => {
                    metrics::counter!("delivery.sweep.republish_failed").increment(1);
                    for row in &event_rows {
                        let _ = self.status.mark_failed(&event_id, &row.destination).await;
                    }
                },
            }
        }

        Ok(republished)
    }

    async fn evict_expired_cache(&self, cutoff: DateTime<Utc>) {
        self.cache.write().await.retain(|_, cached| cached.cached_at >= cutoff);
    }

    /// Runs [`Self::sweep_once`] on a fixed interval until the returned
    /// handle is dropped or aborted. Mirrors the teacher's single
    /// periodic-task pattern for background maintenance work.
    pub fn spawn_sweep(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = self.sweep_once().await {
                    tracing::error!(error = %err, "delivery republish sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: ServiceStatus) -> DeliveryStatusRow {
        DeliveryStatusRow {
            event_id: "evt-1".to_string(),
            destination: "report".to_string(),
            status,
            attempts: 0,
            created_at: Utc::now(),
            last_attempted_at: None,
            delivered_at: None,
        }
    }

    #[test]
    fn empty_rows_have_no_overall_status() {
        assert_eq!(overall_status(&[]), None);
    }

    #[test]
    fn all_delivered_is_delivered() {
        let rows = vec![row(ServiceStatus::Delivered), row(ServiceStatus::Delivered)];
        assert_eq!(overall_status(&rows), Some(DeliveryOverallStatus::Delivered));
    }

    #[test]
    fn mixed_delivered_is_partially_delivered() {
        let rows = vec![row(ServiceStatus::Delivered), row(ServiceStatus::Pending)];
        assert_eq!(overall_status(&rows), Some(DeliveryOverallStatus::PartiallyDelivered));
    }

    #[test]
    fn all_failed_is_failed() {
        let rows = vec![row(ServiceStatus::Failed), row(ServiceStatus::Failed)];
        assert_eq!(overall_status(&rows), Some(DeliveryOverallStatus::Failed));
    }

    #[test]
    fn pending_mix_is_published() {
        let rows = vec![row(ServiceStatus::Pending), row(ServiceStatus::Failed)];
        assert_eq!(overall_status(&rows), Some(DeliveryOverallStatus::Published));
    }
}
