//! Generation engine — the three trigger surfaces and bulk cleanup.
//!
//! The daily timer, the startup catch-up run and a manual admin/manager trigger
//! all end up in the same generator, so they may overlap freely. Cleanup takes
//! the maintenance lock exclusively and never runs alongside a generation.

use std::sync::{Arc, RwLock};

use chrono::{Local, NaiveDate};
use shiftlist_core::access::{Action, require};
use shiftlist_core::error::{Result, ShiftlistError};
use shiftlist_core::traits::TaskDatastore;
use shiftlist_core::types::{StoreId, User};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cron::CronSchedule;
use crate::generator::{CancelFlag, GenerationReport, InstanceGenerator, StoreScope};

pub struct GenerationEngine {
    db: Arc<dyn TaskDatastore>,
    generator: InstanceGenerator,
    maintenance: RwLock<()>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn poisoned<E>(_: E) -> ShiftlistError {
    ShiftlistError::dependency("maintenance lock poisoned")
}

impl GenerationEngine {
    pub fn new(db: Arc<dyn TaskDatastore>) -> Self {
        Self {
            generator: InstanceGenerator::new(db.clone()),
            db,
            maintenance: RwLock::new(()),
        }
    }

    /// All stores, today's local date. Used by the timer and the startup run.
    pub fn run_daily_generation(&self, cancel: &CancelFlag) -> Result<GenerationReport> {
        self.run_system_generation(StoreScope::All, today(), cancel)
    }

    /// Generation without an acting user.
    pub fn run_system_generation(
        &self,
        scope: StoreScope,
        date: NaiveDate,
        cancel: &CancelFlag,
    ) -> Result<GenerationReport> {
        let _guard = self.maintenance.read().map_err(poisoned)?;
        self.generator.generate(scope, date, cancel)
    }

    /// Manual trigger. `store_id = None` covers every store and needs an admin.
    pub fn run_manual_generation(
        &self,
        actor: &User,
        store_id: Option<StoreId>,
        date: Option<NaiveDate>,
    ) -> Result<GenerationReport> {
        require(actor, Action::RunGeneration, store_id)?;
        let date = date.unwrap_or_else(today);
        tracing::info!(
            "👤 Manual generation by user {} for {} ({})",
            actor.id,
            date,
            store_id.map_or_else(|| "all stores".to_string(), |id| format!("store {id}"))
        );
        self.run_system_generation(store_id.into(), date, &CancelFlag::new())
    }

    /// Delete every instance due before `date`. Admin only.
    pub fn cleanup_before(&self, actor: &User, date: NaiveDate) -> Result<usize> {
        require(actor, Action::Cleanup, None)?;
        let _guard = self.maintenance.write().map_err(poisoned)?;
        let removed = self.db.purge_instances_before(date)?;
        tracing::info!("🧹 Removed {removed} task(s) due before {date} (user {})", actor.id);
        Ok(removed)
    }
}

/// Spawn the daily timer as a background tokio task.
///
/// Optionally runs a catch-up generation first, then sleeps until each cron
/// fire time. Flipping `shutdown` to true stops the loop; a run in progress is
/// cancelled between stores and awaited, never interrupted mid-store.
pub fn spawn_daily_trigger(
    engine: Arc<GenerationEngine>,
    schedule: CronSchedule,
    run_on_startup: bool,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("⏰ Daily generation trigger started ({schedule})");

        if run_on_startup {
            tracing::info!("🔁 Startup catch-up generation");
            if !run_guarded(&engine, &mut shutdown).await {
                return;
            }
        }

        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = Local::now();
            let Some(next) = schedule.next_after(&now) else {
                tracing::error!("❌ Cron '{schedule}' has no upcoming fire time, trigger stopped");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!("⏳ Next daily generation at {next}");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => break,
            }

            tracing::info!("🔔 Daily generation fired");
            if !run_guarded(&engine, &mut shutdown).await {
                return;
            }
        }
        tracing::info!("🛑 Daily generation trigger stopped");
    })
}

/// One daily run on the blocking pool. Every outcome is logged, nothing
/// propagates. Returns false when shutdown arrived during the run.
async fn run_guarded(engine: &Arc<GenerationEngine>, shutdown: &mut watch::Receiver<bool>) -> bool {
    let cancel = CancelFlag::new();
    let mut run = {
        let engine = engine.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || engine.run_daily_generation(&cancel))
    };

    let mut keep_going = true;
    let outcome = tokio::select! {
        res = &mut run => res,
        _ = shutdown.changed() => {
            tracing::info!("🛑 Shutdown requested, finishing the current store");
            cancel.cancel();
            keep_going = false;
            run.await
        }
    };

    match outcome {
        Ok(Ok(report)) if report.failures.is_empty() => {}
        Ok(Ok(report)) => tracing::warn!(
            "⚠️ Daily generation for {} finished with {} failed store(s)",
            report.date,
            report.failures.len()
        ),
        Ok(Err(e)) => tracing::error!("❌ Daily generation failed: {e}"),
        Err(e) => tracing::error!("❌ Daily generation task aborted: {e}"),
    }
    if !keep_going {
        tracing::info!("🛑 Daily generation trigger stopped");
    }
    keep_going
}
