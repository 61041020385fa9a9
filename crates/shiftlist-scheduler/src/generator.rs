//! Instance generator — expands templates into pending task instances for a date.
//!
//! Each store is an independent unit: its batch commits on its own, a failure
//! is recorded and the loop moves on, and cancellation is only observed between
//! stores. Re-running for the same date creates nothing new because the datastore
//! skips rows whose uniqueness key already exists.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use serde::Serialize;
use shiftlist_core::error::{ErrorKind, Result, ShiftlistError};
use shiftlist_core::traits::TaskDatastore;
use shiftlist_core::types::{NewInstance, Store, StoreId, TaskTemplate};

use crate::calendar::{ResolvedDate, resolve};
use crate::recurrence::due_shifts;

/// Which stores a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    All,
    One(StoreId),
}

impl From<Option<StoreId>> for StoreScope {
    fn from(store: Option<StoreId>) -> Self {
        store.map_or(StoreScope::All, StoreScope::One)
    }
}

/// Shared stop signal, checked before each store begins.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreOutcome {
    pub store_id: StoreId,
    pub store_name: String,
    pub templates_due: usize,
    pub candidates: usize,
    pub created: usize,
}

impl StoreOutcome {
    /// Candidates that already existed.
    pub fn skipped(&self) -> usize {
        self.candidates.saturating_sub(self.created)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreFailure {
    pub store_id: StoreId,
    pub store_name: String,
    pub kind: ErrorKind,
    pub error: String,
}

/// Result of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub date: NaiveDate,
    pub cycle_position: u8,
    pub created: usize,
    pub stores: Vec<StoreOutcome>,
    pub failures: Vec<StoreFailure>,
    /// True when the run stopped early; stores processed up to that point keep their rows.
    pub cancelled: bool,
}

impl GenerationReport {
    fn new(resolved: &ResolvedDate) -> Self {
        Self {
            date: resolved.date,
            cycle_position: resolved.cycle_position,
            created: 0,
            stores: Vec::new(),
            failures: Vec::new(),
            cancelled: false,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Turns templates into instances. Never mutates stores or templates.
pub struct InstanceGenerator {
    db: Arc<dyn TaskDatastore>,
}

impl InstanceGenerator {
    pub fn new(db: Arc<dyn TaskDatastore>) -> Self {
        Self { db }
    }

    /// Generate instances for `date` across `scope`.
    ///
    /// Fails outright only when the store list cannot be loaded or a single
    /// requested store does not exist. Anything that goes wrong inside a store
    /// is reported per store in the returned report.
    pub fn generate(
        &self,
        scope: StoreScope,
        date: NaiveDate,
        cancel: &CancelFlag,
    ) -> Result<GenerationReport> {
        let resolved = resolve(date);
        let stores = self.stores_in_scope(scope)?;
        let mut report = GenerationReport::new(&resolved);

        tracing::info!(
            "🗓️ Generating tasks for {} ({:?}, rotation week {}) across {} store(s)",
            date,
            resolved.weekday,
            resolved.cycle_position,
            stores.len()
        );

        for store in &stores {
            if cancel.is_cancelled() {
                tracing::warn!(
                    "⏹️ Generation for {} cancelled before store '{}' ({})",
                    date,
                    store.name,
                    store.id
                );
                report.cancelled = true;
                break;
            }

            match self.generate_store(store, &resolved) {
                Ok(outcome) => {
                    tracing::info!(
                        "🏪 Store '{}' ({}): {} created, {} already present",
                        store.name,
                        store.id,
                        outcome.created,
                        outcome.skipped()
                    );
                    report.created += outcome.created;
                    report.stores.push(outcome);
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Generation failed for store '{}' ({}): {e}",
                        store.name,
                        store.id
                    );
                    report.failures.push(StoreFailure {
                        store_id: store.id,
                        store_name: store.name.clone(),
                        kind: e.kind(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "✅ Generation for {} done: {} created in {} store(s), {} failed{}",
            date,
            report.created,
            report.stores.len(),
            report.failures.len(),
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    /// Load, plan and insert one store's batch.
    fn generate_store(&self, store: &Store, resolved: &ResolvedDate) -> Result<StoreOutcome> {
        let templates = self.db.active_templates_for_store(store.id)?;
        let batch = plan_store(&templates, store.id, resolved);
        let templates_due = templates
            .iter()
            .filter(|t| !due_shifts(t, resolved).is_empty())
            .count();
        let created = self.db.insert_generated(&batch)?;
        Ok(StoreOutcome {
            store_id: store.id,
            store_name: store.name.clone(),
            templates_due,
            candidates: batch.len(),
            created,
        })
    }

    fn stores_in_scope(&self, scope: StoreScope) -> Result<Vec<Store>> {
        match scope {
            StoreScope::All => self.db.list_stores(),
            StoreScope::One(id) => self
                .db
                .get_store(id)?
                .map(|s| vec![s])
                .ok_or_else(|| ShiftlistError::not_found(format!("store {id}"))),
        }
    }
}

/// Candidate instances for one store on one date, one per due template and shift.
pub fn plan_store(
    templates: &[TaskTemplate],
    store_id: StoreId,
    resolved: &ResolvedDate,
) -> Vec<NewInstance> {
    templates
        .iter()
        .filter(|t| t.applies_to(store_id))
        .flat_map(|t| {
            due_shifts(t, resolved)
                .iter()
                .map(move |&shift| NewInstance::from_template(t, store_id, shift, resolved.date))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use shiftlist_core::recurrence::RecurrenceRule;
    use shiftlist_core::types::{
        Completion, InstanceFilter, InstanceId, Shift, ShiftScope, TaskInstance, TemplateId, User,
        UserId,
    };
    use shiftlist_db::{SqliteDb, TemplateDraft};
    use std::path::Path;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn memory_db() -> Arc<SqliteDb> {
        Arc::new(SqliteDb::open(Path::new(":memory:")).unwrap())
    }

    fn count(db: &SqliteDb, filter: InstanceFilter) -> usize {
        db.query_instances(&filter).unwrap().len()
    }

    #[test]
    fn test_two_stores_daily_both_and_early() {
        let db = memory_db();
        let a = db.create_store("A", None, None).unwrap();
        let b = db.create_store("B", None, None).unwrap();
        db.create_template(&TemplateDraft::new("Fridge temps", ShiftScope::Both, RecurrenceRule::Daily))
            .unwrap();
        db.create_template(
            &TemplateDraft::new("Bread order", ShiftScope::Early, RecurrenceRule::Daily).for_store(a.id),
        )
        .unwrap();

        let generator = InstanceGenerator::new(db.clone());
        let report = generator
            .generate(StoreScope::All, date(2026, 1, 5), &CancelFlag::new())
            .unwrap();

        assert_eq!(report.created, 5);
        assert!(report.is_clean());
        assert_eq!(count(&db, InstanceFilter::for_store(a.id)), 3);
        assert_eq!(count(&db, InstanceFilter::for_store(b.id)), 2);
    }

    #[test]
    fn test_generation_is_idempotent() {
        let db = memory_db();
        db.create_store("A", None, None).unwrap();
        db.create_store("B", None, None).unwrap();
        db.create_template(&TemplateDraft::new("Cash count", ShiftScope::Both, RecurrenceRule::Daily))
            .unwrap();

        let generator = InstanceGenerator::new(db.clone());
        let first = generator
            .generate(StoreScope::All, date(2026, 3, 4), &CancelFlag::new())
            .unwrap();
        let second = generator
            .generate(StoreScope::All, date(2026, 3, 4), &CancelFlag::new())
            .unwrap();

        assert_eq!(first.created, 4);
        assert_eq!(second.created, 0);
        assert!(second.stores.iter().all(|s| s.skipped() == 2));
        assert_eq!(count(&db, InstanceFilter::default()), 4);
    }

    #[test]
    fn test_weekly_layering_and_monthly() {
        let db = memory_db();
        let store = db.create_store("A", None, None).unwrap();
        db.create_template(&TemplateDraft::new(
            "Supply order",
            ShiftScope::Early,
            RecurrenceRule::weekly(Weekday::Mon, None).unwrap(),
        ))
        .unwrap();
        db.create_template(&TemplateDraft::new(
            "Cooler door",
            ShiftScope::Early,
            RecurrenceRule::weekly(Weekday::Mon, Some(2)).unwrap(),
        ))
        .unwrap();
        db.create_template(&TemplateDraft::new(
            "Inventory",
            ShiftScope::Late,
            RecurrenceRule::monthly(1).unwrap(),
        ))
        .unwrap();
        let generator = InstanceGenerator::new(db.clone());
        let cancel = CancelFlag::new();

        // Monday, rotation week 2: both weekly templates fire.
        let r = generator.generate(StoreScope::One(store.id), date(2026, 1, 5), &cancel).unwrap();
        assert_eq!(r.created, 2);

        // Monday 2026-06-01, rotation week 3 and the 1st: plain weekly plus monthly.
        let r = generator.generate(StoreScope::One(store.id), date(2026, 6, 1), &cancel).unwrap();
        assert_eq!(r.created, 2);
        let titles: Vec<String> = db
            .query_instances(&InstanceFilter::for_store(store.id).on(date(2026, 6, 1)))
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert!(titles.contains(&"Supply order".to_string()));
        assert!(titles.contains(&"Inventory".to_string()));

        // A Tuesday that is neither.
        let r = generator.generate(StoreScope::One(store.id), date(2026, 1, 6), &cancel).unwrap();
        assert_eq!(r.created, 0);
    }

    #[test]
    fn test_inactive_and_foreign_templates_ignored() {
        let db = memory_db();
        let a = db.create_store("A", None, None).unwrap();
        let b = db.create_store("B", None, None).unwrap();
        let retired = db
            .create_template(&TemplateDraft::new("Old task", ShiftScope::Both, RecurrenceRule::Daily))
            .unwrap();
        db.set_template_active(retired.id, false).unwrap();
        db.create_template(
            &TemplateDraft::new("B only", ShiftScope::Late, RecurrenceRule::Daily).for_store(b.id),
        )
        .unwrap();

        let generator = InstanceGenerator::new(db.clone());
        let r = generator
            .generate(StoreScope::One(a.id), date(2026, 2, 2), &CancelFlag::new())
            .unwrap();
        assert_eq!(r.created, 0);
        assert_eq!(r.stores[0].templates_due, 0);
    }

    #[test]
    fn test_unknown_store_is_not_found() {
        let db = memory_db();
        let generator = InstanceGenerator::new(db);
        let err = generator
            .generate(StoreScope::One(99), date(2026, 2, 2), &CancelFlag::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_cancel_before_first_store() {
        let db = memory_db();
        db.create_store("A", None, None).unwrap();
        db.create_template(&TemplateDraft::new("Cash count", ShiftScope::Late, RecurrenceRule::Daily))
            .unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let r = InstanceGenerator::new(db.clone())
            .generate(StoreScope::All, date(2026, 2, 2), &cancel)
            .unwrap();
        assert!(r.cancelled);
        assert_eq!(r.created, 0);
        assert_eq!(count(&db, InstanceFilter::default()), 0);
    }

    /// Delegates to SQLite but fails inserts for `broken` and template loads
    /// for `unreadable`.
    struct FailingStore {
        inner: Arc<SqliteDb>,
        broken: StoreId,
        unreadable: Option<StoreId>,
    }

    impl TaskDatastore for FailingStore {
        fn list_stores(&self) -> Result<Vec<Store>> {
            self.inner.list_stores()
        }
        fn get_store(&self, id: StoreId) -> Result<Option<Store>> {
            self.inner.get_store(id)
        }
        fn get_user(&self, id: UserId) -> Result<Option<User>> {
            self.inner.get_user(id)
        }
        fn list_users(&self, store_id: Option<StoreId>) -> Result<Vec<User>> {
            self.inner.list_users(store_id)
        }
        fn active_templates_for_store(&self, store_id: StoreId) -> Result<Vec<TaskTemplate>> {
            if self.unreadable == Some(store_id) {
                return Err(ShiftlistError::dependency("database is locked"));
            }
            self.inner.active_templates_for_store(store_id)
        }
        fn get_template(&self, id: TemplateId) -> Result<Option<TaskTemplate>> {
            self.inner.get_template(id)
        }
        fn insert_generated(&self, batch: &[NewInstance]) -> Result<usize> {
            if batch.iter().any(|r| r.store_id == self.broken) {
                return Err(ShiftlistError::dependency("disk I/O error"));
            }
            self.inner.insert_generated(batch)
        }
        fn insert_ad_hoc(&self, instance: &NewInstance) -> Result<TaskInstance> {
            self.inner.insert_ad_hoc(instance)
        }
        fn get_instance(&self, id: InstanceId) -> Result<Option<TaskInstance>> {
            self.inner.get_instance(id)
        }
        fn mark_completed(&self, id: InstanceId, completion: &Completion) -> Result<bool> {
            self.inner.mark_completed(id, completion)
        }
        fn mark_skipped(&self, id: InstanceId, notes: Option<&str>) -> Result<bool> {
            self.inner.mark_skipped(id, notes)
        }
        fn query_instances(&self, filter: &InstanceFilter) -> Result<Vec<TaskInstance>> {
            self.inner.query_instances(filter)
        }
        fn purge_instances_before(&self, date: NaiveDate) -> Result<usize> {
            self.inner.purge_instances_before(date)
        }
    }

    #[test]
    fn test_store_failure_does_not_stop_others() {
        let db = memory_db();
        let a = db.create_store("A", None, None).unwrap();
        let b = db.create_store("B", None, None).unwrap();
        let c = db.create_store("C", None, None).unwrap();
        db.create_template(&TemplateDraft::new("Cash count", ShiftScope::Late, RecurrenceRule::Daily))
            .unwrap();

        let failing = Arc::new(FailingStore {
            inner: db.clone(),
            broken: b.id,
            unreadable: None,
        });
        let r = InstanceGenerator::new(failing)
            .generate(StoreScope::All, date(2026, 2, 2), &CancelFlag::new())
            .unwrap();

        assert_eq!(r.created, 2);
        assert_eq!(r.failures.len(), 1);
        assert_eq!(r.failures[0].store_id, b.id);
        assert_eq!(r.failures[0].kind, ErrorKind::Dependency);
        assert_eq!(count(&db, InstanceFilter::for_store(a.id)), 1);
        assert_eq!(count(&db, InstanceFilter::for_store(c.id)), 1);
    }

    #[test]
    fn test_template_load_failure_is_per_store() {
        let db = memory_db();
        let a = db.create_store("A", None, None).unwrap();
        let b = db.create_store("B", None, None).unwrap();
        db.create_template(&TemplateDraft::new("Fridge temps", ShiftScope::Both, RecurrenceRule::Daily))
            .unwrap();

        let failing = Arc::new(FailingStore {
            inner: db.clone(),
            broken: 0,
            unreadable: Some(a.id),
        });
        let r = InstanceGenerator::new(failing)
            .generate(StoreScope::All, date(2026, 2, 2), &CancelFlag::new())
            .unwrap();

        assert!(!r.is_clean());
        assert_eq!(r.failures.len(), 1);
        assert_eq!(r.failures[0].store_id, a.id);
        assert_eq!(r.stores.len(), 1);
        assert_eq!(count(&db, InstanceFilter::for_store(b.id)), 2);
    }

    #[test]
    fn test_concurrent_runs_create_each_key_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.db");
        let setup = SqliteDb::open(&path).unwrap();
        for name in ["A", "B", "C"] {
            setup.create_store(name, None, None).unwrap();
        }
        setup
            .create_template(&TemplateDraft::new("Fridge temps", ShiftScope::Both, RecurrenceRule::Daily))
            .unwrap();

        let connections: Vec<Arc<dyn TaskDatastore>> = (0..4)
            .map(|_| Arc::new(SqliteDb::open(&path).unwrap()) as Arc<dyn TaskDatastore>)
            .collect();
        let handles: Vec<_> = connections
            .into_iter()
            .map(|db| {
                std::thread::spawn(move || {
                    InstanceGenerator::new(db)
                        .generate(StoreScope::All, date(2026, 10, 14), &CancelFlag::new())
                        .unwrap()
                        .created
                })
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(total, 6);
        assert_eq!(count(&setup, InstanceFilter::default()), 6);
    }

    #[test]
    fn test_plan_store_expands_shifts() {
        let template = TaskTemplate {
            id: 7,
            title: "Fridge temps".into(),
            description: Some("Both units".into()),
            category: Some("Hygiene".into()),
            shift_scope: ShiftScope::Both,
            recurrence: RecurrenceRule::Daily,
            store_id: None,
            requires_evidence: false,
            active: true,
        };
        let plan = plan_store(&[template], 3, &resolve(date(2026, 4, 15)));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].shift, Shift::Early);
        assert_eq!(plan[1].shift, Shift::Late);
        assert!(plan.iter().all(|p| p.template_id == Some(7) && p.store_id == 3));
        assert_eq!(plan[0].category.as_deref(), Some("Hygiene"));
    }
}
