//! Instance queries and report summaries for the export layer.
//!
//! Rendering is someone else's job; this module only answers "what happened
//! between these dates" with the caller's store scope applied.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;
use shiftlist_core::access::{Action, require};
use shiftlist_core::error::{Result, ShiftlistError};
use shiftlist_core::traits::TaskDatastore;
use shiftlist_core::types::{InstanceFilter, Role, StoreId, TaskInstance, TaskStatus, User, UserId};

const TOP_WORKERS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub store_id: Option<StoreId>,
}

impl ReportQuery {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            store_id: None,
        }
    }

    pub fn for_store(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub skipped: usize,
    /// Percent completed, two decimals; `None` when there are no tasks.
    pub completion_rate: Option<f64>,
}

impl StatusCounts {
    fn tally<'a>(tasks: impl IntoIterator<Item = &'a TaskInstance>) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            counts.total += 1;
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Skipped => counts.skipped += 1,
            }
        }
        counts.completion_rate = completion_rate(counts.completed, counts.total);
        counts
    }
}

fn completion_rate(completed: usize, total: usize) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let pct = completed as f64 / total as f64 * 100.0;
    Some((pct * 100.0).round() / 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSummary {
    pub store_id: StoreId,
    pub store_name: String,
    #[serde(flatten)]
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub user_id: UserId,
    pub full_name: String,
    pub store_id: Option<StoreId>,
    pub completed: usize,
    /// Distinct calendar days (UTC) with at least one completion.
    pub active_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub store_id: Option<StoreId>,
    pub totals: StatusCounts,
    pub stores: Vec<StoreSummary>,
    pub top_workers: Vec<WorkerSummary>,
}

fn check_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(ShiftlistError::invalid(format!(
            "range start {from} is after end {to}"
        ))),
        _ => Ok(()),
    }
}

/// Instances visible to `actor`. Store-bound users without an explicit store
/// see their own; asking for another store is `Forbidden`.
pub fn list_instances(
    db: &dyn TaskDatastore,
    actor: &User,
    filter: &InstanceFilter,
) -> Result<Vec<TaskInstance>> {
    check_range(filter.from, filter.to)?;
    let mut filter = filter.clone();
    if !actor.is_admin() {
        filter.store_id = filter.store_id.or(actor.store_id);
    }
    require(actor, Action::ViewTasks, filter.store_id)?;
    db.query_instances(&filter)
}

/// Totals, per-store rows and the most active workers for a date range.
///
/// Managers always get their own store; workers may not view reports.
pub fn summarize(db: &dyn TaskDatastore, actor: &User, query: &ReportQuery) -> Result<ReportSummary> {
    check_range(Some(query.from), Some(query.to))?;
    let store_id = match actor.role {
        Role::Admin => query.store_id,
        _ => query.store_id.or(actor.store_id),
    };
    require(actor, Action::ViewReports, store_id)?;

    let stores = match store_id {
        Some(id) => vec![
            db.get_store(id)?
                .ok_or_else(|| ShiftlistError::not_found(format!("store {id}")))?,
        ],
        None => db.list_stores()?,
    };

    let tasks = db.query_instances(&InstanceFilter {
        store_id,
        from: Some(query.from),
        to: Some(query.to),
        ..InstanceFilter::default()
    })?;

    let store_rows = stores
        .into_iter()
        .map(|store| StoreSummary {
            counts: StatusCounts::tally(tasks.iter().filter(|t| t.store_id == store.id)),
            store_id: store.id,
            store_name: store.name,
        })
        .collect();

    let mut completions: HashMap<UserId, (usize, BTreeSet<NaiveDate>)> = HashMap::new();
    for task in tasks.iter().filter(|t| t.status == TaskStatus::Completed) {
        if let Some(user) = task.completed_by {
            let entry = completions.entry(user).or_default();
            entry.0 += 1;
            if let Some(at) = task.completed_at {
                entry.1.insert(at.date_naive());
            }
        }
    }

    let mut workers: Vec<WorkerSummary> = db
        .list_users(store_id)?
        .into_iter()
        .filter(|u| u.role == Role::Worker)
        .map(|u| {
            let (completed, days) = completions.remove(&u.id).unwrap_or_default();
            WorkerSummary {
                user_id: u.id,
                full_name: u.full_name,
                store_id: u.store_id,
                completed,
                active_days: days.len(),
            }
        })
        .collect();
    workers.sort_by(|a, b| b.completed.cmp(&a.completed).then(a.user_id.cmp(&b.user_id)));
    workers.truncate(TOP_WORKERS);

    Ok(ReportSummary {
        from: query.from,
        to: query.to,
        store_id,
        totals: StatusCounts::tally(&tasks),
        stores: store_rows,
        top_workers: workers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Utc};
    use shiftlist_core::error::ErrorKind;
    use shiftlist_core::recurrence::RecurrenceRule;
    use shiftlist_core::types::{Completion, NewInstance, Shift, ShiftScope};
    use shiftlist_db::{SqliteDb, TemplateDraft};
    use std::path::Path;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct World {
        db: SqliteDb,
        a: StoreId,
        b: StoreId,
        empty: StoreId,
        admin: User,
        manager: User,
        worker: User,
    }

    /// Store A: 4 tasks over two days, 3 completed by the worker; store B: 2
    /// pending; store "C Empty": nothing.
    fn world() -> World {
        let db = SqliteDb::open(Path::new(":memory:")).unwrap();
        let a = db.create_store("A", None, None).unwrap().id;
        let b = db.create_store("B", None, None).unwrap().id;
        let empty = db.create_store("C Empty", None, None).unwrap().id;
        let admin = db.create_user("admin", "Admin", Role::Admin, None).unwrap();
        let manager = db.create_user("m", "Manager", Role::Manager, Some(a)).unwrap();
        let worker = db.create_user("w", "Worker", Role::Worker, Some(a)).unwrap();
        db.create_user("idle", "Idle Worker", Role::Worker, Some(a)).unwrap();

        let t = db
            .create_template(&TemplateDraft::new("Fridge temps", ShiftScope::Both, RecurrenceRule::Daily))
            .unwrap();
        let mut batch = Vec::new();
        for day in [date(2026, 10, 13), date(2026, 10, 14)] {
            for shift in [Shift::Early, Shift::Late] {
                batch.push(NewInstance::from_template(&t, a, shift, day));
            }
        }
        db.insert_generated(&batch).unwrap();
        db.insert_generated(&[
            NewInstance::from_template(&t, b, Shift::Early, date(2026, 10, 14)),
            NewInstance::from_template(&t, b, Shift::Late, date(2026, 10, 14)),
        ])
        .unwrap();

        let mut in_a = db.query_instances(&InstanceFilter::for_store(a)).unwrap();
        in_a.sort_by_key(|t| t.id);
        for (task, hour) in in_a.iter().take(3).zip([8, 9, 8]) {
            let at = Utc
                .with_ymd_and_hms(2026, 10, task.due_date.day(), hour, 0, 0)
                .unwrap();
            db.mark_completed(
                task.id,
                &Completion {
                    completed_by: worker.id,
                    completed_at: at,
                    evidence_path: None,
                    notes: None,
                },
            )
            .unwrap();
        }

        World {
            db,
            a,
            b,
            empty,
            admin,
            manager,
            worker,
        }
    }

    #[test]
    fn test_admin_summary_covers_all_stores() {
        let w = world();
        let q = ReportQuery::new(date(2026, 10, 1), date(2026, 10, 31));
        let s = summarize(&w.db, &w.admin, &q).unwrap();

        assert_eq!(s.totals.total, 6);
        assert_eq!(s.totals.completed, 3);
        assert_eq!(s.totals.pending, 3);
        assert_eq!(s.totals.completion_rate, Some(50.0));

        assert_eq!(s.stores.len(), 3);
        let empty = s.stores.iter().find(|r| r.store_id == w.empty).unwrap();
        assert_eq!(empty.counts.total, 0);
        assert_eq!(empty.counts.completion_rate, None);
        let a = s.stores.iter().find(|r| r.store_id == w.a).unwrap();
        assert_eq!(a.counts.completion_rate, Some(75.0));

        assert_eq!(s.top_workers.len(), 2);
        assert_eq!(s.top_workers[0].user_id, w.worker.id);
        assert_eq!(s.top_workers[0].completed, 3);
        assert_eq!(s.top_workers[0].active_days, 2);
        assert_eq!(s.top_workers[1].completed, 0);
    }

    #[test]
    fn test_manager_forced_to_own_store() {
        let w = world();
        let q = ReportQuery::new(date(2026, 10, 14), date(2026, 10, 14));
        let s = summarize(&w.db, &w.manager, &q).unwrap();
        assert_eq!(s.store_id, Some(w.a));
        assert_eq!(s.stores.len(), 1);
        assert_eq!(s.totals.total, 2);

        let err = summarize(&w.db, &w.manager, &q.for_store(w.b)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = summarize(&w.db, &w.worker, &q).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_rate_rounding_and_bad_range() {
        assert_eq!(completion_rate(1, 3), Some(33.33));
        assert_eq!(completion_rate(2, 3), Some(66.67));
        assert_eq!(completion_rate(0, 0), None);

        let w = world();
        let q = ReportQuery::new(date(2026, 10, 31), date(2026, 10, 1));
        let err = summarize(&w.db, &w.admin, &q).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_list_instances_scoping() {
        let w = world();
        let mine = list_instances(&w.db, &w.worker, &InstanceFilter::default()).unwrap();
        assert_eq!(mine.len(), 4);
        assert!(mine.iter().all(|t| t.store_id == w.a));

        let err = list_instances(&w.db, &w.worker, &InstanceFilter::for_store(w.b)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let all = list_instances(&w.db, &w.admin, &InstanceFilter::default()).unwrap();
        assert_eq!(all.len(), 6);

        let pending_b = InstanceFilter {
            status: Some(TaskStatus::Pending),
            ..InstanceFilter::for_store(w.b)
        };
        assert_eq!(list_instances(&w.db, &w.admin, &pending_b).unwrap().len(), 2);
    }
}
