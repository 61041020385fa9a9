//! # Shiftlist Scheduler
//!
//! Recurrence expansion and task lifecycle for recurring store checklists.
//!
//! ## Architecture
//! ```text
//! Triggers (engine)
//!   ├── daily cron timer  "0 1 * * *"  (local time)
//!   ├── startup catch-up run
//!   └── manual run (admin: all stores, manager: own store)
//!         └── InstanceGenerator
//!               ├── calendar::resolve(date) → weekday, day of month, rotation week
//!               ├── recurrence::due_shifts(template, date)
//!               └── TaskDatastore::insert_generated(batch)  one unit per store
//!
//! TaskLifecycle
//!   ├── complete → EvidenceSink::store, then conditional pending → completed
//!   └── skip     → conditional pending → skipped
//! ```

pub mod adhoc;
pub mod calendar;
pub mod cron;
pub mod engine;
pub mod evidence;
pub mod generator;
pub mod lifecycle;
pub mod recurrence;
pub mod report;

pub use adhoc::{AdHocRequest, create_ad_hoc};
pub use calendar::{ResolvedDate, parse_date, resolve};
pub use cron::CronSchedule;
pub use engine::{GenerationEngine, spawn_daily_trigger};
pub use evidence::FsEvidenceSink;
pub use generator::{
    CancelFlag, GenerationReport, InstanceGenerator, StoreFailure, StoreOutcome, StoreScope,
};
pub use lifecycle::{CompleteRequest, TaskLifecycle, load_actor};
pub use recurrence::{due_shifts, is_due};
pub use report::{ReportQuery, ReportSummary, StatusCounts, StoreSummary, WorkerSummary, list_instances, summarize};
