//! # Shiftlist Core
//!
//! Shared types for recurring store checklists: stores, users, task templates,
//! task instances, the recurrence rule model, the error taxonomy, configuration,
//! and the collaborator traits the scheduler is written against.

pub mod access;
pub mod config;
pub mod error;
pub mod recurrence;
pub mod traits;
pub mod types;

pub use access::{Action, can, require};
pub use config::ShiftlistConfig;
pub use error::{ErrorKind, Result, ShiftlistError};
pub use recurrence::{ROTATION_WEEKS, RecurrenceRule};
pub use traits::{EvidenceSink, EvidenceUpload, TaskDatastore};
pub use types::{
    Completion, InstanceFilter, InstanceId, NewInstance, Role, Shift, ShiftScope, Store, StoreId,
    TaskInstance, TaskStatus, TaskTemplate, TemplateId, User, UserId,
};
