//! Datastore trait — everything the generator and lifecycle need from persistence.

use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{
    Completion, InstanceFilter, InstanceId, NewInstance, Store, StoreId, TaskInstance,
    TaskTemplate, TemplateId, User, UserId,
};

/// Transactional relational store.
///
/// Implementations enforce the instance uniqueness keys themselves:
/// `(template_id, store_id, due_date, shift)` for generated rows and
/// `(title, store_id, due_date, shift)` for ad hoc rows.
pub trait TaskDatastore: Send + Sync {
    fn list_stores(&self) -> Result<Vec<Store>>;

    fn get_store(&self, id: StoreId) -> Result<Option<Store>>;

    fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Users bound to `store_id`, or every user when `None`.
    fn list_users(&self, store_id: Option<StoreId>) -> Result<Vec<User>>;

    /// Active, non-`Once` templates that are global or bound to `store_id`.
    fn active_templates_for_store(&self, store_id: StoreId) -> Result<Vec<TaskTemplate>>;

    fn get_template(&self, id: TemplateId) -> Result<Option<TaskTemplate>>;

    /// Insert one store's batch as a single unit. Rows whose key already exists
    /// are skipped silently. Returns the number actually inserted.
    fn insert_generated(&self, batch: &[NewInstance]) -> Result<usize>;

    /// Insert an ad hoc row. Fails with `Conflict` when the title key exists.
    fn insert_ad_hoc(&self, instance: &NewInstance) -> Result<TaskInstance>;

    fn get_instance(&self, id: InstanceId) -> Result<Option<TaskInstance>>;

    /// Move a `pending` instance to `completed`. Returns false when the instance
    /// was not pending at write time.
    fn mark_completed(&self, id: InstanceId, completion: &Completion) -> Result<bool>;

    /// Move a `pending` instance to `skipped`. Returns false when it was not pending.
    fn mark_skipped(&self, id: InstanceId, notes: Option<&str>) -> Result<bool>;

    fn query_instances(&self, filter: &InstanceFilter) -> Result<Vec<TaskInstance>>;

    /// Administrative bulk cleanup of instances due before `date`.
    fn purge_instances_before(&self, date: NaiveDate) -> Result<usize>;
}
