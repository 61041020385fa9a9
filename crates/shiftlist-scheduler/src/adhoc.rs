//! One-off tasks created by hand, outside any template.

use chrono::NaiveDate;
use shiftlist_core::access::{Action, require};
use shiftlist_core::error::{Result, ShiftlistError};
use shiftlist_core::traits::TaskDatastore;
use shiftlist_core::types::{NewInstance, Shift, StoreId, TaskInstance, User};

/// Incoming request; every field except description and category is required.
#[derive(Debug, Clone, Default)]
pub struct AdHocRequest {
    pub store_id: Option<StoreId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub shift: Option<Shift>,
    pub due_date: Option<NaiveDate>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| ShiftlistError::invalid(format!("{field} is required")))
}

/// Create a pending task with no template. Duplicate titles for the same
/// store, date and shift fail with `Conflict`.
pub fn create_ad_hoc(db: &dyn TaskDatastore, actor: &User, request: AdHocRequest) -> Result<TaskInstance> {
    let store_id = required(request.store_id, "store_id")?;
    require(actor, Action::CreateAdHoc, Some(store_id))?;

    let title = required(
        request.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        "title",
    )?;
    let shift = required(request.shift, "shift")?;
    let due_date = required(request.due_date, "due_date")?;

    if db.get_store(store_id)?.is_none() {
        return Err(ShiftlistError::not_found(format!("store {store_id}")));
    }

    let task = db.insert_ad_hoc(&NewInstance {
        template_id: None,
        store_id,
        title,
        description: request.description,
        category: request.category,
        shift,
        due_date,
    })?;
    tracing::info!(
        "📝 Ad hoc task {} '{}' for store {} on {} ({})",
        task.id,
        task.title,
        store_id,
        due_date,
        shift
    );
    Ok(task)
}
