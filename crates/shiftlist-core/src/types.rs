//! Domain model: stores, users, templates, and task instances.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, ShiftlistError};
use crate::recurrence::RecurrenceRule;

pub type StoreId = i64;
pub type UserId = i64;
pub type TemplateId = i64;
pub type InstanceId = i64;

/// A physical store location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
}

/// User role. Managers and workers are bound to exactly one store, admins to none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Worker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Worker => "worker",
        }
    }

    /// Whether a user with this role must carry a store binding.
    pub fn is_store_bound(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = ShiftlistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "owner" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "worker" | "employee" => Ok(Role::Worker),
            other => Err(ShiftlistError::invalid(format!("unknown role '{other}'"))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An actor who can complete tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub store_id: Option<StoreId>,
    pub active: bool,
}

impl User {
    /// Check the role/store binding invariant.
    pub fn validate_binding(role: Role, store_id: Option<StoreId>) -> Result<()> {
        match (role.is_store_bound(), store_id) {
            (true, None) => Err(ShiftlistError::invalid(format!(
                "{role} must be bound to a store"
            ))),
            (false, Some(_)) => Err(ShiftlistError::invalid("admin cannot be bound to a store")),
            _ => Ok(()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A named portion of the operating day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Early,
    Late,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::Early => "early",
            Shift::Late => "late",
        }
    }
}

impl FromStr for Shift {
    type Err = ShiftlistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "early" | "frueh" => Ok(Shift::Early),
            "late" | "spaet" => Ok(Shift::Late),
            other => Err(ShiftlistError::invalid(format!("unknown shift '{other}'"))),
        }
    }
}

impl std::fmt::Display for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which shifts a template spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftScope {
    Early,
    Late,
    Both,
}

impl ShiftScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftScope::Early => "early",
            ShiftScope::Late => "late",
            ShiftScope::Both => "both",
        }
    }

    /// Expand the scope into concrete shifts, early first.
    pub fn shifts(&self) -> &'static [Shift] {
        match self {
            ShiftScope::Early => &[Shift::Early],
            ShiftScope::Late => &[Shift::Late],
            ShiftScope::Both => &[Shift::Early, Shift::Late],
        }
    }
}

impl FromStr for ShiftScope {
    type Err = ShiftlistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "early" | "frueh" => Ok(ShiftScope::Early),
            "late" | "spaet" => Ok(ShiftScope::Late),
            "both" | "beide" => Ok(ShiftScope::Both),
            other => Err(ShiftlistError::invalid(format!("unknown shift scope '{other}'"))),
        }
    }
}

/// Recurring work definition. Never mutated by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub id: TemplateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub shift_scope: ShiftScope,
    pub recurrence: RecurrenceRule,
    /// None = applies to every store.
    pub store_id: Option<StoreId>,
    pub requires_evidence: bool,
    pub active: bool,
}

impl TaskTemplate {
    pub fn applies_to(&self, store_id: StoreId) -> bool {
        self.store_id.is_none_or(|id| id == store_id)
    }
}

/// Task instance status. Moves forward exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

impl FromStr for TaskStatus {
    type Err = ShiftlistError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            "skipped" => Ok(TaskStatus::Skipped),
            other => Err(ShiftlistError::invalid(format!("unknown status '{other}'"))),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete unit of work for one store, one due date, one shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInstance {
    pub id: InstanceId,
    /// None for ad hoc tasks.
    pub template_id: Option<TemplateId>,
    pub store_id: StoreId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub shift: Shift,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
    pub completed_by: Option<UserId>,
    pub completed_at: Option<DateTime<Utc>>,
    pub evidence_path: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row to insert. Title, description and category are copied, not linked.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInstance {
    pub template_id: Option<TemplateId>,
    pub store_id: StoreId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub shift: Shift,
    pub due_date: NaiveDate,
}

impl NewInstance {
    pub fn from_template(
        template: &TaskTemplate,
        store_id: StoreId,
        shift: Shift,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            template_id: Some(template.id),
            store_id,
            title: template.title.clone(),
            description: template.description.clone(),
            category: template.category.clone(),
            shift,
            due_date,
        }
    }
}

/// Terminal-state write applied by the lifecycle component.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub completed_by: UserId,
    pub completed_at: DateTime<Utc>,
    pub evidence_path: Option<String>,
    pub notes: Option<String>,
}

/// Instance query used by listings and the report collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceFilter {
    pub store_id: Option<StoreId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub shift: Option<Shift>,
    pub status: Option<TaskStatus>,
}

impl InstanceFilter {
    pub fn for_store(store_id: StoreId) -> Self {
        Self {
            store_id: Some(store_id),
            ..Self::default()
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.from = Some(date);
        self.to = Some(date);
        self
    }
}
