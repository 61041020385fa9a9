//! Task instance lifecycle: `pending` → `completed` | `skipped`, exactly once.

use std::sync::Arc;

use chrono::Utc;
use shiftlist_core::access::{Action, require};
use shiftlist_core::error::{Result, ShiftlistError};
use shiftlist_core::traits::{EvidenceSink, EvidenceUpload, TaskDatastore};
use shiftlist_core::types::{Completion, InstanceId, TaskInstance, User, UserId};

/// Look up the acting user, failing with `NotFound`.
pub fn load_actor(db: &dyn TaskDatastore, id: UserId) -> Result<User> {
    db.get_user(id)?
        .ok_or_else(|| ShiftlistError::not_found(format!("user {id}")))
}

#[derive(Debug, Clone, Default)]
pub struct CompleteRequest {
    pub notes: Option<String>,
    pub evidence: Option<EvidenceUpload>,
    /// Worker to record as the completer; admins and managers only.
    pub on_behalf_of: Option<UserId>,
}

pub struct TaskLifecycle {
    db: Arc<dyn TaskDatastore>,
    sink: Arc<dyn EvidenceSink>,
}

impl TaskLifecycle {
    pub fn new(db: Arc<dyn TaskDatastore>, sink: Arc<dyn EvidenceSink>) -> Self {
        Self { db, sink }
    }

    fn instance(&self, id: InstanceId) -> Result<TaskInstance> {
        self.db
            .get_instance(id)?
            .ok_or_else(|| ShiftlistError::not_found(format!("task {id}")))
    }

    /// Resolve who gets credited for the completion.
    fn completer(&self, actor: &User, task: &TaskInstance, target: Option<UserId>) -> Result<UserId> {
        let Some(target_id) = target.filter(|&id| id != actor.id) else {
            return Ok(actor.id);
        };
        require(actor, Action::DelegateCompletion, Some(task.store_id))?;
        let target = self
            .db
            .get_user(target_id)?
            .ok_or_else(|| ShiftlistError::invalid(format!("target user {target_id} does not exist")))?;
        if !target.active || target.store_id != Some(task.store_id) {
            return Err(ShiftlistError::invalid(format!(
                "user {} is not an active member of store {}",
                target.id, task.store_id
            )));
        }
        Ok(target.id)
    }

    fn requires_evidence(&self, task: &TaskInstance) -> Result<bool> {
        match task.template_id {
            Some(id) => Ok(self
                .db
                .get_template(id)?
                .is_some_and(|t| t.requires_evidence)),
            None => Ok(false),
        }
    }

    /// Complete a pending instance.
    ///
    /// Evidence goes to the sink before the status write; if the write does not
    /// land, the stored payload is discarded again.
    pub fn complete(
        &self,
        id: InstanceId,
        actor: &User,
        request: CompleteRequest,
    ) -> Result<TaskInstance> {
        let task = self.instance(id)?;
        require(actor, Action::CompleteTask, Some(task.store_id))?;
        let completed_by = self.completer(actor, &task, request.on_behalf_of)?;
        if task.status.is_terminal() {
            return Err(ShiftlistError::conflict(format!("task {id} is already {}", task.status)));
        }
        if request.evidence.is_none() && self.requires_evidence(&task)? {
            return Err(ShiftlistError::PreconditionFailed(format!(
                "task {id} requires photo evidence"
            )));
        }

        let evidence_path = request
            .evidence
            .as_ref()
            .map(|upload| self.sink.store(upload))
            .transpose()?;

        let completion = Completion {
            completed_by,
            completed_at: Utc::now(),
            evidence_path,
            notes: request.notes,
        };
        let written = self.db.mark_completed(id, &completion);
        if !matches!(written, Ok(true)) {
            if let Some(path) = completion.evidence_path.as_deref()
                && let Err(e) = self.sink.discard(path)
            {
                tracing::warn!("⚠️ Could not discard evidence {path}: {e}");
            }
        }
        if !written? {
            return Err(self.lost_transition(id));
        }

        tracing::info!(
            "✅ Task {} '{}' completed by user {}",
            id,
            task.title,
            completed_by
        );
        self.instance(id)
    }

    /// Skip a pending instance.
    pub fn skip(&self, id: InstanceId, actor: &User, notes: Option<&str>) -> Result<TaskInstance> {
        let task = self.instance(id)?;
        require(actor, Action::SkipTask, Some(task.store_id))?;
        if task.status.is_terminal() {
            return Err(ShiftlistError::conflict(format!("task {id} is already {}", task.status)));
        }
        if !self.db.mark_skipped(id, notes)? {
            return Err(self.lost_transition(id));
        }
        tracing::info!("⏭️ Task {} '{}' skipped by user {}", id, task.title, actor.id);
        self.instance(id)
    }

    /// Another writer got there first, or the row vanished.
    fn lost_transition(&self, id: InstanceId) -> ShiftlistError {
        match self.db.get_instance(id) {
            Ok(Some(task)) => ShiftlistError::conflict(format!("task {id} is already {}", task.status)),
            Ok(None) => ShiftlistError::not_found(format!("task {id}")),
            Err(e) => e,
        }
    }
}
