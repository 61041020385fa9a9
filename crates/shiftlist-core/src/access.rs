//! Capability check: `can(user, action, store)`.
//!
//! Admins reach every store. Managers reach their own store for every action
//! except bulk cleanup and store administration. Workers may only view and
//! complete tasks in their store.

use crate::error::{Result, ShiftlistError};
use crate::types::{Role, StoreId, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewTasks,
    CompleteTask,
    /// Complete on behalf of another store-bound user.
    DelegateCompletion,
    SkipTask,
    CreateAdHoc,
    RunGeneration,
    ViewReports,
    ManageTemplates,
    /// Create users or change their active flag.
    ManageUsers,
    ManageStores,
    Cleanup,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::ViewTasks => "view tasks",
            Action::CompleteTask => "complete tasks",
            Action::DelegateCompletion => "complete tasks for others",
            Action::SkipTask => "skip tasks",
            Action::CreateAdHoc => "create tasks",
            Action::RunGeneration => "run generation",
            Action::ViewReports => "view reports",
            Action::ManageTemplates => "manage templates",
            Action::ManageUsers => "manage users",
            Action::ManageStores => "manage stores",
            Action::Cleanup => "clean up tasks",
        };
        f.write_str(s)
    }
}

/// `store = None` means "all stores", which only admins reach.
pub fn can(user: &User, action: Action, store: Option<StoreId>) -> bool {
    if !user.active {
        return false;
    }
    match user.role {
        Role::Admin => true,
        Role::Manager => {
            !matches!(action, Action::Cleanup | Action::ManageStores)
                && store.is_some()
                && store == user.store_id
        }
        Role::Worker => {
            matches!(action, Action::ViewTasks | Action::CompleteTask)
                && store.is_some()
                && store == user.store_id
        }
    }
}

/// `can` as a `Result`, failing with `Forbidden`.
pub fn require(user: &User, action: Action, store: Option<StoreId>) -> Result<()> {
    if can(user, action, store) {
        Ok(())
    } else {
        let target = store.map_or_else(|| "all stores".to_string(), |id| format!("store {id}"));
        Err(ShiftlistError::forbidden(format!(
            "user {} ({}) may not {action} for {target}",
            user.id, user.role
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn user(role: Role, store_id: Option<StoreId>) -> User {
        User {
            id: 1,
            username: "u".into(),
            full_name: "U".into(),
            role,
            store_id,
            active: true,
        }
    }

    #[test]
    fn test_admin_reaches_everything() {
        let admin = user(Role::Admin, None);
        assert!(can(&admin, Action::CreateAdHoc, Some(9)));
        assert!(can(&admin, Action::RunGeneration, None));
        assert!(can(&admin, Action::Cleanup, None));
    }

    #[test]
    fn test_manager_confined_to_own_store() {
        let mgr = user(Role::Manager, Some(1));
        assert!(can(&mgr, Action::CreateAdHoc, Some(1)));
        assert!(!can(&mgr, Action::CreateAdHoc, Some(2)));
        assert!(!can(&mgr, Action::ViewReports, None));
        assert!(!can(&mgr, Action::Cleanup, Some(1)));
        assert!(can(&mgr, Action::ManageTemplates, Some(1)));
        assert!(!can(&mgr, Action::ManageTemplates, None));
        assert!(can(&mgr, Action::ManageUsers, Some(1)));
        assert!(!can(&mgr, Action::ManageStores, Some(1)));
    }

    #[test]
    fn test_worker_can_only_complete_and_view() {
        let worker = user(Role::Worker, Some(1));
        assert!(can(&worker, Action::CompleteTask, Some(1)));
        assert!(!can(&worker, Action::CompleteTask, Some(2)));
        assert!(!can(&worker, Action::SkipTask, Some(1)));
        assert!(!can(&worker, Action::DelegateCompletion, Some(1)));
        assert!(!can(&worker, Action::ManageTemplates, Some(1)));
    }

    #[test]
    fn test_inactive_user_denied() {
        let mut admin = user(Role::Admin, None);
        admin.active = false;
        let err = require(&admin, Action::ViewTasks, Some(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
