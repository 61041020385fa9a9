//! Reference-data administration on behalf of an authenticated user.
//!
//! Every write is checked with [`access::require`] before it reaches
//! [`SqliteDb`]. Managers work inside their own store: they add workers,
//! toggle users of that store, and maintain store-scoped templates. Stores
//! and global templates stay with admins.

use shiftlist_core::access::{self, Action};
use shiftlist_core::error::{Result, ShiftlistError};
use shiftlist_core::traits::TaskDatastore;
use shiftlist_core::types::{Role, Store, StoreId, TaskTemplate, TemplateId, User, UserId};

use crate::db::{SqliteDb, TemplateDraft};

pub struct Administration<'a> {
    db: &'a SqliteDb,
    actor: &'a User,
}

impl<'a> Administration<'a> {
    pub fn new(db: &'a SqliteDb, actor: &'a User) -> Self {
        Self { db, actor }
    }

    pub fn create_store(&self, name: &str, address: Option<&str>, city: Option<&str>) -> Result<Store> {
        access::require(self.actor, Action::ManageStores, None)?;
        let store = self.db.create_store(name, address, city)?;
        tracing::info!("🏪 Store '{}' ({}) created by user {}", store.name, store.id, self.actor.id);
        Ok(store)
    }

    /// Stores the actor can see: all of them for admins, otherwise their own.
    pub fn list_stores(&self) -> Result<Vec<Store>> {
        if self.actor.role == Role::Admin && self.actor.active {
            return self.db.list_stores();
        }
        access::require(self.actor, Action::ViewTasks, self.actor.store_id)?;
        Ok(self
            .db
            .list_stores()?
            .into_iter()
            .filter(|s| Some(s.id) == self.actor.store_id)
            .collect())
    }

    pub fn create_user(
        &self,
        username: &str,
        full_name: &str,
        role: Role,
        store_id: Option<StoreId>,
    ) -> Result<User> {
        access::require(self.actor, Action::ManageUsers, store_id)?;
        if self.actor.role != Role::Admin && role != Role::Worker {
            return Err(ShiftlistError::forbidden(format!(
                "user {} may only create workers",
                self.actor.id
            )));
        }
        let user = self.db.create_user(username, full_name, role, store_id)?;
        tracing::info!("👤 User '{}' ({}, {}) created by user {}", user.username, user.id, user.role, self.actor.id);
        Ok(user)
    }

    pub fn set_user_active(&self, id: UserId, active: bool) -> Result<()> {
        if id == self.actor.id {
            return Err(ShiftlistError::invalid("cannot change your own active flag"));
        }
        let target = self
            .db
            .get_user(id)?
            .ok_or_else(|| ShiftlistError::not_found(format!("user {id}")))?;
        access::require(self.actor, Action::ManageUsers, target.store_id)?;
        if self.actor.role != Role::Admin && target.role != Role::Worker {
            return Err(ShiftlistError::forbidden(format!(
                "user {} may only change workers",
                self.actor.id
            )));
        }
        self.db.set_user_active(id, active)?;
        tracing::info!("👤 User {id} active={active} (by user {})", self.actor.id);
        Ok(())
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        if self.actor.role == Role::Admin && self.actor.active {
            return self.db.list_users(None);
        }
        access::require(self.actor, Action::ManageUsers, self.actor.store_id)?;
        self.db.list_users(self.actor.store_id)
    }

    pub fn create_template(&self, draft: &TemplateDraft) -> Result<TaskTemplate> {
        access::require(self.actor, Action::ManageTemplates, draft.store_id)?;
        self.db.create_template(draft)
    }

    /// Both the current and the requested store must be manageable, so a
    /// manager can neither take over a global template nor hand theirs out.
    pub fn update_template(&self, id: TemplateId, draft: &TemplateDraft) -> Result<TaskTemplate> {
        let existing = self.template(id)?;
        access::require(self.actor, Action::ManageTemplates, existing.store_id)?;
        access::require(self.actor, Action::ManageTemplates, draft.store_id)?;
        self.db.update_template(id, draft)
    }

    pub fn set_template_active(&self, id: TemplateId, active: bool) -> Result<()> {
        let existing = self.template(id)?;
        access::require(self.actor, Action::ManageTemplates, existing.store_id)?;
        self.db.set_template_active(id, active)?;
        tracing::info!("📋 Template {id} active={active} (by user {})", self.actor.id);
        Ok(())
    }

    /// Admins see every template. Managers see the global ones plus their
    /// store's, since both feed that store's checklist.
    pub fn list_templates(&self) -> Result<Vec<TaskTemplate>> {
        if self.actor.role == Role::Admin && self.actor.active {
            return self.db.list_templates();
        }
        access::require(self.actor, Action::ManageTemplates, self.actor.store_id)?;
        Ok(self
            .db
            .list_templates()?
            .into_iter()
            .filter(|t| t.store_id.is_none() || t.store_id == self.actor.store_id)
            .collect())
    }

    fn template(&self, id: TemplateId) -> Result<TaskTemplate> {
        self.db
            .get_template(id)?
            .ok_or_else(|| ShiftlistError::not_found(format!("template {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiftlist_core::error::ErrorKind;
    use shiftlist_core::recurrence::RecurrenceRule;
    use shiftlist_core::types::ShiftScope;
    use std::path::PathBuf;

    struct Fixture {
        db: SqliteDb,
        store: Store,
        other: Store,
        admin: User,
        manager: User,
        worker: User,
    }

    fn fixture() -> Fixture {
        let db = SqliteDb::open(&PathBuf::from(":memory:")).unwrap();
        let store = db.create_store("Mitte", None, Some("Berlin")).unwrap();
        let other = db.create_store("Altona", None, Some("Hamburg")).unwrap();
        let admin = db.create_user("root", "Root", Role::Admin, None).unwrap();
        let manager = db.create_user("mara", "Mara", Role::Manager, Some(store.id)).unwrap();
        let worker = db.create_user("wim", "Wim", Role::Worker, Some(store.id)).unwrap();
        Fixture { db, store, other, admin, manager, worker }
    }

    fn daily(title: &str) -> TemplateDraft {
        TemplateDraft::new(title, ShiftScope::Both, RecurrenceRule::Daily)
    }

    #[test]
    fn test_only_admins_create_stores() {
        let f = fixture();
        let err = Administration::new(&f.db, &f.manager)
            .create_store("Pankow", None, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let store = Administration::new(&f.db, &f.admin)
            .create_store("Pankow", None, None)
            .unwrap();
        assert_eq!(store.name, "Pankow");
        assert_eq!(Administration::new(&f.db, &f.admin).list_stores().unwrap().len(), 3);
        assert_eq!(
            Administration::new(&f.db, &f.worker).list_stores().unwrap(),
            vec![f.store.clone()]
        );
    }

    #[test]
    fn test_manager_creates_only_workers_in_own_store() {
        let f = fixture();
        let ops = Administration::new(&f.db, &f.manager);
        let hired = ops.create_user("nora", "Nora", Role::Worker, Some(f.store.id)).unwrap();
        assert_eq!(hired.store_id, Some(f.store.id));

        let err = ops
            .create_user("otto", "Otto", Role::Manager, Some(f.store.id))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = ops
            .create_user("olga", "Olga", Role::Worker, Some(f.other.id))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let names: Vec<String> = ops.list_users().unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["mara", "nora", "wim"]);
    }

    #[test]
    fn test_set_user_active_checks_target_store() {
        let f = fixture();
        let elsewhere = f.db.create_user("eli", "Eli", Role::Worker, Some(f.other.id)).unwrap();
        let ops = Administration::new(&f.db, &f.manager);

        ops.set_user_active(f.worker.id, false).unwrap();
        assert!(!f.db.get_user(f.worker.id).unwrap().unwrap().active);

        let err = ops.set_user_active(elsewhere.id, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = ops.set_user_active(f.manager.id, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = ops.set_user_active(999, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = Administration::new(&f.db, &f.worker)
            .set_user_active(f.manager.id, false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_template_scope_rules() {
        let f = fixture();
        let global = f.db.create_template(&daily("Count tills")).unwrap();
        let foreign = f.db.create_template(&daily("Altona only").for_store(f.other.id)).unwrap();
        let manager = Administration::new(&f.db, &f.manager);

        let err = manager.create_template(&daily("Global try")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let own = manager.create_template(&daily("Fridge check").for_store(f.store.id)).unwrap();

        let edited = manager
            .update_template(own.id, &daily("Fridge temps").for_store(f.store.id).requiring_evidence())
            .unwrap();
        assert_eq!(edited.title, "Fridge temps");
        assert!(edited.requires_evidence);

        let err = manager
            .update_template(global.id, &daily("Mine now").for_store(f.store.id))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = manager.update_template(own.id, &daily("Fridge temps")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = manager.set_template_active(foreign.id, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        manager.set_template_active(own.id, false).unwrap();
        assert!(!f.db.get_template(own.id).unwrap().unwrap().active);

        let visible: Vec<TemplateId> = manager.list_templates().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(visible, vec![global.id, own.id]);
        assert_eq!(Administration::new(&f.db, &f.admin).list_templates().unwrap().len(), 3);

        let err = Administration::new(&f.db, &f.worker).list_templates().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = Administration::new(&f.db, &f.admin).set_template_active(999, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_deactivated_admin_is_refused() {
        let f = fixture();
        f.db.set_user_active(f.admin.id, false).unwrap();
        let admin = f.db.get_user(f.admin.id).unwrap().unwrap();
        let err = Administration::new(&f.db, &admin).list_templates().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = Administration::new(&f.db, &admin).create_store("X", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
