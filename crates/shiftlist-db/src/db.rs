//! SQLite datastore — stores, users, task templates, and task instances.
//!
//! Uniqueness of task instances is enforced by partial unique indexes, so
//! concurrent generators (in this process or another one sharing the file)
//! cannot create duplicates. Generated inserts use `ON CONFLICT DO NOTHING`.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, params_from_iter};
use shiftlist_core::error::{Result, ShiftlistError};
use shiftlist_core::recurrence::RecurrenceRule;
use shiftlist_core::traits::TaskDatastore;
use shiftlist_core::types::{
    Completion, InstanceFilter, InstanceId, NewInstance, Role, ShiftScope, Store, StoreId,
    TaskInstance, TaskTemplate, TemplateId, User, UserId,
};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

const DATE_FMT: &str = "%Y-%m-%d";

/// Shared SELECT column list for task queries.
const TASK_SELECT: &str = "SELECT id,template_id,store_id,title,description,category,shift,due_date,status,completed_by,completed_at,photo_path,notes,created_at FROM tasks";

const TEMPLATE_SELECT: &str = "SELECT id,title,description,category,shift,recurrence,recurrence_day,recurrence_cycle,store_id,requires_photo,active FROM task_templates";

const USER_SELECT: &str = "SELECT id,username,full_name,role,store_id,active FROM users";

/// Template fields supplied by the administrative layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub shift_scope: ShiftScope,
    pub recurrence: RecurrenceRule,
    pub store_id: Option<StoreId>,
    pub requires_evidence: bool,
}

impl TemplateDraft {
    pub fn new(title: &str, shift_scope: ShiftScope, recurrence: RecurrenceRule) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            category: None,
            shift_scope,
            recurrence,
            store_id: None,
            requires_evidence: false,
        }
    }

    pub fn for_store(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn requiring_evidence(mut self) -> Self {
        self.requires_evidence = true;
        self
    }
}

/// SQLite-backed datastore.
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

fn db_err(ctx: &'static str) -> impl Fn(rusqlite::Error) -> ShiftlistError {
    move |e| ShiftlistError::Dependency(format!("{ctx}: {e}"))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn conversion<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parse_col<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion(idx, e))
}

fn date_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FMT).map_err(|e| conversion(idx, e))
}

fn timestamp_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| conversion(idx, e))
    })
    .transpose()
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

/// Map a database row to a TaskInstance.
fn row_to_instance(row: &rusqlite::Row) -> rusqlite::Result<TaskInstance> {
    Ok(TaskInstance {
        id: row.get(0)?,
        template_id: row.get(1)?,
        store_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        shift: parse_col(row, 6)?,
        due_date: date_col(row, 7)?,
        status: parse_col(row, 8)?,
        completed_by: row.get(9)?,
        completed_at: timestamp_col(row, 10)?,
        evidence_path: row.get(11)?,
        notes: row.get(12)?,
        created_at: timestamp_col(row, 13)?.unwrap_or_else(Utc::now),
    })
}

fn row_to_store(row: &rusqlite::Row) -> rusqlite::Result<Store> {
    Ok(Store {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        city: row.get(3)?,
    })
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        role: parse_col::<Role>(row, 3)?,
        store_id: row.get(4)?,
        active: row.get::<_, i64>(5)? != 0,
    })
}

/// Raw template columns; the recurrence is decoded afterwards so one bad row
/// does not poison a whole listing.
struct TemplateRow {
    id: TemplateId,
    title: String,
    description: Option<String>,
    category: Option<String>,
    shift: String,
    recurrence: String,
    recurrence_day: Option<String>,
    recurrence_cycle: Option<i64>,
    store_id: Option<StoreId>,
    requires_photo: bool,
    active: bool,
}

fn row_to_template_row(row: &rusqlite::Row) -> rusqlite::Result<TemplateRow> {
    Ok(TemplateRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        shift: row.get(4)?,
        recurrence: row.get(5)?,
        recurrence_day: row.get(6)?,
        recurrence_cycle: row.get(7)?,
        store_id: row.get(8)?,
        requires_photo: row.get::<_, i64>(9)? != 0,
        active: row.get::<_, Option<i64>>(10)?.unwrap_or(1) != 0,
    })
}

impl TemplateRow {
    fn decode(self) -> Result<TaskTemplate> {
        let cycle = self
            .recurrence_cycle
            .map(u8::try_from)
            .transpose()
            .map_err(|_| ShiftlistError::invalid(format!("template {}: bad rotation week", self.id)))?;
        let recurrence =
            RecurrenceRule::from_columns(&self.recurrence, self.recurrence_day.as_deref(), cycle)?;
        Ok(TaskTemplate {
            id: self.id,
            title: self.title,
            description: self.description,
            category: self.category,
            shift_scope: self.shift.parse()?,
            recurrence,
            store_id: self.store_id,
            requires_evidence: self.requires_photo,
            active: self.active,
        })
    }
}

impl SqliteDb {
    /// Open or create the database. Pass `:memory:` for a private in-memory store.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err("DB open error"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(db_err("DB pragma error"))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ShiftlistError::Dependency(format!("Lock: {e}")))
    }

    /// Run schema migrations.
    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS stores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                address TEXT,
                city TEXT,
                created_at TEXT DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                full_name TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('admin', 'manager', 'worker')),
                store_id INTEGER REFERENCES stores(id),
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS task_templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                category TEXT,
                shift TEXT NOT NULL,
                recurrence TEXT NOT NULL CHECK(recurrence IN ('daily', 'weekly', 'monthly', 'once')),
                recurrence_day TEXT,
                recurrence_cycle INTEGER,
                store_id INTEGER REFERENCES stores(id),
                requires_photo INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                template_id INTEGER REFERENCES task_templates(id),
                store_id INTEGER NOT NULL REFERENCES stores(id),
                title TEXT NOT NULL,
                description TEXT,
                category TEXT,
                shift TEXT NOT NULL CHECK(shift IN ('early', 'late')),
                due_date TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending', 'completed', 'skipped')),
                completed_by INTEGER REFERENCES users(id),
                completed_at TEXT,
                photo_path TEXT,
                notes TEXT,
                created_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_template_key
                ON tasks(template_id, store_id, due_date, shift) WHERE template_id IS NOT NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_adhoc_key
                ON tasks(title, store_id, due_date, shift) WHERE template_id IS NULL;
            CREATE INDEX IF NOT EXISTS idx_tasks_store_date ON tasks(store_id, due_date);
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            CREATE INDEX IF NOT EXISTS idx_users_store ON users(store_id);
        ",
        )
        .map_err(db_err("Migration error"))?;

        // Columns added after the first schema; fail harmlessly when present.
        let alter_stmts = [
            "ALTER TABLE task_templates ADD COLUMN active INTEGER NOT NULL DEFAULT 1",
            "ALTER TABLE task_templates ADD COLUMN recurrence_cycle INTEGER",
        ];
        for stmt in &alter_stmts {
            let _ = conn.execute(stmt, []);
        }

        Ok(())
    }

    // ── Stores ────────────────────────────────────

    pub fn create_store(&self, name: &str, address: Option<&str>, city: Option<&str>) -> Result<Store> {
        if name.trim().is_empty() {
            return Err(ShiftlistError::invalid("store name is required"));
        }
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO stores (name, address, city) VALUES (?1, ?2, ?3)",
            params![name, address, city],
        )
        .map_err(db_err("Insert store"))?;
        Ok(Store {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            address: address.map(str::to_string),
            city: city.map(str::to_string),
        })
    }

    // ── Users ────────────────────────────────────

    pub fn create_user(
        &self,
        username: &str,
        full_name: &str,
        role: Role,
        store_id: Option<StoreId>,
    ) -> Result<User> {
        User::validate_binding(role, store_id)?;
        if let Some(id) = store_id
            && self.get_store(id)?.is_none()
        {
            return Err(ShiftlistError::not_found(format!("store {id}")));
        }
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (username, full_name, role, store_id) VALUES (?1, ?2, ?3, ?4)",
            params![username, full_name, role.as_str(), store_id],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                ShiftlistError::conflict(format!("username '{username}' taken"))
            } else {
                ShiftlistError::Dependency(format!("Create user: {e}"))
            }
        })?;
        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            full_name: full_name.to_string(),
            role,
            store_id,
            active: true,
        })
    }

    pub fn set_user_active(&self, id: UserId, active: bool) -> Result<()> {
        let conn = self.lock()?;
        let n = conn
            .execute(
                "UPDATE users SET active=?1 WHERE id=?2",
                params![active as i32, id],
            )
            .map_err(db_err("Update user"))?;
        if n == 0 {
            return Err(ShiftlistError::not_found(format!("user {id}")));
        }
        Ok(())
    }

    // ── Templates ────────────────────────────────────

    pub fn create_template(&self, draft: &TemplateDraft) -> Result<TaskTemplate> {
        if draft.title.trim().is_empty() {
            return Err(ShiftlistError::invalid("template title is required"));
        }
        if let Some(id) = draft.store_id
            && self.get_store(id)?.is_none()
        {
            return Err(ShiftlistError::not_found(format!("store {id}")));
        }
        let (kind, day, cycle) = draft.recurrence.to_columns();
        let id = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO task_templates (title, description, category, shift, recurrence, recurrence_day, recurrence_cycle, store_id, requires_photo)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    draft.title,
                    draft.description,
                    draft.category,
                    draft.shift_scope.as_str(),
                    kind,
                    day,
                    cycle,
                    draft.store_id,
                    draft.requires_evidence as i32,
                ],
            )
            .map_err(db_err("Insert template"))?;
            conn.last_insert_rowid()
        };
        tracing::debug!("📋 Template created: '{}' ({})", draft.title, id);
        self.get_template(id)?
            .ok_or_else(|| ShiftlistError::not_found(format!("template {id}")))
    }

    /// Soft-disable or re-enable a template. Templates are never deleted.
    pub fn set_template_active(&self, id: TemplateId, active: bool) -> Result<()> {
        let conn = self.lock()?;
        let n = conn
            .execute(
                "UPDATE task_templates SET active=?1 WHERE id=?2",
                params![active as i32, id],
            )
            .map_err(db_err("Update template"))?;
        if n == 0 {
            return Err(ShiftlistError::not_found(format!("template {id}")));
        }
        Ok(())
    }

    /// Replace a template's definition. The active flag is left alone and
    /// instances generated earlier keep their copied title and description.
    pub fn update_template(&self, id: TemplateId, draft: &TemplateDraft) -> Result<TaskTemplate> {
        if draft.title.trim().is_empty() {
            return Err(ShiftlistError::invalid("template title is required"));
        }
        if let Some(store_id) = draft.store_id
            && self.get_store(store_id)?.is_none()
        {
            return Err(ShiftlistError::not_found(format!("store {store_id}")));
        }
        let (kind, day, cycle) = draft.recurrence.to_columns();
        {
            let conn = self.lock()?;
            let n = conn
                .execute(
                    "UPDATE task_templates SET title=?1, description=?2, category=?3, shift=?4, recurrence=?5,
                     recurrence_day=?6, recurrence_cycle=?7, store_id=?8, requires_photo=?9 WHERE id=?10",
                    params![
                        draft.title,
                        draft.description,
                        draft.category,
                        draft.shift_scope.as_str(),
                        kind,
                        day,
                        cycle,
                        draft.store_id,
                        draft.requires_evidence as i32,
                        id,
                    ],
                )
                .map_err(db_err("Update template"))?;
            if n == 0 {
                return Err(ShiftlistError::not_found(format!("template {id}")));
            }
        }
        tracing::debug!("📋 Template updated: '{}' ({})", draft.title, id);
        self.get_template(id)?
            .ok_or_else(|| ShiftlistError::not_found(format!("template {id}")))
    }

    /// All templates, including inactive and one-off ones.
    pub fn list_templates(&self) -> Result<Vec<TaskTemplate>> {
        self.load_templates(&format!("{TEMPLATE_SELECT} ORDER BY title"), params![])
    }

    fn load_templates(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<TaskTemplate>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(db_err("Prepare"))?;
        let rows: Vec<TemplateRow> = stmt
            .query_map(args, row_to_template_row)
            .map_err(db_err("Query"))?
            .collect::<rusqlite::Result<_>>()
            .map_err(db_err("Read template"))?;

        Ok(rows
            .into_iter()
            .filter_map(|raw| {
                let id = raw.id;
                match raw.decode() {
                    Ok(t) => Some(t),
                    Err(e) => {
                        tracing::warn!("⚠️ Skipping malformed template {id}: {e}");
                        None
                    }
                }
            })
            .collect())
    }
}

impl TaskDatastore for SqliteDb {
    fn list_stores(&self) -> Result<Vec<Store>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id,name,address,city FROM stores ORDER BY name")
            .map_err(db_err("Prepare"))?;
        let stores = stmt
            .query_map([], row_to_store)
            .map_err(db_err("Query"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read store"))?;
        Ok(stores)
    }

    fn get_store(&self, id: StoreId) -> Result<Option<Store>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id,name,address,city FROM stores WHERE id=?1",
            params![id],
            row_to_store,
        )
        .optional()
        .map_err(db_err("Get store"))
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.lock()?;
        conn.query_row(&format!("{USER_SELECT} WHERE id=?1"), params![id], row_to_user)
            .optional()
            .map_err(db_err("Get user"))
    }

    fn list_users(&self, store_id: Option<StoreId>) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "{USER_SELECT} WHERE ?1 IS NULL OR store_id = ?1 ORDER BY username"
            ))
            .map_err(db_err("Prepare"))?;
        let users = stmt
            .query_map(params![store_id], row_to_user)
            .map_err(db_err("Query"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read user"))?;
        Ok(users)
    }

    fn active_templates_for_store(&self, store_id: StoreId) -> Result<Vec<TaskTemplate>> {
        self.load_templates(
            &format!(
                "{TEMPLATE_SELECT} WHERE active = 1 AND recurrence != 'once' AND (store_id IS NULL OR store_id = ?1) ORDER BY id"
            ),
            params![store_id],
        )
    }

    fn get_template(&self, id: TemplateId) -> Result<Option<TaskTemplate>> {
        let raw = {
            let conn = self.lock()?;
            conn.query_row(
                &format!("{TEMPLATE_SELECT} WHERE id=?1"),
                params![id],
                row_to_template_row,
            )
            .optional()
            .map_err(db_err("Get template"))?
        };
        raw.map(TemplateRow::decode).transpose()
    }

    fn insert_generated(&self, batch: &[NewInstance]) -> Result<usize> {
        if let Some(row) = batch.iter().find(|r| r.template_id.is_none()) {
            return Err(ShiftlistError::invalid(format!(
                "generated row '{}' has no template",
                row.title
            )));
        }
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err("Begin"))?;
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO tasks (template_id, store_id, title, description, category, shift, due_date, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)
                     ON CONFLICT DO NOTHING",
                )
                .map_err(db_err("Prepare"))?;
            for row in batch {
                inserted += stmt
                    .execute(params![
                        row.template_id,
                        row.store_id,
                        row.title,
                        row.description,
                        row.category,
                        row.shift.as_str(),
                        format_date(row.due_date),
                        now,
                    ])
                    .map_err(db_err("Insert task"))?;
            }
        }
        tx.commit().map_err(db_err("Commit"))?;
        Ok(inserted)
    }

    fn insert_ad_hoc(&self, instance: &NewInstance) -> Result<TaskInstance> {
        if instance.template_id.is_some() {
            return Err(ShiftlistError::invalid("ad hoc task cannot reference a template"));
        }
        let due = format_date(instance.due_date);
        let id = {
            let mut conn = self.lock()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db_err("Begin"))?;
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM tasks WHERE title=?1 AND store_id=?2 AND due_date=?3 AND shift=?4",
                    params![instance.title, instance.store_id, due, instance.shift.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err("Check task"))?;
            if existing.is_some() {
                return Err(ShiftlistError::conflict(format!(
                    "task '{}' already exists for store {} on {} ({})",
                    instance.title, instance.store_id, due, instance.shift
                )));
            }
            tx.execute(
                "INSERT INTO tasks (template_id, store_id, title, description, category, shift, due_date, status, created_at)
                 VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
                params![
                    instance.store_id,
                    instance.title,
                    instance.description,
                    instance.category,
                    instance.shift.as_str(),
                    due,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ShiftlistError::conflict(format!("task '{}' already exists", instance.title))
                } else {
                    ShiftlistError::Dependency(format!("Insert task: {e}"))
                }
            })?;
            let id = tx.last_insert_rowid();
            tx.commit().map_err(db_err("Commit"))?;
            id
        };
        self.get_instance(id)?
            .ok_or_else(|| ShiftlistError::not_found(format!("task {id}")))
    }

    fn get_instance(&self, id: InstanceId) -> Result<Option<TaskInstance>> {
        let conn = self.lock()?;
        conn.query_row(&format!("{TASK_SELECT} WHERE id=?1"), params![id], row_to_instance)
            .optional()
            .map_err(db_err("Get task"))
    }

    fn mark_completed(&self, id: InstanceId, completion: &Completion) -> Result<bool> {
        let conn = self.lock()?;
        let n = conn
            .execute(
                "UPDATE tasks SET status='completed', completed_by=?1, completed_at=?2, photo_path=?3, notes=?4
                 WHERE id=?5 AND status='pending'",
                params![
                    completion.completed_by,
                    completion.completed_at.to_rfc3339(),
                    completion.evidence_path,
                    completion.notes,
                    id,
                ],
            )
            .map_err(db_err("Complete task"))?;
        Ok(n == 1)
    }

    fn mark_skipped(&self, id: InstanceId, notes: Option<&str>) -> Result<bool> {
        let conn = self.lock()?;
        let n = conn
            .execute(
                "UPDATE tasks SET status='skipped', notes=COALESCE(?1, notes) WHERE id=?2 AND status='pending'",
                params![notes, id],
            )
            .map_err(db_err("Skip task"))?;
        Ok(n == 1)
    }

    fn query_instances(&self, filter: &InstanceFilter) -> Result<Vec<TaskInstance>> {
        let mut sql = format!("{TASK_SELECT} WHERE 1=1");
        let mut args: Vec<Value> = Vec::new();
        if let Some(store_id) = filter.store_id {
            sql.push_str(" AND store_id = ?");
            args.push(Value::Integer(store_id));
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND due_date >= ?");
            args.push(Value::Text(format_date(from)));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND due_date <= ?");
            args.push(Value::Text(format_date(to)));
        }
        if let Some(shift) = filter.shift {
            sql.push_str(" AND shift = ?");
            args.push(Value::Text(shift.as_str().into()));
        }
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            args.push(Value::Text(status.as_str().into()));
        }
        sql.push_str(" ORDER BY due_date DESC, shift, category, title");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(db_err("Prepare"))?;
        let tasks = stmt
            .query_map(params_from_iter(args.iter()), row_to_instance)
            .map_err(db_err("Query"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read task"))?;
        Ok(tasks)
    }

    fn purge_instances_before(&self, date: NaiveDate) -> Result<usize> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM tasks WHERE due_date < ?1",
            params![format_date(date)],
        )
        .map_err(db_err("Purge tasks"))
    }
}
