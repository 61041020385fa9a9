//! Demo data for a fresh database.

use chrono::Weekday;
use shiftlist_core::error::Result;
use shiftlist_core::recurrence::RecurrenceRule;
use shiftlist_core::traits::TaskDatastore;
use shiftlist_core::types::{Role, ShiftScope};

use crate::db::{SqliteDb, TemplateDraft};

/// What `seed_demo` created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub stores: usize,
    pub users: usize,
    pub templates: usize,
}

/// Populate an empty database with stores, users, and a template set that
/// covers every recurrence kind. Does nothing when stores already exist.
pub fn seed_demo(db: &SqliteDb) -> Result<SeedSummary> {
    if !db.list_stores()?.is_empty() {
        tracing::info!("🌱 Database already has stores, skipping seed");
        return Ok(SeedSummary::default());
    }

    let stores = [
        ("Arcaden", "Regensburg"),
        ("Ziegetsdorfer Strasse", "Regensburg"),
        ("Cham", "Cham"),
        ("Straubing", "Straubing"),
    ];
    let mut first_store = None;
    for (name, city) in stores {
        let store = db.create_store(name, None, Some(city))?;
        first_store.get_or_insert(store.id);
    }
    let home = first_store.unwrap_or_default();

    db.create_user("admin", "System Administrator", Role::Admin, None)?;
    db.create_user("manager1", "Store Manager 1", Role::Manager, Some(home))?;
    db.create_user("worker1", "Max Mustermann", Role::Worker, Some(home))?;

    let templates = [
        TemplateDraft::new("Check bread stock", ShiftScope::Early, RecurrenceRule::Daily)
            .with_category("Stock"),
        TemplateDraft::new("Check fridge temperatures", ShiftScope::Both, RecurrenceRule::Daily)
            .with_category("Hygiene"),
        TemplateDraft::new("Cash count", ShiftScope::Late, RecurrenceRule::Daily)
            .with_category("Cash"),
        TemplateDraft::new("Deep clean counter", ShiftScope::Late, RecurrenceRule::Daily)
            .with_category("Cleaning")
            .requiring_evidence(),
        TemplateDraft::new(
            "Review supply order",
            ShiftScope::Early,
            RecurrenceRule::weekly(Weekday::Mon, None)?,
        )
        .with_category("Stock"),
        TemplateDraft::new(
            "Clean walk-in cooler door",
            ShiftScope::Both,
            RecurrenceRule::weekly(Weekday::Wed, Some(4))?,
        )
        .with_category("Deep clean"),
        TemplateDraft::new("Inventory", ShiftScope::Both, RecurrenceRule::monthly(1)?)
            .with_category("Stock"),
    ];
    for draft in &templates {
        db.create_template(draft)?;
    }

    let summary = SeedSummary {
        stores: stores.len(),
        users: 3,
        templates: templates.len(),
    };
    tracing::info!(
        "🌱 Seeded {} stores, {} users, {} templates",
        summary.stores,
        summary.users,
        summary.templates
    );
    Ok(summary)
}
