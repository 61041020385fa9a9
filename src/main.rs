//! # Shiftlist — recurring store checklists
//!
//! Usage:
//!   shiftlist init --seed                       # Create the database with demo data
//!   shiftlist init --admin root                 # Bootstrap the first admin user
//!   shiftlist serve                             # Run the daily generation timer
//!   shiftlist generate --date 2026-10-14        # Generate tasks for every store
//!   shiftlist tasks --as 3 --date 2026-10-14    # List a user's tasks
//!   shiftlist complete 42 --as 3 --photo a.jpg  # Complete a task with evidence
//!   shiftlist admin --as 1 templates            # Reference data, access-checked

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use shiftlist_core::traits::{EvidenceUpload, TaskDatastore};
use shiftlist_core::types::{
    InstanceFilter, InstanceId, Role, Shift, ShiftScope, StoreId, TaskStatus, TemplateId, UserId,
};
use shiftlist_core::{RecurrenceRule, ShiftlistConfig};
use shiftlist_db::{Administration, SqliteDb, TemplateDraft, seed_demo};
use shiftlist_scheduler::{
    AdHocRequest, CancelFlag, CompleteRequest, CronSchedule, FsEvidenceSink, GenerationEngine,
    ReportQuery, StoreScope, TaskLifecycle, create_ad_hoc, list_instances, load_actor,
    spawn_daily_trigger, summarize,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "shiftlist",
    version,
    about = "📋 Shiftlist — recurring store checklists"
)]
struct Cli {
    /// Config file (default: ~/.shiftlist/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Database path, overrides the config file
    #[arg(long)]
    db: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and a default config
    Init {
        /// Load demo stores, users and templates
        #[arg(long)]
        seed: bool,
        /// Create an admin with this username unless it already exists
        #[arg(long, value_name = "USERNAME")]
        admin: Option<String>,
    },
    /// Run the daily generation timer until Ctrl-C
    Serve,
    /// Generate task instances for a date
    Generate {
        #[arg(long)]
        store: Option<StoreId>,
        /// Defaults to today (local time)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Run as this user; without it the run is a system run
        #[arg(long = "as")]
        actor: Option<UserId>,
    },
    /// List task instances
    Tasks {
        #[arg(long = "as")]
        actor: UserId,
        #[arg(long)]
        store: Option<StoreId>,
        #[arg(long, conflicts_with_all = ["from", "to"])]
        date: Option<NaiveDate>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        shift: Option<Shift>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Complete a task
    Complete {
        task: InstanceId,
        #[arg(long = "as")]
        actor: UserId,
        #[arg(long)]
        notes: Option<String>,
        /// Photo evidence (jpeg, png or gif)
        #[arg(long)]
        photo: Option<PathBuf>,
        /// Record the completion for this worker
        #[arg(long = "for")]
        on_behalf_of: Option<UserId>,
    },
    /// Skip a task
    Skip {
        task: InstanceId,
        #[arg(long = "as")]
        actor: UserId,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Create a one-off task
    Add {
        #[arg(long = "as")]
        actor: UserId,
        #[arg(long)]
        store: StoreId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        shift: Shift,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Completion summary for a date range
    Stats {
        #[arg(long = "as")]
        actor: UserId,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long)]
        store: Option<StoreId>,
    },
    /// Delete tasks due before a date (admin only)
    Cleanup {
        #[arg(long = "as")]
        actor: UserId,
        #[arg(long)]
        before: NaiveDate,
    },
    /// Reference data administration
    Admin {
        #[arg(long = "as")]
        actor: UserId,
        #[command(subcommand)]
        cmd: AdminCommand,
    },
}

/// Rule forms: daily, weekly:monday, weekly:wednesday:4, monthly:1
#[derive(Args)]
struct TemplateArgs {
    title: String,
    #[arg(long)]
    shift: ShiftScope,
    #[arg(long)]
    rule: RecurrenceRule,
    #[arg(long)]
    store: Option<StoreId>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    requires_photo: bool,
}

impl TemplateArgs {
    fn into_draft(self) -> TemplateDraft {
        let mut draft = TemplateDraft::new(&self.title, self.shift, self.rule);
        if let Some(id) = self.store {
            draft = draft.for_store(id);
        }
        if let Some(c) = &self.category {
            draft = draft.with_category(c);
        }
        if let Some(d) = &self.description {
            draft = draft.with_description(d);
        }
        if self.requires_photo {
            draft = draft.requiring_evidence();
        }
        draft
    }
}

#[derive(Subcommand)]
enum AdminCommand {
    AddStore {
        name: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
    },
    AddUser {
        username: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        store: Option<StoreId>,
    },
    SetUserActive {
        id: UserId,
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
    },
    Users,
    AddTemplate(TemplateArgs),
    /// Replace a template's fields; existing tasks keep their copies
    EditTemplate {
        id: TemplateId,
        #[command(flatten)]
        fields: TemplateArgs,
    },
    SetTemplateActive {
        id: TemplateId,
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
    },
    Templates,
    Stores,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

fn load_config(cli: &Cli) -> Result<ShiftlistConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = ShiftlistConfig::load_from(&expand_path(path))?;
            config.apply_env();
            config
        }
        None => ShiftlistConfig::load()?,
    };
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    Ok(config)
}

fn open_db(config: &ShiftlistConfig) -> Result<Arc<SqliteDb>> {
    let path = config.database.expanded_path();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let db = SqliteDb::open(&path)?;
    tracing::debug!("🗄️ Database: {}", path.display());
    Ok(Arc::new(db))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "shiftlist=debug,shiftlist_scheduler=debug,shiftlist_db=debug"
    } else {
        "shiftlist=info,shiftlist_scheduler=info,shiftlist_db=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(&cli)?;
    let db = open_db(&config)?;

    match cli.command {
        Command::Init { seed, admin } => {
            let path = ShiftlistConfig::default_path();
            if cli.config.is_none() && !path.exists() {
                config.save()?;
                println!("✅ Config written to {}", path.display());
            }
            println!("✅ Database ready at {}", config.database.expanded_path().display());
            if seed {
                let summary = seed_demo(&db)?;
                println!(
                    "🌱 Seeded {} stores, {} users, {} templates",
                    summary.stores, summary.users, summary.templates
                );
            }
            if let Some(username) = admin {
                bootstrap_admin(&db, &username)?;
            }
        }

        Command::Serve => serve(&config, db).await?,

        Command::Generate { store, date, actor } => {
            let engine = GenerationEngine::new(db.clone());
            let report = match actor {
                Some(id) => {
                    let actor = load_actor(&*db, id)?;
                    engine.run_manual_generation(&actor, store, date)?
                }
                None => {
                    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
                    engine.run_system_generation(StoreScope::from(store), date, &CancelFlag::new())?
                }
            };
            print_json(&report)?;
        }

        Command::Tasks {
            actor,
            store,
            date,
            from,
            to,
            shift,
            status,
        } => {
            let actor = load_actor(&*db, actor)?;
            let filter = InstanceFilter {
                store_id: store,
                from: date.or(from),
                to: date.or(to),
                shift,
                status,
            };
            print_json(&list_instances(&*db, &actor, &filter)?)?;
        }

        Command::Complete {
            task,
            actor,
            notes,
            photo,
            on_behalf_of,
        } => {
            let actor = load_actor(&*db, actor)?;
            let evidence = photo
                .map(|path| -> Result<EvidenceUpload> {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("read {}", path.display()))?;
                    let mut upload = EvidenceUpload::new(bytes, content_type_for(&path));
                    upload.file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                    Ok(upload)
                })
                .transpose()?;
            let sink = Arc::new(FsEvidenceSink::from_config(&config.evidence));
            let lifecycle = TaskLifecycle::new(db.clone(), sink);
            let done = lifecycle.complete(
                task,
                &actor,
                CompleteRequest {
                    notes,
                    evidence,
                    on_behalf_of,
                },
            )?;
            print_json(&done)?;
        }

        Command::Skip { task, actor, notes } => {
            let actor = load_actor(&*db, actor)?;
            let sink = Arc::new(FsEvidenceSink::from_config(&config.evidence));
            let lifecycle = TaskLifecycle::new(db.clone(), sink);
            print_json(&lifecycle.skip(task, &actor, notes.as_deref())?)?;
        }

        Command::Add {
            actor,
            store,
            title,
            shift,
            date,
            description,
            category,
        } => {
            let actor = load_actor(&*db, actor)?;
            let task = create_ad_hoc(
                &*db,
                &actor,
                AdHocRequest {
                    store_id: Some(store),
                    title: Some(title),
                    description,
                    category,
                    shift: Some(shift),
                    due_date: Some(date),
                },
            )?;
            print_json(&task)?;
        }

        Command::Stats {
            actor,
            from,
            to,
            store,
        } => {
            let actor = load_actor(&*db, actor)?;
            let query = ReportQuery {
                from,
                to,
                store_id: store,
            };
            print_json(&summarize(&*db, &actor, &query)?)?;
        }

        Command::Cleanup { actor, before } => {
            let actor = load_actor(&*db, actor)?;
            let removed = GenerationEngine::new(db.clone()).cleanup_before(&actor, before)?;
            println!("🧹 Removed {removed} task(s) due before {before}");
        }

        Command::Admin { actor, cmd } => {
            let actor = load_actor(&*db, actor)?;
            admin(&Administration::new(&db, &actor), cmd)?;
        }
    }

    Ok(())
}

fn bootstrap_admin(db: &SqliteDb, username: &str) -> Result<()> {
    if db.list_users(None)?.iter().any(|u| u.username == username) {
        println!("⚠️  User '{username}' already exists.");
        return Ok(());
    }
    let user = db.create_user(username, username, Role::Admin, None)?;
    println!("✅ Admin user created:");
    println!("   Username: {}", user.username);
    println!("   Id:       {} (pass as --as {})", user.id, user.id);
    Ok(())
}

fn admin(ops: &Administration<'_>, cmd: AdminCommand) -> Result<()> {
    match cmd {
        AdminCommand::AddStore {
            name,
            address,
            city,
        } => print_json(&ops.create_store(&name, address.as_deref(), city.as_deref())?),
        AdminCommand::AddUser {
            username,
            full_name,
            role,
            store,
        } => print_json(&ops.create_user(&username, &full_name, role, store)?),
        AdminCommand::SetUserActive { id, active } => {
            ops.set_user_active(id, active)?;
            println!("✅ User {id} {}", if active { "enabled" } else { "disabled" });
            Ok(())
        }
        AdminCommand::Users => print_json(&ops.list_users()?),
        AdminCommand::AddTemplate(fields) => print_json(&ops.create_template(&fields.into_draft())?),
        AdminCommand::EditTemplate { id, fields } => {
            print_json(&ops.update_template(id, &fields.into_draft())?)
        }
        AdminCommand::SetTemplateActive { id, active } => {
            ops.set_template_active(id, active)?;
            println!("✅ Template {id} {}", if active { "enabled" } else { "disabled" });
            Ok(())
        }
        AdminCommand::Templates => print_json(&ops.list_templates()?),
        AdminCommand::Stores => print_json(&ops.list_stores()?),
    }
}

async fn serve(config: &ShiftlistConfig, db: Arc<SqliteDb>) -> Result<()> {
    if !config.scheduler.enabled {
        println!("⚠️ Scheduler disabled in config, nothing to do");
        return Ok(());
    }
    let schedule = CronSchedule::parse(&config.scheduler.daily_cron)?;
    let engine = Arc::new(GenerationEngine::new(db));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    println!("📋 Shiftlist v{}", env!("CARGO_PKG_VERSION"));
    println!("   🗄️  Database:  {}", config.database.expanded_path().display());
    println!("   ⏰ Schedule:  {schedule} (local time)");
    println!("   🔁 Catch-up:  {}", config.scheduler.run_on_startup);
    println!();

    let handle = spawn_daily_trigger(
        engine,
        schedule,
        config.scheduler.run_on_startup,
        shutdown_rx,
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("🛑 Ctrl-C received, shutting down");
    shutdown_tx.send(true).ok();
    handle.await?;
    Ok(())
}
