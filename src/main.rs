use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use tracing::{info, warn};

use m2e_store::{
    config::{self, AppConfig},
    db::{self, DbPool},
    installer::{InstallOptions, Installer},
    maintenance,
    migrator::Migrator,
    repositories::CreationAttempt,
    schema, seed, ServiceError, Store,
};

#[derive(Parser)]
#[command(
    name = "m2e-store",
    about = "Install, migrate and inspect the M2E storage schema",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the schema, seed reference data and record the run
    Install(InstallArgs),
    #[command(subcommand)]
    Migrate(MigrateCommands),
    /// Insert reference data that is missing; existing rows are left alone
    Seed,
    #[command(subcommand)]
    Config(ConfigCommands),
    #[command(subcommand)]
    Setup(SetupCommands),
    #[command(subcommand)]
    Maintenance(MaintenanceCommands),
    #[command(subcommand)]
    Queue(QueueCommands),
    #[command(subcommand)]
    Orders(OrderCommands),
}

#[derive(Args)]
struct InstallArgs {
    /// Drop every m2epro_ table first
    #[arg(long)]
    reinstall: bool,
}

#[derive(Subcommand)]
enum MigrateCommands {
    Up {
        #[arg(long)]
        steps: Option<u32>,
    },
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    Status,
    /// Drop the prefixed tables and re-apply every migration
    Fresh,
}

#[derive(Subcommand)]
enum ConfigCommands {
    Get { path: String, key: String },
    Set {
        path: String,
        key: String,
        value: Option<String>,
    },
}

#[derive(Subcommand)]
enum SetupCommands {
    /// Show the latest setup record
    Status,
}

#[derive(Subcommand)]
enum MaintenanceCommands {
    /// Remove expired requests, stale locks, expired processings and old logs
    Expire,
}

#[derive(Subcommand)]
enum QueueCommands {
    /// List due listing product instructions, one batch at most
    Pending,
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Claim the local order creation for an order under the configured attempt policy
    Attempt { order_id: i32 },
}

#[derive(Serialize)]
struct MigrationStatus {
    applied: Vec<String>,
    pending: Vec<String>,
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
    store: Store,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        m2e_store::logging::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        db::check_connection(&db_pool)
            .await
            .context("database did not answer")?;

        let db = Arc::new(db_pool);
        let store = Store::from_config(db.clone(), &config);
        Ok(Self { config, db, store })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let category = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<ServiceError>())
                .map(ServiceError::category)
                .unwrap_or("internal_error");
            if json {
                let body = serde_json::json!({
                    "error": category,
                    "message": format!("{:#}", err),
                });
                eprintln!("{}", body);
            } else {
                eprintln!("error[{}]: {:#}", category, err);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let context = CliContext::initialize().await?;

    let installs_itself = matches!(cli.command, Commands::Install(_) | Commands::Migrate(_));
    if context.config.auto_install && !installs_itself {
        info!("auto_install is set; bringing the schema up to date");
        Installer::new(context.db.clone())
            .install(InstallOptions::default())
            .await
            .context("automatic install failed")?;
    }

    match cli.command {
        Commands::Install(args) => handle_install(&context, args, cli.json).await?,
        Commands::Migrate(command) => handle_migrate(&context, command, cli.json).await?,
        Commands::Seed => {
            let report = seed::seed_all(context.db.as_ref())
                .await
                .context("failed to seed reference data")?;
            if cli.json {
                print_json(&report)?;
            } else {
                println!(
                    "Seeded {} row(s): {} marketplace(s), {} config value(s), {} wizard(s), {} tag(s)",
                    report.total(),
                    report.marketplaces,
                    report.config,
                    report.wizards,
                    report.tags
                );
            }
        }
        Commands::Config(command) => handle_config(&context, command, cli.json).await?,
        Commands::Setup(SetupCommands::Status) => {
            let status = Installer::new(context.db.clone())
                .status()
                .await
                .context("failed to read setup record")?;
            if cli.json {
                print_json(&status)?;
            } else {
                match status {
                    Some(setup) => {
                        println!(
                            "Setup #{} {} -> {} • completed: {}",
                            setup.id,
                            setup.version_from.as_deref().unwrap_or("(fresh)"),
                            setup.version_to,
                            setup.is_completed
                        );
                        if let Some(profile) = setup.profiler_data {
                            println!("Last error:\n{}", profile);
                        }
                    }
                    None => println!("Not installed"),
                }
            }
        }
        Commands::Maintenance(MaintenanceCommands::Expire) => {
            let settings = context
                .store
                .settings()
                .await
                .context("failed to load store settings")?;
            let report = maintenance::sweep(context.db.clone(), &settings, Utc::now())
                .await
                .context("maintenance sweep failed")?;
            if cli.json {
                print_json(&report)?;
            } else {
                println!(
                    "Removed {} expired processing(s), released {} lock(s), dropped {} request(s), pruned {} log row(s)",
                    report.expired_processings,
                    report.released_locks,
                    report.expired_single_requests + report.expired_partial_requests,
                    report.pruned_logs.total()
                );
            }
        }
        Commands::Queue(QueueCommands::Pending) => {
            let pending = context
                .store
                .pending_instructions(Utc::now())
                .await
                .context("failed to read instruction queue")?;
            if cli.json {
                print_json(&pending)?;
            } else if pending.is_empty() {
                println!("No due instructions");
            } else {
                for instruction in &pending {
                    println!(
                        "#{} product {} {} (priority {}, from {})",
                        instruction.id,
                        instruction.listing_product_id,
                        instruction.instruction_type,
                        instruction.priority,
                        instruction.initiator
                    );
                }
            }
        }
        Commands::Orders(OrderCommands::Attempt { order_id }) => {
            let attempt = context
                .store
                .begin_order_creation(order_id, Utc::now())
                .await
                .with_context(|| format!("failed to start local order creation for {}", order_id))?;
            if cli.json {
                print_json(&attempt)?;
            } else {
                match attempt {
                    CreationAttempt::Claimed(order) => println!(
                        "Claimed order {} (previous failures: {})",
                        order.id, order.magento_order_creation_fails_count
                    ),
                    CreationAttempt::AlreadyCreated { magento_order_id } => {
                        println!("Local order {} already exists", magento_order_id)
                    }
                    CreationAttempt::InFlight => println!("Another attempt is still running"),
                    CreationAttempt::GaveUp { fails_count } => {
                        println!("Gave up after {} failed attempt(s)", fails_count)
                    }
                }
            }
        }
    }

    Ok(())
}

async fn handle_install(context: &CliContext, args: InstallArgs, json: bool) -> Result<()> {
    if args.reinstall {
        warn!("Reinstall requested; every m2epro_ table will be dropped");
    }
    let report = Installer::new(context.db.clone())
        .install(InstallOptions {
            reinstall: args.reinstall,
        })
        .await
        .context("install failed")?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "Installed {} (setup #{}): {} migration(s) applied, {} reference row(s) seeded in {} ms",
            report.version_to,
            report.setup_id,
            report.applied_migrations,
            report.seed.total(),
            report.elapsed_ms
        );
        if !report.dropped_tables.is_empty() {
            println!("Dropped {} table(s) first", report.dropped_tables.len());
        }
    }
    Ok(())
}

async fn handle_migrate(context: &CliContext, command: MigrateCommands, json: bool) -> Result<()> {
    let db = context.db.as_ref();
    match command {
        MigrateCommands::Up { steps } => {
            Migrator::up(db, steps).await.context("migration up failed")?;
        }
        MigrateCommands::Down { steps } => {
            Migrator::down(db, Some(steps))
                .await
                .context("migration down failed")?;
        }
        MigrateCommands::Fresh => {
            let dropped = schema::drop_prefixed_tables(db)
                .await
                .context("failed to drop prefixed tables")?;
            info!(dropped = dropped.len(), "Prefixed tables dropped");
            Migrator::up(db, None).await.context("migration up failed")?;
        }
        MigrateCommands::Status => {}
    }

    let status = MigrationStatus {
        applied: Migrator::get_applied_migrations(db)
            .await?
            .iter()
            .map(|m| m.name().to_string())
            .collect(),
        pending: Migrator::get_pending_migrations(db)
            .await?
            .iter()
            .map(|m| m.name().to_string())
            .collect(),
    };

    if json {
        print_json(&status)?;
    } else {
        for name in &status.applied {
            println!("applied  {}", name);
        }
        for name in &status.pending {
            println!("pending  {}", name);
        }
    }
    Ok(())
}

async fn handle_config(context: &CliContext, command: ConfigCommands, json: bool) -> Result<()> {
    let repo = context.store.config();
    match command {
        ConfigCommands::Get { path, key } => {
            let value = repo.get(&path, &key).await?;
            if json {
                print_json(&value)?;
            } else {
                println!("{}", value.as_deref().unwrap_or("NULL"));
            }
        }
        ConfigCommands::Set { path, key, value } => {
            repo.set(&path, &key, value.as_deref()).await?;
            if json {
                print_json(&value)?;
            } else {
                println!("ok");
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
