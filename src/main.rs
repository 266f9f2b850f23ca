use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use timekeeper::{
    config::{Settings, database},
    core::{
        reminder,
        rollup::{self, RollupOutcome},
    },
    errors::Result,
    notify::LogNotifier,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Scheduled jobs for timer reminders and monthly roll-ups.
#[derive(Debug, Parser)]
#[command(name = "timekeeper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database tables and indexes
    InitDb,
    /// Send timer reminders (every zone with active users unless --zone is given)
    Remind {
        /// IANA time zone, e.g. Africa/Cairo
        #[arg(long)]
        zone: Option<String>,
    },
    /// Roll up a past month into monthly summaries
    Rollup {
        /// Calendar year (defaults to two months ago)
        #[arg(long, requires = "month")]
        year: Option<i32>,
        /// Month number 1-12 (defaults to two months ago)
        #[arg(long, requires = "year")]
        month: Option<i32>,
        /// Only roll up this user
        #[arg(long)]
        user: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars may also be set externally
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Settings are read per invocation
    let settings = Settings::load()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    match cli.command {
        Command::InitDb => {}
        Command::Remind { zone: Some(zone) } => {
            let report = reminder::dispatch_now(&db, &LogNotifier, &settings, &zone).await?;
            info!(
                time_zone = %report.time_zone,
                date = %report.reference_date,
                threshold_passed = report.threshold_passed,
                reminded = report.reminded.len(),
                failures = report.failures.len(),
                "Reminder run complete"
            );
        }
        Command::Remind { zone: None } => {
            let sweep =
                reminder::dispatch_all_zones(&db, &LogNotifier, &settings, Utc::now()).await?;
            for (zone, e) in &sweep.failures {
                warn!(time_zone = %zone, "Zone skipped: {e}");
            }
            info!(
                zones = sweep.reports.len(),
                reminded = sweep.reminded_count(),
                "Reminder sweep complete"
            );
        }
        Command::Rollup { year, month, user } => {
            let (year, number) = match (year, month) {
                (Some(year), Some(number)) => (year, number),
                _ => rollup::default_rollup_period(Utc::now().date_naive()),
            };

            if let Some(user_id) = user {
                match rollup::rollup(&db, user_id, year, number).await? {
                    RollupOutcome::Created(month) => info!(
                        user_id,
                        total_hours = month.total_hours(settings.pto_day_hours),
                        "Month rolled up"
                    ),
                    RollupOutcome::AlreadyRolledUp => info!(user_id, "Month already rolled up"),
                    RollupOutcome::NoDays => info!(user_id, "No day records for that month"),
                    RollupOutcome::UserArchived => info!(user_id, "User is archived, skipped"),
                }
            } else {
                let report = rollup::rollup_all(&db, year, number).await?;
                info!("{}", rollup::format_rollup_summary(&report, settings.pto_day_hours));
            }
        }
    }

    Ok(())
}
