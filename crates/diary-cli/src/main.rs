//! Diary CLI - reference host for the clinical trial nosebleed diary.
//!
//! Wraps the diary-core service layer: record events and markers,
//! query by date and completeness, verify ledger integrity, and sync
//! against the cloud record service.

mod config;
mod output;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use diary_core::storage::SqliteStore;
use diary_core::{
    Credential, DiaryService, HttpCloudService, PushOutcome, RecordDraft, Severity, VERSION,
};

use config::DiaryConfig;

/// Diary - local-first clinical trial nosebleed diary
#[derive(Parser)]
#[command(name = "diary")]
#[command(version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the diary database file
    #[arg(long, global = true, env = "DIARY_PATH")]
    diary: Option<String>,

    /// Cloud record service base URL
    #[arg(long, global = true, env = "DIARY_SERVER")]
    server: Option<String>,

    /// Path to a TOML config file
    #[arg(long, global = true, env = "DIARY_CONFIG")]
    config: Option<String>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a nosebleed event
    Add {
        /// Calendar date the event is attributed to (YYYY-MM-DD)
        #[arg(value_name = "DATE")]
        date: String,

        /// Start time (UTC ISO-8601)
        #[arg(long)]
        start: Option<String>,

        /// IANA timezone the start was recorded in
        #[arg(long)]
        start_zone: Option<String>,

        /// End time (UTC ISO-8601)
        #[arg(long)]
        end: Option<String>,

        /// IANA timezone the end was recorded in
        #[arg(long)]
        end_zone: Option<String>,

        /// Severity (spotting, dripping, trickling, flowing, pouring, gushing)
        #[arg(long)]
        severity: Option<String>,

        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Record an explicit "nothing happened" marker for a date
    NoEvent {
        #[arg(value_name = "DATE")]
        date: String,
    },

    /// Record an explicit "don't know" marker for a date
    Unknown {
        #[arg(value_name = "DATE")]
        date: String,
    },

    /// List records for a date
    List {
        #[arg(value_name = "DATE")]
        date: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List incomplete records awaiting correction
    Incomplete {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a record by id
    Show {
        #[arg(value_name = "ID")]
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Supersede a record with a corrected one
    Correct {
        /// Id of the record being corrected
        #[arg(value_name = "ID")]
        id: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        start_zone: Option<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        end_zone: Option<String>,

        #[arg(long)]
        severity: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Logically retract a record (the original stays in the ledger)
    Retract {
        #[arg(value_name = "ID")]
        id: String,

        /// Reason for the retraction
        #[arg(value_name = "REASON")]
        reason: String,
    },

    /// Verify the integrity chain over the full ledger
    Check,

    /// Push and/or pull against the cloud record service
    Sync {
        #[arg(value_enum, default_value_t = SyncDirection::All)]
        direction: SyncDirection,

        /// Bearer token from the auth collaborator
        #[arg(long, env = "DIARY_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Show the persisted device identifier
    DeviceId,

    /// Irreversibly erase all local data and unlink the device identity
    Wipe {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SyncDirection {
    Push,
    Pull,
    All,
}

fn parse_date(value: &str) -> anyhow::Result<NaiveDate> {
    value
        .parse::<NaiveDate>()
        .with_context(|| format!("Invalid date \"{}\" (expected YYYY-MM-DD)", value))
}

fn parse_time(value: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp \"{}\" (expected ISO-8601)", value))
}

fn parse_id(value: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid record id \"{}\"", value))
}

#[allow(clippy::too_many_arguments)]
fn build_draft(
    start: Option<String>,
    start_zone: Option<String>,
    end: Option<String>,
    end_zone: Option<String>,
    severity: Option<String>,
    notes: Option<String>,
) -> anyhow::Result<RecordDraft> {
    Ok(RecordDraft {
        start_time: start.as_deref().map(parse_time).transpose()?,
        start_zone,
        end_time: end.as_deref().map(parse_time).transpose()?,
        end_zone,
        severity: severity.as_deref().map(Severity::parse).transpose()?,
        notes,
    })
}

fn print_records(records: &[diary_core::DiaryRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else if records.is_empty() {
        println!("No records.");
    } else {
        for record in records {
            println!("{}", output::summary_line(record));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let file_config = match cli.config.as_deref() {
        Some(path) => DiaryConfig::load(Path::new(path))?,
        None => DiaryConfig::default(),
    };
    let diary_path = cli
        .diary
        .or(file_config.diary.path)
        .unwrap_or_else(|| "diary.db".to_string());
    let server_url = cli.server.or(file_config.server.url);

    let store = Arc::new(SqliteStore::open(Path::new(&diary_path))?);
    let cloud = Arc::new(HttpCloudService::new(
        server_url
            .clone()
            .unwrap_or_else(|| "http://localhost:8080".to_string()),
    )?);
    let diary = DiaryService::new(store.clone(), store, cloud);

    match cli.command {
        Commands::Add {
            date,
            start,
            start_zone,
            end,
            end_zone,
            severity,
            notes,
        } => {
            let occurs_on = parse_date(&date)?;
            let draft = build_draft(start, start_zone, end, end_zone, severity, notes)?;
            let record = diary.add_record(occurs_on, draft)?;
            if !cli.quiet {
                if record.is_incomplete {
                    println!(
                        "Recorded {} (incomplete: add an end time and severity later)",
                        record.id
                    );
                } else {
                    println!("Recorded {}", record.id);
                }
            }
        }
        Commands::NoEvent { date } => {
            let record = diary.mark_no_event(parse_date(&date)?)?;
            if !cli.quiet {
                println!("Marked {} as no-event ({})", date, record.id);
            }
        }
        Commands::Unknown { date } => {
            let record = diary.mark_unknown(parse_date(&date)?)?;
            if !cli.quiet {
                println!("Marked {} as unknown ({})", date, record.id);
            }
        }
        Commands::List { date, json } => {
            let records = diary.records_on(parse_date(&date)?)?;
            print_records(&records, json)?;
        }
        Commands::Incomplete { json } => {
            let records = diary.incomplete()?;
            print_records(&records, json)?;
        }
        Commands::Show { id, json } => {
            let record = diary.get(&parse_id(&id)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print!("{}", output::detail(&record));
            }
        }
        Commands::Correct {
            id,
            start,
            start_zone,
            end,
            end_zone,
            severity,
            notes,
        } => {
            let parent = parse_id(&id)?;
            let draft = build_draft(start, start_zone, end, end_zone, severity, notes)?;
            let record = diary.correct(parent, draft)?;
            if !cli.quiet {
                println!("Recorded correction {} superseding {}", record.id, parent);
            }
        }
        Commands::Retract { id, reason } => {
            let target = parse_id(&id)?;
            let record = diary.retract(target, reason)?;
            if !cli.quiet {
                println!("Recorded retraction {} for {}", record.id, target);
            }
        }
        Commands::Check => {
            if diary.verify_integrity()? {
                if !cli.quiet {
                    println!("Ledger integrity verified.");
                }
            } else {
                anyhow::bail!(
                    "Ledger integrity verification FAILED; contact study support before syncing"
                );
            }
        }
        Commands::Sync { direction, token } => {
            if server_url.is_none() {
                anyhow::bail!("No server URL configured. Use --server or the config file.");
            }
            let credential = Credential::new(token.unwrap_or_default());

            if matches!(direction, SyncDirection::Push | SyncDirection::All) {
                match diary.push(&credential).await? {
                    PushOutcome::NothingToPush => {
                        if !cli.quiet {
                            println!("Push: nothing to push.");
                        }
                    }
                    PushOutcome::Pushed { count } => {
                        if !cli.quiet {
                            println!("Push: {} record(s) acknowledged.", count);
                        }
                    }
                }
            }
            if matches!(direction, SyncDirection::Pull | SyncDirection::All) {
                let outcome = diary.pull(&credential).await?;
                if !cli.quiet {
                    println!(
                        "Pull: {} record(s) fetched, {} merged.",
                        outcome.fetched, outcome.merged
                    );
                }
            }
        }
        Commands::DeviceId => {
            println!("{}", diary.device_id()?);
        }
        Commands::Wipe { yes } => {
            if !yes {
                anyhow::bail!("Refusing to wipe without --yes");
            }
            diary.erase_local_data()?;
            if !cli.quiet {
                println!("Local diary erased; device identity reset.");
            }
        }
    }

    Ok(())
}
