mod ai;
mod config;
mod errors;
mod logging;
mod models;
mod remote;
mod store;
mod sync;
mod tui;
mod view;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use config::{Config, Settings};
use logging::LogTarget;
use models::{Patch, Record, RecordId};
use remote::HttpRemote;
use std::sync::Arc;
use store::LoadStatus;
use sync::{DeleteOutcome, EnrichOutcome, SyncEngine, UpdateOutcome};

#[derive(Parser)]
#[command(name = "hunt-board")]
#[command(about = "Track job applications in list and board views, synced with your tracker API")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List applications, newest first
    List {
        /// Only show applications whose role or company contains this text
        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Show applications grouped by status
    Board,

    /// Show one application
    Show {
        /// Application ID (or a unique prefix)
        id: String,
    },

    /// Create a new application with default values
    Add,

    /// Change one field of an application
    Set {
        /// Application ID (or a unique prefix)
        id: String,

        /// Field name (role, company, location, salary, link, notes,
        /// description, aiInsights, status, stage, dateApplied)
        field: String,

        /// New value
        value: String,
    },

    /// Delete an application
    Rm {
        /// Application ID (or a unique prefix)
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Analyze the job description with AI and save the result
    Analyze {
        /// Application ID (or a unique prefix)
        id: String,
    },

    /// Interactive list/board browser
    Browse,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_settings(&cli.settings)?;

    let target = match cli.command {
        Commands::Browse => LogTarget::File,
        _ => LogTarget::Stderr,
    };
    let _log_guard = logging::init(&config.log_level, target)?;

    let remote = HttpRemote::new(config.api_url.clone(), config.timeout)?;
    let provider = ai::create_provider(&config)?;
    let engine = Arc::new(SyncEngine::new(remote, provider));

    if let Commands::Browse = cli.command {
        return tui::run_browse(engine).await;
    }

    if !engine.load().await {
        let message = engine.read(|store| match store.status() {
            LoadStatus::Error(msg) => msg.clone(),
            _ => "Could not load applications".to_string(),
        });
        return Err(anyhow!(message));
    }

    match cli.command {
        Commands::List { search } => {
            engine.set_search_term(search);
            engine.read(|store| {
                let list = view::visible_list(store.records(), store.search_term());
                if list.is_empty() {
                    println!("No applications found.");
                    return;
                }
                println!("{}", list_header());
                println!("{}", "-".repeat(96));
                for record in list {
                    println!("{}", list_row(record));
                }
            });
        }

        Commands::Board => {
            engine.read(|store| {
                let board = view::board(store.records());
                for column in &board.columns {
                    println!("{} ({})", column.status.label().to_uppercase(), column.records.len());
                    for record in &column.records {
                        println!(
                            "  #{} - {} @ {} [{}]",
                            truncate(&record.id.to_string(), 10),
                            record.role(),
                            record.company(),
                            record.fields.stage
                        );
                    }
                    println!();
                }
            });
        }

        Commands::Show { id } => {
            let Some(id) = resolve(&engine, &id) else {
                return Ok(());
            };
            if let Some(record) = engine.read(|store| store.get(&id).cloned()) {
                print_record(&record);
            }
        }

        Commands::Add => match engine.create().await {
            Some(id) => println!("Added application #{}", id),
            None => println!("Could not add application."),
        },

        Commands::Set { id, field, value } => {
            let Some(id) = resolve(&engine, &id) else {
                return Ok(());
            };
            let patch = Patch::parse(&field, &value)?;
            let name = patch.field_name();
            match engine.update(&id, patch).await {
                UpdateOutcome::Saved => println!("Updated {} of #{}.", name, id),
                UpdateOutcome::Missing => println!("Application #{} not found.", id),
                UpdateOutcome::RolledBack(err) => {
                    println!("Update of #{} was not saved: {}", id, err)
                }
            }
        }

        Commands::Rm { id, yes } => {
            let Some(id) = resolve(&engine, &id) else {
                return Ok(());
            };
            let ask = |prompt: &str| {
                yes || dialoguer::Confirm::new()
                    .with_prompt(prompt)
                    .default(false)
                    .interact()
                    .unwrap_or(false)
            };
            match engine.delete(&id, &ask).await {
                DeleteOutcome::Removed => println!("Deleted application #{}.", id),
                DeleteOutcome::Declined => println!("Kept application #{}.", id),
                DeleteOutcome::Missing => println!("Application #{} not found.", id),
                DeleteOutcome::Failed(err) => println!("Delete of #{} failed: {}", id, err),
            }
        }

        Commands::Analyze { id } => {
            let Some(id) = resolve(&engine, &id) else {
                return Ok(());
            };
            match engine.enrich(&id).await {
                EnrichOutcome::Applied => {
                    if let Some(record) = engine.read(|store| store.get(&id).cloned()) {
                        println!("--- AI Insights ---");
                        println!("{}", record.fields.ai_insights.unwrap_or_default());
                    }
                }
                EnrichOutcome::Disabled => {
                    println!("AI analysis is disabled. Set GEMINI_API_KEY to enable it.")
                }
                EnrichOutcome::Skipped => println!(
                    "Description of #{} is too short to analyze (need {} characters).",
                    id,
                    ai::MIN_ENRICH_CHARS
                ),
                EnrichOutcome::NoInsight => println!("The model returned no insight."),
                EnrichOutcome::Missing => println!("Application #{} not found.", id),
                EnrichOutcome::Failed(err) => println!("Analysis failed: {}", err),
            }
        }

        Commands::Browse => unreachable!("handled before loading"),
    }

    Ok(())
}

fn resolve(engine: &SyncEngine<HttpRemote>, needle: &str) -> Option<RecordId> {
    let id = engine.read(|store| store.resolve(needle));
    if id.is_none() {
        println!("Application '{}' not found.", needle);
    }
    id
}

fn list_header() -> String {
    format!(
        "{:<10} {:<22} {:<28} {:<20} {:<12}",
        "ID", "STATUS", "ROLE", "COMPANY", "APPLIED"
    )
}

fn list_row(record: &Record) -> String {
    // NaiveDate's Display ignores width
    format!(
        "{:<10} {:<22} {:<28} {:<20} {:<12}",
        truncate(&record.id.to_string(), 10),
        record.fields.status,
        truncate(record.role(), 28),
        truncate(record.company(), 20),
        record.fields.date_applied.to_string()
    )
}

fn print_record(record: &Record) {
    let fields = &record.fields;
    println!("Application #{}", record.id);
    println!("Role: {}", record.role());
    println!("Company: {}", record.company());
    println!("Status: {}", fields.status);
    println!("Stage: {}", fields.stage);
    println!("Applied: {}", fields.date_applied);
    for (label, value) in [
        ("Location", &fields.location),
        ("Salary", &fields.salary),
        ("Link", &fields.link),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            println!("{}: {}", label, value);
        }
    }
    for (label, value) in [
        ("Description", &fields.description),
        ("Notes", &fields.notes),
        ("AI Insights", &fields.ai_insights),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            println!("\n--- {} ---\n{}", label, value);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
