use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

mod batch;
mod classify;
mod config;
mod dates;
mod db;
mod error;
mod extract;
mod models;
mod normalize;
mod registry;
mod report;
mod sheet;

use config::AnalyzerConfig;
use registry::{resolve_subjects, ProfileSnapshot};

#[derive(Parser)]
#[command(name = "transcript-early-warning")]
#[command(about = "Flags failing, borderline and ungraded profile subjects in student transcripts", long_about = None)]
struct Cli {
    /// JSON analyzer configuration (default subjects, offline class profiles, sheet layout)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the class profile schema
    InitDb,
    /// Load the subject directory and sample class profiles
    Seed,
    /// Import class profiles from a `class_name,subject` CSV file
    ImportProfiles {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the subjects checked for a class
    Profile {
        #[arg(long)]
        class: Option<String>,
    },
    /// Analyze a folder of transcripts
    Analyze {
        #[arg(long)]
        folder: PathBuf,
        #[arg(long)]
        class: Option<String>,
        /// Write the full batch as JSON
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write problem records as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print the earliest and latest as-of dates in a folder
    Dates {
        #[arg(long)]
        folder: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        folder: PathBuf,
        #[arg(long)]
        class: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn require_pool() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance holding class profiles")?;
    connect(&database_url).await
}

async fn load_profiles(config: &AnalyzerConfig) -> anyhow::Result<ProfileSnapshot> {
    match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = connect(&database_url).await?;
            let snapshot = db::fetch_profile_snapshot(&pool).await?;
            tracing::info!(classes = snapshot.len(), "loaded class profiles from database");
            Ok(snapshot)
        }
        Err(_) => Ok(config.profile_snapshot()),
    }
}

fn print_batch_summary(batch: &models::AnalysisBatch, folder: &Path) {
    println!(
        "Processed {} of {} transcripts in {}.",
        batch.processed_count(),
        batch.files.len(),
        folder.display()
    );
    for file in batch.skipped_files() {
        if let models::FileStatus::Skipped { reason } = &file.status {
            println!("- skipped {}: {}", file.file_name, reason);
        }
    }

    if batch.problem_records.is_empty() {
        println!("No problems found in profile subjects.");
        return;
    }

    println!("Students with problems:");
    for student in report::summarize_by_student(&batch.problem_records) {
        println!(
            "- {} ({}) failing: [{}] borderline: [{}]",
            student.student_name,
            student.class_name,
            student.failed_subjects.join(", "),
            student.satisfactory_subjects.join(", ")
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AnalyzerConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&require_pool().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&require_pool().await?).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportProfiles { csv } => {
            let inserted = db::import_profiles_csv(&require_pool().await?, &csv).await?;
            println!("Inserted {inserted} profile subjects from {}.", csv.display());
        }
        Commands::Profile { class } => {
            let profiles = load_profiles(&config).await?;
            let subjects = resolve_subjects(&profiles, class.as_deref(), &config.default_subjects);
            match subjects.source() {
                registry::SubjectSource::Profile(name) => println!("Profile subjects for {name}:"),
                registry::SubjectSource::Default => println!("Default subjects:"),
            }
            for subject in subjects.iter() {
                println!("- {subject}");
            }
        }
        Commands::Analyze {
            folder,
            class,
            json,
            csv,
        } => {
            let profiles = load_profiles(&config).await?;
            let batch = batch::analyze(&folder, class.as_deref(), &profiles, &config)?;
            print_batch_summary(&batch, &folder);

            if let Some(path) = json {
                let text = serde_json::to_string_pretty(&batch)?;
                std::fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Batch written to {}.", path.display());
            }
            if let Some(path) = csv {
                match report::save_csv(&batch.problem_records, &path)? {
                    Some(path) => println!("Results saved to {}.", path.display()),
                    None => println!("No results to save."),
                }
            }
        }
        Commands::Dates { folder } => {
            let (earliest, latest) = batch::extract_batch_dates(&folder, config.layout)?;
            match (earliest, latest) {
                (Some(earliest), Some(latest)) => println!(
                    "Earliest: {}, latest: {}.",
                    earliest.format("%d.%m.%Y"),
                    latest.format("%d.%m.%Y")
                ),
                _ => println!("No as-of dates found in {}.", folder.display()),
            }
        }
        Commands::Report { folder, class, out } => {
            let profiles = load_profiles(&config).await?;
            let batch = batch::analyze(&folder, class.as_deref(), &profiles, &config)?;
            let report = report::build_report(&batch, class.as_deref());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
