//! Terminal front end for the staff dashboard.
//!
//! # Responsibility
//! - Resolve configuration and open the local document store.
//! - Drive one dashboard session per invocation and print its notices.

use anyhow::Context;
use caredesk_core::{init_from_config, load_config, DashboardConfig, SubmissionKind};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod seed;

const DEFAULT_DATABASE: &str = "caredesk.sqlite3";

#[derive(Parser, Debug)]
#[command(name = "caredesk", version, about = "Golden Serenity staff dashboard")]
struct Cli {
    #[arg(long, global = true, env = "CAREDESK_CONFIG", help = "TOML config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "SQLite database (overrides config)")]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Unread/total counts per kind.
    Summary,
    /// List submissions, newest first.
    List {
        #[arg(value_enum)]
        kind: KindArg,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, help = "Availability filter, e.g. `part` or `all`")]
        availability: Option<String>,
    },
    /// Open one submission; unread submissions become `reviewed`.
    Show {
        #[arg(value_enum)]
        kind: KindArg,
        id: String,
    },
    /// Set a submission's status.
    Status {
        #[arg(value_enum)]
        kind: KindArg,
        id: String,
        status: String,
    },
    /// Email the submitter and mark the submission as replied.
    Reply {
        #[arg(value_enum)]
        kind: KindArg,
        id: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        message: String,
    },
    /// Write an application PDF.
    Export {
        id: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Insert sample applications and inquiries.
    Seed,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Applications,
    Inquiries,
}

impl From<KindArg> for SubmissionKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Applications => SubmissionKind::Application,
            KindArg::Inquiries => SubmissionKind::Inquiry,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_from_config(&config).context("failed to initialize logging")?;

    let conn = caredesk_core::open_db(&config.database_path).with_context(|| {
        format!(
            "failed to open database `{}`",
            config.database_path.display()
        )
    })?;

    match cli.command {
        Commands::Summary => commands::summary(&conn),
        Commands::List {
            kind,
            search,
            availability,
        } => commands::list(&conn, kind.into(), search, availability),
        Commands::Show { kind, id } => commands::show(&conn, kind.into(), &id),
        Commands::Status { kind, id, status } => {
            commands::set_status(&conn, kind.into(), &id, &status)
        }
        Commands::Reply {
            kind,
            id,
            subject,
            message,
        } => commands::reply(&conn, &config, kind.into(), &id, subject, message),
        Commands::Export { id, out } => commands::export(&conn, &id, &out),
        Commands::Seed => seed::run(&conn),
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<DashboardConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = DashboardConfig::with_database(DEFAULT_DATABASE);
            config.apply_env_overrides(|key| std::env::var(key).ok());
            config
        }
    };
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    config.validate()?;
    Ok(config)
}
