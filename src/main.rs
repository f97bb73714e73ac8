mod error;
mod models;
mod store;
mod tui;
mod view;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use error::StoreError;
use models::{Draft, Status, today};
use store::Store;
use view::SortKey;

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(about = "Track job applications - add, edit, search, and sort them from one place")]
struct Cli {
    /// Data file (defaults to the platform data directory)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an application
    Add {
        /// Company name
        #[arg(short, long)]
        company: String,

        /// Job title
        #[arg(short, long)]
        job: String,

        /// Job description
        #[arg(short, long)]
        description: String,

        /// Application date, DD/MM/YYYY (defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Application status
        #[arg(short, long, value_enum, default_value_t = Status::Pending)]
        status: Status,
    },

    /// List applications
    List {
        /// Sort order
        #[arg(short, long, value_enum, default_value_t = SortKey::NewToOld)]
        sort: SortKey,

        /// Keep only applications whose company, job, description or
        /// status contains this text
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one application in full
    Show {
        /// Application id
        id: i64,
    },

    /// Edit an application; omitted flags keep their current value
    Edit {
        /// Application id
        id: i64,

        #[arg(short, long)]
        company: Option<String>,

        #[arg(short, long)]
        job: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(short, long, value_enum)]
        status: Option<Status>,
    },

    /// Remove applications by id
    Remove {
        /// Application ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Browse applications in the terminal UI
    Browse {
        #[arg(short, long, value_enum, default_value_t = SortKey::NewToOld)]
        sort: SortKey,

        #[arg(long)]
        search: Option<String>,
    },

    /// Print the data file location
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli.file.clone().unwrap_or_else(Store::default_path);

    // A file that exists but does not parse is recoverable: warn and
    // start empty. It is only overwritten on the next successful save.
    let store = match Store::open(path.clone()) {
        Ok(store) => store,
        Err(e @ StoreError::Load { .. }) => {
            eprintln!("warning: {e}; starting with an empty list");
            Store::empty(path)
        }
        Err(e) => return Err(e.into()),
    };

    match cli.command {
        // No subcommand opens the browse screen.
        None => tui::run(store, SortKey::NewToOld, String::new())?,

        Some(Commands::Browse { sort, search }) => {
            tui::run(store, sort, search.unwrap_or_default())?
        }

        Some(Commands::Add {
            company,
            job,
            description,
            date,
            status,
        }) => {
            let mut store = store;
            let record = store.add(Draft {
                date: date.unwrap_or_else(today),
                company,
                job,
                description,
                status,
            })?;
            println!("Added application #{} ({})", record.id, record.company);
        }

        Some(Commands::List { sort, search }) => {
            let rows = view::view(store.all(), sort, search.as_deref().unwrap_or(""));
            if rows.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<6} {:<12} {:<22} {:<26} {:<12}",
                    "ID", "DATE", "COMPANY", "JOB", "STATUS"
                );
                println!("{}", "-".repeat(80));
                for (id, record) in rows {
                    println!(
                        "{:<6} {:<12} {:<22} {:<26} {:<12}",
                        id,
                        record.date,
                        truncate(&record.company, 20),
                        truncate(&record.job, 24),
                        record.status
                    );
                }
            }
        }

        Some(Commands::Show { id }) => {
            let record = store.resolve(id)?;
            println!("Application #{}", record.id);
            println!("Company: {}", record.company);
            println!("Job: {}", record.job);
            println!("Date: {}", record.date);
            println!("Status: {}", record.status);
            println!("\n--- Description ---");
            println!("{}", textwrap::fill(&record.description, 80));
        }

        Some(Commands::Edit {
            id,
            company,
            job,
            description,
            date,
            status,
        }) => {
            let mut store = store;
            let current = store.resolve(id)?.clone();
            let record = store.edit(
                id,
                Draft {
                    date: date.unwrap_or(current.date),
                    company: company.unwrap_or(current.company),
                    job: job.unwrap_or(current.job),
                    description: description.unwrap_or(current.description),
                    status: status.unwrap_or(current.status),
                },
            )?;
            println!("Updated application #{} ({})", record.id, record.company);
        }

        Some(Commands::Remove { ids }) => {
            let mut store = store;
            let removed = store.remove(&ids)?;
            println!("Removed {removed} application(s).");
        }

        Some(Commands::Path) => {
            println!("{}", store.path().display());
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
