//! Command-line interface for tsundoku.
//!
//! Provides an interactive session, one-shot resolution of ISBNs,
//! a listing of stored books, and a config dump.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{build_client, GoogleBooks, OpenLibrary, Provider};
use crate::config::ResolvedConfig;
use crate::core::{dates, Outcome, ResolveMode, Resolver, SqliteStore};
use crate::domain::Source;

pub mod session;

pub use session::{Session, SessionSummary};

/// tsundoku - Resolve ISBNs into book metadata
#[derive(Parser, Debug)]
#[command(name = "tsundoku")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// SQLite database file (overrides config)
    #[arg(long, global = true, env = "TSUNDOKU_DATABASE")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enter ISBNs interactively, confirming each record before it is stored
    Session,

    /// Resolve and store ISBNs without prompting
    Resolve {
        /// ISBN-10 or ISBN-13 values
        #[arg(required = true)]
        isbns: Vec<String>,

        /// Store a new record even if the ISBN is already stored
        #[arg(short, long)]
        force: bool,
    },

    /// List recently stored books
    List {
        /// Maximum number of books to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let mut config = crate::config::config()?.clone();
        if let Some(database) = self.database {
            config.database = database;
        }

        match self.command {
            Commands::Session => run_session(&config).await,
            Commands::Resolve { isbns, force } => resolve_isbns(&config, &isbns, force).await,
            Commands::List { limit } => list_books(&config, limit).await,
            Commands::Config => show_config(&config),
        }
    }
}

fn open_store(config: &ResolvedConfig) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.database, config.store_timeout)
        .with_context(|| format!("Failed to open database: {}", config.database.display()))?;
    Ok(Arc::new(store))
}

/// Build a resolver with the configured providers in order
pub fn build_resolver(config: &ResolvedConfig, store: Arc<SqliteStore>) -> Result<Resolver> {
    let client = build_client(config.http_timeout).context("Failed to build HTTP client")?;

    let providers = config
        .providers
        .iter()
        .map(|source| -> Box<dyn Provider> {
            match source {
                Source::Google => Box::new(GoogleBooks::new(client.clone(), &config.google_base_url)),
                Source::OpenLibrary => {
                    Box::new(OpenLibrary::new(client.clone(), &config.openlibrary_base_url))
                }
            }
        })
        .collect();

    Ok(Resolver::new(store, providers))
}

/// Run the interactive prompt loop on stdin/stdout
async fn run_session(config: &ResolvedConfig) -> Result<()> {
    let store = open_store(config)?;
    let resolver = build_resolver(config, store)?;

    let stdin = io::stdin();
    let summary = Session::new(&resolver, stdin.lock(), io::stdout())
        .run()
        .await?;

    eprintln!(
        "\n[{} created, {} skipped, {} not found, {} failed]",
        summary.created, summary.skipped, summary.not_found, summary.failed
    );

    Ok(())
}

/// Resolve each ISBN in turn; a failure does not stop the rest
async fn resolve_isbns(config: &ResolvedConfig, isbns: &[String], force: bool) -> Result<()> {
    let store = open_store(config)?;
    let resolver = build_resolver(config, store)?;

    let mode = if force {
        ResolveMode::AddAnyway
    } else {
        ResolveMode::CheckExisting
    };

    let mut failures = 0;

    for raw in isbns {
        match resolver.resolve(raw, mode).await {
            Ok(Outcome::AlreadyStored(existing)) => {
                println!(
                    "Skipped: '{}' found already ({}). Use --force to add anyway.",
                    existing.title,
                    raw.trim()
                );
            }
            Ok(Outcome::Stored { id, record }) => {
                println!(
                    "({}) Created record for: '{}' [{}]",
                    id, record.title, record.source
                );
            }
            Ok(Outcome::NotFound) => {
                println!("No records found for: {}", raw.trim());
            }
            Err(e) => {
                eprintln!("Error: {}: {:#}", raw.trim(), anyhow::Error::new(e));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} ISBNs failed", failures, isbns.len());
    }

    Ok(())
}

/// List recently stored books
async fn list_books(config: &ResolvedConfig, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let books = store.recent(limit).await?;

    if books.is_empty() {
        println!("No books stored");
        return Ok(());
    }

    println!(
        "{:<6} {:<40} {:<14} {:<11} {:<12}",
        "ID", "TITLE", "ISBN", "PUBLISHED", "SOURCE"
    );
    println!("{}", "-".repeat(87));

    for book in books {
        let isbn = if book.isbn13.is_empty() {
            &book.isbn10
        } else {
            &book.isbn13
        };
        let published = book.published_date.map(dates::format).unwrap_or_default();
        let source = book.source.map(|s| s.as_str()).unwrap_or("?");

        println!(
            "{:<6} {:<40} {:<14} {:<11} {:<12}",
            book.id,
            truncate(&book.title, 40),
            isbn,
            published,
            source
        );
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig) -> Result<()> {
    let providers: Vec<&str> = config.providers.iter().map(Source::as_str).collect();

    println!("tsundoku configuration");
    println!("======================");
    println!();
    println!("Config file: {}", match &config.config_file {
        Some(path) => path.display().to_string(),
        None => "(none - using defaults)".to_string(),
    });
    println!("Home:        {}", config.home.display());
    println!("Database:    {}", config.database.display());
    println!("Providers:   {}", providers.join(" -> "));
    println!("Google:      {}", config.google_base_url);
    println!("OpenLibrary: {}", config.openlibrary_base_url);
    println!("Timeouts:    store {:?}, http {:?}", config.store_timeout, config.http_timeout);

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
