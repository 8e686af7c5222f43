//! # rote
//!
//! Terminal flashcards with spaced-repetition scheduling.
//!
//! ```bash
//! rote add "cześć" "hello" --tag greetings --deck polish
//! rote due --deck polish
//! rote review --deck polish --tag greetings
//! rote edit 3f2a --back "hi"
//! rote stats --days 30
//! ```

mod app;

use anyhow::{Context, Result};
use app::{App, CardEdit, FilterArgs};
use clap::{Parser, Subcommand};
use rote::AppConfig;
use std::io;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rote")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database file, overriding the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (default: ~/.rote/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log scheduling decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Add a card
    Add {
        front: String,
        back: String,
        /// Tag for the card, repeatable
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Deck for the card, created if missing
        #[arg(short, long)]
        deck: Option<String>,
    },
    /// Change the text, tags or deck of a card
    Edit {
        id: String,
        #[command(flatten)]
        changes: CardEdit,
    },
    /// List cards
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List cards that are due now
    Due {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Review due cards interactively
    Review {
        #[command(flatten)]
        filter: FilterArgs,
        /// Seed for interval jitter, for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show what each grade would do to a card
    Preview { id: String },
    /// Show the review history of a card
    History { id: String },
    /// Study statistics over recent days
    Stats {
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// List tags with card counts
    Tags,
    /// List decks with card counts
    Decks,
    /// Create a deck or set its topic
    NewDeck {
        name: String,
        #[arg(long)]
        topic: Option<String>,
    },
    /// Delete a deck; its cards are kept without a deck
    DeleteDeck { name: String },
    /// Forget all scheduling progress of a card
    Reset { id: String },
    /// Delete a card and its history
    Delete { id: String },
    /// Move the clock forward one day
    AdvanceDay,
    /// Repair stored scheduling data
    Migrate,
    /// Print the effective configuration
    Config,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "rote=debug" } else { "rote=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => AppConfig::load_default().context("cannot load config")?,
    };
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!("rote v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let mut app = App::open(config)?;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Add {
            front,
            back,
            tags,
            deck,
        } => app.add(&front, &back, tags, deck.as_deref(), &mut out),
        Commands::Edit { id, changes } => app.edit(&id, changes, &mut out),
        Commands::List { filter } => app.list(&filter, &mut out),
        Commands::Due { filter } => app.due(&filter, &mut out),
        Commands::Review { filter, seed } => {
            let mut jitter = app::jitter_source(seed);
            let mut input = io::stdin().lock();
            app.review(&filter, &mut jitter, &mut input, &mut out)
        }
        Commands::Preview { id } => app.preview(&id, &mut out),
        Commands::History { id } => app.history(&id, &mut out),
        Commands::Stats { days } => app.stats(days, &mut out),
        Commands::Tags => app.tags(&mut out),
        Commands::Decks => app.decks(&mut out),
        Commands::NewDeck { name, topic } => app.new_deck(&name, topic.as_deref(), &mut out),
        Commands::DeleteDeck { name } => app.delete_deck(&name, &mut out),
        Commands::Reset { id } => app.reset(&id, &mut out),
        Commands::Delete { id } => app.delete(&id, &mut out),
        Commands::AdvanceDay => app.advance_day(&mut out),
        Commands::Migrate => app.migrate(&mut out),
        Commands::Config => app.show_config(&mut out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_review_flags() {
        let cli = Cli::parse_from([
            "rote", "--db", "/tmp/x.sqlite3", "review", "-t", "verbs", "--seed", "7", "-d", "pl",
        ]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.sqlite3")));
        match cli.command {
            Commands::Review { filter, seed } => {
                assert_eq!(filter.tag.as_deref(), Some("verbs"));
                assert_eq!(filter.deck.as_deref(), Some("pl"));
                assert_eq!(seed, Some(7));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_add_with_tags() {
        let cli = Cli::parse_from([
            "rote", "add", "cześć", "hello", "-t", "polish", "--tag", "greetings", "--deck", "A1",
        ]);
        match cli.command {
            Commands::Add {
                front,
                back,
                tags,
                deck,
            } => {
                assert_eq!(front, "cześć");
                assert_eq!(back, "hello");
                assert_eq!(tags, vec!["polish", "greetings"]);
                assert_eq!(deck.as_deref(), Some("A1"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_edit_changes() {
        let cli = Cli::parse_from([
            "rote", "edit", "3f2a", "--back", "hi", "-t", "greetings", "--no-deck",
        ]);
        match cli.command {
            Commands::Edit { id, changes } => {
                assert_eq!(id, "3f2a");
                assert_eq!(changes.front, None);
                assert_eq!(changes.back.as_deref(), Some("hi"));
                assert_eq!(changes.tags, vec!["greetings"]);
                assert!(changes.no_deck);
                assert!(!changes.clear_tags);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let conflict =
            Cli::try_parse_from(["rote", "edit", "3f2a", "--deck", "pl", "--no-deck"]);
        assert!(conflict.is_err());
    }

    #[test]
    fn test_db_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "stats_window_days = 3\n").unwrap();

        let cli = Cli::parse_from([
            "rote",
            "--config",
            config_path.to_str().unwrap(),
            "--db",
            "/tmp/other.sqlite3",
            "list",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.stats_window_days, 3);
        assert_eq!(config.database_path, PathBuf::from("/tmp/other.sqlite3"));
    }
}
