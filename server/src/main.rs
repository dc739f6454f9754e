//! `questbook` command-line driver for the ledger.
//!
//! Every subcommand prints its result as pretty JSON on stdout. Ledger
//! failures print a user-facing message on stderr and exit non-zero; the
//! full error goes to the log.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use questbook::{config, schema, LedgerError, Repository, DEFAULT_NOTES};
use rules::{EconomyRules, PlayerId};
use serde::Serialize;
use sheets::{JsonWorkbook, Workbook};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const WORKBOOK_TITLE: &str = "Questbook Ledger";

/// Exit code for a request the ledger refused.
const EXIT_REFUSED: u8 = 2;

#[derive(Parser)]
#[command(name = "questbook", about = "Character ledger for the community spreadsheet")]
struct Cli {
    /// Workbook file (overrides QUESTBOOK_WORKBOOK).
    #[arg(long, global = true)]
    workbook: Option<PathBuf>,

    /// Economy rules TOML file (overrides QUESTBOOK_RULES).
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty ledger workbook with every worksheet and header.
    Init {
        /// Overwrite an existing workbook.
        #[arg(long)]
        force: bool,
    },
    /// Gold a character created at `level` starts with.
    StartingGold { level: u32 },
    #[command(flatten)]
    Ledger(LedgerCommand),
}

/// Subcommands that talk to the workbook.
#[derive(Subcommand)]
enum LedgerCommand {
    /// Show one player's character.
    Character { player: PlayerId },
    /// Show several players' characters; fails if any is missing.
    Characters {
        #[arg(required = true)]
        players: Vec<PlayerId>,
    },
    /// Create a character for a player.
    Create {
        player: PlayerId,
        name: String,
        /// Starting level (defaults to the configured starting level).
        #[arg(long)]
        level: Option<u32>,
    },
    /// Overwrite a character's currency.
    SetCurrency { player: PlayerId, amount: u64 },
    /// List the item catalog.
    Items,
    /// Look up one item by name.
    Item { name: String },
    /// Buy an item for a player's character.
    Buy {
        player: PlayerId,
        item: String,
        #[arg(long, default_value_t = questbook::DEFAULT_QUANTITY)]
        quantity: u32,
    },
    /// Record a market entry without touching the character's funds.
    Record {
        player: PlayerId,
        item: String,
        #[arg(long, default_value_t = questbook::DEFAULT_QUANTITY)]
        quantity: u32,
        #[arg(long, default_value = DEFAULT_NOTES)]
        notes: String,
    },
    /// List the market ledger.
    MarketLog,
    /// Settle a played session.
    LogGame {
        dm: PlayerId,
        #[arg(required = true)]
        players: Vec<PlayerId>,
    },
    /// List the game ledger.
    GameLog,
}

fn init_tracing() -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = config::get_log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "questbook");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    Ok(guard)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Execute one ledger subcommand and print its result.
async fn run(repo: &Repository, command: LedgerCommand) -> anyhow::Result<()> {
    match command {
        LedgerCommand::Character { player } => {
            print_json(&repo.get_character_by_player_id(player).await?)
        }
        LedgerCommand::Characters { players } => {
            print_json(&repo.get_characters_by_ids(&players).await?)
        }
        LedgerCommand::Create {
            player,
            name,
            level,
        } => print_json(&repo.create_new_character(&name, player, level).await?),
        LedgerCommand::SetCurrency { player, amount } => {
            repo.set_character_currency(player, amount).await?;
            print_json(&repo.get_character_by_player_id(player).await?)
        }
        LedgerCommand::Items => print_json(&repo.get_all_items().await?),
        LedgerCommand::Item { name } => print_json(&repo.get_item(&name).await?),
        LedgerCommand::Buy {
            player,
            item,
            quantity,
        } => print_json(&repo.purchase_item(player, &item, quantity).await?),
        LedgerCommand::Record {
            player,
            item,
            quantity,
            notes,
        } => {
            let character = repo.get_character_by_player_id(player).await?;
            let item = repo.get_item(&item).await?;
            let entry = repo
                .new_market_log_entry(&character, &item, quantity, &notes)
                .await?;
            print_json(&entry)
        }
        LedgerCommand::MarketLog => print_json(&repo.get_all_market_log_entries().await?),
        LedgerCommand::LogGame { dm, players } => {
            print_json(&repo.log_game(dm, &players).await?)
        }
        LedgerCommand::GameLog => print_json(&repo.get_all_game_log_entries().await?),
    }
}

fn init_workbook(path: PathBuf, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "workbook {} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    let book = JsonWorkbook::create(&path, WORKBOOK_TITLE, &schema::default_layout())
        .with_context(|| format!("creating workbook {}", path.display()))?;
    print_json(&serde_json::json!({
        "workbook": book.path().display().to_string(),
        "title": book.title(),
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let _guard = init_tracing()?;

    let rules_path = cli.rules.clone().or_else(config::get_rules_path);
    let rules: EconomyRules = config::load_rules(rules_path.as_deref())?;
    let workbook_path = cli.workbook.clone().unwrap_or_else(config::get_workbook_path);

    let command = match cli.command {
        Commands::Init { force } => {
            init_workbook(workbook_path, force)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::StartingGold { level } => {
            print_json(&serde_json::json!({
                "level": level,
                "starting_gold": rules.starting_gold(level),
            }))?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Ledger(command) => command,
    };

    tracing::debug!("Using workbook: {}", workbook_path.display());
    let workbook: Arc<dyn Workbook> = Arc::new(
        JsonWorkbook::open(&workbook_path)
            .with_context(|| format!("opening workbook {}", workbook_path.display()))?,
    );
    let repo = Repository::connect(workbook, rules)
        .await
        .context("connecting to the ledger")?;

    match run(&repo, command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => match e.downcast_ref::<LedgerError>() {
            Some(refused) => {
                tracing::error!("Request failed: {}", refused);
                eprintln!("{}", refused.user_message());
                Ok(ExitCode::from(EXIT_REFUSED))
            }
            None => Err(e),
        },
    }
}
