mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use kalc_core::{
    calculate, format_result, AngleUnit, CalcKind, CalcRequest, HistoryQuery, HistoryStore,
    OwnerId, Preferences, PreferencesPatch, PreferencesStore,
};
use kalc_server::AppState;
use kalc_store::SqliteStore;

#[derive(Parser)]
#[command(
    name = "kalc",
    version,
    about = "Web-served calculator with history and preferences"
)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Owner scope for history and preferences
    #[arg(long, global = true, default_value = "cli")]
    session: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listen address (host:port)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Evaluate one expression and print the result
    Eval {
        /// Expression to evaluate
        expression: String,

        /// Angle unit for trigonometric functions
        #[arg(long, default_value = "rad")]
        unit: String,

        /// Decimal places in the printed result
        #[arg(long, default_value_t = 10)]
        decimals: u32,
    },

    /// Inspect or clear calculation history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// Inspect or mutate stored preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },

    /// Show the active config file path
    Config,
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List history entries, most recent first
    List {
        /// Substring filter on expression or result
        #[arg(short, long)]
        search: Option<String>,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Entries per page
        #[arg(long, default_value_t = 20)]
        per_page: u32,
    },

    /// Delete all history entries for this owner
    Clear,
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Print the stored preferences record
    Show,

    /// Apply a partial preferences update
    Set {
        /// Display theme name
        #[arg(long)]
        theme: Option<String>,

        /// Decimal places used when formatting results
        #[arg(long)]
        decimals: Option<u32>,

        /// Angle unit (rad or deg)
        #[arg(long)]
        unit: Option<String>,

        /// Memory register value
        #[arg(long)]
        memory: Option<Decimal>,
    },
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "kalc", "kalc")
        .map(|dirs| dirs.data_dir().join("kalc.db"))
        .unwrap_or_else(|| PathBuf::from("kalc.db"))
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteStore> {
    let path = match db {
        Some(p) => p,
        None => {
            let cfg = config::load_config()?;
            cfg.store
                .path
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path)
        }
    };
    debug!(path = %path.display(), "opening database");
    SqliteStore::new(&path).context("failed to open database")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let owner = OwnerId::Session(cli.session.clone());

    match cli.command {
        Commands::Serve { addr } => cmd_serve(cli.db, addr),
        Commands::Eval {
            expression,
            unit,
            decimals,
        } => cmd_eval(&expression, &unit, decimals),
        Commands::History { command } => {
            let store = open_store(cli.db)?;
            match command {
                HistoryCommands::List {
                    search,
                    page,
                    per_page,
                } => cmd_history_list(&store, &owner, search, page, per_page),
                HistoryCommands::Clear => cmd_history_clear(&store, &owner),
            }
        }
        Commands::Prefs { command } => {
            let store = open_store(cli.db)?;
            match command {
                PrefsCommands::Show => cmd_prefs_show(&store, &owner),
                PrefsCommands::Set {
                    theme,
                    decimals,
                    unit,
                    memory,
                } => cmd_prefs_set(&store, &owner, theme, decimals, unit, memory),
            }
        }
        Commands::Config => cmd_config(),
    }
}

fn cmd_serve(db: Option<PathBuf>, addr: Option<String>) -> Result<()> {
    let cfg = config::load_config()?;
    let addr: SocketAddr = addr
        .unwrap_or(cfg.server.addr)
        .parse()
        .context("invalid listen address")?;

    let store = open_store(db)?;
    let state = Arc::new(AppState::new(store));

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime
        .block_on(kalc_server::serve(addr, state))
        .context("server error")
}

fn cmd_eval(expression: &str, unit: &str, decimals: u32) -> Result<()> {
    let angle_unit: AngleUnit = unit.parse().map_err(anyhow::Error::msg)?;
    let prefs = Preferences {
        angle_unit,
        decimal_places: decimals,
        ..Preferences::default()
    };
    let req = CalcRequest {
        expression: expression.to_string(),
        kind: CalcKind::Scientific,
        action: "calculate".into(),
        matrix_data: None,
    };
    let value = calculate(&req, &prefs)?;
    match format_result(&value, decimals, CalcKind::Scientific) {
        Value::String(s) => println!("{s}"),
        other => println!("{other}"),
    }
    Ok(())
}

fn cmd_history_list(
    store: &SqliteStore,
    owner: &OwnerId,
    search: Option<String>,
    page: u32,
    per_page: u32,
) -> Result<()> {
    let query = HistoryQuery {
        search,
        page,
        per_page,
    };
    let listing = store.list(owner, &query)?;

    if listing.entries.is_empty() {
        println!("No history entries.");
        return Ok(());
    }

    println!(
        "Page {}/{} ({} entries)",
        listing.current_page, listing.total_pages, listing.total_count
    );
    for entry in &listing.entries {
        println!(
            "  [{}] {} = {}  ({}, {})",
            entry.id,
            entry.expression,
            entry.result,
            entry.kind,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}

fn cmd_history_clear(store: &SqliteStore, owner: &OwnerId) -> Result<()> {
    let deleted = store.clear(owner)?;
    println!("Deleted {deleted} entries.");
    Ok(())
}

fn cmd_prefs_show(store: &SqliteStore, owner: &OwnerId) -> Result<()> {
    let prefs = store.get_or_create(owner)?;
    println!("theme:          {}", prefs.theme);
    println!("decimal_places: {}", prefs.decimal_places);
    println!("angle_unit:     {}", prefs.angle_unit);
    println!("memory_value:   {}", prefs.memory_value);
    Ok(())
}

fn cmd_prefs_set(
    store: &SqliteStore,
    owner: &OwnerId,
    theme: Option<String>,
    decimals: Option<u32>,
    unit: Option<String>,
    memory: Option<Decimal>,
) -> Result<()> {
    let angle_unit = match unit {
        Some(u) => Some(u.parse::<AngleUnit>().map_err(anyhow::Error::msg)?),
        None => None,
    };
    let patch = PreferencesPatch {
        theme,
        decimal_places: decimals,
        angle_unit,
        memory_value: memory,
    };
    if patch.is_empty() {
        bail!("nothing to set; pass at least one of --theme, --decimals, --unit, --memory");
    }

    let prefs = store.update(owner, &patch)?;
    println!("Preferences updated.");
    println!("theme:          {}", prefs.theme);
    println!("decimal_places: {}", prefs.decimal_places);
    println!("angle_unit:     {}", prefs.angle_unit);
    println!("memory_value:   {}", prefs.memory_value);
    Ok(())
}

fn cmd_config() -> Result<()> {
    println!("Config: {}", config::show_config_path());
    println!("Default db: {}", default_db_path().display());
    Ok(())
}
