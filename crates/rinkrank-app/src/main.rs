// rinkrank entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (log to file, not terminal)
// 3. Load config (copying defaults on first run)
// 4. Load data and build the engine
// 5. Run the subcommand, writing tables as CSV to stdout

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use rinkrank_core::config;
use rinkrank_core::engine::Engine;
use rinkrank_core::query::{Cell, Dataset, PlayerRow};
use rinkrank_core::stats::{PlayerId, Season};

#[derive(Parser)]
#[command(name = "rinkrank")]
#[command(about = "Fantasy hockey player ratings from multi-season stat tables")]
#[command(version)]
struct Cli {
    /// Directory holding config/, defaults/ and the data files
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Active players ranked by rating
    Rank {
        /// Only show the best N players
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Per-season stat table
    Table {
        /// Season token, e.g. 20242025
        #[arg(short, long)]
        season: Season,

        #[arg(short, long, value_enum, default_value_t = TableKind::Totals)]
        dataset: TableKind,
    },

    /// Bio and per-season history for one player (id or part of a name)
    Player { query: String },

    /// Mark a player as picked
    Pick { player: String },

    /// Clear a player's picked flag
    Unpick { player: String },

    /// Replace a player's note
    Note {
        player: String,
        /// Note text; words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TableKind {
    Totals,
    Averages,
    Deviations,
    Ratios,
    Fullset,
}

impl TableKind {
    fn dataset(self) -> Option<Dataset> {
        match self {
            TableKind::Totals => Some(Dataset::Totals),
            TableKind::Averages => Some(Dataset::Averages),
            TableKind::Deviations => Some(Dataset::Deviations),
            TableKind::Ratios => Some(Dataset::Ratios),
            TableKind::Fullset => None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };

    init_tracing(&base_dir)?;
    info!("rinkrank starting in {}", base_dir.display());

    let config = config::load_config_at(&base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, seasons={:?}",
        config.league.name,
        config.league.seasons.iter().map(Season::as_str).collect::<Vec<_>>()
    );

    let mut engine = Engine::load(&config).context("failed to load player data")?;

    match cli.command {
        Command::Rank { top } => print_rankings(&engine, top),
        Command::Table { season, dataset } => {
            if !engine.seasons().contains(&season) {
                bail!("season {season} is not configured in league.toml");
            }
            let rows = match dataset.dataset() {
                Some(d) => engine.dataset_rows(&season, d),
                None => engine.fullset(&season),
            };
            write_rows(&rows)
        }
        Command::Player { query } => print_player(&engine, &query),
        Command::Pick { player } => {
            let id = resolve_player(&engine, &player)?;
            engine.set_picked(&id, true)?;
            engine.save_annotations().context("failed to save annotations")?;
            println!("{} marked as picked", describe(&engine, &id));
            Ok(())
        }
        Command::Unpick { player } => {
            let id = resolve_player(&engine, &player)?;
            engine.set_picked(&id, false)?;
            engine.save_annotations().context("failed to save annotations")?;
            println!("{} no longer picked", describe(&engine, &id));
            Ok(())
        }
        Command::Note { player, text } => {
            let id = resolve_player(&engine, &player)?;
            engine.set_note(&id, text.join(" "))?;
            engine.save_annotations().context("failed to save annotations")?;
            println!("note saved for {}", describe(&engine, &id));
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RankRecord<'a> {
    #[serde(rename = "Rank")]
    rank: usize,
    #[serde(rename = "Picked")]
    picked: bool,
    #[serde(rename = "Team")]
    team: &'a str,
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Pos")]
    position: &'a str,
    #[serde(rename = "Age")]
    age: u32,
    #[serde(rename = "Rating")]
    rating: f64,
    #[serde(rename = "Note")]
    note: &'a str,
}

fn print_rankings(engine: &Engine, top: Option<usize>) -> anyhow::Result<()> {
    let rankings = engine.rankings();
    let limit = top.unwrap_or(rankings.len());

    let mut wtr = csv::Writer::from_writer(io::stdout().lock());
    for ranked in rankings.iter().take(limit) {
        wtr.serialize(RankRecord {
            rank: ranked.rank,
            picked: ranked.annotation.picked,
            team: &ranked.bio.team,
            id: ranked.id.as_str(),
            name: &ranked.bio.name,
            position: &ranked.bio.position_code,
            age: ranked.bio.age,
            rating: ranked.rating,
            note: &ranked.annotation.note,
        })
        .context("failed to write ranking row")?;
    }
    wtr.flush().context("failed to flush output")?;
    Ok(())
}

fn print_player(engine: &Engine, query: &str) -> anyhow::Result<()> {
    let matches = engine.find_players(query);
    let id = match matches.as_slice() {
        [] => bail!("no active player matches `{query}`"),
        [id] => id.clone(),
        many => {
            eprintln!("{} players match `{query}`:", many.len());
            for id in many {
                eprintln!("  {}", describe(engine, id));
            }
            return Ok(());
        }
    };

    let bio = engine
        .bio(&id)
        .with_context(|| format!("no bio for player {id}"))?;
    let annotation = engine.annotations().get(&id).cloned().unwrap_or_default();

    let mut wtr = csv::Writer::from_writer(io::stdout().lock());
    wtr.write_record(["ID", "Name", "Team", "Pos", "Age", "Picked", "Note"])?;
    let age = bio.age.to_string();
    let picked = annotation.picked.to_string();
    wtr.write_record([
        id.as_str(),
        bio.name.as_str(),
        bio.team.as_str(),
        bio.position_code.as_str(),
        age.as_str(),
        picked.as_str(),
        annotation.note.as_str(),
    ])?;
    wtr.flush().context("failed to flush output")?;
    drop(wtr);

    let history = engine.player_history(&id);
    if !history.missing_seasons.is_empty() {
        let missing: Vec<&str> = history.missing_seasons.iter().map(Season::as_str).collect();
        eprintln!("no stats for {} in {}", bio.name, missing.join(", "));
    }
    if !history.rows.is_empty() {
        println!();
        write_rows(&history.rows)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve a player argument to exactly one active player.
fn resolve_player(engine: &Engine, query: &str) -> anyhow::Result<PlayerId> {
    let matches = engine.find_players(query);
    match matches.as_slice() {
        [] => bail!("no active player matches `{query}`"),
        [id] => Ok(id.clone()),
        many => {
            let names: Vec<String> = many.iter().map(|id| describe(engine, id)).collect();
            bail!("`{query}` is ambiguous: {}", names.join("; "))
        }
    }
}

fn describe(engine: &Engine, id: &PlayerId) -> String {
    match engine.bio(id) {
        Some(bio) => format!("{} {} ({})", id, bio.name, bio.team),
        None => id.to_string(),
    }
}

/// Write query rows as CSV with a header taken from the first row.
fn write_rows(rows: &[PlayerRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(io::stdout().lock());
    let mut header_written = false;
    for row in rows {
        let flat = row.to_flat();
        if !header_written {
            wtr.write_record(flat.iter().map(|(column, _)| column.as_str()))
                .context("failed to write header")?;
            header_written = true;
        }
        wtr.write_record(flat.iter().map(|(_, cell)| cell_text(cell)))
            .context("failed to write row")?;
    }
    wtr.flush().context("failed to flush output")?;
    Ok(())
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{n:.0}"),
        other => other.to_string(),
    }
}

fn init_tracing(base_dir: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = directories::ProjectDirs::from("", "", "rinkrank")
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| base_dir.join("logs"));
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("rinkrank.log"))
        .context("failed to create log file")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rinkrank=info,rinkrank_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
