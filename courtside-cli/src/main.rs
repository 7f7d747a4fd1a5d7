//! Courtside CLI: team, player, live, prediction and cache commands.
//!
//! Commands:
//! - `games`: team game log for a season, or the most recent N games
//! - `players`: per-player game logs, or per-player season averages
//! - `live`: score of the team's game in progress, optionally re-polled
//! - `compare`: team games across the comparison seasons, or a per-season summary
//! - `predict`: next-game points from the rolling-average model
//! - `export`: write any of the above tables to CSV under `paths.data`
//! - `cache stats` / `cache clear`: cache counters and invalidation

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use polars::prelude::DataFrame;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use courtside_core::config::AppConfig;
use courtside_core::data::assemble::games_from_frame;
use courtside_core::domain::LiveGameSnapshot;
use courtside_runner::{save_frame_csv, NextGamePredictor, PredictError, TeamDataManager};

#[derive(Parser)]
#[command(
    name = "courtside",
    about = "Courtside CLI: cached NBA team and player stats"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used if it does not exist.
    #[arg(long, global = true, default_value = "courtside.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Team game log, most recent first.
    Games {
        /// Season like 2024-25. Defaults to `dashboard.default_season`.
        #[arg(long)]
        season: Option<String>,

        /// Only show the N most recent games.
        #[arg(long)]
        recent: Option<usize>,

        /// Show rolling averages instead of the raw log.
        #[arg(long, default_value_t = false)]
        trends: bool,
    },
    /// Game logs for every player on the roster.
    Players {
        #[arg(long)]
        season: Option<String>,

        /// Show per-player season averages instead of game logs.
        #[arg(long, default_value_t = false)]
        averages: bool,
    },
    /// Score of the team's game in progress.
    Live {
        /// Re-poll every `dashboard.refresh_rate_secs` until interrupted.
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    /// Team games across the comparison seasons.
    Compare {
        /// Show one aggregate row per season.
        #[arg(long, default_value_t = false)]
        summary: bool,
    },
    /// Predict the team's points in its next game.
    Predict {
        /// Retrain the model even if one is saved.
        #[arg(long, default_value_t = false)]
        retrain: bool,
    },
    /// Write a table to CSV under `paths.data`.
    Export {
        #[arg(value_enum)]
        table: ExportTable,

        #[arg(long)]
        season: Option<String>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportTable {
    TeamGames,
    PlayerStats,
    PlayerAverages,
    Comparison,
    Summary,
    Trends,
}

impl ExportTable {
    fn file_stem(self) -> &'static str {
        match self {
            ExportTable::TeamGames => "team_games",
            ExportTable::PlayerStats => "player_stats",
            ExportTable::PlayerAverages => "player_averages",
            ExportTable::Comparison => "season_comparison",
            ExportTable::Summary => "season_summary",
            ExportTable::Trends => "trends",
        }
    }
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report hit/miss counters and tier status.
    Stats,
    /// Drop every cached entry in both tiers and reset counters.
    Clear,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    let manager = TeamDataManager::from_config(config)?;

    match cli.command {
        Commands::Games {
            season,
            recent,
            trends,
        } => run_games(&manager, season.as_deref(), recent, trends),
        Commands::Players { season, averages } => {
            run_players(&manager, season.as_deref(), averages)
        }
        Commands::Live { watch } => run_live(&manager, watch),
        Commands::Compare { summary } => run_compare(&manager, summary),
        Commands::Predict { retrain } => run_predict(&manager, retrain),
        Commands::Export { table, season } => run_export(&manager, table, season.as_deref()),
        Commands::Cache { action } => match action {
            CacheAction::Stats => run_cache_stats(&manager),
            CacheAction::Clear => {
                manager.clear_cache();
                println!("Cache cleared.");
                Ok(())
            }
        },
    }
}

fn print_table(title: &str, df: Option<DataFrame>) {
    match df {
        Some(df) => {
            println!("=== {title} ({} rows) ===", df.height());
            println!("{df}");
        }
        None => println!("No data available for {title}."),
    }
}

fn run_games(
    manager: &TeamDataManager,
    season: Option<&str>,
    recent: Option<usize>,
    trends: bool,
) -> Result<()> {
    if trends {
        print_table("Trends", manager.get_trends(season)?);
    } else if let Some(n) = recent {
        print_table("Recent games", manager.get_recent_games(season, n)?);
    } else {
        print_table("Team games", manager.get_team_games(season)?);
    }
    Ok(())
}

fn run_players(manager: &TeamDataManager, season: Option<&str>, averages: bool) -> Result<()> {
    if averages {
        print_table("Player averages", manager.get_player_averages(season)?);
    } else {
        print_table("Player stats", manager.get_player_stats(season)?);
    }
    Ok(())
}

fn print_live(snapshot: Option<&LiveGameSnapshot>) {
    let now = chrono::Local::now().format("%H:%M:%S");
    match snapshot {
        Some(g) => println!(
            "[{now}] {} {} - {} {}  |  {} (period {}, {})",
            g.away_team, g.away_score, g.home_score, g.home_team, g.status, g.period, g.game_clock
        ),
        None => println!("[{now}] No live game for this team."),
    }
}

fn run_live(manager: &TeamDataManager, watch: bool) -> Result<()> {
    loop {
        print_live(manager.get_live_game_stats().as_ref());
        if !watch {
            return Ok(());
        }
        std::thread::sleep(manager.config().refresh_rate());
    }
}

fn run_compare(manager: &TeamDataManager, summary: bool) -> Result<()> {
    if summary {
        print_table("Season summary", manager.get_season_summary()?);
    } else {
        print_table("Season comparison", manager.get_season_comparison()?);
    }
    Ok(())
}

fn run_predict(manager: &TeamDataManager, retrain: bool) -> Result<()> {
    let config = manager.config();
    let mut predictor = NextGamePredictor::new(&config.paths.models, config.ml.clone());

    let needs_training = retrain
        || match predictor.load() {
            Ok(_) => false,
            Err(PredictError::ModelNotTrained(path)) => {
                tracing::info!(path = %path.display(), "no saved model, training");
                true
            }
            Err(e) => return Err(e.into()),
        };

    if needs_training {
        let Some(df) = manager.get_season_comparison()? else {
            bail!("no team games available to train on");
        };
        let games = games_from_frame(&df)?;
        let report = predictor.train(&games)?;
        println!("=== Training ===");
        println!("Rows:      {} train / {} test", report.train_rows, report.test_rows);
        println!("R² train:  {:.3}", report.r2_train);
        println!("R² test:   {:.3}", report.r2_test);
        println!("Model:     {}", report.model_path.display());
        println!();
    }

    let recent = manager.team_game_records(None)?;
    let points = predictor.predict_next(&recent)?;
    println!("Predicted points next game: {points:.1}");
    Ok(())
}

fn run_export(manager: &TeamDataManager, table: ExportTable, season: Option<&str>) -> Result<()> {
    let df = match table {
        ExportTable::TeamGames => manager.get_team_games(season)?,
        ExportTable::PlayerStats => manager.get_player_stats(season)?,
        ExportTable::PlayerAverages => manager.get_player_averages(season)?,
        ExportTable::Comparison => manager.get_season_comparison()?,
        ExportTable::Summary => manager.get_season_summary()?,
        ExportTable::Trends => manager.get_trends(season)?,
    };
    let Some(df) = df else {
        bail!("no data to export for {}", table.file_stem());
    };
    let path = save_frame_csv(&df, &manager.config().paths.data, table.file_stem())?;
    println!("Exported {} rows to {}", df.height(), path.display());
    Ok(())
}

fn run_cache_stats(manager: &TeamDataManager) -> Result<()> {
    let stats = manager.get_cache_stats();
    println!("=== Cache ===");
    println!("Hits:        {}", stats.hits);
    println!("Misses:      {}", stats.misses);
    println!("API calls:   {}", stats.api_calls);
    println!("Hit rate:    {}", stats.hit_rate);
    println!("Fast tier:   {} entries", stats.fast_tier_entries);
    println!(
        "Shared tier: {}",
        stats.shared_tier.as_deref().unwrap_or("disabled")
    );
    println!("As of:       {}", stats.timestamp.to_rfc3339());
    Ok(())
}
