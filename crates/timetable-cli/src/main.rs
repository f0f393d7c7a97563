//! `timetable` — university timetable viewer with a local cache.
//!
//! # Usage
//!
//! ```
//! timetable show
//! timetable show --week 5 --next
//! timetable edit --week 5 --period 3 --day 2 --subject "Lab" --code LB1 --date 2024-10-01
//! timetable edit --week 5 --period 3 --day 2 --clear
//! timetable --config ~/.config/timetable/timetable.toml refresh
//! ```

mod client;
mod render;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use client::UpstreamClient;
use settings::Settings;
use timetable_core::{
  schedule::{ClassEntry, Direction, WeekId},
  session::Timetable,
};
use timetable_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "timetable", version, about = "University timetable viewer with a local cache")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "timetable.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print one week of the timetable.
  Show {
    /// Week to show (default: the first week).
    #[arg(long)]
    week: Option<String>,

    /// Show the week after the selected one.
    #[arg(long, conflicts_with = "prev")]
    next: bool,

    /// Show the week before the selected one.
    #[arg(long)]
    prev: bool,
  },

  /// List week identifiers in upstream order.
  Weeks,

  /// Replace or clear a single cell.
  Edit {
    #[arg(long)]
    week: String,

    /// Period number, 1-12.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
    period: u8,

    /// Day of week, 1 (Monday) to 7 (Sunday).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=7))]
    day: u8,

    #[arg(long, required_unless_present = "clear")]
    subject: Option<String>,

    #[arg(long)]
    code: Option<String>,

    #[arg(long)]
    date: Option<String>,

    /// Empty the cell instead of writing an entry.
    #[arg(long, conflicts_with_all = ["subject", "code", "date"])]
    clear: bool,
  },

  /// Fetch from upstream regardless of cache age.
  Refresh,

  /// Show when the cache was last written and whether it is stale.
  Status,
}

type App = Timetable<SqliteStore, UpstreamClient>;

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(log_filter(
      &std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default(),
    ))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store_path = settings.resolved_store_path();
  if let Some(parent) = store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let client = UpstreamClient::new(settings.upstream()).context("failed to build HTTP client")?;

  let mut app = Timetable::new(store, client).with_max_age(settings.max_age());

  match cli.command {
    Command::Show { week, next, prev } => show(&mut app, week, next, prev).await,
    Command::Weeks => weeks(&mut app).await,
    Command::Edit { week, period, day, subject, code, date, clear } => {
      let entry = (!clear).then(|| ClassEntry {
        subject_name: subject.unwrap_or_default(),
        subject_code: code.unwrap_or_default(),
        date:         date.unwrap_or_default(),
      });
      edit(&mut app, WeekId::from(week), period, day, entry).await
    }
    Command::Refresh => {
      app.refresh().await?;
      match app.schedule() {
        Some(schedule) => println!("Fetched {} weeks.", schedule.weekly_schedules.len()),
        None => println!("Upstream returned no timetable data."),
      }
      Ok(())
    }
    Command::Status => status(&app).await,
  }
}

/// `RUST_LOG`-style `directives`, defaulting to `INFO` when empty.
fn log_filter(directives: &str) -> EnvFilter {
  EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .parse_lossy(directives)
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn show(app: &mut App, week: Option<String>, next: bool, prev: bool) -> Result<()> {
  if app.get_schedule().await?.is_none() {
    println!("No timetable data available.");
    return Ok(());
  }

  if let Some(week) = week {
    app.select_week(&WeekId::from(week))?;
  }
  if next {
    app.change_week(Direction::Next);
  } else if prev {
    app.change_week(Direction::Previous);
  }

  match (app.schedule(), app.current_week(), app.current_grid()) {
    (Some(schedule), Some(id), Some(grid)) => print!("{}", render::week(schedule, id, grid)),
    _ => println!("The timetable has no weeks."),
  }
  Ok(())
}

async fn weeks(app: &mut App) -> Result<()> {
  match app.get_schedule().await? {
    Some(schedule) => print!("{}", render::week_list(schedule)),
    None => println!("No timetable data available."),
  }
  Ok(())
}

async fn edit(
  app: &mut App,
  week: WeekId,
  period: u8,
  day: u8,
  entry: Option<ClassEntry>,
) -> Result<()> {
  if app.get_schedule().await?.is_none() {
    bail!("no timetable data to edit");
  }

  let cleared = entry.is_none();
  app
    .edit_cell(&week, usize::from(period) - 1, usize::from(day) - 1, entry)
    .await?;

  tracing::info!(%week, period, day, cleared, "cell edited");
  if let Some(grid) = app.schedule().and_then(|s| s.week(&week)) {
    let left = grid.occupied();
    println!("Week {week}: period {period}, day {day} updated ({left} occupied cells).");
  }
  Ok(())
}

async fn status(app: &App) -> Result<()> {
  let status = app.status().await?;
  match status.last_fetch {
    Some(at) => println!(
      "Last fetched {} ({}).",
      at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
      if status.stale { "stale" } else { "fresh" }
    ),
    None => println!("Nothing cached yet."),
  }
  println!("Refetch after {} hours.", app.max_age().num_hours());
  Ok(())
}
