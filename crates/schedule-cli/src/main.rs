//! `schedule` CLI: run the schedule engine over JSON event files.
//!
//! ## Usage
//!
//! ```sh
//! # Slot boundaries of the configured grid
//! schedule --config grid.toml slots
//!
//! # Column layout for one day (recurring events are expanded first)
//! schedule layout -i events.json --date 2024-01-01
//!
//! # Would booking teacher-42 (with substitute teacher-7) clash?
//! schedule conflicts -i events.json --resource teacher-42 --substitute teacher-7 \
//!   --start 2024-01-03T09:15 --end 2024-01-03T10:00
//!
//! # Concrete events visible in a week
//! schedule expand -i events.json --from 2024-01-01 --to 2024-01-07
//!
//! # Free time for a teacher, at least 45 minutes long
//! schedule free -i events.json --resource teacher-42 \
//!   --start 2024-01-01T08:00 --end 2024-01-01T17:00 --min-minutes 45
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use log::{debug, LevelFilter};
use schedule_engine::event::timestamp;
use schedule_engine::grid::{self, TimeGridConfig};
use schedule_engine::{conflict, freebusy, layout, recurrence, Event};
use serde::Serialize;
use std::io::{self, Read};

#[derive(Parser)]
#[command(name = "schedule", version, about = "Timetable grid, layout and conflict tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Grid config file (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the grid's slot boundaries, one per line
    Slots {
        /// Override the configured zoom level
        #[arg(long)]
        zoom: Option<f64>,
    },
    /// Lay out one day's events into side-by-side columns
    Layout {
        /// Events JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Day to lay out (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Override the configured zoom level
        #[arg(long)]
        zoom: Option<f64>,
    },
    /// Check a candidate booking against existing events
    Conflicts {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
        /// Main teacher
        #[arg(long)]
        resource: String,
        /// Substitute teacher, checked independently
        #[arg(long)]
        substitute: Option<String>,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Event being edited; neither it nor its occurrences count as conflicts
        #[arg(long)]
        exclude: Option<String>,
    },
    /// Expand recurring events into the concrete events within a date range
    Expand {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: String,
    },
    /// List a teacher's free time within a window
    Free {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
        #[arg(long)]
        resource: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Only report the first slot at least this long
        #[arg(long)]
        min_minutes: Option<i64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Slots { zoom } => {
            let config = with_zoom(config, zoom);
            let slots: String = grid::time_slots(&config)
                .iter()
                .map(|t| format!("{}\n", t.format("%H:%M")))
                .collect();
            print!("{}", slots);
        }
        Commands::Layout {
            input,
            output,
            date,
            zoom,
        } => {
            let config = with_zoom(config, zoom);
            let day = parse_date(&date)?;
            let events = read_events(input.as_deref())?;
            let visible = recurrence::expand_visible(&events, day, day)
                .context("Failed to expand recurring events")?;
            let positioned = layout::layout_day(&visible, day, &config);
            write_json(output.as_deref(), &positioned)?;
        }
        Commands::Conflicts {
            input,
            output,
            resource,
            substitute,
            start,
            end,
            exclude,
        } => {
            let start = parse_timestamp(&start)?;
            let end = parse_timestamp(&end)?;
            let events = read_events(input.as_deref())?;
            let candidates = recurrence::expand_range(&events, start, end)
                .context("Failed to expand recurring events")?;
            let check = conflict::check_assignment(
                &candidates,
                &resource,
                substitute.as_deref(),
                start,
                end,
                exclude.as_deref(),
            )
            .context("Failed to check assignment")?;
            debug!("assignment clear: {}", check.is_clear());
            write_json(output.as_deref(), &check)?;
        }
        Commands::Expand {
            input,
            output,
            from,
            to,
        } => {
            let from = parse_date(&from)?;
            let to = parse_date(&to)?;
            let events = read_events(input.as_deref())?;
            let visible = recurrence::expand_visible(&events, from, to)
                .context("Failed to expand recurring events")?;
            write_json(output.as_deref(), &visible)?;
        }
        Commands::Free {
            input,
            output,
            resource,
            start,
            end,
            min_minutes,
        } => {
            let start = parse_timestamp(&start)?;
            let end = parse_timestamp(&end)?;
            let events = read_events(input.as_deref())?;
            let visible = recurrence::expand_range(&events, start, end)
                .context("Failed to expand recurring events")?;
            match min_minutes {
                Some(min) => {
                    let slot = freebusy::first_free_slot(&visible, &resource, start, end, min)
                        .context("Failed to compute free slots")?;
                    write_json(output.as_deref(), &slot)?;
                }
                None => {
                    let slots = freebusy::free_slots(&visible, &resource, start, end)
                        .context("Failed to compute free slots")?;
                    write_json(output.as_deref(), &slots)?;
                }
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` controls the level, defaulting to `warn`; `--verbose` forces `debug`.
fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn load_config(path: Option<&str>) -> Result<TimeGridConfig> {
    let Some(path) = path else {
        return Ok(TimeGridConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path))?;
    let config: TimeGridConfig =
        toml::from_str(&text).with_context(|| format!("Invalid grid config: {}", path))?;
    debug!("loaded grid config from {}: {:?}", path, config);
    Ok(config)
}

fn with_zoom(config: TimeGridConfig, zoom: Option<f64>) -> TimeGridConfig {
    match zoom {
        Some(level) => grid::adjust_zoom(&config, level),
        None => config,
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("Invalid date: {}", raw))
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    timestamp::parse(raw).with_context(|| format!("Invalid timestamp: {}", raw))
}

fn read_events(path: Option<&str>) -> Result<Vec<Event>> {
    let json = read_input(path)?;
    let events: Vec<Event> = serde_json::from_str(&json).context("Failed to parse events JSON")?;
    debug!("read {} events", events.len());
    Ok(events)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: Option<&str>, value: &T) -> Result<()> {
    let mut pretty = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    pretty.push('\n');
    write_output(path, &pretty)
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
