mod colors;
mod render;

use antikoala_core::session::parse_date;
use antikoala_core::session::parse_time_of_day;
use antikoala_core::stats::parse_month;
use antikoala_core::*;
use chrono::Datelike;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "antikoala")]
#[command(about = "Blood-alcohol and drinking-capacity tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Whose records to use
    #[arg(long, global = true)]
    user: Option<String>,

    /// Estimation mode (live or peak)
    #[arg(long, global = true)]
    mode: Option<EstimationMode>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the drink catalog
    Drinks,

    /// Show or edit the user profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Create a new drinking session
    New {
        /// Event name
        name: String,

        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// List sessions, newest first (default)
    List,

    /// Show one session with its live estimate
    Show { id: String },

    /// Add drinks to a session
    Add {
        id: String,
        /// Drink key or Korean name (e.g. soju, 소주)
        drink: DrinkKind,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },

    /// Remove drinks from a session (never below zero)
    Remove {
        id: String,
        drink: DrinkKind,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },

    /// Start a session now, or correct its start time
    Start {
        id: String,
        /// Start time on the session date (HH:MM)
        #[arg(long)]
        at: Option<String>,
    },

    /// End a session now, or correct its end time
    End {
        id: String,
        /// End time (HH:MM); earlier than the start means after midnight
        #[arg(long)]
        at: Option<String>,
    },

    /// Re-open an ended session
    Reopen { id: String },

    /// Rename a session
    Rename { id: String, name: String },

    /// Delete a session
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Follow a session's estimate as time passes
    Watch {
        id: String,
        /// Stop after this many updates
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Consumption statistics
    Stats {
        /// monthly, quarterly or yearly
        #[arg(long, default_value = "monthly")]
        period: Period,
        /// Any date inside the period (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// Calendar of drinking days
    Calendar {
        /// Month to show (YYYY-MM), defaults to this month
        #[arg(long)]
        month: Option<String>,
    },

    /// Compact the session journal into the CSV snapshot
    Rollup {
        /// Clean up processed journal files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    Show,
    /// Create or update the profile; omitted fields keep their value
    Set {
        #[arg(long)]
        name: Option<String>,
        /// male or female
        #[arg(long)]
        gender: Option<Gender>,
        /// Body weight in kg
        #[arg(long)]
        weight: Option<f64>,
        /// Tolerance in soju bottles
        #[arg(long)]
        capacity: Option<f64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    antikoala_core::logging::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_persistence() => {
            tracing::error!("Persistence failure: {}", e);
            eprintln!("⚠ 저장소 오류: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = &cli.data_dir {
        config.data.data_dir = dir.clone();
    }
    if let Some(user) = &cli.user {
        config.user.id = user.clone();
    }
    if let Some(mode) = cli.mode {
        config.estimation.mode = mode;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    let errors = drink_catalog().validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    let ctx = AppContext::new(config, Arc::new(SystemClock))?;

    match cli.command.unwrap_or(Commands::List) {
        Commands::Drinks => {
            render::render_drinks();
            Ok(())
        }
        Commands::Profile { action } => cmd_profile(&ctx, action),
        Commands::New { name, date } => {
            let date = date.as_deref().map(parse_date).transpose()?;
            let session = ctx.create_session(&name, date)?;
            println!(
                "✓ Created session {} '{}' ({})",
                session.short_id(),
                session.event_name,
                session::session_date(&session, ctx.offset())
            );
            Ok(())
        }
        Commands::List => render::render_view(&ctx, &View::List),
        Commands::Show { id } => {
            let session = ctx.find(&id)?;
            render::render_view(
                &ctx,
                &View::Detail {
                    session_id: session.id,
                },
            )
        }
        Commands::Add { id, drink, count } => {
            let session = ctx.adjust_count(&id, drink, clamp_delta(count))?;
            render::render_count_change(&session, drink);
            Ok(())
        }
        Commands::Remove { id, drink, count } => {
            let session = ctx.adjust_count(&id, drink, -clamp_delta(count))?;
            render::render_count_change(&session, drink);
            Ok(())
        }
        Commands::Start { id, at } => {
            let at = at.as_deref().map(parse_time_of_day).transpose()?;
            let session = ctx.start(&id, at)?;
            println!("✓ {} started", session.event_name);
            Ok(())
        }
        Commands::End { id, at } => {
            let at = at.as_deref().map(parse_time_of_day).transpose()?;
            let session = ctx.end(&id, at)?;
            println!("✓ {} ended", session.event_name);
            if let Some(percentage) = session.peak_percentage {
                println!("  주량 대비 {:.1}%", percentage);
            }
            Ok(())
        }
        Commands::Reopen { id } => {
            let session = ctx.reopen(&id)?;
            println!("✓ {} reopened", session.event_name);
            Ok(())
        }
        Commands::Rename { id, name } => {
            let session = ctx.rename(&id, &name)?;
            println!("✓ Renamed to '{}'", session.event_name);
            Ok(())
        }
        Commands::Delete { id, yes } => cmd_delete(&ctx, &id, yes),
        Commands::Watch { id, ticks } => cmd_watch(&ctx, &id, ticks),
        Commands::Stats { period, date } => {
            let anchor = match date {
                Some(d) => parse_date(&d)?,
                None => ctx.today(),
            };
            render::render_view(&ctx, &View::Stats { period, anchor })
        }
        Commands::Calendar { month } => {
            let (year, month) = match month {
                Some(m) => parse_month(&m)?,
                None => {
                    let today = ctx.today();
                    (today.year(), today.month())
                }
            };
            let days = ctx.calendar(Some((year, month)))?;
            render::render_calendar(year, month, &days)
        }
        Commands::Rollup { cleanup } => cmd_rollup(&ctx, cleanup),
    }
}

fn clamp_delta(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn cmd_profile(ctx: &AppContext, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Show => match ctx.profile()? {
            Some(profile) => {
                render::render_profile(&profile);
                Ok(())
            }
            None => Err(Error::ProfileMissing),
        },
        ProfileAction::Set {
            name,
            gender,
            weight,
            capacity,
        } => {
            let profile = ctx.update_profile(ProfilePatch {
                name,
                gender,
                weight_kg: weight,
                capacity,
            })?;
            println!("✓ Profile saved");
            render::render_profile(&profile);
            Ok(())
        }
    }
}

fn cmd_delete(ctx: &AppContext, id: &str, yes: bool) -> Result<()> {
    let session = ctx.find(id)?;
    if !yes && !confirm(&format!("Delete '{}' ({})?", session.event_name, session.short_id()))? {
        println!("Cancelled.");
        return Ok(());
    }
    let deleted = ctx.delete(&session.id.to_string())?;
    println!("✓ Deleted '{}'", deleted.event_name);
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn cmd_watch(ctx: &AppContext, id: &str, ticks: Option<u64>) -> Result<()> {
    let profile = ctx.require_profile()?;
    let session = ctx.find(id)?;
    render::render_detail(ctx, &session, Some(&profile));

    let view = View::Detail {
        session_id: session.id,
    };
    let seconds = view
        .tick_seconds(session.is_running(), &ctx.config.display)
        .unwrap_or(ctx.config.display.passive_tick_seconds);
    let ticker = Ticker::start(Duration::from_secs(seconds))?;

    let mut rendered = 0;
    loop {
        // The store is the change feed: re-read session and profile on every tick
        let (session, profile) = ctx.refresh(session.id)?;
        render::render_tick(ctx, &session, &profile);
        rendered += 1;

        if ticks.is_some_and(|limit| rendered >= limit) {
            break;
        }
        if ticker.wait().is_none() {
            break;
        }
    }
    Ok(())
}

fn cmd_rollup(ctx: &AppContext, cleanup: bool) -> Result<()> {
    let journal_path = ctx.store.journal_path();
    if !journal_path.exists() {
        println!("No journal found - nothing to roll up.");
        return Ok(());
    }

    let (count, cleaned) = ctx.rollup(cleanup)?;
    println!("✓ Rolled up {} journal entries to CSV", count);
    println!("  CSV: {}", ctx.store.snapshot_path().display());
    if cleaned > 0 {
        println!("✓ Cleaned up {} processed journal files", cleaned);
    }
    Ok(())
}
