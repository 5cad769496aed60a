use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use crate::{
    db::{CategoryInput, CategoryUpdate, XpSource},
    events::ProgressEvent,
    log_warn,
    progression::{LevelState, TitleVocabulary},
    settings::TimerSettings,
    registry,
    timer::{TimerMode, TimerStatus},
    tracker::{CategoryProgress, LogOutcome},
    AppState,
};

const ENABLE_LOGS: bool = true;
const DEFAULT_DATA_DIR: &str = ".pixel-pages";
const BAR_WIDTH: usize = 20;

#[derive(Parser)]
#[command(name = "pixel-pages")]
#[command(about = "Level up your skills with logged focus time", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the registry database and settings
    /// (defaults to $PIXEL_PAGES_DATA_DIR, then ./.pixel-pages)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every category with its level, title and rank
    Status,

    /// Show one category in detail
    Show {
        /// Category id or name
        category: String,
    },

    /// Create a category
    Add {
        name: String,
        #[arg(long, default_value = "#00FFAA")]
        color: String,
        #[arg(long)]
        icon: Option<String>,
    },

    /// Change a category's name or colors
    Edit {
        /// Category id or name
        category: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        /// Override color; pass an empty string to clear it
        #[arg(long)]
        custom_color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },

    /// Delete a category (its history is kept)
    Remove {
        /// Category id or name
        category: String,
    },

    /// Credit manually tracked minutes to a category
    Log {
        /// Category id or name
        category: String,
        minutes: u64,
    },

    /// Show recently credited minutes
    History {
        /// Only this category
        category: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },

    /// Run a focus countdown and credit it when it finishes
    Focus {
        /// Category id or name
        category: String,
        /// Length in minutes (defaults to the configured focus length)
        #[arg(long)]
        minutes: Option<u64>,
    },

    /// Count up until Ctrl+C, then credit the elapsed minutes
    Stopwatch {
        /// Category id or name
        category: String,
    },

    /// Run a break countdown (earns no XP)
    Break {
        #[arg(long)]
        minutes: Option<u64>,
    },

    /// List achievements and when they were unlocked
    Achievements,

    /// Merge a registry exported from browser storage
    Import { path: PathBuf },

    /// Show or set the title vocabulary (branches | classic)
    Vocabulary { value: Option<String> },

    /// Show or set the default focus and break lengths
    Timer {
        #[arg(long)]
        focus: Option<u64>,
        #[arg(long = "break")]
        break_minutes: Option<u64>,
    },
}

fn data_dir(cli_value: Option<PathBuf>) -> PathBuf {
    cli_value
        .or_else(|| std::env::var_os("PIXEL_PAGES_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let app = AppState::open(&data_dir(cli.data_dir)).await?;

    match cli.command {
        Commands::Status => status(&app).await,
        Commands::Show { category } => show(&app, &category).await,
        Commands::Add { name, color, icon } => {
            let category = app
                .tracker
                .db()
                .create_category(CategoryInput {
                    name,
                    color,
                    icon_name: icon,
                })
                .await?;
            println!("Created {} ({})", category.name, category.id);
            Ok(())
        }
        Commands::Edit {
            category,
            name,
            color,
            custom_color,
            icon,
        } => {
            let target = app.tracker.resolve_category(&category).await?;
            let update = CategoryUpdate {
                name,
                color,
                custom_color: custom_color.map(|value| Some(value).filter(|v| !v.is_empty())),
                icon_name: icon.map(Some),
            };
            let updated = app.tracker.db().update_category(&target.id, update).await?;
            println!("Updated {}", updated.name);
            Ok(())
        }
        Commands::Remove { category } => {
            let target = app.tracker.resolve_category(&category).await?;
            app.tracker.db().soft_delete_category(&target.id).await?;
            println!("Removed {}", target.name);
            Ok(())
        }
        Commands::Log { category, minutes } => {
            let outcome = app
                .tracker
                .log_minutes(&category, minutes, XpSource::Manual)
                .await?;
            print_outcome(&outcome);
            Ok(())
        }
        Commands::History { category, limit } => history(&app, category, limit).await,
        Commands::Focus { category, minutes } => {
            run_timer(&app, TimerMode::Focus, minutes, Some(category.as_str())).await
        }
        Commands::Stopwatch { category } => {
            run_timer(&app, TimerMode::Stopwatch, None, Some(category.as_str())).await
        }
        Commands::Break { minutes } => run_timer(&app, TimerMode::Break, minutes, None).await,
        Commands::Achievements => achievements(&app).await,
        Commands::Import { path } => import(&app, path).await,
        Commands::Vocabulary { value } => vocabulary(&app, value),
        Commands::Timer {
            focus,
            break_minutes,
        } => timer_settings(&app, focus, break_minutes),
    }
}

fn progress_bar(state: &LevelState) -> String {
    let filled = usize::from(state.percentage) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        state.percentage
    )
}

fn print_progress_line(progress: &CategoryProgress) {
    let state = &progress.state;
    let xp_label = if state.mastered {
        "MAX".to_string()
    } else {
        format!("{}/{} min", state.current_level_xp, state.level_max_xp)
    };
    println!(
        "{:<16} LV {:>2} {:<14} {:<10} {} {}",
        progress.category.name,
        state.level,
        state.title,
        state.rank_style.rank_name,
        progress_bar(state),
        xp_label
    );
}

async fn status(app: &AppState) -> Result<()> {
    let progress = app.tracker.category_progress().await?;
    if progress.is_empty() {
        println!("No categories yet. Add one with `pixel-pages add <name>`.");
        return Ok(());
    }

    for entry in &progress {
        print_progress_line(entry);
    }

    let total_minutes: u64 = progress.iter().map(|entry| entry.category.xp).sum();
    println!();
    println!(
        "Total: {}h {}m across {} categories",
        total_minutes / 60,
        total_minutes % 60,
        progress.len()
    );
    Ok(())
}

async fn show(app: &AppState, key: &str) -> Result<()> {
    let category = app.tracker.resolve_category(key).await?;
    let state = category.level_state(app.tracker.vocabulary());

    println!("{} ({})", category.name, category.id);
    println!("  Level:  {} - {}", state.level, state.title);
    println!("  Rank:   {} ({})", state.rank_style.rank_name, state.rank_style.color);
    println!("  Color:  {}", category.display_color());
    println!("  XP:     {} min total", category.xp);
    println!("  Bar:    {}", progress_bar(&state));
    Ok(())
}

fn print_outcome(outcome: &LogOutcome) {
    println!(
        "+{} min to {} -> LV {} {} {}",
        outcome.entry.minutes,
        outcome.category.name,
        outcome.after.level,
        outcome.after.title,
        progress_bar(&outcome.after)
    );
    if outcome.leveled_up() {
        println!(
            "LEVEL UP! {} -> {} ({})",
            outcome.before.level, outcome.after.level, outcome.after.rank_style.rank_name
        );
    }
    for unlock in &outcome.unlocked {
        println!(
            "Achievement unlocked: {} - {}",
            unlock.id.title(),
            unlock.id.description()
        );
    }
}

async fn history(app: &AppState, category: Option<String>, limit: u64) -> Result<()> {
    let category_id = match category {
        Some(key) => Some(app.tracker.resolve_category(&key).await?.id),
        None => None,
    };
    let categories = app.tracker.db().list_categories().await?;
    let entries = app
        .tracker
        .db()
        .list_xp_entries(category_id.as_deref(), limit)
        .await?;

    for entry in entries {
        let name = categories
            .iter()
            .find(|category| category.id == entry.category_id)
            .map(|category| category.name.as_str())
            .unwrap_or("(deleted)");
        println!(
            "{}  {:<16} +{:>4} min  {}",
            entry.logged_at.format("%Y-%m-%d %H:%M"),
            name,
            entry.minutes,
            entry.source.as_str()
        );
    }
    Ok(())
}

async fn run_timer(
    app: &AppState,
    mode: TimerMode,
    minutes: Option<u64>,
    category: Option<&str>,
) -> Result<()> {
    let mut events = app.tracker.events().subscribe();
    let started = app.timer.start(mode, minutes, category).await?;
    match mode {
        TimerMode::Stopwatch => println!("Stopwatch running. Press Ctrl+C to stop and log."),
        _ => println!(
            "{:?} for {} min. Press Ctrl+C to end early.",
            mode,
            started.target_ms / 60_000
        ),
    }

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl+C")?;
                log_warn!("Interrupted; ending the session early");
                match app.timer.interrupt().await? {
                    Some(result) => {
                        match result.outcome {
                            Some(outcome) => print_outcome(&outcome),
                            None => println!("Session ended; nothing to credit."),
                        }
                        return Ok(());
                    }
                    // Already expired; wait for the ticker to report its credit.
                    None => continue,
                }
            }
            event = events.recv() => match event {
                Ok(ProgressEvent::TimerHeartbeat { remaining_ms, state, .. })
                    if state.status == TimerStatus::Running =>
                {
                    let seconds = remaining_ms.max(0) / 1000;
                    println!("  {:02}:{:02}", seconds / 60, seconds % 60);
                }
                Ok(ProgressEvent::LevelUp { category_name, to_level, title, .. }) => {
                    println!("LEVEL UP! {category_name} is now LV {to_level} {title}");
                }
                Ok(ProgressEvent::AchievementUnlocked { achievement }) => {
                    println!("Achievement unlocked: {}", achievement.id.title());
                }
                Ok(ProgressEvent::SessionFinished { credited_minutes, .. }) => {
                    println!("Session complete: {credited_minutes} min credited.");
                    return Ok(());
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

async fn achievements(app: &AppState) -> Result<()> {
    for status in app.tracker.achievement_board().await? {
        let marker = match status.unlocked_at {
            Some(at) => format!("unlocked {}", at.format("%Y-%m-%d")),
            None => "locked".to_string(),
        };
        println!("{:<14} {:<40} {}", status.title, status.description, marker);
    }
    Ok(())
}

async fn import(app: &AppState, path: PathBuf) -> Result<()> {
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let records = registry::parse_snapshot(&json)?;
    let summary = app.tracker.db().import_snapshot(records).await?;
    let unlocked = app.tracker.sync_achievements().await?;

    println!(
        "Imported: {} created, {} updated, {} min added",
        summary.created, summary.updated, summary.xp_added
    );
    for unlock in unlocked {
        println!("Achievement unlocked: {}", unlock.id.title());
    }
    Ok(())
}

fn vocabulary(app: &AppState, value: Option<String>) -> Result<()> {
    let settings = app.tracker.settings();
    if let Some(value) = value {
        let vocabulary: TitleVocabulary = value.parse()?;
        settings.set_title_vocabulary(vocabulary)?;
    }
    let active = settings.title_vocabulary();
    println!("Title vocabulary: {}", active.as_str());
    println!(
        "Titled categories: {}",
        active.category_keys().collect::<Vec<_>>().join(", ")
    );
    Ok(())
}

fn timer_settings(app: &AppState, focus: Option<u64>, break_minutes: Option<u64>) -> Result<()> {
    let settings = app.tracker.settings();
    let current = settings.timer();
    if focus.is_some() || break_minutes.is_some() {
        settings.update_timer(TimerSettings {
            focus_minutes: focus.unwrap_or(current.focus_minutes),
            break_minutes: break_minutes.unwrap_or(current.break_minutes),
        })?;
    }
    let active = settings.timer();
    println!(
        "Focus: {} min, break: {} min",
        active.focus_minutes, active.break_minutes
    );
    Ok(())
}
