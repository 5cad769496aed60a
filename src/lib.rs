pub mod achievements;
mod cli;
pub mod db;
pub mod events;
pub mod progression;
pub mod registry;
pub mod settings;
pub mod timer;
pub mod tracker;
mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use db::Database;
use events::EventBus;
use log::info;
use settings::SettingsStore;
use timer::TimerController;
use tracker::ProgressTracker;

pub use cli::run_cli;

/// Everything a front end needs, opened from one data directory.
pub struct AppState {
    pub tracker: ProgressTracker,
    pub timer: TimerController,
}

impl AppState {
    pub async fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let database = Database::new(data_dir.join("pixel-pages.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;

        let seeded = database
            .seed_default_categories(settings.title_vocabulary())
            .await?;
        if seeded > 0 {
            info!("Seeded {seeded} default categories");
        }

        let tracker = ProgressTracker::new(database, Arc::new(settings), EventBus::new());

        // Unlocks earned while the store was edited elsewhere (e.g. imports).
        tracker.sync_achievements().await?;

        let timer = TimerController::new(tracker.clone());
        Ok(Self { tracker, timer })
    }
}

pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    run_cli().await
}
