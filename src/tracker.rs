use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use crate::{
    achievements::{self, AchievementId},
    db::{Database, SkillCategory, UnlockedAchievement, XpEntry, XpSource},
    events::{EventBus, ProgressEvent},
    progression::{LevelState, TitleVocabulary},
    settings::SettingsStore,
};

/// A category together with its derived progression.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProgress {
    pub category: SkillCategory,
    pub state: LevelState,
}

/// Result of crediting minutes to a category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogOutcome {
    pub category: SkillCategory,
    pub before: LevelState,
    pub after: LevelState,
    pub entry: XpEntry,
    pub unlocked: Vec<UnlockedAchievement>,
}

impl LogOutcome {
    pub fn leveled_up(&self) -> bool {
        self.after.level > self.before.level
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatus {
    pub id: AchievementId,
    pub title: &'static str,
    pub description: &'static str,
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Single place where XP changes: every credit goes through here so derived
/// levels, unlocks and subscriber notifications stay consistent.
#[derive(Clone)]
pub struct ProgressTracker {
    db: Database,
    settings: Arc<SettingsStore>,
    events: EventBus,
}

impl ProgressTracker {
    pub fn new(db: Database, settings: Arc<SettingsStore>, events: EventBus) -> Self {
        Self {
            db,
            settings,
            events,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn vocabulary(&self) -> TitleVocabulary {
        self.settings.title_vocabulary()
    }

    pub async fn category_progress(&self) -> Result<Vec<CategoryProgress>> {
        let vocabulary = self.vocabulary();
        let categories = self.db.list_categories().await?;
        Ok(categories
            .into_iter()
            .map(|category| CategoryProgress {
                state: category.level_state(vocabulary),
                category,
            })
            .collect())
    }

    /// Resolve a category by id or name.
    pub async fn resolve_category(&self, key: &str) -> Result<SkillCategory> {
        self.db
            .find_category(key)
            .await?
            .ok_or_else(|| anyhow!("No category matches '{key}'"))
    }

    pub async fn log_minutes(
        &self,
        category_key: &str,
        minutes: u64,
        source: XpSource,
    ) -> Result<LogOutcome> {
        let category = self.resolve_category(category_key).await?;
        let credited = self.db.credit_minutes(&category.id, minutes, source).await?;

        let vocabulary = self.vocabulary();
        let before = credited.before.level_state(vocabulary);
        let after = credited.after.level_state(vocabulary);

        self.events.emit(ProgressEvent::SessionLogged {
            category_id: credited.after.id.clone(),
            minutes,
            source,
            level_state: after.clone(),
        });

        if after.level > before.level {
            info!(
                "{} reached level {} ({})",
                credited.after.name, after.level, after.title
            );
            self.events.emit(ProgressEvent::LevelUp {
                category_id: credited.after.id.clone(),
                category_name: credited.after.name.clone(),
                from_level: before.level,
                to_level: after.level,
                title: after.title.clone(),
            });
        }

        let unlocked = self.sync_achievements().await?;

        Ok(LogOutcome {
            category: credited.after,
            before,
            after,
            entry: credited.entry,
            unlocked,
        })
    }

    /// Evaluate milestones against the current registry and persist any that
    /// newly hold. Returns only the fresh unlocks.
    pub async fn sync_achievements(&self) -> Result<Vec<UnlockedAchievement>> {
        let categories = self.db.list_categories().await?;
        let fresh = self
            .db
            .record_unlocks(achievements::satisfied(&categories))
            .await?;

        for unlock in &fresh {
            info!("Achievement unlocked: {}", unlock.id.title());
            self.events.emit(ProgressEvent::AchievementUnlocked {
                achievement: unlock.clone(),
            });
        }

        Ok(fresh)
    }

    pub async fn achievement_board(&self) -> Result<Vec<AchievementStatus>> {
        let unlocked = self.db.list_unlocked_achievements().await?;
        Ok(AchievementId::ALL
            .into_iter()
            .map(|id| AchievementStatus {
                id,
                title: id.title(),
                description: id.description(),
                unlocked_at: unlocked
                    .iter()
                    .find(|unlock| unlock.id == id)
                    .map(|unlock| unlock.unlocked_at),
            })
            .collect())
    }
}
