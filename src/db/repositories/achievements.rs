use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::params;

use crate::{
    achievements::AchievementId,
    db::{connection::Database, helpers::parse_datetime, models::UnlockedAchievement},
};

impl Database {
    /// Persist unlocks, returning only the ones that were not already stored.
    pub async fn record_unlocks(&self, ids: Vec<AchievementId>) -> Result<Vec<UnlockedAchievement>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.transaction(move |tx| {
            let now = Utc::now();
            let mut fresh = Vec::new();
            for id in ids {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO achievements (id, unlocked_at) VALUES (?1, ?2)",
                    params![id.as_str(), now.to_rfc3339()],
                )?;
                if inserted == 1 {
                    fresh.push(UnlockedAchievement {
                        id,
                        unlocked_at: now,
                    });
                }
            }
            Ok(fresh)
        })
        .await
    }

    /// All stored unlocks in the order they happened.
    pub async fn list_unlocked_achievements(&self) -> Result<Vec<UnlockedAchievement>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, unlocked_at FROM achievements ORDER BY unlocked_at ASC, rowid ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut unlocked = Vec::new();
            while let Some(row) = rows.next()? {
                let raw_id: String = row.get(0)?;
                let unlocked_at: String = row.get(1)?;
                let id = AchievementId::from_storage(&raw_id)
                    .ok_or_else(|| anyhow!("unknown achievement id {raw_id}"))?;
                unlocked.push(UnlockedAchievement {
                    id,
                    unlocked_at: parse_datetime(&unlocked_at, "unlocked_at")?,
                });
            }
            Ok(unlocked)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::{achievements::AchievementId, db::Database};

    #[tokio::test]
    async fn unlocks_are_recorded_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.sqlite3")).unwrap();

        let first = db
            .record_unlocks(vec![AchievementId::FirstBlood])
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = db
            .record_unlocks(vec![AchievementId::FirstBlood, AchievementId::MultiTasker])
            .await
            .unwrap();
        let ids: Vec<AchievementId> = second.iter().map(|unlock| unlock.id).collect();
        assert_eq!(ids, [AchievementId::MultiTasker]);

        let stored: Vec<AchievementId> = db
            .list_unlocked_achievements()
            .await
            .unwrap()
            .iter()
            .map(|unlock| unlock.id)
            .collect();
        assert_eq!(stored, [AchievementId::FirstBlood, AchievementId::MultiTasker]);
    }

    #[tokio::test]
    async fn unlocks_survive_reopening_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite3");
        {
            let db = Database::new(path.clone()).unwrap();
            db.record_unlocks(vec![AchievementId::GrindMaster])
                .await
                .unwrap();
        }

        let db = Database::new(path).unwrap();
        let again = db
            .record_unlocks(vec![AchievementId::GrindMaster])
            .await
            .unwrap();
        assert!(again.is_empty());
    }
}
