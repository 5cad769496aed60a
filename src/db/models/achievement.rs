use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::achievements::AchievementId;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievement {
    pub id: AchievementId,
    pub unlocked_at: DateTime<Utc>,
}
