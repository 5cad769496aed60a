//! One-time milestones evaluated against the whole category registry.
//!
//! Predicates are re-checked after every XP change; the store keeps which
//! ones already fired so each unlock is reported exactly once.

use serde::{Serialize, Serializer};

use crate::{
    db::models::SkillCategory,
    progression::{current_level, MAX_LEVEL},
};

const MULTI_TASKER_CATEGORIES: usize = 3;
const GRIND_MASTER_HOURS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AchievementId {
    /// Any category has real progress.
    FirstBlood,
    /// Three or more categories have progress.
    MultiTasker,
    /// 100 hours logged across all categories.
    GrindMaster,
    /// Any category at the level cap.
    Perfectionist,
}

impl AchievementId {
    pub const ALL: [AchievementId; 4] = [
        AchievementId::FirstBlood,
        AchievementId::MultiTasker,
        AchievementId::GrindMaster,
        AchievementId::Perfectionist,
    ];

    /// Stable id used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstBlood => "first-blood",
            Self::MultiTasker => "multi-tasker",
            Self::GrindMaster => "grind-master",
            Self::Perfectionist => "perfectionist",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::FirstBlood => "FIRST BLOOD",
            Self::MultiTasker => "MULTI-TASKER",
            Self::GrindMaster => "GRIND MASTER",
            Self::Perfectionist => "PERFECTIONIST",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::FirstBlood => "Log focus time in any skill",
            Self::MultiTasker => "Make progress in 3 different skills",
            Self::GrindMaster => "Log 100 hours across all skills",
            Self::Perfectionist => "Max out a skill at level 10",
        }
    }

    pub fn from_storage(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == value)
    }

    /// Whether the milestone holds for the given registry snapshot.
    pub fn is_satisfied(&self, categories: &[SkillCategory]) -> bool {
        let active = || categories.iter().filter(|category| category.xp > 0);
        match self {
            Self::FirstBlood => active().next().is_some(),
            Self::MultiTasker => active().count() >= MULTI_TASKER_CATEGORIES,
            Self::GrindMaster => {
                let total_minutes: u64 = categories.iter().map(|category| category.xp).sum();
                total_minutes / 60 >= GRIND_MASTER_HOURS
            }
            Self::Perfectionist => categories
                .iter()
                .any(|category| current_level(category.xp) == MAX_LEVEL),
        }
    }
}

impl Serialize for AchievementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Every milestone the snapshot currently satisfies, in declaration order.
pub fn satisfied(categories: &[SkillCategory]) -> Vec<AchievementId> {
    AchievementId::ALL
        .into_iter()
        .filter(|id| id.is_satisfied(categories))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(name: &str, xp: u64) -> SkillCategory {
        let now = Utc::now();
        SkillCategory {
            id: name.to_lowercase(),
            name: name.into(),
            xp,
            color: "#00FFAA".into(),
            custom_color: None,
            icon_name: None,
            order_index: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn empty_registry_unlocks_nothing() {
        assert!(satisfied(&[]).is_empty());
        assert!(satisfied(&[category("Scholar", 0)]).is_empty());
    }

    #[test]
    fn first_progress_is_first_blood() {
        let categories = [category("Scholar", 1), category("Artisan", 0)];
        assert_eq!(satisfied(&categories), vec![AchievementId::FirstBlood]);
    }

    #[test]
    fn three_active_categories_is_multi_tasker() {
        let two = [category("Scholar", 5), category("Artisan", 5), category("Scribe", 0)];
        assert!(!AchievementId::MultiTasker.is_satisfied(&two));

        let three = [category("Scholar", 5), category("Artisan", 5), category("Scribe", 5)];
        assert!(AchievementId::MultiTasker.is_satisfied(&three));
    }

    #[test]
    fn hundred_hours_is_grind_master() {
        let short = [category("Scholar", 3000), category("Artisan", 2999)];
        assert!(!AchievementId::GrindMaster.is_satisfied(&short));

        let enough = [category("Scholar", 3000), category("Artisan", 3000)];
        assert!(AchievementId::GrindMaster.is_satisfied(&enough));
    }

    #[test]
    fn level_cap_is_perfectionist() {
        assert!(!AchievementId::Perfectionist.is_satisfied(&[category("Scholar", 2944)]));
        assert!(AchievementId::Perfectionist.is_satisfied(&[category("Scholar", 2945)]));
    }

    #[test]
    fn ids_round_trip_through_storage_strings() {
        for id in AchievementId::ALL {
            assert_eq!(AchievementId::from_storage(id.as_str()), Some(id));
        }
        assert_eq!(AchievementId::from_storage("speedrunner"), None);
    }
}
