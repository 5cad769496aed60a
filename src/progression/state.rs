use serde::Serialize;

use super::{
    rank::{rank_style, RankStyle},
    titles::{level_title, TitleVocabulary},
    xp::{current_level, level_progress},
};

/// Everything a view needs to render one category's progression.
///
/// Derived from `(xp, name, vocabulary)` on every read and never stored.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelState {
    pub level: u32,
    pub current_level_xp: u64,
    pub level_max_xp: u64,
    pub percentage: u8,
    /// At the level cap; the XP fields then hold the full-bar sentinel.
    pub mastered: bool,
    pub title: String,
    pub rank_style: RankStyle,
}

impl LevelState {
    pub fn compute(vocabulary: TitleVocabulary, category_name: &str, total_xp: u64) -> Self {
        let level = current_level(total_xp);
        let progress = level_progress(total_xp);

        Self {
            level,
            current_level_xp: progress.current,
            level_max_xp: progress.max,
            percentage: progress.percentage,
            mastered: progress.is_mastered(),
            title: level_title(vocabulary, category_name, level),
            rank_style: rank_style(level),
        }
    }
}
