use serde::{Deserialize, Serialize};

/// Minutes required to complete level 1.
pub const BASE_LEVEL_XP: u64 = 60;

/// Each level needs 40% more XP than the one before it.
pub const LEVEL_GROWTH: f64 = 1.4;

pub const MIN_LEVEL: u32 = 1;
pub const MAX_LEVEL: u32 = 10;

/// Minutes of practice needed to complete `level`.
///
/// Computed as `floor(60 * 1.4^(level - 1))` straight from the base for every
/// level. Compounding the previous floored value drifts from level 4 onwards
/// (163 instead of 164), so never derive one level from another.
///
/// Levels below 1 are clamped to level 1.
pub fn xp_required_for_level(level: u32) -> u64 {
    let level = level.max(MIN_LEVEL);
    let exponent = i32::try_from(level - 1).unwrap_or(i32::MAX);
    (BASE_LEVEL_XP as f64 * LEVEL_GROWTH.powi(exponent)).floor() as u64
}

/// Total XP spent on every level strictly below `level`.
pub fn xp_before_level(level: u32) -> u64 {
    (MIN_LEVEL..level.max(MIN_LEVEL))
        .map(xp_required_for_level)
        .sum()
}

/// Resolves cumulative XP into a level in `[1, 10]`.
///
/// XP that lands exactly on a cumulative threshold belongs to the next level.
pub fn current_level(total_xp: u64) -> u32 {
    let mut cumulative = 0u64;
    for level in MIN_LEVEL..=MAX_LEVEL {
        cumulative += xp_required_for_level(level);
        if total_xp < cumulative {
            return level;
        }
    }
    MAX_LEVEL
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub current: u64,
    pub max: u64,
    pub percentage: u8,
}

impl LevelProgress {
    /// Reported once a category reaches the level cap; reads as a full bar.
    pub const MASTERED: LevelProgress = LevelProgress {
        current: 100,
        max: 100,
        percentage: 100,
    };

    pub fn is_mastered(&self) -> bool {
        *self == Self::MASTERED
    }
}

/// XP gathered inside the current level and how far along the bar it is.
pub fn level_progress(total_xp: u64) -> LevelProgress {
    let level = current_level(total_xp);
    if level == MAX_LEVEL {
        return LevelProgress::MASTERED;
    }

    let current = total_xp - xp_before_level(level);
    let max = xp_required_for_level(level);
    // Same double-precision expression the web client renders with.
    let percentage = (current as f64 / max as f64 * 100.0).floor().clamp(0.0, 100.0) as u8;

    LevelProgress {
        current,
        max,
        percentage,
    }
}
