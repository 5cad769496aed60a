//! Skill category data models.
//!
//! A category is one branch of the skill tree. Its `xp` is the total minutes
//! of focus time credited to it and only ever grows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progression::{LevelState, TitleVocabulary};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkillCategory {
    pub id: String,
    pub name: String,
    pub xp: u64,
    pub color: String,
    pub custom_color: Option<String>,
    pub icon_name: Option<String>,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SkillCategory {
    pub fn level_state(&self, vocabulary: TitleVocabulary) -> LevelState {
        LevelState::compute(vocabulary, &self.name, self.xp)
    }

    /// The color a view should paint with; a user override wins.
    pub fn display_color(&self) -> &str {
        self.custom_color.as_deref().unwrap_or(&self.color)
    }
}

/// Input data for creating a category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    pub color: String,
    pub icon_name: Option<String>,
}

/// Validation functions for category data
pub mod validation {
    use anyhow::{bail, Result};

    const MAX_NAME_LENGTH: usize = 40;

    pub fn validate_color(color: &str) -> Result<()> {
        if !color.starts_with('#') {
            bail!("Invalid color format. Must be hex (#RRGGBB)");
        }

        let hex_part = &color[1..];
        if hex_part.len() != 6 && hex_part.len() != 8 {
            bail!("Invalid color format. Must be hex (#RRGGBB or #RRGGBBAA)");
        }

        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("Invalid color format. Must be hex (#RRGGBB)");
        }

        Ok(())
    }

    pub fn validate_name(name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("Category name cannot be empty");
        }
        if trimmed.chars().count() > MAX_NAME_LENGTH {
            bail!("Category name too long (max {MAX_NAME_LENGTH} chars)");
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn accepts_rgb_and_rgba_hex() {
            assert!(validate_color("#00FFAA").is_ok());
            assert!(validate_color("#00ffaa80").is_ok());
        }

        #[test]
        fn rejects_malformed_colors() {
            assert!(validate_color("00FFAA").is_err());
            assert!(validate_color("#00FF").is_err());
            assert!(validate_color("#GGGGGG").is_err());
        }

        #[test]
        fn rejects_blank_and_long_names() {
            assert!(validate_name("   ").is_err());
            assert!(validate_name(&"x".repeat(41)).is_err());
            assert!(validate_name("Scholar").is_ok());
        }
    }
}
