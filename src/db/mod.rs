mod connection;
mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::{CategoryInput, SkillCategory, UnlockedAchievement, XpEntry, XpSource};
pub use repositories::categories::{CategoryUpdate, CreditedMinutes, ImportSummary};
