pub mod achievement;
pub mod category;
pub mod xp_entry;

pub use achievement::UnlockedAchievement;
pub use category::{CategoryInput, SkillCategory};
pub use xp_entry::{XpEntry, XpSource};
