//! XP and leveling rules shared by every view of a skill category.
//!
//! Categories gather XP as minutes of logged focus time. Levels run from 1 to
//! 10 with exponentially growing requirements; titles and rank styles are pure
//! lookups on the resolved level.

pub mod rank;
pub mod state;
pub mod titles;
pub mod xp;

pub use rank::{rank_style, RankStyle};
pub use state::LevelState;
pub use titles::{level_title, TitleVocabulary};
pub use xp::{
    current_level, level_progress, xp_before_level, xp_required_for_level, LevelProgress,
    MAX_LEVEL, MIN_LEVEL,
};
