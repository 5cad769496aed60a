pub mod achievements;
pub mod categories;
pub mod xp_entries;
