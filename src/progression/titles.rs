use serde::{Deserialize, Serialize};

use super::xp::MAX_LEVEL;

/// Which flavor-title table a deployment renders.
///
/// The two tables describe the same XP data with different category names and
/// are never consulted together.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TitleVocabulary {
    /// Nine skill branches: scholar, profession, artisan, ...
    #[default]
    Branches,
    /// Five broad categories: study, work, creative, code, personal.
    Classic,
}

type TitleTable = &'static [(&'static str, [&'static str; MAX_LEVEL as usize])];

const BRANCH_TITLES: TitleTable = &[
    (
        "scholar",
        [
            "STUDENT", "APPRENTICE", "RESEARCHER", "ANALYST", "SCHOLAR", "EXPERT",
            "PROFESSOR", "LUMINARY", "SAGE", "GRAND SAGE",
        ],
    ),
    (
        "profession",
        [
            "INTERN", "ASSOCIATE", "SPECIALIST", "PROFESSIONAL", "SENIOR", "LEAD",
            "MANAGER", "DIRECTOR", "EXECUTIVE", "TYCOON",
        ],
    ),
    (
        "artisan",
        [
            "DABBLER", "HOBBYIST", "CRAFTER", "ARTISAN", "DESIGNER", "CREATOR",
            "VIRTUOSO", "MAESTRO", "VISIONARY", "LEGEND",
        ],
    ),
    (
        "scribe",
        [
            "NOTE TAKER", "WRITER", "JOURNALIST", "AUTHOR", "STORYTELLER", "NOVELIST",
            "WORDSMITH", "LAUREATE", "BARD", "GRAND SCRIBE",
        ],
    ),
    (
        "programming",
        [
            "NOOB", "CODER", "PROGRAMMER", "DEVELOPER", "ENGINEER", "SENIOR DEV",
            "ARCHITECT", "WIZARD", "NINJA", "HACKER",
        ],
    ),
    (
        "literacy",
        [
            "READER", "BOOKWORM", "BIBLIOPHILE", "CRITIC", "LITERATUS", "ERUDITE",
            "POLYMATH", "LOREKEEPER", "ARCHIVIST", "ORACLE",
        ],
    ),
    (
        "strategist",
        [
            "PLANNER", "ORGANIZER", "TACTICIAN", "COORDINATOR", "STRATEGIST", "COMMANDER",
            "GENERAL", "MASTERMIND", "GRANDMASTER", "OVERLORD",
        ],
    ),
    (
        "mindfulness",
        [
            "SEEKER", "NOVICE", "PRACTITIONER", "MEDITATOR", "CENTERED", "BALANCED",
            "SERENE", "ENLIGHTENED", "ASCENDED", "ZEN MASTER",
        ],
    ),
    (
        "knowledge",
        [
            "CURIOUS", "LEARNER", "INQUIRER", "THINKER", "INTELLECTUAL", "SAVANT",
            "PHILOSOPHER", "GENIUS", "PRODIGY", "OMNISCIENT",
        ],
    ),
];

const CLASSIC_TITLES: TitleTable = &[
    (
        "study",
        [
            "ROOKIE", "STUDENT", "LEARNER", "SCHOLAR", "ACADEMIC", "EXPERT", "PROFESSOR",
            "GENIUS", "MASTERMIND", "SAGE",
        ],
    ),
    (
        "work",
        [
            "TRAINEE", "WORKER", "PROFESSIONAL", "SPECIALIST", "EXPERT", "VETERAN",
            "MANAGER", "DIRECTOR", "EXECUTIVE", "TITAN",
        ],
    ),
    (
        "creative",
        [
            "DOODLER", "SKETCHER", "ARTIST", "CREATOR", "DESIGNER", "INNOVATOR",
            "VIRTUOSO", "MAESTRO", "VISIONARY", "LEGEND",
        ],
    ),
    (
        "code",
        [
            "NOOB", "SCRIPT KIDDIE", "CODER", "DEVELOPER", "ENGINEER", "SENIOR DEV",
            "ARCHITECT", "WIZARD", "NINJA", "HACKER",
        ],
    ),
    (
        "personal",
        [
            "BEGINNER", "EXPLORER", "ACHIEVER", "GROWER", "FOCUSED", "DISCIPLINED",
            "BALANCED", "MASTER", "ENLIGHTENED", "TRANSCENDENT",
        ],
    ),
];

impl TitleVocabulary {
    fn table(self) -> TitleTable {
        match self {
            TitleVocabulary::Branches => BRANCH_TITLES,
            TitleVocabulary::Classic => CLASSIC_TITLES,
        }
    }

    /// Category keys known to this vocabulary, in display order.
    pub fn category_keys(self) -> impl Iterator<Item = &'static str> {
        self.table().iter().map(|(key, _)| *key)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TitleVocabulary::Branches => "branches",
            TitleVocabulary::Classic => "classic",
        }
    }
}

impl std::str::FromStr for TitleVocabulary {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "branches" => Ok(TitleVocabulary::Branches),
            "classic" => Ok(TitleVocabulary::Classic),
            other => Err(anyhow::anyhow!(
                "unknown title vocabulary '{other}' (expected 'branches' or 'classic')"
            )),
        }
    }
}

/// Flavor title for `category_name` at `level`, or `LEVEL {level}` when the
/// vocabulary has no entry for the name or the level is out of range.
pub fn level_title(vocabulary: TitleVocabulary, category_name: &str, level: u32) -> String {
    let key = category_name.trim().to_lowercase();
    vocabulary
        .table()
        .iter()
        .find(|(name, _)| *name == key)
        .and_then(|(_, titles)| {
            let index = usize::try_from(level.checked_sub(1)?).ok()?;
            titles.get(index)
        })
        .map(|title| (*title).to_string())
        .unwrap_or_else(|| format!("LEVEL {level}"))
}
