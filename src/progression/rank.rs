use serde::Serialize;

/// Cosmetic tier shared by every category at a given level.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RankStyle {
    pub color: &'static str,
    pub glow_color: &'static str,
    pub rank_name: &'static str,
}

const LEGENDARY: RankStyle = RankStyle {
    color: "#FFD700",
    glow_color: "#FFD70080",
    rank_name: "LEGENDARY",
};

const EPIC: RankStyle = RankStyle {
    color: "#FF4D4D",
    glow_color: "#FF4D4D80",
    rank_name: "EPIC",
};

const RARE: RankStyle = RankStyle {
    color: "#A335EE",
    glow_color: "#A335EE80",
    rank_name: "RARE",
};

const UNCOMMON: RankStyle = RankStyle {
    color: "#1EFF00",
    glow_color: "#1EFF0080",
    rank_name: "UNCOMMON",
};

const COMMON: RankStyle = RankStyle {
    color: "#9D9D9D",
    glow_color: "#9D9D9D80",
    rank_name: "COMMON",
};

pub fn rank_style(level: u32) -> RankStyle {
    if level >= 10 {
        LEGENDARY
    } else if level >= 8 {
        EPIC
    } else if level >= 6 {
        RARE
    } else if level >= 4 {
        UNCOMMON
    } else {
        COMMON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_level_thresholds() {
        let names: Vec<&str> = (1..=10).map(|level| rank_style(level).rank_name).collect();
        assert_eq!(
            names,
            [
                "COMMON", "COMMON", "COMMON", "UNCOMMON", "UNCOMMON", "RARE", "RARE", "EPIC",
                "EPIC", "LEGENDARY"
            ]
        );
    }

    #[test]
    fn named_levels() {
        assert_eq!(rank_style(10).rank_name, "LEGENDARY");
        assert_eq!(rank_style(1).rank_name, "COMMON");
        assert_eq!(rank_style(7).rank_name, "RARE");
        assert_eq!(rank_style(0).rank_name, "COMMON");
    }

    #[test]
    fn glow_is_translucent_variant_of_color() {
        for level in 1..=10 {
            let style = rank_style(level);
            assert!(style.glow_color.starts_with(style.color));
            assert_eq!(style.glow_color.len(), style.color.len() + 2);
        }
    }
}
