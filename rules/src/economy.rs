//! Experience, levels and gold.
//!
//! All of the community's tunables live in [`EconomyRules`], which is passed
//! around explicitly so every calculation here can be checked without a
//! workbook.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Characters below this level start with no gold at all.
pub const STARTING_GOLD_LEVEL: u32 = 3;

/// Sessions a character is assumed to have played per level when back-filling
/// gold for a character created above the starting level.
pub const SESSIONS_PER_LEVEL: u64 = 4;

/// Number of configured tiers.
pub const TIER_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error("xp_per_level must be greater than zero")]
    ZeroXpPerLevel,
    #[error("starting_level must be at least 1")]
    ZeroStartingLevel,
    #[error("level {level} belongs to both tier {first} and tier {second}")]
    OverlappingTiers {
        level: u32,
        first: usize,
        second: usize,
    },
}

/// A band of levels sharing one per-session gold reward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub levels: BTreeSet<u32>,
    pub gold_per_game: u64,
}

impl Tier {
    pub fn new(levels: impl IntoIterator<Item = u32>, gold_per_game: u64) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            gold_per_game,
        }
    }
}

/// Process-wide economy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyRules {
    pub xp_per_level: u64,
    pub xp_per_game: u64,
    pub starting_level: u32,
    pub starting_gold: u64,
    pub tiers: [Tier; TIER_COUNT],
}

impl Default for EconomyRules {
    fn default() -> Self {
        Self {
            xp_per_level: 4,
            xp_per_game: 1,
            starting_level: 3,
            starting_gold: 200,
            tiers: [
                Tier::new(3..=4, 125),
                Tier::new(5..=8, 500),
                Tier::new(9..=12, 1500),
                Tier::new(13..=16, 3000),
                Tier::new(17..=20, 4500),
            ],
        }
    }
}

impl EconomyRules {
    /// Reject configurations the formulas below cannot honour.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.xp_per_level == 0 {
            return Err(RulesError::ZeroXpPerLevel);
        }
        if self.starting_level == 0 {
            return Err(RulesError::ZeroStartingLevel);
        }
        for (i, first) in self.tiers.iter().enumerate() {
            for (j, second) in self.tiers.iter().enumerate().skip(i + 1) {
                if let Some(level) = first.levels.intersection(&second.levels).next() {
                    return Err(RulesError::OverlappingTiers {
                        level: *level,
                        first: i + 1,
                        second: j + 1,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn level_from_xp(&self, xp: u64) -> u32 {
        let level = xp / self.xp_per_level.max(1) + 1;
        u32::try_from(level).unwrap_or(u32::MAX)
    }

    /// Experience a character minted at `level` starts with.
    pub fn xp_for_level(&self, level: u32) -> u64 {
        u64::from(level.saturating_sub(1)).saturating_mul(self.xp_per_level)
    }

    /// Gold awarded per session to a character of `level`; zero outside every tier.
    pub fn tier_rate(&self, level: u32) -> u64 {
        self.tiers
            .iter()
            .find(|tier| tier.levels.contains(&level))
            .map(|tier| tier.gold_per_game)
            .unwrap_or(0)
    }

    /// Gold a character created at `target_level` starts with.
    ///
    /// The base amount plus what the character would have earned playing
    /// [`SESSIONS_PER_LEVEL`] sessions at every level from
    /// [`STARTING_GOLD_LEVEL`] up to, but not including, `target_level`.
    pub fn starting_gold(&self, target_level: u32) -> u64 {
        if target_level < STARTING_GOLD_LEVEL {
            return 0;
        }
        (STARTING_GOLD_LEVEL..target_level).fold(self.starting_gold, |gold, level| {
            gold.saturating_add(SESSIONS_PER_LEVEL.saturating_mul(self.tier_rate(level)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_starting_gold_table() {
        let rules = EconomyRules::default();
        for (level, expected) in [(3, 200), (5, 1200), (9, 9200), (2, 0), (20, 135_200)] {
            assert_eq!(rules.starting_gold(level), expected, "level {level}");
        }
    }

    #[test]
    fn test_no_starting_gold_below_level_three() {
        let rules = EconomyRules::default();
        assert_eq!(rules.starting_gold(0), 0);
        assert_eq!(rules.starting_gold(1), 0);
        assert_eq!(rules.starting_gold(2), 0);
        assert_eq!(rules.starting_gold(3), rules.starting_gold);
    }

    #[test]
    fn test_level_from_xp() {
        let rules = EconomyRules::default();
        assert_eq!(rules.level_from_xp(0), 1);
        assert_eq!(rules.level_from_xp(3), 1);
        assert_eq!(rules.level_from_xp(4), 2);
        assert_eq!(rules.level_from_xp(8), 3);
    }

    #[test]
    fn test_tier_rate_outside_tiers_is_zero() {
        let rules = EconomyRules::default();
        assert_eq!(rules.tier_rate(1), 0);
        assert_eq!(rules.tier_rate(2), 0);
        assert_eq!(rules.tier_rate(4), 125);
        assert_eq!(rules.tier_rate(12), 1500);
        assert_eq!(rules.tier_rate(21), 0);
    }

    #[test]
    fn test_default_rules_are_valid() {
        assert_eq!(EconomyRules::default().validate(), Ok(()));
    }

    #[test]
    fn test_overlapping_tiers_rejected() {
        let mut rules = EconomyRules::default();
        rules.tiers[3] = Tier::new(12..=16, 3000);
        assert_eq!(
            rules.validate(),
            Err(RulesError::OverlappingTiers {
                level: 12,
                first: 3,
                second: 4,
            })
        );
    }

    #[test]
    fn test_zero_xp_per_level_rejected() {
        let rules = EconomyRules {
            xp_per_level: 0,
            ..EconomyRules::default()
        };
        assert_eq!(rules.validate(), Err(RulesError::ZeroXpPerLevel));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let rules: EconomyRules = toml::from_str("xp_per_game = 2\nstarting_gold = 50\n").unwrap();
        assert_eq!(rules.xp_per_game, 2);
        assert_eq!(rules.starting_gold, 50);
        assert_eq!(rules.xp_per_level, 4);
        assert_eq!(rules.tiers, EconomyRules::default().tiers);
    }

    #[test]
    fn test_tiers_from_toml() {
        let source = r#"
            [[tiers]]
            levels = [1, 2]
            gold_per_game = 10
            [[tiers]]
            levels = [3]
            gold_per_game = 20
            [[tiers]]
            levels = [4]
            gold_per_game = 30
            [[tiers]]
            levels = [5]
            gold_per_game = 40
            [[tiers]]
            levels = []
            gold_per_game = 0
        "#;
        let rules: EconomyRules = toml::from_str(source).unwrap();
        assert_eq!(rules.tier_rate(2), 10);
        assert_eq!(rules.tier_rate(6), 0);
        // 200 + 4 * 20 + 4 * 30
        assert_eq!(rules.starting_gold(5), 400);
    }

    proptest! {
        #[test]
        fn prop_level_round_trips_through_xp(level in 1u32..=1000) {
            let rules = EconomyRules::default();
            prop_assert_eq!(rules.level_from_xp(rules.xp_for_level(level)), level);
        }

        #[test]
        fn prop_starting_gold_is_monotonic(level in 3u32..200) {
            let rules = EconomyRules::default();
            prop_assert!(rules.starting_gold(level + 1) >= rules.starting_gold(level));
        }

        #[test]
        fn prop_xp_just_below_next_level_stays(level in 1u32..1000) {
            let rules = EconomyRules::default();
            let xp = rules.xp_for_level(level + 1) - 1;
            prop_assert_eq!(rules.level_from_xp(xp), level);
        }
    }
}
