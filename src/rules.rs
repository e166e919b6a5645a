use crate::agent::AgentKind;
use crate::error::{ArenaError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rule {
    pub move_distance: i32,
    pub kill_distance: i32,
}

impl Rule {
    pub const fn new(move_distance: i32, kill_distance: i32) -> Self {
        Self { move_distance, kill_distance }
    }
}

/// Movement and combat rules, read by every worker without locking.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<AgentKind, Rule>,
    matchups: HashSet<(AgentKind, AgentKind)>,
}

impl RuleTable {
    /// A table with no rules at all. Every kind is "unknown" to it.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        Self::empty()
            .with_rule(AgentKind::Rogue, Rule::new(10, 10))
            .with_rule(AgentKind::Orc, Rule::new(20, 10))
            .with_rule(AgentKind::Werewolf, Rule::new(40, 5))
            .with_rule(AgentKind::Pegasus, Rule::new(30, 10))
            .with_matchup(AgentKind::Rogue, AgentKind::Werewolf)
            .with_matchup(AgentKind::Werewolf, AgentKind::Rogue)
            .with_matchup(AgentKind::Orc, AgentKind::Rogue)
    }

    pub fn global() -> &'static RuleTable {
        use std::sync::OnceLock;
        static RULES: OnceLock<RuleTable> = OnceLock::new();
        RULES.get_or_init(RuleTable::standard)
    }

    pub fn with_rule(mut self, kind: AgentKind, rule: Rule) -> Self {
        self.rules.insert(kind, rule);
        self
    }

    pub fn with_matchup(mut self, attacker: AgentKind, defender: AgentKind) -> Self {
        self.matchups.insert((attacker, defender));
        self
    }

    pub fn rule(&self, kind: AgentKind) -> Option<Rule> {
        self.rules.get(&kind).copied()
    }

    /// Lookup by raw type tag; tags that don't name a kind get the zero rule.
    pub fn rule_for_tag(&self, tag: &str) -> Rule {
        tag.parse::<AgentKind>()
            .ok()
            .and_then(|kind| self.rule(kind))
            .unwrap_or_default()
    }

    pub fn move_distance(&self, kind: AgentKind) -> i32 {
        self.rule(kind).map(|r| r.move_distance).unwrap_or(0)
    }

    pub fn kill_distance(&self, kind: AgentKind) -> i32 {
        self.rule(kind).map(|r| r.kill_distance).unwrap_or(0)
    }

    /// False whenever either side is a kind this table has no rule for.
    pub fn can_kill(&self, attacker: AgentKind, defender: AgentKind) -> bool {
        self.rules.contains_key(&attacker)
            && self.rules.contains_key(&defender)
            && self.matchups.contains(&(attacker, defender))
    }

    pub fn kinds(&self) -> Vec<AgentKind> {
        let mut kinds: Vec<AgentKind> = self.rules.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dice {
    pub min: u32,
    pub max: u32,
}

impl Dice {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min == 0 || min > max {
            return Err(ArenaError::InvalidConfig(format!(
                "dice range {}..={} must start at 1 or above and not be inverted",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn d6() -> Self {
        Self { min: 1, max: 6 }
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min..=self.max)
    }
}

impl Default for Dice {
    fn default() -> Self {
        Self::d6()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn standard_distances() {
        let rules = RuleTable::standard();
        let expected = [
            (AgentKind::Rogue, 10, 10),
            (AgentKind::Orc, 20, 10),
            (AgentKind::Werewolf, 40, 5),
            (AgentKind::Pegasus, 30, 10),
        ];
        for (kind, mv, kill) in expected {
            assert_eq!(rules.move_distance(kind), mv, "{kind} move");
            assert_eq!(rules.kill_distance(kind), kill, "{kind} kill");
        }
    }

    #[test]
    fn unknown_kinds_get_zero_rule() {
        let rules = RuleTable::standard();
        assert_eq!(rules.rule_for_tag("Dragon"), Rule::new(0, 0));
        assert_eq!(rules.rule_for_tag("Orc"), Rule::new(20, 10));

        let empty = RuleTable::empty();
        assert_eq!(empty.move_distance(AgentKind::Rogue), 0);
        assert_eq!(empty.kill_distance(AgentKind::Rogue), 0);
        assert!(empty.rule(AgentKind::Rogue).is_none());
    }

    #[test]
    fn matchup_matrix_is_exact() {
        let rules = RuleTable::standard();
        let killers = [
            (AgentKind::Rogue, AgentKind::Werewolf),
            (AgentKind::Werewolf, AgentKind::Rogue),
            (AgentKind::Orc, AgentKind::Rogue),
        ];
        for attacker in AgentKind::ALL {
            for defender in AgentKind::ALL {
                let expected = killers.contains(&(attacker, defender));
                assert_eq!(
                    rules.can_kill(attacker, defender),
                    expected,
                    "{attacker} vs {defender}"
                );
            }
        }
    }

    #[test]
    fn kinds_without_a_rule_are_never_matched() {
        let rules = RuleTable::empty()
            .with_rule(AgentKind::Rogue, Rule::new(10, 10))
            .with_matchup(AgentKind::Rogue, AgentKind::Werewolf)
            .with_matchup(AgentKind::Orc, AgentKind::Rogue);

        assert!(rules.rule(AgentKind::Werewolf).is_none());
        assert!(!rules.can_kill(AgentKind::Rogue, AgentKind::Werewolf));
        assert!(!rules.can_kill(AgentKind::Orc, AgentKind::Rogue));

        let rules = rules.with_rule(AgentKind::Werewolf, Rule::new(40, 5));
        assert!(rules.can_kill(AgentKind::Rogue, AgentKind::Werewolf));
    }

    #[test]
    fn d6_stays_in_range() {
        let dice = Dice::d6();
        let mut rng = StdRng::seed_from_u64(7);
        let out_of_range = (0..1000)
            .map(|_| dice.roll(&mut rng))
            .filter(|roll| !(1..=6).contains(roll))
            .count();
        assert_eq!(out_of_range, 0);
    }

    #[test]
    fn dice_rejects_bad_ranges() {
        assert!(Dice::new(0, 6).is_err());
        assert!(Dice::new(5, 2).is_err());
        assert!(Dice::new(3, 3).is_ok());
    }

    proptest! {
        #[test]
        fn any_dice_rolls_inside_its_range(
            min in 1u32..50,
            span in 0u32..50,
            seed in any::<u64>(),
        ) {
            let dice = Dice::new(min, min + span).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..32 {
                let roll = dice.roll(&mut rng);
                prop_assert!(roll >= dice.min && roll <= dice.max);
            }
        }
    }
}
