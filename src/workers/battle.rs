use crate::metrics::MetricsCollector;
use crate::queue::{BattleQueue, Engagement, LogQueue};
use crate::rules::Dice;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    /// One side was already dead when the engagement came up.
    Stale,
    Kill { attack: u32, defense: u32 },
    Repelled { attack: u32, defense: u32 },
}

pub struct BattleWorker {
    battles: Arc<BattleQueue>,
    events: Arc<LogQueue>,
    metrics: MetricsCollector,
    dice: Dice,
    rng: StdRng,
}

impl BattleWorker {
    pub fn new(
        battles: Arc<BattleQueue>,
        events: Arc<LogQueue>,
        metrics: MetricsCollector,
        dice: Dice,
        rng: StdRng,
    ) -> Self {
        Self {
            battles,
            events,
            metrics,
            dice,
            rng,
        }
    }

    pub async fn run(mut self) {
        info!("Battle worker started");
        let mut resolved = 0u64;

        while let Some(engagement) = self.battles.pop().await {
            if self.resolve(engagement) != BattleOutcome::Stale {
                resolved += 1;
            }
        }

        info!("Battle worker stopped after {} battles", resolved);
    }

    pub fn resolve(&mut self, engagement: Engagement) -> BattleOutcome {
        if engagement.is_stale() {
            self.metrics.stale_engagement();
            return BattleOutcome::Stale;
        }

        let attack = self.dice.roll(&mut self.rng);
        let defense = self.dice.roll(&mut self.rng);
        let Engagement { attacker, defender } = engagement;

        // ties go to the defender
        let outcome = if attack > defense {
            if !defender.die() {
                self.metrics.stale_engagement();
                return BattleOutcome::Stale;
            }
            self.metrics.kill();
            BattleOutcome::Kill { attack, defense }
        } else {
            self.metrics.failed_attack();
            BattleOutcome::Repelled { attack, defense }
        };

        let verb = match outcome {
            BattleOutcome::Kill { .. } => "killed",
            _ => "failed to kill",
        };
        let message = format!(
            "{} {} {} {} {} ({} vs {})",
            attacker.kind(),
            attacker.name(),
            verb,
            defender.kind(),
            defender.name(),
            attack,
            defense
        );
        debug!("{}", message);

        if self.events.push(message).is_err() {
            warn!("Event queue closed, dropped battle report for {}", defender.name());
        }
        outcome
    }
}
