use crate::agent::Agent;
use crate::metrics::MetricsCollector;
use crate::queue::{BattleQueue, Engagement};
use crate::roster::Roster;
use crate::rules::RuleTable;
use rand::Rng;
use rand::rngs::StdRng;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct MovementWorker {
    roster: Arc<Roster>,
    rules: Arc<RuleTable>,
    battles: Arc<BattleQueue>,
    metrics: MetricsCollector,
    pause_ms: RangeInclusive<u64>,
    rng: StdRng,
}

impl MovementWorker {
    pub fn new(
        roster: Arc<Roster>,
        rules: Arc<RuleTable>,
        battles: Arc<BattleQueue>,
        metrics: MetricsCollector,
        pause_ms: RangeInclusive<u64>,
        rng: StdRng,
    ) -> Self {
        Self {
            roster,
            rules,
            battles,
            metrics,
            pause_ms,
            rng,
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Movement worker started");
        let mut ticks = 0u64;

        loop {
            let pause = Duration::from_millis(self.rng.gen_range(self.pause_ms.clone()));
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }

            let enqueued = self.tick();
            ticks += 1;
            if enqueued > 0 {
                debug!("Tick {} found {} engagements", ticks, enqueued);
            }
        }

        info!("Movement worker stopped after {} ticks", ticks);
    }

    /// Moves every living agent once, then queues each lethal pairing it finds.
    /// Returns how many engagements were queued.
    pub fn tick(&mut self) -> usize {
        let agents = self.roster.snapshot();
        let mut enqueued = 0;

        for mover in &agents {
            if !mover.is_alive() {
                continue;
            }
            let Some(rule) = self.rules.rule(mover.kind()) else {
                continue;
            };

            self.step(mover, rule.move_distance);

            let (queued, open) = self.scan(mover, &agents, rule.kill_distance);
            enqueued += queued;
            if !open {
                // battle queue closed, the run is winding down
                debug!("Battle queue closed mid-tick, abandoning scan");
                break;
            }
        }

        self.metrics.tick();
        self.metrics.engagements_enqueued(enqueued);
        enqueued
    }

    fn step(&mut self, mover: &Agent, distance: i32) {
        let dx = self.rng.gen_range(-1..=1);
        let dy = self.rng.gen_range(-1..=1);
        let pos = mover.position();
        let (x, y) = mover
            .bounds()
            .clamp(pos.x.saturating_add(dx * distance), pos.y.saturating_add(dy * distance));

        if !mover.set_position(x, y) {
            warn!("{} '{}' refused move to ({}, {})", mover.kind(), mover.name(), x, y);
        }
    }

    /// Queues every pairing `mover` is allowed to attack. Returns how many were
    /// queued and whether the battle queue is still accepting work.
    fn scan(&self, mover: &Arc<Agent>, agents: &[Arc<Agent>], kill_distance: i32) -> (usize, bool) {
        let reach = f64::from(kill_distance);
        let mut found = 0;

        for other in agents {
            if Arc::ptr_eq(mover, other) || !other.is_alive() {
                continue;
            }
            if mover.distance_to(other) > reach {
                continue;
            }
            if !self.rules.can_kill(mover.kind(), other.kind()) {
                continue;
            }

            if self.battles.push(Engagement::new(mover.clone(), other.clone())).is_err() {
                return (found, false);
            }
            found += 1;
        }

        (found, true)
    }
}
