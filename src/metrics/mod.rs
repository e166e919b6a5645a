pub mod export;

use crate::agent::AgentKind;
use crate::roster::RosterStats;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: f64,
    pub alive: usize,
    pub total: usize,
    pub rogues: usize,
    pub orcs: usize,
    pub werewolves: usize,
    pub pegasi: usize,
    pub ticks: u64,
    pub battles: u64,
    pub kills: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub ticks: u64,
    pub engagements_enqueued: u64,
    pub battles: u64,
    pub kills: u64,
    pub failed_attacks: u64,
    pub stale_engagements: u64,
    pub events_emitted: u64,
    pub sink_errors: u64,
}

#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<RwLock<MetricsInner>>,
    start_time: Instant,
}

#[derive(Debug, Default)]
struct MetricsInner {
    counters: Counters,
    snapshots: Vec<MetricsSnapshot>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner::default())),
            start_time: Instant::now(),
        }
    }

    pub fn tick(&self) {
        self.inner.write().counters.ticks += 1;
    }

    pub fn engagements_enqueued(&self, n: usize) {
        self.inner.write().counters.engagements_enqueued += n as u64;
    }

    pub fn kill(&self) {
        let mut inner = self.inner.write();
        inner.counters.battles += 1;
        inner.counters.kills += 1;
    }

    pub fn failed_attack(&self) {
        let mut inner = self.inner.write();
        inner.counters.battles += 1;
        inner.counters.failed_attacks += 1;
    }

    pub fn stale_engagement(&self) {
        self.inner.write().counters.stale_engagements += 1;
    }

    pub fn event_emitted(&self) {
        self.inner.write().counters.events_emitted += 1;
    }

    pub fn sink_error(&self) {
        self.inner.write().counters.sink_errors += 1;
    }

    pub fn counters(&self) -> Counters {
        self.inner.read().counters.clone()
    }

    pub fn kills(&self) -> u64 {
        self.inner.read().counters.kills
    }

    pub fn snapshot(&self, stats: &RosterStats) -> MetricsSnapshot {
        let inner = self.inner.read();

        MetricsSnapshot {
            timestamp: self.start_time.elapsed().as_secs_f64(),
            alive: stats.alive,
            total: stats.total,
            rogues: stats.alive_of(AgentKind::Rogue),
            orcs: stats.alive_of(AgentKind::Orc),
            werewolves: stats.alive_of(AgentKind::Werewolf),
            pegasi: stats.alive_of(AgentKind::Pegasus),
            ticks: inner.counters.ticks,
            battles: inner.counters.battles,
            kills: inner.counters.kills,
        }
    }

    pub fn save_snapshot(&self, stats: &RosterStats) -> MetricsSnapshot {
        let snapshot = self.snapshot(stats);
        self.inner.write().snapshots.push(snapshot.clone());
        snapshot
    }

    pub fn get_snapshots(&self) -> Vec<MetricsSnapshot> {
        self.inner.read().snapshots.clone()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
