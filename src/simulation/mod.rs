pub mod config;
pub use config::SimConfig;

use crate::metrics::{Counters, MetricsCollector};
use crate::queue::{BattleQueue, LogQueue, WorkQueue};
use crate::render;
use crate::roster::{AgentView, Roster, RosterStats};
use crate::rules::RuleTable;
use crate::sink::{ConsoleSink, FanoutSink, FileSink, LogSink};
use crate::workers::{BattleWorker, LoggerWorker, MovementWorker, WorkerRole};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep_until, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimState {
    Created,
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub name: String,
    pub total: usize,
    pub deaths: usize,
    pub survivors: Vec<AgentView>,
    pub stats: RosterStats,
    pub counters: Counters,
    pub elapsed_secs: f64,
    /// Work still queued when the stop was signalled.
    pub backlog: Backlog,
    /// Workers that panicked or had to be aborted at shutdown.
    pub failed_workers: Vec<WorkerRole>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlog {
    pub battles: usize,
    pub events: usize,
}

impl SimulationReport {
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== GAME OVER ===");
        let _ = writeln!(out, "Final survivors:");
        for s in &self.survivors {
            let _ = writeln!(out, "  {} '{}' at ({}, {})", s.kind, s.name, s.x, s.y);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Total survivors: {} out of {}", self.survivors.len(), self.total);
        let _ = write!(
            out,
            "Battles: {} | Kills: {} | Failed attacks: {} | Stale: {}",
            self.counters.battles,
            self.counters.kills,
            self.counters.failed_attacks,
            self.counters.stale_engagements
        );
        out
    }
}

pub struct Simulation {
    config: SimConfig,
    rules: Arc<RuleTable>,
    roster: Arc<Roster>,
    battles: Arc<BattleQueue>,
    events: Arc<LogQueue>,
    extra_sinks: Vec<Box<dyn LogSink>>,
    cancel: CancellationToken,
    state: SimState,
    pub metrics: MetricsCollector,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            rules: Arc::new(RuleTable::global().clone()),
            roster: Arc::new(Roster::new()),
            battles: Arc::new(WorkQueue::new("battles")),
            events: Arc::new(WorkQueue::new("events")),
            extra_sinks: Vec::new(),
            cancel: CancellationToken::new(),
            state: SimState::Created,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    /// Runs with these agents instead of a random population.
    pub fn with_roster(mut self, roster: Roster) -> Self {
        self.roster = Arc::new(roster);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn LogSink>) -> Self {
        self.extra_sinks.push(sink);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn roster(&self) -> Arc<Roster> {
        self.roster.clone()
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    /// Cancelling the returned token ends the run early.
    pub fn stop_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&mut self) -> Result<SimulationReport> {
        if self.state != SimState::Created {
            anyhow::bail!("simulation '{}' has already been run", self.config.name);
        }

        self.config.validate().context("invalid simulation config")?;
        let dice = self.config.dice()?;

        if self.roster.is_empty() {
            let mut rng = self.rng(0);
            let roster = Roster::seeded(self.config.population, self.config.bounds(), &mut rng)
                .context("failed to seed roster")?;
            self.roster = Arc::new(roster);
        }

        let progress = self.progress_bar()?;
        let sink = self.build_sink(&progress)?;

        self.roster.seal();
        let total = self.roster.len();

        info!("Starting simulation: {}", self.config.name);
        info!("Map: {}x{}, Agents: {}", self.config.width, self.config.height, total);
        info!("Duration: {:?}", self.config.duration);

        // the queue is still open here, these can't fail
        let _ = self.events.push(format!("Game initialized with {} NPCs", total));
        let _ = self.events.push("Starting async game...".to_string());

        let started = Instant::now();
        self.state = SimState::Running;

        let movement = tokio::spawn(
            MovementWorker::new(
                self.roster.clone(),
                self.rules.clone(),
                self.battles.clone(),
                self.metrics.clone(),
                self.config.sleep_range(),
                self.rng(1),
            )
            .run(self.cancel.clone()),
        );
        let battle = tokio::spawn(
            BattleWorker::new(
                self.battles.clone(),
                self.events.clone(),
                self.metrics.clone(),
                dice,
                self.rng(2),
            )
            .run(),
        );
        let logger = tokio::spawn(
            LoggerWorker::new(
                self.events.clone(),
                sink,
                self.metrics.clone(),
                self.config.log_poll_interval,
            )
            .run(),
        );

        self.drive(started, &progress).await;

        self.state = SimState::Stopping;
        info!("Shutting down simulation..");
        self.cancel.cancel();
        self.battles.close();

        let backlog = Backlog {
            battles: self.battles.len(),
            events: self.events.len(),
        };
        if backlog != Backlog::default() {
            info!(
                "Draining {} engagements and {} events before exit",
                backlog.battles, backlog.events
            );
        }

        let mut failed = Vec::new();
        self.join(WorkerRole::Movement, movement, &mut failed).await;
        self.join(WorkerRole::Battle, battle, &mut failed).await;
        // closed only now so the battle worker's last reports still reach the sink
        self.events.close();
        self.join(WorkerRole::Logger, logger, &mut failed).await;

        self.state = SimState::Stopped;
        progress.finish_with_message("Simulation complete");

        let report = self.report(started.elapsed(), backlog, failed);
        info!(
            "{} of {} agents survived ({} kills)",
            report.survivors.len(),
            report.total,
            report.counters.kills
        );
        Ok(report)
    }

    async fn drive(&self, started: Instant, progress: &ProgressBar) {
        let deadline = sleep_until(tokio::time::Instant::from_std(started) + self.config.duration);
        tokio::pin!(deadline);

        let mut tick = interval(self.config.render_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Stop requested");
                    break;
                }
                _ = &mut deadline => break,
                _ = tick.tick() => self.project(started.elapsed(), progress),
            }
        }
    }

    /// Read-only view of the current state: metrics snapshot, progress and map.
    fn project(&self, elapsed: Duration, progress: &ProgressBar) {
        let views = self.roster.views();
        let stats = RosterStats::from_views(&views);
        let snapshot = self.metrics.save_snapshot(&stats);

        progress.set_position(elapsed.as_secs());
        progress.set_message(format!(
            "Alive: {}/{} | Kills: {}",
            snapshot.alive, snapshot.total, snapshot.kills
        ));

        if self.config.render_map {
            let frame = render::render_frame(
                &views,
                self.config.bounds(),
                self.config.map_display,
                elapsed.as_secs(),
            );
            if progress.is_hidden() {
                println!("{}\n", frame);
            } else {
                progress.println(frame);
            }
        }
    }

    async fn join(
        &self,
        role: WorkerRole,
        mut handle: JoinHandle<()>,
        failed: &mut Vec<WorkerRole>,
    ) {
        match timeout(self.config.shutdown_grace, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("{} worker crashed: {}", role, e);
                failed.push(role);
            }
            Err(_) => {
                warn!(
                    "{} worker did not stop within {:?}, aborting",
                    role, self.config.shutdown_grace
                );
                handle.abort();
                // wait for the abort to land so nothing is still writing when we count
                let _ = handle.await;
                failed.push(role);
            }
        }
    }

    fn report(
        &self,
        elapsed: Duration,
        backlog: Backlog,
        failed_workers: Vec<WorkerRole>,
    ) -> SimulationReport {
        let views = self.roster.views();
        let stats = RosterStats::from_views(&views);
        let survivors: Vec<AgentView> = views.into_iter().filter(|v| v.alive).collect();

        SimulationReport {
            name: self.config.name.clone(),
            total: stats.total,
            deaths: stats.total - stats.alive,
            survivors,
            stats,
            counters: self.metrics.counters(),
            elapsed_secs: elapsed.as_secs_f64(),
            backlog,
            failed_workers,
        }
    }

    fn build_sink(&mut self, progress: &ProgressBar) -> Result<Box<dyn LogSink>> {
        let mut fanout = FanoutSink::new();

        if self.config.console_events {
            fanout.push(Box::new(ConsoleSink::with_progress(progress.clone())));
        }
        if let Some(path) = &self.config.log_file {
            let file = FileSink::append(path)
                .with_context(|| format!("cannot open event log {}", path.display()))?;
            fanout.push(Box::new(file));
        }
        for sink in self.extra_sinks.drain(..) {
            fanout.push(sink);
        }

        Ok(Box::new(fanout))
    }

    fn progress_bar(&self) -> Result<ProgressBar> {
        if !self.config.show_progress {
            return Ok(ProgressBar::hidden());
        }

        let pb = ProgressBar::new(self.config.duration.as_secs());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.red/yellow} {pos}/{len}s {msg}")?
                .progress_chars("█▓░"),
        );
        Ok(pb)
    }

    // Each worker gets its own stream; with a seed set they're reproducible per stream
    fn rng(&self, stream: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn quick() -> SimConfig {
        SimConfig::headless()
            .with_duration(Duration::from_millis(300))
            .with_render_interval(Duration::from_millis(50))
            .with_sleep_range(1, 5)
            .with_seed(42)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn lifecycle_reaches_stopped() {
        let mut sim = Simulation::new(quick().with_population(30).with_map(30, 30));
        assert_eq!(sim.state(), SimState::Created);

        let report = sim.run().await.unwrap();
        assert_eq!(sim.state(), SimState::Stopped);
        assert_eq!(report.total, 30);
        assert_eq!(report.survivors.len() + report.deaths, 30);
        assert!(report.failed_workers.is_empty());
        assert!(!sim.metrics.get_snapshots().is_empty());
        assert!(sim.roster().is_sealed());

        assert!(sim.run().await.is_err());
    }

    #[tokio::test]
    async fn invalid_config_fails_before_start() {
        let mut sim = Simulation::new(quick().with_map(0, 0));
        assert!(sim.run().await.is_err());
        assert_eq!(sim.state(), SimState::Created);
        assert!(sim.roster().is_empty());
    }

    /// Blocks its thread before each of the first `stalls` messages.
    #[derive(Debug)]
    struct StallingSink {
        inner: MemorySink,
        stall: Duration,
        stalls: usize,
    }

    impl LogSink for StallingSink {
        fn emit(&mut self, message: &str) -> std::io::Result<()> {
            if self.stalls > 0 {
                self.stalls -= 1;
                std::thread::sleep(self.stall);
            }
            self.inner.emit(message)
        }
    }

    #[derive(Debug)]
    struct PanickingSink;

    impl LogSink for PanickingSink {
        fn emit(&mut self, _message: &str) -> std::io::Result<()> {
            panic!("sink blew up");
        }
    }

    fn pegasi(n: usize) -> Roster {
        use crate::agent::{Agent, AgentKind, Bounds};

        let bounds = Bounds::new(10, 10);
        Roster::from_agents((0..n).map(|i| {
            Agent::new(format!("Sky_{}", i), AgentKind::Pegasus, 5, 5, bounds).unwrap()
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn unopenable_log_file_fails_before_start() {
        let missing = std::env::temp_dir()
            .join(format!("npc-arena-missing-{}", std::process::id()))
            .join("events.log");
        let mut config = quick();
        config.log_file = Some(missing);
        let mut sim = Simulation::new(config);

        assert!(sim.run().await.is_err());
        assert_eq!(sim.state(), SimState::Created);
        assert_eq!(sim.metrics.counters().ticks, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn worker_past_its_grace_is_aborted_and_reported() {
        let mut config = quick().with_duration(Duration::from_millis(100));
        config.shutdown_grace = Duration::from_millis(50);
        let sink = StallingSink {
            inner: MemorySink::new(),
            stall: Duration::from_millis(400),
            stalls: usize::MAX,
        };
        let mut sim = Simulation::new(config)
            .with_roster(pegasi(5))
            .with_sink(Box::new(sink));

        let report = timeout(Duration::from_secs(10), sim.run()).await.unwrap().unwrap();
        assert_eq!(sim.state(), SimState::Stopped);
        assert_eq!(report.failed_workers, vec![WorkerRole::Logger]);
        assert_eq!(report.survivors.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn panicking_worker_is_reported_and_run_still_stops() {
        let mut sim = Simulation::new(quick())
            .with_roster(pegasi(5))
            .with_sink(Box::new(PanickingSink));

        let report = timeout(Duration::from_secs(10), sim.run()).await.unwrap().unwrap();
        assert_eq!(sim.state(), SimState::Stopped);
        assert_eq!(report.failed_workers, vec![WorkerRole::Logger]);
        assert_eq!(report.total, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn queued_events_are_delivered_after_stop() {
        let delivered = MemorySink::new();
        // the first message holds the logger past the stop, so the second is still queued
        let sink = StallingSink {
            inner: delivered.clone(),
            stall: Duration::from_millis(300),
            stalls: 1,
        };
        let mut sim = Simulation::new(quick().with_duration(Duration::from_millis(100)))
            .with_sink(Box::new(sink));

        let report = timeout(Duration::from_secs(10), sim.run()).await.unwrap().unwrap();
        assert!(report.backlog.events >= 1);
        assert!(report.failed_workers.is_empty());
        assert_eq!(delivered.len() as u64, 2 + report.counters.battles);
        let counters = report.counters;
        assert_eq!(
            counters.engagements_enqueued,
            counters.battles + counters.stale_engagements
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stop_handle_ends_the_run_early() {
        let sink = MemorySink::new();
        let mut sim = Simulation::new(quick().with_duration(Duration::from_secs(60)))
            .with_sink(Box::new(sink.clone()));
        let stop = sim.stop_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            stop.cancel();
        });

        let report = timeout(Duration::from_secs(10), sim.run()).await.unwrap().unwrap();
        assert!(report.elapsed_secs < 10.0);
        assert_eq!(sink.lines()[0], "Game initialized with 50 NPCs");
        assert_eq!(sink.lines()[1], "Starting async game...");
    }

    #[test]
    fn summary_lists_survivors() {
        let report = SimulationReport {
            name: "t".to_string(),
            total: 2,
            deaths: 1,
            survivors: vec![AgentView {
                name: "Orc_1".to_string(),
                kind: crate::agent::AgentKind::Orc,
                x: 4,
                y: 7,
                alive: true,
            }],
            stats: RosterStats::default(),
            counters: Counters::default(),
            elapsed_secs: 1.0,
            backlog: Backlog::default(),
            failed_workers: Vec::new(),
        };
        let text = report.summary();
        assert!(text.contains("  Orc 'Orc_1' at (4, 7)\n"));
        assert!(text.contains("Total survivors: 1 out of 2"));
    }
}
