use crate::agent::{Agent, AgentKind, Bounds};
use crate::error::{ArenaError, Result};
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Shared set of agents. The collection lock only guards membership, agent
/// fields synchronize themselves.
#[derive(Debug, Default)]
pub struct Roster {
    inner: RwLock<RosterInner>,
}

#[derive(Debug, Default)]
struct RosterInner {
    agents: Vec<Arc<Agent>>,
    names: HashSet<String>,
    sealed: bool,
}

/// Point-in-time copy of one agent, for rendering and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentView {
    pub name: String,
    pub kind: AgentKind,
    pub x: i32,
    pub y: i32,
    pub alive: bool,
}

impl From<&Agent> for AgentView {
    fn from(agent: &Agent) -> Self {
        let pos = agent.position();
        Self {
            name: agent.name().to_string(),
            kind: agent.kind(),
            x: pos.x,
            y: pos.y,
            alive: agent.is_alive(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterStats {
    pub alive: usize,
    pub total: usize,
    pub by_kind: BTreeMap<AgentKind, usize>,
}

impl RosterStats {
    pub fn from_views(views: &[AgentView]) -> Self {
        let mut by_kind: BTreeMap<AgentKind, usize> =
            AgentKind::ALL.iter().map(|k| (*k, 0)).collect();
        let mut alive = 0;

        for view in views.iter().filter(|v| v.alive) {
            alive += 1;
            *by_kind.entry(view.kind).or_default() += 1;
        }

        Self {
            alive,
            total: views.len(),
            by_kind,
        }
    }

    pub fn alive_of(&self, kind: AgentKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Random population, named `<Kind>_<index>`.
    pub fn seeded<R: Rng + ?Sized>(population: usize, bounds: Bounds, rng: &mut R) -> Result<Self> {
        if bounds.width <= 0 || bounds.height <= 0 {
            return Err(ArenaError::InvalidConfig(format!(
                "cannot seed a {}x{} map",
                bounds.width, bounds.height
            )));
        }

        let roster = Self::new();
        for i in 0..population {
            let kind = AgentKind::ALL[rng.gen_range(0..AgentKind::ALL.len())];
            let x = rng.gen_range(0..bounds.width);
            let y = rng.gen_range(0..bounds.height);
            roster.insert(Agent::new(format!("{}_{}", kind, i), kind, x, y, bounds)?)?;
        }
        Ok(roster)
    }

    pub fn from_agents(agents: impl IntoIterator<Item = Agent>) -> Result<Self> {
        let roster = Self::new();
        for agent in agents {
            roster.insert(agent)?;
        }
        Ok(roster)
    }

    pub fn insert(&self, agent: Agent) -> Result<Arc<Agent>> {
        let mut inner = self.inner.write();
        if inner.sealed {
            return Err(ArenaError::RosterSealed);
        }
        if !inner.names.insert(agent.name().to_string()) {
            return Err(ArenaError::DuplicateName(agent.name().to_string()));
        }

        let agent = Arc::new(agent);
        inner.agents.push(agent.clone());
        Ok(agent)
    }

    /// Freezes membership. Called when a run starts.
    pub fn seal(&self) {
        self.inner.write().sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.read().sealed
    }

    /// Copies the agent references under the read lock. The copy can be walked
    /// without holding anything.
    pub fn snapshot(&self) -> Vec<Arc<Agent>> {
        self.inner.read().agents.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn alive_count(&self) -> usize {
        self.snapshot().iter().filter(|a| a.is_alive()).count()
    }

    pub fn views(&self) -> Vec<AgentView> {
        self.snapshot().iter().map(|a| AgentView::from(a.as_ref())).collect()
    }

    pub fn stats(&self) -> RosterStats {
        RosterStats::from_views(&self.views())
    }

    pub fn survivors(&self) -> Vec<AgentView> {
        self.views().into_iter().filter(|v| v.alive).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn seeding_places_everyone_on_the_map() {
        let bounds = Bounds::new(40, 25);
        let mut rng = StdRng::seed_from_u64(3);
        let roster = Roster::seeded(50, bounds, &mut rng).unwrap();

        assert_eq!(roster.len(), 50);
        assert_eq!(roster.alive_count(), 50);
        for agent in roster.snapshot() {
            assert!(bounds.contains(agent.x(), agent.y()), "{agent}");
            assert!(agent.name().starts_with(agent.kind().name()));
        }
    }

    #[test]
    fn seeding_zero_sized_map_fails() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(Roster::seeded(5, Bounds::new(0, 10), &mut rng).is_err());
    }

    #[test]
    fn duplicate_names_are_refused() {
        let roster = Roster::new();
        let bounds = Bounds::default();
        roster.insert(Agent::new("Grom", AgentKind::Orc, 1, 1, bounds).unwrap()).unwrap();
        let err = roster
            .insert(Agent::new("Grom", AgentKind::Rogue, 2, 2, bounds).unwrap())
            .unwrap_err();
        assert!(matches!(err, ArenaError::DuplicateName(name) if name == "Grom"));
        assert_eq!(roster.len(), 1);

        roster.insert(Agent::new("Grom_2", AgentKind::Orc, 3, 3, bounds).unwrap()).unwrap();
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn large_populations_seed_with_unique_names() {
        let mut rng = StdRng::seed_from_u64(9);
        let roster = Roster::seeded(50_000, Bounds::default(), &mut rng).unwrap();
        let names: HashSet<String> =
            roster.snapshot().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names.len(), 50_000);
    }

    #[test]
    fn sealed_roster_refuses_members() {
        let roster = Roster::new();
        roster.seal();
        let err = roster
            .insert(Agent::new("Late", AgentKind::Orc, 1, 1, Bounds::default()).unwrap())
            .unwrap_err();
        assert!(matches!(err, ArenaError::RosterSealed));
    }

    #[test]
    fn snapshot_shares_agents() {
        let roster = Roster::new();
        roster
            .insert(Agent::new("Vex", AgentKind::Rogue, 5, 5, Bounds::default()).unwrap())
            .unwrap();

        let snapshot = roster.snapshot();
        snapshot[0].die();
        assert_eq!(roster.alive_count(), 0);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn stats_count_living_by_kind() {
        let bounds = Bounds::default();
        let roster = Roster::from_agents([
            Agent::new("a", AgentKind::Rogue, 0, 0, bounds).unwrap(),
            Agent::new("b", AgentKind::Rogue, 0, 0, bounds).unwrap(),
            Agent::new("c", AgentKind::Pegasus, 0, 0, bounds).unwrap(),
        ])
        .unwrap();
        roster.snapshot()[1].die();

        let stats = roster.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.alive, 2);
        assert_eq!(stats.alive_of(AgentKind::Rogue), 1);
        assert_eq!(stats.alive_of(AgentKind::Pegasus), 1);
        assert_eq!(stats.alive_of(AgentKind::Orc), 0);
        assert_eq!(roster.survivors().len(), 2);
    }
}
