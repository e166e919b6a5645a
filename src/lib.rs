pub mod agent;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod queue;
pub mod render;
pub mod roster;
pub mod rules;
pub mod simulation;
pub mod sink;
pub mod workers;

pub use agent::{Agent, AgentKind, Bounds, Position};
pub use error::ArenaError;
pub use metrics::MetricsCollector;
pub use roster::Roster;
pub use rules::{Dice, RuleTable};
pub use simulation::{SimConfig, Simulation, SimulationReport};

pub mod prelude {
    pub use crate::agent::{Agent, AgentKind, Bounds};
    pub use crate::metrics::MetricsSnapshot;
    pub use crate::queue::{BattleQueue, Engagement, LogQueue, WorkQueue};
    pub use crate::roster::{AgentView, Roster, RosterStats};
    pub use crate::rules::{Dice, Rule, RuleTable};
    pub use crate::simulation::{SimConfig, SimState, Simulation, SimulationReport};
    pub use crate::sink::{LogSink, MemorySink};
}
