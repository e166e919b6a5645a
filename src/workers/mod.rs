pub mod battle;
pub mod logger;
pub mod movement;

pub use battle::{BattleOutcome, BattleWorker};
pub use logger::LoggerWorker;
pub use movement::MovementWorker;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum WorkerRole {
    Movement,
    Battle,
    Logger,
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkerRole::Movement => "movement",
            WorkerRole::Battle => "battle",
            WorkerRole::Logger => "logger",
        })
    }
}
