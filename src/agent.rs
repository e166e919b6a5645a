// Agents are shared between every worker, so all mutable state lives in atomics.

use crate::error::{ArenaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    Rogue,
    Orc,
    Werewolf,
    Pegasus,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Rogue,
        AgentKind::Orc,
        AgentKind::Werewolf,
        AgentKind::Pegasus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Rogue => "Rogue",
            AgentKind::Orc => "Orc",
            AgentKind::Werewolf => "Werewolf",
            AgentKind::Pegasus => "Pegasus",
        }
    }

    /// Map glyph used by the console renderer.
    pub fn symbol(&self) -> char {
        match self {
            AgentKind::Rogue => 'R',
            AgentKind::Orc => 'O',
            AgentKind::Werewolf => 'W',
            AgentKind::Pegasus => 'P',
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentKind {
    type Err = ArenaError;

    // Old roster files were written with the localized names, keep reading them
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Rogue" | "Разбойник" => Ok(AgentKind::Rogue),
            "Orc" | "Орк" => Ok(AgentKind::Orc),
            "Werewolf" | "Оборотень" => Ok(AgentKind::Werewolf),
            "Pegasus" => Ok(AgentKind::Pegasus),
            other => Err(ArenaError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        (0..self.width).contains(&x) && (0..self.height).contains(&y)
    }

    pub fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        (
            x.clamp(0, (self.width - 1).max(0)),
            y.clamp(0, (self.height - 1).max(0)),
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self { width: 100, height: 100 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }

    // x in the high half, y in the low half, so one atomic load sees both
    fn pack(self) -> u64 {
        ((self.x as u32 as u64) << 32) | (self.y as u32 as u64)
    }

    fn unpack(bits: u64) -> Self {
        Self {
            x: (bits >> 32) as u32 as i32,
            y: bits as u32 as i32,
        }
    }
}

pub struct Agent {
    name: String,
    kind: AgentKind,
    bounds: Bounds,
    position: AtomicU64,
    alive: AtomicBool,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        kind: AgentKind,
        x: i32,
        y: i32,
        bounds: Bounds,
    ) -> Result<Self> {
        if !bounds.contains(x, y) {
            return Err(ArenaError::InvalidPosition {
                x,
                y,
                width: bounds.width,
                height: bounds.height,
            });
        }

        Ok(Self {
            name: name.into(),
            kind,
            bounds,
            position: AtomicU64::new(Position::new(x, y).pack()),
            alive: AtomicBool::new(true),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn position(&self) -> Position {
        Position::unpack(self.position.load(Ordering::Acquire))
    }

    pub fn x(&self) -> i32 {
        self.position().x
    }

    pub fn y(&self) -> i32 {
        self.position().y
    }

    /// Writes a new position. Returns `false` and keeps the old position when
    /// the target lies outside the agent's map bounds.
    pub fn set_position(&self, x: i32, y: i32) -> bool {
        if !self.bounds.contains(x, y) {
            return false;
        }
        self.position.store(Position::new(x, y).pack(), Ordering::Release);
        true
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Marks the agent dead. Returns `true` only for the call that actually
    /// flipped the flag, repeated calls are no-ops.
    pub fn die(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }

    pub fn distance_to(&self, other: &Agent) -> f64 {
        self.position().distance_to(&other.position())
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("position", &self.position())
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pos = self.position();
        write!(
            f,
            "{} '{}' at ({}, {}) - {}",
            self.kind,
            self.name,
            pos.x,
            pos.y,
            if self.is_alive() { "Alive" } else { "Dead" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wide() -> Bounds {
        Bounds::new(501, 501)
    }

    #[test]
    fn creation_keeps_fields() {
        let agent = Agent::new("Test", AgentKind::Rogue, 100, 200, wide()).unwrap();
        assert_eq!(agent.name(), "Test");
        assert_eq!(agent.kind(), AgentKind::Rogue);
        assert_eq!(agent.position(), Position::new(100, 200));
        assert!(agent.is_alive());
    }

    #[test]
    fn creation_outside_bounds_fails() {
        let err = Agent::new("Lost", AgentKind::Orc, 600, 10, wide()).unwrap_err();
        assert!(matches!(err, ArenaError::InvalidPosition { x: 600, y: 10, .. }));
        assert!(Agent::new("Neg", AgentKind::Orc, -1, 0, wide()).is_err());
    }

    #[test]
    fn set_position_rejects_out_of_bounds() {
        let agent = Agent::new("Test", AgentKind::Werewolf, 100, 100, wide()).unwrap();

        assert!(agent.set_position(200, 300));
        assert_eq!((agent.x(), agent.y()), (200, 300));

        assert!(!agent.set_position(600, 600));
        assert_eq!((agent.x(), agent.y()), (200, 300));

        assert!(!agent.set_position(-5, 10));
        assert_eq!((agent.x(), agent.y()), (200, 300));
    }

    #[test]
    fn die_is_idempotent() {
        let agent = Agent::new("Test", AgentKind::Orc, 100, 100, wide()).unwrap();
        assert!(agent.die());
        assert!(!agent.is_alive());
        assert!(!agent.die());
        assert!(!agent.is_alive());
    }

    #[test]
    fn distance_is_euclidean_and_symmetric() {
        let a = Agent::new("Test1", AgentKind::Rogue, 0, 0, wide()).unwrap();
        let b = Agent::new("Test2", AgentKind::Orc, 3, 4, wide()).unwrap();
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(b.distance_to(&a), 5.0);
    }

    #[test]
    fn kind_parses_localized_names() {
        assert_eq!("Разбойник".parse::<AgentKind>().unwrap(), AgentKind::Rogue);
        assert_eq!("Орк".parse::<AgentKind>().unwrap(), AgentKind::Orc);
        assert_eq!("Оборотень".parse::<AgentKind>().unwrap(), AgentKind::Werewolf);
        assert_eq!("Pegasus".parse::<AgentKind>().unwrap(), AgentKind::Pegasus);
        assert!("Dragon".parse::<AgentKind>().is_err());
    }

    proptest! {
        #[test]
        fn packed_position_survives_any_coordinates(x in any::<i32>(), y in any::<i32>()) {
            let pos = Position::new(x, y);
            prop_assert_eq!(Position::unpack(pos.pack()), pos);
        }

        #[test]
        fn clamped_moves_stay_on_the_map(
            x in 0i32..100, y in 0i32..100,
            dx in -1i32..=1, dy in -1i32..=1,
            step in 0i32..60,
        ) {
            let bounds = Bounds::default();
            let agent = Agent::new("Walker", AgentKind::Pegasus, x, y, bounds).unwrap();
            let (nx, ny) = bounds.clamp(x + dx * step, y + dy * step);
            prop_assert!(agent.set_position(nx, ny));
            prop_assert!(bounds.contains(agent.x(), agent.y()));
        }
    }
}
