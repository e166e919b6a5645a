use crate::agent::Bounds;
use crate::error::{ArenaError, Result};
use crate::rules::Dice;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest accepted map side.
pub const MAX_MAP_SIDE: i32 = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub population: usize,
    pub sleep_min_ms: u64,
    pub sleep_max_ms: u64,
    pub duration: Duration,
    pub render_interval: Duration,
    pub dice_min: u32,
    pub dice_max: u32,
    pub log_poll_interval: Duration,
    pub shutdown_grace: Duration,
    pub map_display: usize,
    pub seed: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub console_events: bool,
    pub render_map: bool,
    pub show_progress: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "arena".to_string(),
            width: 100,
            height: 100,
            population: 50,
            sleep_min_ms: 10,
            sleep_max_ms: 100,
            duration: Duration::from_secs(30),
            render_interval: Duration::from_secs(1),
            dice_min: 1,
            dice_max: 6,
            log_poll_interval: Duration::from_millis(100),
            shutdown_grace: Duration::from_secs(2),
            map_display: 20,
            seed: None,
            log_file: None,
            console_events: true,
            render_map: true,
            show_progress: true,
        }
    }
}

impl SimConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Quiet configuration for tests and embedding: no console output at all.
    pub fn headless() -> Self {
        Self {
            console_events: false,
            render_map: false,
            show_progress: false,
            ..Self::default()
        }
    }

    pub fn with_map(mut self, width: i32, height: i32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_population(mut self, population: usize) -> Self {
        self.population = population;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_render_interval(mut self, interval: Duration) -> Self {
        self.render_interval = interval;
        self
    }

    pub fn with_sleep_range(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.sleep_min_ms = min_ms;
        self.sleep_max_ms = max_ms;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }

    pub fn sleep_range(&self) -> RangeInclusive<u64> {
        self.sleep_min_ms..=self.sleep_max_ms
    }

    pub fn dice(&self) -> Result<Dice> {
        Dice::new(self.dice_min, self.dice_max)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ArenaError::InvalidConfig(msg));

        if self.width <= 0 || self.height <= 0 {
            return invalid(format!("map must be at least 1x1, got {}x{}", self.width, self.height));
        }
        if self.width > MAX_MAP_SIDE || self.height > MAX_MAP_SIDE {
            return invalid(format!(
                "map {}x{} exceeds the {} cell limit per side",
                self.width, self.height, MAX_MAP_SIDE
            ));
        }
        if self.sleep_min_ms > self.sleep_max_ms {
            return invalid(format!(
                "sleep range {}..={} ms is inverted",
                self.sleep_min_ms, self.sleep_max_ms
            ));
        }
        if self.duration.is_zero() {
            return invalid("duration must be positive".to_string());
        }
        if self.render_interval.is_zero() || self.log_poll_interval.is_zero() {
            return invalid("render and log poll intervals must be positive".to_string());
        }
        if self.map_display == 0 {
            return invalid("map display size must be positive".to_string());
        }
        self.dice()?;
        Ok(())
    }
}
