//! Engine tuning and difficulty presets
//!
//! Every gameplay constant lives here so a run can be reconfigured from JSON.
//! Durations are milliseconds, distances are world units, `dt` is seconds.

use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Difficulty preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Relaxed,
    #[default]
    Standard,
    Frantic,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Relaxed => "Relaxed",
            Difficulty::Standard => "Standard",
            Difficulty::Frantic => "Frantic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "relaxed" | "easy" => Some(Difficulty::Relaxed),
            "standard" | "normal" => Some(Difficulty::Standard),
            "frantic" | "hard" => Some(Difficulty::Frantic),
            _ => None,
        }
    }

    /// Loop duration at score zero
    pub fn base_loop_duration_ms(&self) -> f32 {
        match self {
            Difficulty::Relaxed => 180_000.0,
            Difficulty::Standard => 120_000.0,
            Difficulty::Frantic => 80_000.0,
        }
    }

    /// Obstacles present when an episode starts
    pub fn starting_obstacles(&self) -> u32 {
        match self {
            Difficulty::Relaxed => 25,
            Difficulty::Standard => 40,
            Difficulty::Frantic => 60,
        }
    }

    /// Extra obstacles per score bucket
    pub fn obstacles_per_bucket(&self) -> u32 {
        match self {
            Difficulty::Relaxed => 8,
            Difficulty::Standard => 12,
            Difficulty::Frantic => 16,
        }
    }
}

/// Tube cross-section and sweep resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TubeSettings {
    /// Circumradius of the polygonal cross-section
    pub outer_radius: f32,
    /// Rings sampled along the path
    pub tubular_segments: u32,
    /// Polygon side count at episode start
    pub initial_sides: u32,
    /// Inward offset of edge overlay and vertex markers
    pub edge_inset: f32,
}

impl Default for TubeSettings {
    fn default() -> Self {
        Self {
            outer_radius: 0.65,
            tubular_segments: 256,
            initial_sides: 16,
            edge_inset: 0.012,
        }
    }
}

/// Forward speed curve
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSettings {
    pub base_loop_duration_ms: f32,
    /// Each point multiplies the loop duration by this factor (<1 speeds up)
    pub speed_multiplier_per_point: f32,
    pub min_loop_duration_ms: f32,
    /// Maximum forward speed in loops per second; `None` disables the cap
    pub max_forward_speed: Option<f32>,
    /// Score beyond which speed stops increasing
    pub speed_score_cap: u64,
    /// How fast the loop duration adapts toward its target (per second)
    pub loop_adapt_rate: f32,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            base_loop_duration_ms: 120_000.0,
            speed_multiplier_per_point: 0.995,
            min_loop_duration_ms: 3_000.0,
            max_forward_speed: Some(1.0 / 60.0),
            speed_score_cap: 100,
            loop_adapt_rate: 2.5,
        }
    }
}

/// Lateral steering inside the tube
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LateralSettings {
    /// Units per second at full input
    pub max_lateral_speed: f32,
    /// Velocity approach rate (per second)
    pub lateral_accel: f32,
    /// Design cap on the offset magnitude
    pub max_lateral: f32,
    /// Sphere radius of the agent
    pub agent_radius: f32,
    /// Gap kept between the agent sphere and the tube wall
    pub containment_epsilon: f32,
    /// Path-parameter distance of the forward-look sample
    pub lookahead: f32,
}

impl Default for LateralSettings {
    fn default() -> Self {
        Self {
            max_lateral_speed: 0.5,
            lateral_accel: 18.0,
            max_lateral: 0.45,
            agent_radius: 0.06,
            containment_epsilon: 0.005,
            lookahead: 0.002,
        }
    }
}

/// Obstacle size, placement and density
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleSettings {
    /// Edge length of the cube; collision uses its circumscribed sphere
    pub size: f32,
    pub starting_count: u32,
    pub max_count: u32,
    pub per_bucket_increment: u32,
    /// Spawns allowed per tick while below the target count
    pub spawn_batch: u32,
    /// Minimum wrapped path distance from the agent at spawn time
    pub min_path_distance: f32,
    pub spawn_retries: u32,
    /// Gap kept between an obstacle sphere and the tube wall
    pub wall_epsilon: f32,
}

impl ObstacleSettings {
    /// Radius of the sphere enclosing an obstacle cube
    pub fn sphere_radius(&self) -> f32 {
        3.0_f32.sqrt() * (self.size / 2.0)
    }
}

impl Default for ObstacleSettings {
    fn default() -> Self {
        Self {
            size: 0.075,
            starting_count: 40,
            max_count: 400,
            per_bucket_increment: 12,
            spawn_batch: 24,
            min_path_distance: 0.08,
            spawn_retries: 12,
            wall_epsilon: 0.001,
        }
    }
}

/// Style-driven cross-section changes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    /// Score at which styles may start changing the side count
    pub unlock_score: u64,
    /// Side counts a style may pick from
    pub radial_choices: Vec<u32>,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            unlock_score: 50,
            radial_choices: vec![3, 5, 7, 8, 16],
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub difficulty: Difficulty,
    pub tube: TubeSettings,
    pub progress: ProgressSettings,
    pub lateral: LateralSettings,
    pub obstacles: ObstacleSettings,
    pub style: StyleSettings,
    /// Shortest frame delta accepted by a tick (seconds)
    pub dt_min: f32,
    /// Longest frame delta accepted by a tick (seconds)
    pub dt_max: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Standard,
            tube: TubeSettings::default(),
            progress: ProgressSettings::default(),
            lateral: LateralSettings::default(),
            obstacles: ObstacleSettings::default(),
            style: StyleSettings::default(),
            dt_min: 0.0001,
            dt_max: 0.05,
        }
    }
}

impl Settings {
    /// Create settings from a difficulty preset (applies preset defaults)
    pub fn from_preset(preset: Difficulty) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a difficulty preset (updates preset-dependent tuning)
    pub fn apply_preset(&mut self, preset: Difficulty) {
        self.difficulty = preset;
        self.progress.base_loop_duration_ms = preset.base_loop_duration_ms();
        self.obstacles.starting_count = preset.starting_obstacles();
        self.obstacles.per_bucket_increment = preset.obstacles_per_bucket();
    }

    /// Clamp a raw frame delta into the accepted range
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if dt.is_finite() {
            dt.clamp(self.dt_min, self.dt_max)
        } else {
            self.dt_max
        }
    }

    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.tube.outer_radius > 0.0) {
            return Err(EngineError::InvalidConfig("tube.outer_radius must be positive"));
        }
        if self.tube.initial_sides < 3 {
            return Err(EngineError::InvalidConfig("tube.initial_sides must be at least 3"));
        }
        if self.tube.tubular_segments < 3 {
            return Err(EngineError::InvalidConfig(
                "tube.tubular_segments must be at least 3",
            ));
        }
        if self.tube.edge_inset < 0.0 {
            return Err(EngineError::InvalidConfig("tube.edge_inset must not be negative"));
        }
        if !(self.progress.base_loop_duration_ms > 0.0) {
            return Err(EngineError::InvalidConfig(
                "progress.base_loop_duration_ms must be positive",
            ));
        }
        if !(self.progress.speed_multiplier_per_point > 0.0
            && self.progress.speed_multiplier_per_point <= 1.0)
        {
            return Err(EngineError::InvalidConfig(
                "progress.speed_multiplier_per_point must be in (0, 1]",
            ));
        }
        if !(self.progress.min_loop_duration_ms > 0.0) {
            return Err(EngineError::InvalidConfig(
                "progress.min_loop_duration_ms must be positive",
            ));
        }
        if self
            .progress
            .max_forward_speed
            .is_some_and(|speed| !(speed > 0.0))
        {
            return Err(EngineError::InvalidConfig(
                "progress.max_forward_speed must be positive when set",
            ));
        }
        if self.progress.loop_adapt_rate < 0.0 {
            return Err(EngineError::InvalidConfig(
                "progress.loop_adapt_rate must not be negative",
            ));
        }
        if self.lateral.max_lateral < 0.0 || self.lateral.max_lateral_speed < 0.0 {
            return Err(EngineError::InvalidConfig(
                "lateral limits must not be negative",
            ));
        }
        if self.lateral.agent_radius < 0.0 {
            return Err(EngineError::InvalidConfig("lateral.agent_radius must not be negative"));
        }
        if !(self.lateral.lookahead > 0.0 && self.lateral.lookahead < 0.5) {
            return Err(EngineError::InvalidConfig("lateral.lookahead must be in (0, 0.5)"));
        }
        if self.obstacles.size < 0.0 {
            return Err(EngineError::InvalidConfig("obstacles.size must not be negative"));
        }
        if self.obstacles.starting_count > self.obstacles.max_count {
            return Err(EngineError::InvalidConfig(
                "obstacles.starting_count exceeds obstacles.max_count",
            ));
        }
        if !(0.0..=0.5).contains(&self.obstacles.min_path_distance) {
            return Err(EngineError::InvalidConfig(
                "obstacles.min_path_distance must be in [0, 0.5]",
            ));
        }
        if self.style.radial_choices.iter().any(|&sides| sides < 3) {
            return Err(EngineError::InvalidConfig(
                "style.radial_choices entries must be at least 3",
            ));
        }
        if !(self.dt_min > 0.0 && self.dt_min <= self.dt_max) {
            return Err(EngineError::InvalidConfig("dt_min must be positive and <= dt_max"));
        }
        Ok(())
    }
}
