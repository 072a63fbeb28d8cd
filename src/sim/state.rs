//! Engine state and core simulation types
//!
//! The engine owns everything that changes during an episode. The path, the
//! high score store and the style selector are collaborators handed in at
//! construction.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::lateral::{LateralController, ScreenBasis};
use super::path::Path;
use super::progress::ProgressController;
use super::spawner::{Obstacle, ObstacleSpawner};
use super::tick::{TickInput, TickOutcome};
use super::tube::{self, TubeGeometry};
use crate::error::Result;
use crate::highscores::{HighScoreStore, MemoryStore};
use crate::settings::Settings;
use crate::style::{StyleSelector, StyleTable};
use crate::{score_bucket, wrap_unit};

/// Whether the current episode is still being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeState {
    Running,
    /// An obstacle was hit; only `reset` leaves this state
    Ended,
}

/// Snapshot of the agent's motion state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub path_progress: f32,
    pub lateral_offset: Vec2,
    pub lateral_velocity: Vec2,
    pub current_loop_duration_ms: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub score: u64,
    pub high_score: u64,
}

/// Things that happened during a tick, in the order they happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The agent passed an obstacle and scored a point
    ObstacleCleared { id: u32 },
    ObstaclesSpawned { count: usize },
    TubeRebuilt { sides: u32, inradius: f32 },
    GameOver {
        score: u64,
        high_score: u64,
        new_high_score: bool,
    },
}

/// The tunnel engine
pub struct Engine<P: Path> {
    pub(super) path: P,
    pub(super) settings: Settings,
    pub(super) tube: TubeGeometry,
    pub(super) progress: ProgressController,
    pub(super) lateral: LateralController,
    pub(super) spawner: ObstacleSpawner,
    /// Active obstacles (ordered by id)
    pub(super) obstacles: Vec<Obstacle>,
    pub(super) score: ScoreState,
    pub(super) episode: EpisodeState,
    pub(super) rng: Pcg32,
    seed: u64,
    next_id: u32,
    pub(super) store: Box<dyn HighScoreStore>,
    pub(super) selector: Box<dyn StyleSelector>,
    /// Side count decided for each score bucket seen this episode
    pub(super) bucket_sides: HashMap<u64, u32>,
    /// Where the agent was when the episode ended
    pub(super) terminal_position: Option<Vec3>,
    pub(super) time_ticks: u64,
}

impl<P: Path> Engine<P> {
    /// Create an engine with an in-memory high score and the default style table
    pub fn new(path: P, settings: Settings, seed: u64) -> Result<Self> {
        settings.validate()?;
        let tube = tube::build(
            &path,
            settings.tube.initial_sides,
            settings.tube.tubular_segments,
            settings.tube.outer_radius,
            settings.tube.edge_inset,
        )?;
        let selector = StyleTable::new(
            settings.style.clone(),
            settings.tube.initial_sides,
            seed.rotate_left(32),
        );

        let mut engine = Self {
            progress: ProgressController::new(settings.progress.clone()),
            lateral: LateralController::new(settings.lateral.clone()),
            spawner: ObstacleSpawner::new(settings.obstacles.clone()),
            path,
            settings,
            tube,
            obstacles: Vec::new(),
            score: ScoreState::default(),
            episode: EpisodeState::Running,
            rng: Pcg32::seed_from_u64(seed),
            seed,
            next_id: 1,
            store: Box::new(MemoryStore::new()),
            selector: Box::new(selector),
            bucket_sides: HashMap::new(),
            terminal_position: None,
            time_ticks: 0,
        };
        engine.populate_initial_obstacles();

        log::info!(
            "Engine ready: seed={}, sides={}, inradius={:.4}, obstacles={}",
            seed,
            engine.sides(),
            engine.inradius(),
            engine.obstacles.len()
        );
        Ok(engine)
    }

    /// Use `store` for the high score, loading the stored value now
    pub fn with_store(mut self, store: impl HighScoreStore + 'static) -> Self {
        self.score.high_score = store.load_high_score();
        self.store = Box::new(store);
        self
    }

    pub fn with_style_selector(mut self, selector: impl StyleSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    /// Allocate a new obstacle id
    pub(super) fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Spawn one obstacle away from the agent's current progress
    pub(super) fn spawn_obstacle(&mut self) {
        let id = self.next_entity_id();
        let obstacle = self.spawner.spawn(
            id,
            &self.path,
            &mut self.rng,
            self.tube.inradius(),
            self.progress.path_progress,
        );
        self.obstacles.push(obstacle);
    }

    fn populate_initial_obstacles(&mut self) {
        let count = self.settings.obstacles.starting_count;
        for _ in 0..count {
            self.spawn_obstacle();
        }
    }

    /// Advance one frame. See [`super::tick::tick`].
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> TickOutcome {
        super::tick::tick(self, input, dt)
    }

    /// Back to a fresh episode: progress, lateral state, score and obstacles
    /// start over and the tube returns to its initial side count. The high
    /// score and the random stream carry on.
    pub fn reset(&mut self) {
        self.progress.reset();
        self.lateral.reset();
        self.obstacles.clear();
        self.score.score = 0;
        self.episode = EpisodeState::Running;
        self.terminal_position = None;
        self.bucket_sides.clear();
        self.time_ticks = 0;

        let initial_sides = self.settings.tube.initial_sides;
        if self.sides() != initial_sides {
            if let Err(e) = self.rebuild_tube(initial_sides) {
                log::warn!("Could not restore {} sides on reset: {}", initial_sides, e);
            }
        }
        self.populate_initial_obstacles();
        log::info!("Episode reset ({} obstacles)", self.obstacles.len());
    }

    /// Replace the tube with one of `sides` sides.
    ///
    /// The new geometry is built in full before it replaces the old one, so a
    /// rejected side count leaves the current tube untouched. The agent and any
    /// obstacles that no longer fit inside a narrower tube are pulled toward the
    /// centerline. The side count sticks for the current score bucket, so the
    /// style check on the next tick does not undo it.
    pub fn rebuild_tube(&mut self, sides: u32) -> Result<()> {
        let geometry = tube::build(
            &self.path,
            sides,
            self.settings.tube.tubular_segments,
            self.settings.tube.outer_radius,
            self.settings.tube.edge_inset,
        )?;
        self.tube = geometry;
        self.bucket_sides.insert(score_bucket(self.score.score), sides);
        self.lateral.contain(self.tube.inradius());

        let max_r = self.spawner.max_offset(self.tube.inradius());
        let moved = self
            .obstacles
            .iter_mut()
            .map(|o| o.clamp_radius(&self.path, max_r))
            .filter(|&moved| moved)
            .count();
        log::info!(
            "Tube rebuilt: sides={}, inradius={:.4}, obstacles moved inward={}",
            sides,
            self.tube.inradius(),
            moved
        );
        Ok(())
    }

    /// Put an obstacle at `path_param` with a cross-section `offset`, outside
    /// the random spawner. Returns its id.
    pub fn place_obstacle(&mut self, path_param: f32, offset: Vec2) -> u32 {
        let id = self.next_entity_id();
        let obstacle = Obstacle::at(id, &self.path, wrap_unit(path_param), offset);
        self.obstacles.push(obstacle);
        id
    }

    /// Screen basis at the agent's current progress
    pub fn screen_basis(&self) -> ScreenBasis {
        ScreenBasis::at(
            &self.path,
            self.progress.path_progress,
            self.settings.lateral.lookahead,
        )
    }

    /// World position of the agent.
    ///
    /// After a collision this is where the push-out left the agent.
    pub fn agent_world_position(&self) -> Vec3 {
        if let Some(position) = self.terminal_position {
            return position;
        }
        self.path.point_at(self.progress.path_progress)
            + self.screen_basis().to_world(self.lateral.offset)
    }

    pub fn agent(&self) -> AgentState {
        AgentState {
            path_progress: self.progress.path_progress,
            lateral_offset: self.lateral.offset,
            lateral_velocity: self.lateral.velocity,
            current_loop_duration_ms: self.progress.current_loop_duration_ms,
        }
    }

    pub fn score(&self) -> u64 {
        self.score.score
    }

    pub fn high_score(&self) -> u64 {
        self.score.high_score
    }

    pub fn episode_state(&self) -> EpisodeState {
        self.episode
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn obstacle_positions(&self) -> Vec<Vec3> {
        self.obstacles.iter().map(|o| o.position).collect()
    }

    pub fn inradius(&self) -> f32 {
        self.tube.inradius()
    }

    pub fn sides(&self) -> u32 {
        self.tube.sides()
    }

    pub fn tube(&self) -> &TubeGeometry {
        &self.tube
    }

    pub fn path(&self) -> &P {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Ticks simulated this episode
    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    /// Furthest the agent may stray from the centerline in the current tube
    pub fn lateral_limit(&self) -> f32 {
        self.lateral.limit(self.tube.inradius())
    }
}
