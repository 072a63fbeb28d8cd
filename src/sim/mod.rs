//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied `dt`, clamped to the configured range
//! - Seeded RNG only
//! - Stable iteration order (obstacles by id)
//! - No rendering or platform dependencies

pub mod collision;
pub mod lateral;
pub mod path;
pub mod progress;
pub mod scoring;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod tube;

pub use collision::{CollisionOutcome, resolve};
pub use lateral::{LateralController, ScreenBasis, containment_radius};
pub use path::{CirclePath, ClosedSpline, CrossSectionFrame, Path};
pub use progress::ProgressController;
pub use scoring::{crossed, on_progress_advance, target_obstacle_count};
pub use spawner::{Obstacle, ObstacleSpawner};
pub use state::{AgentState, Engine, EpisodeState, GameEvent, ScoreState};
pub use tick::{TickInput, TickOutcome, tick};
pub use tube::{TubeCrossSection, TubeGeometry, TubeMesh, TubeVertex};
