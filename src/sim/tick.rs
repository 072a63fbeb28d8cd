//! Per-frame simulation tick
//!
//! One tick runs, in order: forward progress, lateral steering, obstacle
//! spawning, collision, scoring, then the style check that may rebuild the
//! tube. The rebuild comes last so nothing earlier in the tick sees a
//! half-changed tube.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::collision;
use super::lateral::ScreenBasis;
use super::path::Path;
use super::scoring::{crossed_obstacles, target_obstacle_count};
use super::state::{Engine, EpisodeState, GameEvent};
use crate::score_bucket;

/// Input for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Steering intent in screen space, each axis in [-1, 1]
    pub intent: Vec2,
}

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickOutcome {
    /// Seconds actually simulated after clamping
    pub dt: f32,
    pub path_progress: f32,
    pub agent_position: Vec3,
    pub score_delta: u64,
    pub spawned: usize,
    pub collided: bool,
    /// New side count when the tube was rebuilt this tick
    pub rebuilt: Option<u32>,
    pub events: Vec<GameEvent>,
}

/// Advance the engine by one frame of `dt` seconds.
///
/// Does nothing once the episode has ended.
pub fn tick<P: Path>(engine: &mut Engine<P>, input: &TickInput, dt: f32) -> TickOutcome {
    if engine.episode == EpisodeState::Ended {
        return TickOutcome {
            path_progress: engine.progress.path_progress,
            agent_position: engine.agent_world_position(),
            collided: true,
            ..Default::default()
        };
    }

    let dt = engine.settings.clamp_dt(dt);
    let mut outcome = TickOutcome {
        dt,
        ..Default::default()
    };
    engine.time_ticks += 1;

    // Forward
    let prev_progress = engine.progress.path_progress;
    let progress = engine.progress.tick(dt, engine.score.score);
    outcome.path_progress = progress;

    // Lateral
    let basis = ScreenBasis::at(&engine.path, progress, engine.settings.lateral.lookahead);
    let inradius = engine.tube.inradius();
    let offset = engine.lateral.tick(dt, input.intent, &basis, inradius);
    let agent_pos = engine.path.point_at(progress) + basis.to_world(offset);

    for obstacle in &mut engine.obstacles {
        obstacle.tumble(dt);
    }

    // Spawn
    let scorable = engine.obstacles.len();
    let target = target_obstacle_count(engine.score.score, &engine.settings.obstacles);
    let to_spawn = engine.spawner.batch_size(scorable, target);
    for _ in 0..to_spawn {
        engine.spawn_obstacle();
    }
    if to_spawn > 0 {
        outcome.spawned = to_spawn;
        outcome
            .events
            .push(GameEvent::ObstaclesSpawned { count: to_spawn });
    }

    // Collision
    let hit = collision::resolve(
        agent_pos,
        &engine.obstacles,
        engine.settings.lateral.agent_radius,
        engine.spawner.obstacle_radius(),
    );
    outcome.agent_position = hit.resolved_pos;
    if hit.collided {
        outcome.collided = true;
        end_episode(engine, hit.resolved_pos, hit.first_hit, &mut outcome);
        return outcome;
    }

    // Scoring: obstacles added this tick wait until the next one
    let cleared = crossed_obstacles(prev_progress, progress, &engine.obstacles[..scorable]);
    if !cleared.is_empty() {
        outcome.score_delta = cleared.len() as u64;
        engine.score.score += outcome.score_delta;
        outcome
            .events
            .extend(cleared.into_iter().map(|id| GameEvent::ObstacleCleared { id }));
    }

    // Style
    apply_style(engine, &mut outcome);

    outcome
}

fn end_episode<P: Path>(
    engine: &mut Engine<P>,
    position: Vec3,
    obstacle_id: Option<u32>,
    outcome: &mut TickOutcome,
) {
    engine.episode = EpisodeState::Ended;
    engine.terminal_position = Some(position);

    let score = engine.score.score;
    let new_high_score = score > engine.score.high_score;
    if new_high_score {
        engine.score.high_score = score;
        engine.store.save_high_score(score);
    }

    log::info!(
        "Game over: hit obstacle {:?} at progress {:.4}, score={}, high={}{}",
        obstacle_id,
        engine.progress.path_progress,
        score,
        engine.score.high_score,
        if new_high_score { " (new)" } else { "" }
    );
    outcome.events.push(GameEvent::GameOver {
        score,
        high_score: engine.score.high_score,
        new_high_score,
    });
}

/// Consult the selector the first time a bucket is reached and rebuild when
/// the side count changes
fn apply_style<P: Path>(engine: &mut Engine<P>, outcome: &mut TickOutcome) {
    let bucket = score_bucket(engine.score.score);
    if engine.bucket_sides.contains_key(&bucket) {
        return;
    }
    let sides = engine.selector.sides_for_bucket(bucket);
    engine.bucket_sides.insert(bucket, sides);
    if sides == engine.tube.sides() {
        return;
    }

    match engine.rebuild_tube(sides) {
        Ok(()) => {
            outcome.agent_position = engine.agent_world_position();
            outcome.rebuilt = Some(sides);
            outcome.events.push(GameEvent::TubeRebuilt {
                sides,
                inradius: engine.tube.inradius(),
            });
        }
        Err(e) => {
            log::warn!("Keeping {}-sided tube for bucket {}: {}", engine.tube.sides(), bucket, e);
        }
    }
}
