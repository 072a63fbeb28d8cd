//! Forward motion along the path
//!
//! One lap takes `current_loop_duration_ms`. The target duration shrinks
//! geometrically with score up to a cap, and the current duration eases toward
//! it so a new point never causes a visible jump in speed.

use serde::{Deserialize, Serialize};

use crate::settings::ProgressSettings;
use crate::{lerp, wrap_unit};

/// Advances normalized path progress over time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressController {
    settings: ProgressSettings,
    /// Normalized position along the path, in [0, 1)
    pub path_progress: f32,
    /// Wall-clock milliseconds per full lap right now
    pub current_loop_duration_ms: f32,
}

impl ProgressController {
    pub fn new(settings: ProgressSettings) -> Self {
        let current_loop_duration_ms = settings.base_loop_duration_ms;
        Self {
            settings,
            path_progress: 0.0,
            current_loop_duration_ms,
        }
    }

    /// Fastest lap the settings allow, in milliseconds
    pub fn min_loop_duration_ms(&self) -> f32 {
        let speed_floor = match self.settings.max_forward_speed {
            Some(loops_per_sec) if loops_per_sec.is_finite() && loops_per_sec > 0.0 => {
                1000.0 / loops_per_sec
            }
            _ => 0.0,
        };
        self.settings.min_loop_duration_ms.max(speed_floor)
    }

    /// Lap duration the controller is heading toward at `score`
    pub fn target_loop_duration_ms(&self, score: u64) -> f32 {
        let capped = score.min(self.settings.speed_score_cap).min(i32::MAX as u64);
        let raw = self.settings.base_loop_duration_ms
            * self.settings.speed_multiplier_per_point.powi(capped as i32);
        raw.max(self.min_loop_duration_ms())
    }

    /// Advance by `dt` seconds at the speed implied by `score`
    pub fn tick(&mut self, dt: f32, score: u64) -> f32 {
        let target = self.target_loop_duration_ms(score);
        let blend = (self.settings.loop_adapt_rate * dt).min(1.0);
        self.current_loop_duration_ms = lerp(self.current_loop_duration_ms, target, blend);
        self.path_progress =
            wrap_unit(self.path_progress + dt * 1000.0 / self.current_loop_duration_ms);
        self.path_progress
    }

    /// Back to the start of the path at base speed
    pub fn reset(&mut self) {
        self.path_progress = 0.0;
        self.current_loop_duration_ms = self.settings.base_loop_duration_ms;
    }
}
