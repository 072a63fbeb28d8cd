//! Per-bucket tunnel styles
//!
//! Every score bucket (10 points) maps to one entry of a fixed style palette.
//! Once the unlock score is reached a style may also pick its own polygon side
//! count, chosen once and reused whenever that style comes around again.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::consts::POINTS_PER_BUCKET;
use crate::settings::StyleSettings;

/// Chooses the cross-section side count for a score bucket
pub trait StyleSelector {
    /// Side count for `bucket`. Values below 3 are rejected by the engine.
    fn sides_for_bucket(&mut self, bucket: u64) -> u32;
}

/// Visual parameters presentation code applies for one bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TubeStyle {
    pub name: &'static str,
    /// 0xRRGGBB
    pub tube_color: u32,
    pub tube_opacity: f32,
    pub line_color: u32,
    pub point_color: u32,
    pub point_size: f32,
    pub bloom_strength: f32,
    /// Hue modulation of edges and markers
    pub animate_color: bool,
    pub obstacle_color: u32,
    pub animate_obstacles: bool,
}

#[allow(clippy::too_many_arguments)]
const fn style(
    name: &'static str,
    tube_color: u32,
    tube_opacity: f32,
    line_color: u32,
    point_color: u32,
    point_size: f32,
    bloom_strength: f32,
    animate_color: bool,
    obstacle_color: u32,
    animate_obstacles: bool,
) -> TubeStyle {
    TubeStyle {
        name,
        tube_color,
        tube_opacity,
        line_color,
        point_color,
        point_size,
        bloom_strength,
        animate_color,
        obstacle_color,
        animate_obstacles,
    }
}

/// The palette, one entry per bucket, cycling
pub const STYLES: [TubeStyle; 9] = [
    style("default", 0x000000, 1.0, 0xffa500, 0xffffcc, 6.0, 1.6, true, 0xff0500, true),
    style("matrix", 0x000000, 0.5, 0x00ff00, 0x00ff00, 10.0, 2.0, false, 0xffffff, false),
    style("ice", 0x000000, 0.5, 0x66e0ff, 0x99f0ff, 10.0, 2.0, true, 0x000000, false),
    style("ember", 0x120200, 0.95, 0x000000, 0xffc699, 20.0, 1.8, true, 0xffffff, false),
    style("purple haze", 0x001204, 0.96, 0xccffcc, 0xccffcc, 7.0, 1.5, true, 0xffffff, false),
    style("see-through", 0x000000, 0.8, 0xffa500, 0xffff00, 8.0, 1.8, true, 0x000000, false),
    style("default", 0x000000, 1.0, 0xffa500, 0xffffcc, 6.0, 1.6, true, 0xff0500, true),
    style("black hole", 0x000000, 0.0, 0x000000, 0x000000, 0.0, 16.0, true, 0xff0500, true),
    style("craziness", 0x202020, 0.9, 0xffaaff, 0xaaffff, 12.0, 2.5, true, 0xffffff, true),
];

impl TubeStyle {
    /// Style index for a bucket
    #[inline]
    pub fn index_for_bucket(bucket: u64) -> usize {
        (bucket % STYLES.len() as u64) as usize
    }

    pub fn for_bucket(bucket: u64) -> &'static TubeStyle {
        &STYLES[Self::index_for_bucket(bucket)]
    }

    /// Split a 0xRRGGBB colour into linear-ish [0, 1] channels
    pub fn rgb(color: u32) -> [f32; 3] {
        [
            ((color >> 16) & 0xff) as f32 / 255.0,
            ((color >> 8) & 0xff) as f32 / 255.0,
            (color & 0xff) as f32 / 255.0,
        ]
    }
}

/// Default selector: random side count per style index after the unlock score
#[derive(Debug, Clone)]
pub struct StyleTable {
    settings: StyleSettings,
    initial_sides: u32,
    rng: Pcg32,
    chosen: HashMap<usize, u32>,
}

impl StyleTable {
    pub fn new(settings: StyleSettings, initial_sides: u32, seed: u64) -> Self {
        Self {
            settings,
            initial_sides,
            rng: Pcg32::seed_from_u64(seed),
            chosen: HashMap::new(),
        }
    }

    /// Side count already picked for a style index, if any
    pub fn chosen_sides(&self, style_index: usize) -> Option<u32> {
        self.chosen.get(&style_index).copied()
    }
}

impl StyleSelector for StyleTable {
    fn sides_for_bucket(&mut self, bucket: u64) -> u32 {
        let score = bucket.saturating_mul(POINTS_PER_BUCKET);
        if score < self.settings.unlock_score || self.settings.radial_choices.is_empty() {
            return self.initial_sides;
        }
        let index = TubeStyle::index_for_bucket(bucket);
        if let Some(&sides) = self.chosen.get(&index) {
            return sides;
        }
        let choices = &self.settings.radial_choices;
        let sides = choices[self.rng.random_range(0..choices.len())];
        log::debug!(
            "Style '{}' picked {} sides",
            TubeStyle::for_bucket(bucket).name,
            sides
        );
        self.chosen.insert(index, sides);
        sides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_below_unlock_score() {
        let mut table = StyleTable::new(StyleSettings::default(), 16, 1);
        for bucket in 0..5 {
            assert_eq!(table.sides_for_bucket(bucket), 16);
        }
        assert_eq!(table.chosen_sides(0), None);
    }

    #[test]
    fn test_choice_cached_per_style_index() {
        let settings = StyleSettings::default();
        let mut table = StyleTable::new(settings.clone(), 16, 9);
        let first = table.sides_for_bucket(5);
        assert!(settings.radial_choices.contains(&first));
        assert_eq!(table.sides_for_bucket(5), first);
        // Bucket 14 cycles back to the same style as bucket 5
        assert_eq!(table.sides_for_bucket(14), first);
        assert_eq!(table.chosen_sides(5), Some(first));
    }

    #[test]
    fn test_same_seed_same_choices() {
        let mut a = StyleTable::new(StyleSettings::default(), 16, 42);
        let mut b = StyleTable::new(StyleSettings::default(), 16, 42);
        for bucket in 5..30 {
            assert_eq!(a.sides_for_bucket(bucket), b.sides_for_bucket(bucket));
        }
    }

    #[test]
    fn test_empty_choices_keep_initial() {
        let settings = StyleSettings {
            unlock_score: 0,
            radial_choices: Vec::new(),
        };
        let mut table = StyleTable::new(settings, 8, 3);
        assert_eq!(table.sides_for_bucket(7), 8);
    }

    #[test]
    fn test_palette_cycles() {
        assert_eq!(TubeStyle::for_bucket(0).name, "default");
        assert_eq!(TubeStyle::for_bucket(1).name, "matrix");
        assert_eq!(TubeStyle::for_bucket(8).name, "craziness");
        assert_eq!(TubeStyle::for_bucket(9).name, "default");
        assert_eq!(TubeStyle::rgb(0xff8000), [1.0, 128.0 / 255.0, 0.0]);
    }
}
