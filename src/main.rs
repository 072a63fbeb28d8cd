//! Wormhole entry point
//!
//! Runs the engine headless with a fixed-timestep loop and a simple autopilot,
//! restarting after every crash until the requested time has been simulated.

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::PathBuf;

    use anyhow::{Context, Result};
    use clap::Parser;
    use glam::Vec2;

    use wormhole::consts::*;
    use wormhole::sim::{ClosedSpline, Engine, EpisodeState, GameEvent, Path, TickInput};
    use wormhole::{Difficulty, HighScoreStore, JsonFileStore, MemoryStore, Settings, wrap_unit};

    /// Path distance the autopilot scans ahead for obstacles
    const AUTOPILOT_LOOKAHEAD: f32 = 0.01;
    /// Simulated frame length fed into the accumulator
    const FRAME_DT: f32 = 1.0 / 50.0;

    #[derive(Parser)]
    #[command(author, version, about, long_about = None)]
    struct Cli {
        /// Run seed
        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Seconds of game time to simulate
        #[arg(long, default_value_t = 120.0)]
        seconds: f32,

        /// Difficulty preset (relaxed, standard, frantic)
        #[arg(long)]
        preset: Option<String>,

        /// JSON settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Keep the high score in this JSON file instead of memory
        #[arg(long)]
        highscore_file: Option<PathBuf>,
    }

    /// Frame driver holding the engine and timing state
    struct Driver<P: Path> {
        engine: Engine<P>,
        accumulator: f32,
        episodes: u32,
        best_score: u64,
        rebuilds: u32,
    }

    impl<P: Path> Driver<P> {
        fn new(engine: Engine<P>) -> Self {
            Self {
                engine,
                accumulator: 0.0,
                episodes: 1,
                best_score: 0,
                rebuilds: 0,
            }
        }

        /// Run simulation ticks for one frame
        fn update(&mut self, frame_dt: f32) {
            self.accumulator += frame_dt.min(0.1);

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = TickInput {
                    intent: autopilot(&self.engine),
                };
                let outcome = self.engine.tick(&input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                for event in &outcome.events {
                    match event {
                        GameEvent::TubeRebuilt { sides, .. } => {
                            self.rebuilds += 1;
                            log::debug!("Now {} sides", sides);
                        }
                        GameEvent::GameOver { score, .. } => {
                            self.best_score = self.best_score.max(*score);
                        }
                        _ => {}
                    }
                }
            }

            if self.engine.episode_state() == EpisodeState::Ended {
                self.engine.reset();
                self.accumulator = 0.0;
                self.episodes += 1;
            }
        }
    }

    /// Steer away from the nearest obstacles ahead, drifting back to the
    /// centerline when nothing is close
    fn autopilot<P: Path>(engine: &Engine<P>) -> Vec2 {
        let agent = engine.agent();
        let basis = engine.screen_basis();
        let center = engine.path().point_at(agent.path_progress);
        let settings = engine.settings();
        let clearance = settings.lateral.agent_radius + settings.obstacles.sphere_radius();

        let mut steer = -agent.lateral_offset * 2.0;
        for obstacle in engine.obstacles() {
            let ahead = wrap_unit(obstacle.path_param - agent.path_progress);
            if ahead > AUTOPILOT_LOOKAHEAD {
                continue;
            }
            let obstacle_screen = basis.to_screen(obstacle.position - center);
            let away = agent.lateral_offset - obstacle_screen;
            let dist = away.length();
            if dist < clearance * 3.0 {
                let dir = if dist > 1e-4 { away / dist } else { Vec2::X };
                steer += dir * (1.0 - ahead / AUTOPILOT_LOOKAHEAD) * 4.0;
            }
        }
        steer.clamp(Vec2::NEG_ONE, Vec2::ONE)
    }

    fn load_settings(cli: &Cli) -> Result<Settings> {
        let mut settings = match &cli.config {
            Some(path) => Settings::load(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => Settings::default(),
        };
        if let Some(name) = &cli.preset {
            let preset = Difficulty::from_str(name)
                .with_context(|| format!("unknown preset '{}'", name))?;
            settings.apply_preset(preset);
            settings.validate()?;
        }
        Ok(settings)
    }

    fn store(cli: &Cli) -> Box<dyn HighScoreStore> {
        match &cli.highscore_file {
            Some(path) => Box::new(JsonFileStore::new(path)),
            None => Box::new(MemoryStore::new()),
        }
    }

    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        let settings = load_settings(&cli)?;
        log::info!(
            "Wormhole (headless) starting: seed={}, preset={}, {:.0}s",
            cli.seed,
            settings.difficulty.as_str(),
            cli.seconds
        );

        let engine = Engine::new(ClosedSpline::wormhole(), settings, cli.seed)?
            .with_store(store(&cli));
        let mut driver = Driver::new(engine);

        let frames = (cli.seconds.max(0.0) / FRAME_DT).ceil() as u64;
        for _ in 0..frames {
            driver.update(FRAME_DT);
        }
        driver.best_score = driver.best_score.max(driver.engine.score());

        println!("Simulated {:.1}s over {} episode(s)", cli.seconds, driver.episodes);
        println!("Best score: {}", driver.best_score);
        println!("High score: {}", driver.engine.high_score());
        println!("Tube rebuilds: {}", driver.rebuilds);
        println!(
            "Final tube: {} sides, inradius {:.4}, {} obstacles",
            driver.engine.sides(),
            driver.engine.inradius(),
            driver.engine.obstacles().len()
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    env_logger::init();
    headless::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No headless driver on the web; embed the library instead
}
