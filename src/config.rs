use clap::Parser;
use std::path::PathBuf;

use crate::pitch::MAJOR;

// ── Command line ────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "plane-melody", version, about = "Fly a plane, play a melody")]
pub struct Args {
    /// Seed for spawns, harmony choices and percussion noise.
    #[arg(long, default_value_t = 0x5eed_0f_5a11)]
    pub seed: u64,

    /// Frequency of the reference line, in Hz.
    #[arg(long, default_value_t = 440.0)]
    pub base_freq: f64,

    /// Melody volume in [0, 1]. Harmony is scaled down from this.
    #[arg(long, default_value_t = 0.2)]
    pub volume: f64,

    /// Energy at the start of every run.
    #[arg(long, default_value_t = 200.0, allow_negative_numbers = true)]
    pub start_energy: f64,

    /// Run without opening an audio device.
    #[arg(long)]
    pub mute: bool,

    /// Where tracing output goes. Overridden filter via RUST_LOG.
    #[arg(long, default_value = "plane-melody.log")]
    pub log_file: PathBuf,
}

// ── Tuning ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    pub start_x: f64,
    /// Plane flies right on its own until it reaches this x.
    pub cruise_x: f64,
    pub vertical_speed: f64,
    /// Quick ascend/descend distance, in world units.
    pub jump_distance: f64,
    pub detection_radius: f64,
    pub trail_scroll: f64,
}

#[derive(Debug, Clone)]
pub struct EnergyConfig {
    pub start: f64,
    pub lose_threshold: f64,
    pub win_threshold: f64,
    /// Per second.
    pub regen_rate: f64,
    /// Per tick while listening.
    pub listen_penalty: f64,
    pub jump_cost: f64,
}

#[derive(Debug, Clone)]
pub struct PitchConfig {
    pub base_freq: f64,
    pub unit: f64,
    pub scale: [i64; 7],
}

#[derive(Debug, Clone)]
pub struct ToneConfig {
    pub duration: f64,
    pub harmonics: usize,
    pub volume: f64,
}

#[derive(Debug, Clone)]
pub struct MusicConfig {
    pub melody: ToneConfig,
    pub harmony: ToneConfig,
    pub sample_interval: f64,
    pub harmony_interval: f64,
    /// Scale-degree distances a harmony note may sit from the melody.
    pub harmony_steps: Vec<i64>,
    pub percussion_duration: f64,
}

#[derive(Debug, Clone)]
pub struct SpawnConfig {
    pub interval_ticks: u32,
    pub x_jitter: f64,
    pub y_margin: f64,
    pub size: f64,
    pub bird_chance: f64,
    pub bird_speed: (u32, u32),
    pub owl_speed: (u32, u32),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub world: WorldConfig,
    pub energy: EnergyConfig,
    pub pitch: PitchConfig,
    pub music: MusicConfig,
    pub spawn: SpawnConfig,
    pub seed: u64,
    pub mute: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            world: WorldConfig {
                width: 1100.0,
                height: 600.0,
                start_x: 100.0,
                cruise_x: 550.0,
                vertical_speed: 3.0,
                jump_distance: 50.0,
                detection_radius: 85.0,
                trail_scroll: 5.0,
            },
            energy: EnergyConfig {
                start: 200.0,
                lose_threshold: 0.0,
                win_threshold: 500.0,
                regen_rate: 2.6,
                listen_penalty: 0.11,
                jump_cost: 5.8,
            },
            pitch: PitchConfig {
                base_freq: 440.0,
                unit: 10.0,
                scale: MAJOR,
            },
            music: MusicConfig {
                melody: ToneConfig {
                    duration: 1.0,
                    harmonics: 6,
                    volume: 0.2,
                },
                harmony: ToneConfig {
                    duration: 2.0,
                    harmonics: 4,
                    volume: 0.12,
                },
                sample_interval: 0.1,
                harmony_interval: 2.0,
                harmony_steps: vec![2, 4, 7],
                percussion_duration: 0.5,
            },
            spawn: SpawnConfig {
                interval_ticks: 40,
                x_jitter: 200.0,
                y_margin: 20.0,
                size: 100.0,
                bird_chance: 0.39,
                bird_speed: (3, 5),
                owl_speed: (4, 7),
            },
            seed: 0,
            mute: false,
        }
    }
}

impl Config {
    pub fn from_args(args: &Args) -> Self {
        let mut cfg = Config::default();
        cfg.seed = args.seed;
        cfg.mute = args.mute;
        cfg.pitch.base_freq = args.base_freq;

        let volume = args.volume.clamp(0.0, 1.0);
        let ratio = cfg.music.harmony.volume / cfg.music.melody.volume;
        cfg.music.melody.volume = volume;
        cfg.music.harmony.volume = volume * ratio;

        // Starting on a threshold would end the run on the first tick.
        let e = &mut cfg.energy;
        let lo = e.lose_threshold + 1.0;
        let hi = e.win_threshold - 1.0;
        e.start = args.start_energy.clamp(lo, hi);
        cfg
    }

    /// The horizontal line whose pitch is `base_freq`.
    pub fn reference_y(&self) -> f64 {
        self.world.height / 2.0
    }
}
