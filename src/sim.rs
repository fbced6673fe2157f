//! The whole mutable game, owned by the frame loop and advanced one tick
//! at a time. Audio goes out through an `AudioSink`; nothing here draws.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::audio::{AudioSink, VoiceHandle};
use crate::config::Config;
use crate::energy::{Activity, Energy, GameState};
use crate::error::AudioError;
use crate::input::Actions;
use crate::pitch::{Pitch, PitchMapper};
use crate::proximity::{self, ProximityReport, SpawnedObject};
use crate::spawner::Spawner;
use crate::synth::{AudioBuffer, synthesize_percussion};
use crate::voices::{Interval, MAX_HARMONY, Voices};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub x: f64,
    pub y: f64,
}

pub struct Simulation {
    cfg: Config,
    mapper: PitchMapper,
    rng: ChaCha8Rng,
    player: Player,
    objects: Vec<SpawnedObject>,
    spawner: Spawner,
    energy: Energy,
    voices: Voices,
    trail: Vec<(f64, f64)>,
    melody_clock: Interval,
    harmony_clock: Interval,
    drum: AudioBuffer,
    drums: Vec<(VoiceHandle, f64)>,
    pitch: Pitch,
    report: ProximityReport,
    now: f64,
    finished_at: Option<f64>,
}

fn log_audio<T>(result: Result<T, AudioError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "audio playback failed");
            None
        }
    }
}

impl Simulation {
    pub fn new(cfg: Config) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let drum = synthesize_percussion(cfg.music.percussion_duration, &mut rng);
        let mapper = PitchMapper::from_config(&cfg.pitch);
        Simulation {
            player: Player {
                x: cfg.world.start_x,
                y: cfg.reference_y(),
            },
            objects: Vec::new(),
            spawner: Spawner::new(cfg.spawn.clone()),
            energy: Energy::new(cfg.energy.clone()),
            voices: Voices::new(&cfg.music),
            trail: Vec::new(),
            melody_clock: Interval::new(cfg.music.sample_interval),
            harmony_clock: Interval::new(cfg.music.harmony_interval),
            drum,
            drums: Vec::new(),
            pitch: mapper.map(0.0),
            report: ProximityReport::default(),
            now: 0.0,
            finished_at: None,
            mapper,
            rng,
            cfg,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn objects(&self) -> &[SpawnedObject] {
        &self.objects
    }

    pub fn trail(&self) -> &[(f64, f64)] {
        &self.trail
    }

    pub fn energy(&self) -> &Energy {
        &self.energy
    }

    pub fn state(&self) -> GameState {
        self.energy.state()
    }

    pub fn voices(&self) -> &Voices {
        &self.voices
    }

    pub fn report(&self) -> &ProximityReport {
        &self.report
    }

    pub fn is_listening(&self) -> bool {
        self.voices.is_paused()
    }

    /// Seconds since the last reset, frozen once a run is won.
    pub fn elapsed(&self) -> f64 {
        self.finished_at.unwrap_or(self.now)
    }

    /// Distance above the reference line.
    pub fn displacement(&self) -> f64 {
        self.cfg.reference_y() - self.player.y
    }

    /// World y drawn at the top of the screen. Presentation only.
    pub fn camera_offset(&self) -> f64 {
        self.player.y - self.cfg.world.height / 2.0
    }

    /// Frequency shown to the player: what is sounding, else the last sample.
    pub fn frequency(&self) -> f64 {
        self.voices.frequency().unwrap_or(self.pitch.frequency)
    }

    pub fn step<A: AudioSink + ?Sized>(
        &mut self,
        actions: &Actions,
        dt: f64,
        audio: &mut A,
    ) -> Option<GameState> {
        if self.energy.state().is_over() {
            if actions.restart {
                self.reset(audio);
            }
            return None;
        }
        self.now += dt;

        self.fly(actions);
        if actions.free_play {
            self.energy.enter_free_play();
        }
        if actions.percussion {
            self.play_drum(audio);
        }

        let top = self.camera_offset();
        let w = &self.cfg.world;
        if let Some(obj) = self.spawner.tick(&mut self.rng, w.width, top, w.height) {
            self.objects.push(obj);
        }
        self.spawner.advance(&mut self.objects);

        let activity = if actions.listen {
            self.voices.pause(audio);
            self.report = ProximityReport::default();
            Activity::Listening
        } else {
            let _ = log_audio(self.voices.resume(audio));
            let center = (self.player.x, self.player.y);
            self.report = proximity::scan(center, w.detection_radius, &self.objects);
            Activity::Scanning(self.report.delta)
        };

        if let Some(state) = self.energy.tick(dt, activity) {
            self.voices.silence(audio);
            if state == GameState::Win {
                self.finished_at = Some(self.now);
            }
            return Some(state);
        }

        self.expire_sounds(audio);
        self.play_music(dt, audio);
        if !self.voices.is_paused() {
            let scroll = self.cfg.world.trail_scroll;
            for p in &mut self.trail {
                p.0 -= scroll;
            }
            self.trail.retain(|p| p.0 > 0.0);
        }
        None
    }

    fn fly(&mut self, actions: &Actions) {
        let w = &self.cfg.world;
        if actions.up {
            self.player.y -= w.vertical_speed;
        }
        if actions.down {
            self.player.y += w.vertical_speed;
        }
        if actions.quick_ascend && self.energy.try_spend(self.cfg.energy.jump_cost) {
            self.player.y -= w.jump_distance;
        }
        if actions.quick_descend && self.energy.try_spend(self.cfg.energy.jump_cost) {
            self.player.y += w.jump_distance;
        }
        if self.player.x < w.cruise_x {
            self.player.x = (self.player.x + w.vertical_speed).min(w.cruise_x);
        }
    }

    /// Samples the pitch even while listening, so resuming picks up the
    /// plane's current altitude. Trail and harmony wait for the pause to end.
    fn play_music<A: AudioSink + ?Sized>(&mut self, dt: f64, audio: &mut A) {
        let paused = self.voices.is_paused();
        if self.melody_clock.tick(dt) {
            self.pitch = self.mapper.map(self.displacement());
            let _ = log_audio(self.voices.retune(audio, self.pitch.frequency));
            if !paused {
                self.trail.push((self.player.x, self.player.y));
            }
        }
        if !paused && self.harmony_clock.tick(dt) {
            let frequencies = self.harmony_frequencies();
            let _ = log_audio(self.voices.start_harmony(audio, &frequencies, self.now));
        }
    }

    /// 1-3 notes a few scale degrees off the melody, on the side of the
    /// reference line the plane is not on.
    fn harmony_frequencies(&mut self) -> Vec<f64> {
        let steps = &self.cfg.music.harmony_steps;
        if steps.is_empty() {
            return Vec::new();
        }
        let count = self.rng.gen_range(1..=steps.len().min(MAX_HARMONY));
        let chosen: Vec<i64> = steps.choose_multiple(&mut self.rng, count).copied().collect();
        let above = self.displacement() <= 0.0;
        self.mapper
            .harmony(self.pitch.degree, above, &chosen)
            .into_iter()
            .map(|p| p.frequency)
            .collect()
    }

    fn play_drum<A: AudioSink + ?Sized>(&mut self, audio: &mut A) {
        if let Some(handle) = log_audio(audio.play(&self.drum, false)) {
            let until = self.now + self.drum.duration_secs();
            self.drums.push((handle, until));
        }
    }

    fn expire_sounds<A: AudioSink + ?Sized>(&mut self, audio: &mut A) {
        self.voices.expire_harmony(audio, self.now);
        let now = self.now;
        self.drums.retain(|&(handle, until)| {
            if until <= now {
                audio.stop(handle);
                false
            } else {
                true
            }
        });
    }

    fn stop_all<A: AudioSink + ?Sized>(&mut self, audio: &mut A) {
        self.voices.silence(audio);
        for (handle, _) in self.drums.drain(..) {
            audio.stop(handle);
        }
    }

    /// Back to a fresh run: sound off, sky empty, energy at its start value.
    pub fn reset<A: AudioSink + ?Sized>(&mut self, audio: &mut A) {
        self.stop_all(audio);
        self.energy.reset();
        self.player = Player {
            x: self.cfg.world.start_x,
            y: self.cfg.reference_y(),
        };
        self.objects.clear();
        self.spawner.reset();
        self.trail.clear();
        self.melody_clock.reset();
        self.harmony_clock.reset();
        self.pitch = self.mapper.map(0.0);
        self.report = ProximityReport::default();
        self.now = 0.0;
        self.finished_at = None;
        tracing::info!("run reset");
    }

    /// Silence everything before the process exits.
    pub fn shutdown<A: AudioSink + ?Sized>(&mut self, audio: &mut A) {
        self.stop_all(audio);
        audio.stop_all();
        tracing::info!("audio stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::RecordingOutput;
    use crate::proximity::ObjectKind;
    use crate::voices::Melody;

    const DT: f64 = 1.0 / 60.0;

    fn config() -> Config {
        let mut cfg = Config::default();
        cfg.seed = 42;
        // Short buffers keep the tests quick.
        cfg.music.melody.duration = 0.01;
        cfg.music.harmony.duration = 0.05;
        cfg.music.percussion_duration = 0.05;
        cfg
    }

    fn run(sim: &mut Simulation, audio: &mut RecordingOutput, actions: Actions, ticks: usize) {
        for _ in 0..ticks {
            let _ = sim.step(&actions, DT, audio);
        }
    }

    #[test]
    fn melody_follows_altitude() {
        let mut sim = Simulation::new(config());
        let mut audio = RecordingOutput::default();

        run(&mut sim, &mut audio, Actions::default(), 12);
        assert_eq!(sim.frequency(), 440.0);
        assert_eq!(audio.looping_count(), 1);

        let up = Actions {
            up: true,
            ..Actions::default()
        };
        run(&mut sim, &mut audio, up, 20);
        assert!(sim.displacement() >= 60.0);
        assert!(sim.frequency() > 440.0);
        assert_eq!(audio.looping_count(), 1);
        assert!(!sim.trail().is_empty());
    }

    #[test]
    fn camera_does_not_move_the_pitch() {
        let mut sim = Simulation::new(config());
        sim.player.y = 245.0;
        assert_eq!(sim.camera_offset(), -55.0);
        assert_eq!(sim.displacement(), 55.0);
    }

    #[test]
    fn listening_silences_and_costs_energy() {
        let mut sim = Simulation::new(config());
        let mut audio = RecordingOutput::default();
        run(&mut sim, &mut audio, Actions::default(), 12);
        let before = sim.energy().score();

        let listen = Actions {
            listen: true,
            ..Actions::default()
        };
        run(&mut sim, &mut audio, listen, 30);
        assert!(sim.is_listening());
        assert_eq!(audio.looping_count(), 0);
        assert!(sim.report().nearby.is_empty());
        let expected = before + 30.0 * (2.6 * DT - 0.11);
        assert!((sim.energy().score() - expected).abs() < 1e-6);

        run(&mut sim, &mut audio, Actions::default(), 1);
        assert!(!sim.is_listening());
        assert_eq!(audio.looping_count(), 1);
    }

    #[test]
    fn melody_resumes_at_the_altitude_reached_while_listening() {
        let mut sim = Simulation::new(config());
        let mut audio = RecordingOutput::default();
        run(&mut sim, &mut audio, Actions::default(), 12);
        assert_eq!(sim.frequency(), 440.0);

        let climb_quietly = Actions {
            listen: true,
            up: true,
            ..Actions::default()
        };
        run(&mut sim, &mut audio, climb_quietly, 30);
        assert_eq!(audio.looping_count(), 0);
        assert!(sim.frequency() > 440.0);

        run(&mut sim, &mut audio, Actions::default(), 1);
        assert_eq!(audio.looping_count(), 1);
        let tracked = sim.frequency();
        assert!(tracked > 440.0);
        assert!(
            matches!(sim.voices().melody(), Melody::Sounding { frequency, .. } if frequency == tracked)
        );
    }

    #[test]
    fn quick_ascend_jumps_five_degrees_for_a_price() {
        let mut sim = Simulation::new(config());
        let mut audio = RecordingOutput::default();
        let jump = Actions {
            quick_ascend: true,
            ..Actions::default()
        };
        let _ = sim.step(&jump, 0.0, &mut audio);
        assert_eq!(sim.displacement(), 50.0);
        assert!(sim.energy().score() < 200.0 - 5.0);
    }

    /// Ticks until the first harmony cycle fires.
    fn first_harmony(sim: &mut Simulation, audio: &mut RecordingOutput) -> usize {
        for tick in 1..=130 {
            let _ = sim.step(&Actions::default(), DT, audio);
            if !sim.voices().harmony().is_empty() {
                return tick;
            }
        }
        panic!("no harmony within 130 ticks");
    }

    #[test]
    fn harmony_cycles_with_at_most_three_tones() {
        let mut sim = Simulation::new(config());
        let mut audio = RecordingOutput::default();
        let tick = first_harmony(&mut sim, &mut audio);
        assert!((119..=122).contains(&tick), "{tick}");

        let n = sim.voices().harmony().len();
        assert!((1..=3).contains(&n), "{n}");
        assert_eq!(audio.one_shot_count(), n);
        // On the reference line the harmony sits above the melody.
        let harmony = sim.voices().harmony();
        assert!(harmony.iter().all(|h| h.frequency > 440.0 && h.frequency <= 880.0));

        // Harmony buffers are short here, so the deadline cuts them off.
        run(&mut sim, &mut audio, Actions::default(), 10);
        assert!(sim.voices().harmony().is_empty());
        assert_eq!(audio.one_shot_count(), 0);
    }

    #[test]
    fn harmony_sits_below_when_flying_above_the_line() {
        let mut sim = Simulation::new(config());
        let mut audio = RecordingOutput::default();
        sim.player.y = 200.0;
        let _ = first_harmony(&mut sim, &mut audio);

        assert!(sim.displacement() > 0.0);
        let melody = sim.frequency();
        assert!(melody > 440.0);
        let harmony = sim.voices().harmony();
        assert!(!harmony.is_empty());
        assert!(harmony.iter().all(|h| h.frequency < melody), "{harmony:?}");
    }

    #[test]
    fn harmony_choice_is_reproducible_from_the_seed() {
        let collect = || {
            let mut sim = Simulation::new(config());
            let mut audio = RecordingOutput::default();
            let _ = first_harmony(&mut sim, &mut audio);
            sim.voices().harmony().iter().map(|h| h.frequency).collect::<Vec<_>>()
        };
        assert_eq!(collect(), collect());
    }

    #[test]
    fn winning_stops_sound_once_and_restart_resets() {
        let mut cfg = config();
        cfg.energy.start = 499.0;
        cfg.energy.regen_rate = 120.0;
        let mut sim = Simulation::new(cfg);
        let mut audio = RecordingOutput::default();

        let _ = sim.voices.retune(&mut audio, 440.0);
        sim.objects.push(SpawnedObject {
            x: 900.0,
            y: 300.0,
            speed: 1.0,
            kind: ObjectKind::Owl,
        });

        assert_eq!(sim.step(&Actions::default(), DT, &mut audio), Some(GameState::Win));
        assert!(audio.playing.is_empty());
        let stops = audio.stops.len();
        assert!(sim.elapsed() > 0.0);

        for _ in 0..5 {
            assert_eq!(sim.step(&Actions::default(), DT, &mut audio), None);
        }
        assert_eq!(sim.state(), GameState::Win);
        assert_eq!(audio.stops.len(), stops);

        let restart = Actions {
            restart: true,
            ..Actions::default()
        };
        assert_eq!(sim.step(&restart, DT, &mut audio), None);
        assert_eq!(sim.state(), GameState::Running);
        assert!(sim.objects().is_empty());
        assert_eq!(sim.energy().score(), 499.0);
        assert_eq!(sim.elapsed(), 0.0);
    }

    #[test]
    fn draining_energy_loses() {
        let mut cfg = config();
        cfg.energy.start = 1.0;
        cfg.energy.regen_rate = 0.0;
        let mut sim = Simulation::new(cfg);
        let mut audio = RecordingOutput::default();
        let listen = Actions {
            listen: true,
            ..Actions::default()
        };
        let transitions: Vec<_> = (0..20)
            .filter_map(|_| sim.step(&listen, DT, &mut audio))
            .collect();
        assert_eq!(transitions, [GameState::Lose]);
    }

    #[test]
    fn drum_is_tracked_until_it_ends() {
        let mut sim = Simulation::new(config());
        let mut audio = RecordingOutput::default();
        let hit = Actions {
            percussion: true,
            ..Actions::default()
        };
        let _ = sim.step(&hit, DT, &mut audio);
        assert_eq!(audio.one_shot_count(), 1);
        assert!(audio.playing.values().any(|p| !p.looping && p.frames == 2205));
        run(&mut sim, &mut audio, Actions::default(), 5);
        assert_eq!(audio.one_shot_count(), 0);
    }

    #[test]
    fn shutdown_leaves_nothing_playing() {
        let mut sim = Simulation::new(config());
        let mut audio = RecordingOutput::default();
        let hit = Actions {
            percussion: true,
            ..Actions::default()
        };
        let _ = sim.step(&hit, DT, &mut audio);
        run(&mut sim, &mut audio, Actions::default(), 125);
        assert!(!audio.playing.is_empty());

        sim.shutdown(&mut audio);
        assert!(audio.playing.is_empty());
    }

    #[test]
    fn objects_drift_in_and_out() {
        let mut sim = Simulation::new(config());
        let mut audio = RecordingOutput::default();
        run(&mut sim, &mut audio, Actions::default(), 40);
        assert_eq!(sim.objects().len(), 1);
        run(&mut sim, &mut audio, Actions::default(), 2000);
        assert!(sim.objects().iter().all(|o| o.x >= -50.0));
    }
}
