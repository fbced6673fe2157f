//! Which tones are sounding right now, and for how long.
//!
//! One looping melodic voice follows the plane's pitch. Up to three
//! harmony voices are finite tones with their own cutoff deadline.

use crate::audio::{AudioSink, VoiceHandle};
use crate::config::{MusicConfig, ToneConfig};
use crate::error::AudioError;
use crate::synth::synthesize_tone;

pub const MAX_HARMONY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Melody {
    Silent,
    Sounding { frequency: f64, handle: VoiceHandle },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonyTone {
    pub frequency: f64,
    pub handle: VoiceHandle,
    /// Simulation time at which the tone is cut off.
    pub deadline: f64,
}

/// Fires once every `period` seconds of accumulated time. Overshoot
/// carries into the next period so the cadence does not drift.
#[derive(Debug, Clone)]
pub struct Interval {
    period: f64,
    elapsed: f64,
}

impl Interval {
    pub fn new(period: f64) -> Self {
        Interval {
            period,
            elapsed: 0.0,
        }
    }

    pub fn tick(&mut self, dt: f64) -> bool {
        self.elapsed += dt;
        if self.elapsed >= self.period {
            self.elapsed -= self.period;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

#[derive(Debug)]
pub struct Voices {
    melody: Melody,
    /// Last pitch the melody tracked, kept across pauses.
    last_frequency: Option<f64>,
    paused: bool,
    harmony: Vec<HarmonyTone>,
    melody_tone: ToneConfig,
    harmony_tone: ToneConfig,
}

impl Voices {
    pub fn new(cfg: &MusicConfig) -> Self {
        Voices {
            melody: Melody::Silent,
            last_frequency: None,
            paused: false,
            harmony: Vec::new(),
            melody_tone: cfg.melody.clone(),
            harmony_tone: cfg.harmony.clone(),
        }
    }

    #[cfg(test)]
    pub fn melody(&self) -> Melody {
        self.melody
    }

    pub fn frequency(&self) -> Option<f64> {
        self.last_frequency
    }

    pub fn harmony(&self) -> &[HarmonyTone] {
        &self.harmony
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn start_melody<A: AudioSink + ?Sized>(
        &mut self,
        audio: &mut A,
        frequency: f64,
    ) -> Result<(), AudioError> {
        let t = &self.melody_tone;
        let buffer = synthesize_tone(frequency, t.duration, t.harmonics, t.volume);
        let handle = audio.play(&buffer, true)?;
        self.melody = Melody::Sounding { frequency, handle };
        Ok(())
    }

    fn stop_melody<A: AudioSink + ?Sized>(&mut self, audio: &mut A) {
        if let Melody::Sounding { handle, .. } = self.melody {
            audio.stop(handle);
        }
        self.melody = Melody::Silent;
    }

    /// Point the melody at `frequency`. Returns whether a new tone started.
    /// Does nothing while paused beyond remembering the frequency.
    pub fn retune<A: AudioSink + ?Sized>(
        &mut self,
        audio: &mut A,
        frequency: f64,
    ) -> Result<bool, AudioError> {
        if self.paused {
            self.last_frequency = Some(frequency);
            return Ok(false);
        }
        if let Melody::Sounding { frequency: f, .. } = self.melody {
            if f == frequency {
                return Ok(false);
            }
        }
        self.stop_melody(audio);
        self.last_frequency = Some(frequency);
        self.start_melody(audio, frequency)?;
        tracing::trace!(frequency, "melody retuned");
        Ok(true)
    }

    /// Stop everything this player sounds and hold off new tones.
    pub fn pause<A: AudioSink + ?Sized>(&mut self, audio: &mut A) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.stop_melody(audio);
        self.stop_harmony(audio);
        tracing::debug!("voices paused");
    }

    /// Restart the last known pitch, if there is one.
    pub fn resume<A: AudioSink + ?Sized>(&mut self, audio: &mut A) -> Result<(), AudioError> {
        if !self.paused {
            return Ok(());
        }
        self.paused = false;
        tracing::debug!("voices resumed");
        match self.last_frequency {
            Some(frequency) => self.start_melody(audio, frequency),
            None => Ok(()),
        }
    }

    /// Replace the current harmony with `frequencies`, all cut off at
    /// `now` plus the harmony tone duration.
    pub fn start_harmony<A: AudioSink + ?Sized>(
        &mut self,
        audio: &mut A,
        frequencies: &[f64],
        now: f64,
    ) -> Result<(), AudioError> {
        self.stop_harmony(audio);
        if self.paused {
            return Ok(());
        }
        let t = &self.harmony_tone;
        let deadline = now + t.duration;
        for &frequency in frequencies.iter().take(MAX_HARMONY) {
            let buffer = synthesize_tone(frequency, t.duration, t.harmonics, t.volume);
            let handle = audio.play(&buffer, false)?;
            self.harmony.push(HarmonyTone {
                frequency,
                handle,
                deadline,
            });
        }
        Ok(())
    }

    /// Force-stop harmony tones whose deadline has passed.
    pub fn expire_harmony<A: AudioSink + ?Sized>(&mut self, audio: &mut A, now: f64) {
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.harmony)
            .into_iter()
            .partition(|h| h.deadline <= now);
        for h in expired {
            audio.stop(h.handle);
        }
        self.harmony = live;
    }

    fn stop_harmony<A: AudioSink + ?Sized>(&mut self, audio: &mut A) {
        for h in self.harmony.drain(..) {
            audio.stop(h.handle);
        }
    }

    /// Stop every tone and forget all pitch state.
    pub fn silence<A: AudioSink + ?Sized>(&mut self, audio: &mut A) {
        self.stop_melody(audio);
        self.stop_harmony(audio);
        self.last_frequency = None;
        self.paused = false;
    }
}
