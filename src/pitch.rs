//! Altitude to pitch.
//!
//! Vertical distance from the reference line is quantized into scale
//! degrees, degrees into semitones through a seven-step scale, and
//! semitones into a frequency relative to the base.

use fundsp::math::semitone_ratio;

use crate::config::PitchConfig;

pub const MAJOR: [i64; 7] = [0, 2, 4, 5, 7, 9, 11];

/// A repeating seven-note pattern of semitone offsets from the tonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    steps: [i64; 7],
}

impl Scale {
    pub const fn new(steps: [i64; 7]) -> Self {
        Scale { steps }
    }

    #[cfg(test)]
    pub const fn major() -> Self {
        Scale::new(MAJOR)
    }

    /// Semitone offset of any degree, negative ones included.
    pub fn semitones(&self, degree: i64) -> i64 {
        let len = self.steps.len() as i64;
        self.steps[degree.rem_euclid(len) as usize] + 12 * degree.div_euclid(len)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pitch {
    pub degree: i64,
    pub semitones: i64,
    pub frequency: f64,
    pub midi: i32,
}

#[derive(Debug, Clone)]
pub struct PitchMapper {
    scale: Scale,
    base_freq: f64,
    unit: f64,
}

impl PitchMapper {
    pub fn new(scale: Scale, base_freq: f64, unit: f64) -> Self {
        PitchMapper {
            scale,
            base_freq,
            unit,
        }
    }

    pub fn from_config(cfg: &PitchConfig) -> Self {
        PitchMapper::new(Scale::new(cfg.scale), cfg.base_freq, cfg.unit)
    }

    /// Displacement is positive above the reference line.
    pub fn degree_for(&self, displacement: f64) -> i64 {
        (displacement / self.unit).floor() as i64
    }

    pub fn pitch_for_degree(&self, degree: i64) -> Pitch {
        let semitones = self.scale.semitones(degree);
        let frequency = self.base_freq * semitone_ratio(semitones as f64);
        Pitch {
            degree,
            semitones,
            frequency,
            midi: midi_note(frequency),
        }
    }

    pub fn map(&self, displacement: f64) -> Pitch {
        self.pitch_for_degree(self.degree_for(displacement))
    }

    /// Harmony notes `steps` scale degrees above (or below) `degree`.
    pub fn harmony(&self, degree: i64, above: bool, steps: &[i64]) -> Vec<Pitch> {
        let sign = if above { 1 } else { -1 };
        steps
            .iter()
            .map(|step| self.pitch_for_degree(degree + sign * step))
            .collect()
    }
}

/// Nearest MIDI note, A4 = 440 Hz = 69.
pub fn midi_note(frequency: f64) -> i32 {
    (69.0 + 12.0 * (frequency / 440.0).log2()).round() as i32
}
