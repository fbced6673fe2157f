//! Procedural sound buffers. Everything here is a pure function from
//! parameters to interleaved 16-bit stereo samples.

use fundsp::math::sin_hz;
use rand::Rng;

pub const SAMPLE_RATE: u32 = 44100;
pub const CHANNELS: u16 = 2;

const PERCUSSION_HZ: f64 = 100.0;
const PERCUSSION_DECAY: f64 = 5.0;
const NOISE_LEVEL: f64 = 0.2;

/// Interleaved signed 16-bit samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioBuffer {
    fn stereo(mono: impl Iterator<Item = i16>) -> Self {
        let samples = mono.flat_map(|s| [s, s]).collect();
        AudioBuffer {
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
            samples,
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    #[cfg(test)]
    pub fn peak(&self) -> i16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .map_or(0, |p| p.min(i16::MAX as u16) as i16)
    }
}

fn frame_count(duration: f64) -> usize {
    (SAMPLE_RATE as f64 * duration.max(0.0)) as usize
}

fn to_i16(x: f64) -> i16 {
    (x.clamp(-1.0, 1.0) * i16::MAX as f64) as i16
}

/// Additive tone: `harmonic_count` partials at n * `frequency`, each
/// weighted 1/n, normalized to the waveform peak then scaled by `volume`.
pub fn synthesize_tone(
    frequency: f64,
    duration: f64,
    harmonic_count: usize,
    volume: f64,
) -> AudioBuffer {
    let n = frame_count(duration);
    let wave: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE as f64;
            (1..=harmonic_count)
                .map(|h| sin_hz(frequency * h as f64, t) / h as f64)
                .sum()
        })
        .collect();

    let peak = wave.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
    let volume = volume.clamp(0.0, 1.0);
    let gain = if peak > 0.0 { volume / peak } else { 0.0 };

    AudioBuffer::stereo(wave.into_iter().map(|s| to_i16(s * gain)))
}

/// Drum hit: a decaying 100 Hz sine with the same envelope on white noise.
pub fn synthesize_percussion<R: Rng + ?Sized>(duration: f64, rng: &mut R) -> AudioBuffer {
    let n = frame_count(duration);
    let mono: Vec<i16> = (0..n)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE as f64;
            let env = (-PERCUSSION_DECAY * t).exp();
            let noise = rng.gen_range(-1.0..1.0) * NOISE_LEVEL;
            to_i16((sin_hz(PERCUSSION_HZ, t) + noise) * env)
        })
        .collect();
    AudioBuffer::stereo(mono.into_iter())
}
