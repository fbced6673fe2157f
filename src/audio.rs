use rodio::{OutputStream, OutputStreamHandle, Sink, Source, buffer::SamplesBuffer};
use std::collections::HashMap;

use crate::error::AudioError;
use crate::synth::AudioBuffer;

/// Identity of something handed to the playback backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle(u64);

/// The playback side of the game. Stopping a handle that already
/// finished, or was never known, is a no-op.
pub trait AudioSink {
    fn play(&mut self, buffer: &AudioBuffer, looping: bool) -> Result<VoiceHandle, AudioError>;
    fn stop(&mut self, handle: VoiceHandle);
    fn stop_all(&mut self);
}

// ── rodio ───────────────────────────────────────────────────────────────────

/// One rodio `Sink` per playing handle.
pub struct RodioOutput {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sinks: HashMap<VoiceHandle, Sink>,
    next: u64,
}

impl RodioOutput {
    pub fn open() -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(RodioOutput {
            _stream: stream,
            handle,
            sinks: HashMap::new(),
            next: 0,
        })
    }

    fn reap_finished(&mut self) {
        self.sinks.retain(|_, sink| !sink.empty());
    }
}

impl AudioSink for RodioOutput {
    fn play(&mut self, buffer: &AudioBuffer, looping: bool) -> Result<VoiceHandle, AudioError> {
        self.reap_finished();

        let sink = Sink::try_new(&self.handle)?;
        let source = SamplesBuffer::new(buffer.channels, buffer.sample_rate, buffer.samples.clone());
        if looping {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }

        let id = VoiceHandle(self.next);
        self.next += 1;
        let _ = self.sinks.insert(id, sink);
        Ok(id)
    }

    fn stop(&mut self, handle: VoiceHandle) {
        if let Some(sink) = self.sinks.remove(&handle) {
            sink.stop();
        }
    }

    fn stop_all(&mut self) {
        for (_, sink) in self.sinks.drain() {
            sink.stop();
        }
    }
}

// ── Silent ──────────────────────────────────────────────────────────────────

/// Stand-in used when muted or when no device could be opened.
#[derive(Debug, Default)]
pub struct SilentOutput {
    next: u64,
}

impl AudioSink for SilentOutput {
    fn play(&mut self, _buffer: &AudioBuffer, _looping: bool) -> Result<VoiceHandle, AudioError> {
        let id = VoiceHandle(self.next);
        self.next += 1;
        Ok(id)
    }

    fn stop(&mut self, _handle: VoiceHandle) {}

    fn stop_all(&mut self) {}
}

/// Open the default device, falling back to silence if it is missing.
pub fn open_output(mute: bool) -> Box<dyn AudioSink> {
    if mute {
        tracing::info!("audio muted by request");
        return Box::new(SilentOutput::default());
    }
    match RodioOutput::open() {
        Ok(out) => {
            tracing::info!("audio output opened");
            Box::new(out)
        }
        Err(e) => {
            tracing::warn!(error = %e, "continuing without sound");
            Box::new(SilentOutput::default())
        }
    }
}

// ── Test double ─────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Playing {
        pub looping: bool,
        pub frames: usize,
    }

    /// Remembers what is playing and every start/stop it was asked for.
    #[derive(Debug, Default)]
    pub struct RecordingOutput {
        pub playing: BTreeMap<VoiceHandle, Playing>,
        pub started: usize,
        pub stops: Vec<VoiceHandle>,
        next: u64,
    }

    impl RecordingOutput {
        pub fn looping_count(&self) -> usize {
            self.playing.values().filter(|p| p.looping).count()
        }

        pub fn one_shot_count(&self) -> usize {
            self.playing.values().filter(|p| !p.looping).count()
        }
    }

    impl AudioSink for RecordingOutput {
        fn play(&mut self, buffer: &AudioBuffer, looping: bool) -> Result<VoiceHandle, AudioError> {
            let id = VoiceHandle(self.next);
            self.next += 1;
            self.started += 1;
            let _ = self.playing.insert(
                id,
                Playing {
                    looping,
                    frames: buffer.frames(),
                },
            );
            Ok(id)
        }

        fn stop(&mut self, handle: VoiceHandle) {
            self.stops.push(handle);
            let _ = self.playing.remove(&handle);
        }

        fn stop_all(&mut self) {
            let all: Vec<_> = self.playing.keys().copied().collect();
            for handle in all {
                self.stop(handle);
            }
        }
    }
}
