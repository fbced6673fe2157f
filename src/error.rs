/// Failures of the audio playback backend.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// No default output device could be opened.
    #[error("audio output unavailable: {0}")]
    Unavailable(#[from] rodio::StreamError),

    /// A sink could not be attached to the output stream.
    #[error("could not start playback: {0}")]
    Play(#[from] rodio::PlayError),
}
