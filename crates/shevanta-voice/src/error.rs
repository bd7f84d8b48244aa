//! Error types for the Shevanta voice pipeline

use thiserror::Error;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur while handling a voice or text request.
///
/// Synthesis failures never show up here for callers of
/// [`TextToSpeech`](crate::tts::TextToSpeech): they are masked by the fallback
/// chain and only surface as the `degraded` flag on the stored artifact.
#[derive(Error, Debug)]
pub enum VoiceError {
    /// Request carried no audio / no text field.
    #[error("{0}")]
    InputMissing(String),

    /// Upload is not a readable WAV container.
    #[error("Invalid audio file: {0}")]
    InvalidAudio(String),

    /// Every attempted recognition language reported "not understood".
    #[error("Could not understand audio")]
    Unintelligible,

    /// The transcription service itself failed (network, quota, bad response).
    #[error("Speech recognition error: {0}")]
    Service(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    /// True when the caller sent something unusable (maps to HTTP 400).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VoiceError::InputMissing(_) | VoiceError::Unintelligible
        )
    }
}

impl From<config::ConfigError> for VoiceError {
    fn from(err: config::ConfigError) -> Self {
        VoiceError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        assert!(VoiceError::InputMissing("No text provided".into()).is_client_error());
        assert!(!VoiceError::InvalidAudio("short".into()).is_client_error());
        assert!(VoiceError::Unintelligible.is_client_error());
        assert!(!VoiceError::Service("quota".into()).is_client_error());
        assert!(!VoiceError::Tts("down".into()).is_client_error());
    }

    #[test]
    fn messages_match_http_contract() {
        assert_eq!(VoiceError::Unintelligible.to_string(), "Could not understand audio");
        assert_eq!(
            VoiceError::Service("timeout".into()).to_string(),
            "Speech recognition error: timeout"
        );
        assert_eq!(
            VoiceError::InputMissing("No audio file provided".into()).to_string(),
            "No audio file provided"
        );
    }
}
