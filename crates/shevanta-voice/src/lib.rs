//! # Shevanta Voice - request-scoped voice assistant core
//!
//! Turns an uploaded clip (or plain text) into a canned reply and a synthesized
//! answer the caller can fetch later by identifier.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Voice Orchestrator                       │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐    │
//! │  │ SpeechToText │→ │   Selector   │→ │   TextToSpeech   │    │
//! │  │ (mr → en)    │  │ (first match)│  │ clone → tts → ∅  │    │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘    │
//! │                                               ↓              │
//! │                                     ┌──────────────────┐     │
//! │            GET /api/get-audio/{id} ←│  ArtifactStore   │     │
//! │                                     │   (TTL sweep)    │     │
//! │                                     └──────────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod selector;
pub mod store;
pub mod stt;
pub mod tts;

pub use audio::{pcm_f32_to_wav, pcm_i16_to_wav, silent_wav, WavInfo};
pub use config::{
    LanguageConfig, PlaceholderConfig, SttConfig, StoreConfig, TtsConfig, VoiceConfig,
};
pub use error::{VoiceError, VoiceResult};
pub use orchestrator::{
    audio_url, build_orchestrator, SpeechReply, Stage, VoiceOrchestrator, VoiceReply,
    AUDIO_URL_PREFIX,
};
pub use selector::{classify, select_response, Intent, FALLBACK_REPLY};
pub use store::{ArtifactId, ArtifactStore, AudioArtifact, RetentionPolicy};
pub use stt::{
    create_best_stt, DetectedLanguage, OpenAiStt, PlaceholderStt, Recognition, SpeechToText,
    SttBackend, Transcription,
};
pub use tts::{
    build_text_to_speech, ModelStrategy, OpenAiTts, PlaceholderStrategy, Synthesis,
    SynthesisRequest, SynthesisStrategy, TextToSpeech, TtsBackend, VoiceModel, XttsTts,
};
