//! Voice Orchestrator - sequences one request through the pipeline
//!
//! `ValidateInput → (Transcribe | UseGivenText) → SelectResponse → Synthesize → Respond`.
//! No retries here; the STT and TTS adapters own their fallbacks. Methods block on
//! HTTP backends, so async callers should run them on a blocking thread.

use crate::config::VoiceConfig;
use crate::error::{VoiceError, VoiceResult};
use crate::selector::select_response;
use crate::store::{ArtifactId, ArtifactStore, AudioArtifact};
use crate::stt::{create_best_stt, SpeechToText};
use crate::tts::{build_text_to_speech, TextToSpeech};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Route prefix under which stored clips are served.
pub const AUDIO_URL_PREFIX: &str = "/api/get-audio/";

/// Retrieval URL for a stored clip.
pub fn audio_url(id: &ArtifactId) -> String {
    format!("{}{}", AUDIO_URL_PREFIX, id)
}

/// Pipeline stage, recorded in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ValidateInput,
    Transcribe,
    UseGivenText,
    SelectResponse,
    Synthesize,
    Respond,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::ValidateInput => "validate_input",
            Stage::Transcribe => "transcribe",
            Stage::UseGivenText => "use_given_text",
            Stage::SelectResponse => "select_response",
            Stage::Synthesize => "synthesize",
            Stage::Respond => "respond",
        };
        f.write_str(s)
    }
}

/// Body of `/process-voice` and `/process-text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceReply {
    pub transcript: String,
    pub response: String,
    pub audio_url: String,
}

/// Body of `/generate-speech`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeechReply {
    pub message: String,
    pub audio_url: String,
    pub text: String,
}

pub struct VoiceOrchestrator {
    stt: SpeechToText,
    tts: TextToSpeech,
}

impl VoiceOrchestrator {
    pub fn new(stt: SpeechToText, tts: TextToSpeech) -> Self {
        Self { stt, tts }
    }

    pub fn stt(&self) -> &SpeechToText {
        &self.stt
    }

    pub fn tts(&self) -> &TextToSpeech {
        &self.tts
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        self.tts.store()
    }

    /// Uploaded audio → transcript → reply → clip.
    pub fn process_voice(&self, audio: Option<&[u8]>) -> VoiceResult<VoiceReply> {
        debug!(target: "shevanta::voice", stage = %Stage::ValidateInput, "process_voice");
        let audio = audio.ok_or_else(|| VoiceError::InputMissing("No audio file provided".to_string()))?;

        debug!(target: "shevanta::voice", stage = %Stage::Transcribe, bytes = audio.len());
        let transcription = self.stt.transcribe(audio)?;

        self.reply_to(transcription.text)
    }

    /// Given text → reply → clip.
    pub fn process_text(&self, text: Option<&str>) -> VoiceResult<VoiceReply> {
        debug!(target: "shevanta::voice", stage = %Stage::ValidateInput, "process_text");
        let text = text.ok_or_else(|| VoiceError::InputMissing("No text provided".to_string()))?;

        debug!(target: "shevanta::voice", stage = %Stage::UseGivenText, chars = text.chars().count());
        self.reply_to(text.to_string())
    }

    fn reply_to(&self, transcript: String) -> VoiceResult<VoiceReply> {
        debug!(target: "shevanta::voice", stage = %Stage::SelectResponse);
        let response = select_response(&transcript);

        debug!(target: "shevanta::voice", stage = %Stage::Synthesize);
        let synthesis = self.tts.synthesize(response);

        debug!(target: "shevanta::voice", stage = %Stage::Respond, id = %synthesis.artifact_id);
        info!(
            target: "shevanta::voice",
            voice = %synthesis.voice,
            degraded = synthesis.degraded,
            "reply ready"
        );
        Ok(VoiceReply {
            transcript,
            response: response.to_string(),
            audio_url: audio_url(&synthesis.artifact_id),
        })
    }

    /// Synthesize arbitrary text without selecting a reply.
    pub fn generate_speech(&self, text: Option<&str>) -> VoiceResult<SpeechReply> {
        let text = text.ok_or_else(|| VoiceError::InputMissing("No text provided".to_string()))?;
        let synthesis = self.tts.synthesize(text);
        Ok(SpeechReply {
            message: "Speech generated successfully".to_string(),
            audio_url: audio_url(&synthesis.artifact_id),
            text: text.to_string(),
        })
    }

    /// A previously synthesized clip, if still retained.
    pub fn fetch_audio(&self, id: &str) -> Option<AudioArtifact> {
        self.store().get(id)
    }
}

/// Wire STT, the TTS chain and the artifact store from configuration.
pub fn build_orchestrator(cfg: &VoiceConfig) -> VoiceOrchestrator {
    let store = Arc::new(ArtifactStore::new(cfg.store.retention()));
    let mut stt = SpeechToText::new(create_best_stt(&cfg.stt), cfg.languages.clone());
    if let Some(ref dir) = cfg.temp_dir {
        stt = stt.with_temp_dir(dir.clone());
    }
    let tts = build_text_to_speech(cfg, store);
    VoiceOrchestrator::new(stt, tts)
}
