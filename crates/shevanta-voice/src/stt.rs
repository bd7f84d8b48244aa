//! **Speech-to-Text (STT)** — turn an uploaded WAV into text for the reply selector.
//!
//! Implement `SttBackend` for a remote transcription API (or anything else that can
//! read a WAV file). `SpeechToText` stages the upload, runs the primary language and
//! retries once with the secondary language when the first pass did not understand.

use crate::audio::WavInfo;
use crate::config::{LanguageConfig, SttConfig};
use crate::error::{VoiceError, VoiceResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one recognition attempt. Service failures are `Err(VoiceError::Service)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    Text(String),
    NotUnderstood,
}

/// Backend that transcribes a WAV file in a given language (BCP-47, e.g. `mr-IN`).
pub trait SttBackend: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(&self, wav_path: &Path, language: &str) -> VoiceResult<Recognition>;
}

/// Which configured language produced the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectedLanguage {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcription {
    pub text: String,
    pub detected_language: DetectedLanguage,
    /// The language code that was sent with the successful attempt.
    pub language_code: String,
}

/// Placeholder STT: returns a fixed string, or a service error when none is set so an
/// unconfigured deployment reports the problem instead of inventing a transcript.
#[derive(Debug, Default)]
pub struct PlaceholderStt {
    pub response: Option<String>,
}

impl PlaceholderStt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(s: impl Into<String>) -> Self {
        Self {
            response: Some(s.into()),
        }
    }
}

impl SttBackend for PlaceholderStt {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn recognize(&self, _wav_path: &Path, _language: &str) -> VoiceResult<Recognition> {
        match self.response {
            Some(ref r) => Ok(Recognition::Text(r.clone())),
            None => Err(VoiceError::Service(
                "no speech recognition backend configured".to_string(),
            )),
        }
    }
}

/// Production STT backend: OpenAI-compatible transcription API (OpenAI Whisper, local
/// whisper servers exposing `/audio/transcriptions`, ...).
#[derive(Debug, Clone)]
pub struct OpenAiStt {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    client: reqwest::blocking::Client,
}

impl OpenAiStt {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::Config(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    pub fn from_config(cfg: &SttConfig) -> VoiceResult<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .ok_or_else(|| VoiceError::Config("STT requires an API key (STT_API_KEY)".to_string()))?;
        Self::new(
            cfg.api_url.clone(),
            api_key,
            cfg.model.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }
}

/// `mr-IN` → `mr`; the transcription API takes ISO-639-1 hints.
fn iso_639_1(language: &str) -> String {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or(language)
        .to_ascii_lowercase()
}

impl SttBackend for OpenAiStt {
    fn name(&self) -> &str {
        "openai-stt"
    }

    fn recognize(&self, wav_path: &Path, language: &str) -> VoiceResult<Recognition> {
        let wav = std::fs::read(wav_path)?;
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let part = reqwest::blocking::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Service(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", iso_639_1(language));
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| VoiceError::Service(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Service(format!("STT API error {}: {}", status, body)));
        }
        let json: serde_json::Value = res.json().map_err(|e| VoiceError::Service(e.to_string()))?;
        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        if text.is_empty() {
            Ok(Recognition::NotUnderstood)
        } else {
            Ok(Recognition::Text(text))
        }
    }
}

/// Create the best available STT backend from config: OpenAiStt when a key is set,
/// otherwise PlaceholderStt.
pub fn create_best_stt(cfg: &SttConfig) -> Box<dyn SttBackend> {
    if cfg.api_key.is_some() {
        match OpenAiStt::from_config(cfg) {
            Ok(stt) => return Box::new(stt),
            Err(e) => warn!(target: "shevanta::voice", "OpenAI STT unavailable: {}", e),
        }
    }
    Box::new(PlaceholderStt::new())
}

/// Two-language transcription adapter.
pub struct SpeechToText {
    backend: Box<dyn SttBackend>,
    languages: LanguageConfig,
    temp_dir: Option<PathBuf>,
}

impl SpeechToText {
    pub fn new(backend: Box<dyn SttBackend>, languages: LanguageConfig) -> Self {
        Self {
            backend,
            languages,
            temp_dir: None,
        }
    }

    /// Stage uploads under `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn stage_upload(&self, audio: &[u8]) -> VoiceResult<tempfile::NamedTempFile> {
        use std::io::Write;

        let mut builder = tempfile::Builder::new();
        builder.prefix("shevanta-upload-").suffix(".wav");
        let mut file = match self.temp_dir {
            Some(ref dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(audio)?;
        file.flush()?;
        Ok(file)
    }

    /// Transcribe an uploaded WAV. The staged copy is removed when this returns,
    /// whatever the outcome.
    pub fn transcribe(&self, audio: &[u8]) -> VoiceResult<Transcription> {
        let info = WavInfo::parse(audio)?;
        debug!(
            target: "shevanta::voice",
            sample_rate = info.sample_rate,
            channels = info.channels,
            duration_ms = info.duration().as_millis() as u64,
            "upload accepted"
        );

        let upload = self.stage_upload(audio)?;
        let attempts = [
            (DetectedLanguage::Primary, self.languages.primary.as_str()),
            (DetectedLanguage::Secondary, self.languages.secondary.as_str()),
        ];

        for (detected_language, code) in attempts {
            match self.backend.recognize(upload.path(), code)? {
                Recognition::Text(text) if !text.trim().is_empty() => {
                    info!(target: "shevanta::voice", backend = self.backend.name(), language = code, "transcribed");
                    return Ok(Transcription {
                        text: text.trim().to_string(),
                        detected_language,
                        language_code: code.to_string(),
                    });
                }
                _ => {
                    debug!(target: "shevanta::voice", language = code, "speech not understood");
                }
            }
        }

        Err(VoiceError::Unintelligible)
    }
}
