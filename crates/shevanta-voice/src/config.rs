//! Voice configuration loaded from `config/shevanta.toml` and the environment.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | SHEVANTA_CONFIG | config/shevanta | TOML file (extension optional). Missing file is fine. |
//! | SHEVANTA__LANGUAGES__PRIMARY | mr-IN | First recognition language. |
//! | SHEVANTA__LANGUAGES__SECONDARY | en-IN | Retried when the first pass does not understand. |
//! | SHEVANTA__STT__API_KEY / STT_API_KEY / OPENAI_API_KEY | — | Enables OpenAI-compatible STT. |
//! | SHEVANTA__TTS__CLONE_API_URL / XTTS_API_URL | — | Voice-cloning server (primary voice). |
//! | SHEVANTA__TTS__REFERENCE_AUDIO / SHEVANTA_REFERENCE_AUDIO | — | Reference sample for cloning. |
//! | SHEVANTA__TTS__API_KEY / TTS_API_KEY / OPENAI_API_KEY | — | Enables OpenAI-compatible TTS (secondary voice). |
//! | SHEVANTA__STORE__TTL_SECS | 3600 | Lifetime of a generated clip. |

use crate::error::VoiceResult;
use crate::store::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    pub primary: String,
    pub secondary: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            primary: "mr-IN".to_string(),
            secondary: "en-IN".to_string(),
        }
    }
}

/// Speech recognition backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    /// whisper-1, gpt-4o-transcribe, ...
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: None,
            model: "whisper-1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Voice synthesis settings for both the cloning server and the plain TTS API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Base URL of an XTTS server. Unset disables the cloning voice.
    pub clone_api_url: Option<String>,
    /// Speaker name sent to the cloning server when no reference sample exists.
    pub speaker: String,
    /// Reference sample used for cloning when present on disk.
    pub reference_audio: Option<PathBuf>,
    /// Language passed to the cloning model.
    pub language: String,
    pub api_url: String,
    pub api_key: Option<String>,
    /// tts-1 (fast) or tts-1-hd.
    pub model: String,
    pub voice: String,
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            clone_api_url: None,
            speaker: "female".to_string(),
            reference_audio: None,
            language: "en".to_string(),
            api_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            voice: "nova".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    pub sample_rate: u32,
    pub samples: usize,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::audio::PLACEHOLDER_SAMPLE_RATE,
            samples: crate::audio::PLACEHOLDER_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub ttl_secs: u64,
    pub max_artifacts: usize,
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_artifacts: 512,
            sweep_interval_secs: 300,
        }
    }
}

impl StoreConfig {
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            ttl: Duration::from_secs(self.ttl_secs),
            max_artifacts: self.max_artifacts,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub languages: LanguageConfig,
    pub stt: SttConfig,
    pub tts: TtsConfig,
    pub placeholder: PlaceholderConfig,
    pub store: StoreConfig,
    /// Where uploads are staged; system temp dir when unset.
    pub temp_dir: Option<PathBuf>,
}

impl VoiceConfig {
    /// Load config from file and environment. Precedence: `SHEVANTA__*` env > file > defaults,
    /// then legacy variables fill whatever is still unset.
    pub fn load() -> VoiceResult<Self> {
        let config_path =
            std::env::var("SHEVANTA_CONFIG").unwrap_or_else(|_| "config/shevanta".to_string());
        let built = config::Config::builder()
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SHEVANTA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let mut cfg: VoiceConfig = built.try_deserialize()?;
        cfg.apply_legacy_env();
        Ok(cfg)
    }

    /// Fill unset fields from the plain variable names (`STT_API_KEY`, `XTTS_API_URL`, ...).
    pub fn apply_legacy_env(&mut self) {
        let shared_key = env_opt_string("OPENAI_API_KEY");

        if self.stt.api_key.is_none() {
            self.stt.api_key = env_opt_string("STT_API_KEY").or_else(|| shared_key.clone());
        }
        if let Some(url) = env_opt_string("STT_API_URL") {
            if self.stt.api_url == DEFAULT_OPENAI_URL {
                self.stt.api_url = url;
            }
        }
        if let Some(model) = env_opt_string("STT_MODEL") {
            self.stt.model = model;
        }

        if self.tts.clone_api_url.is_none() {
            self.tts.clone_api_url = env_opt_string("XTTS_API_URL");
        }
        if self.tts.reference_audio.is_none() {
            self.tts.reference_audio = env_opt_string("SHEVANTA_REFERENCE_AUDIO").map(PathBuf::from);
        }
        if self.tts.api_key.is_none() {
            self.tts.api_key = env_opt_string("TTS_API_KEY").or(shared_key);
        }
        if let Some(url) = env_opt_string("TTS_API_URL") {
            if self.tts.api_url == DEFAULT_OPENAI_URL {
                self.tts.api_url = url;
            }
        }
        if let Some(model) = env_opt_string("TTS_MODEL") {
            self.tts.model = model;
        }
        if let Some(voice) = env_opt_string("TTS_VOICE") {
            self.tts.voice = voice;
        }
    }

    /// Reference sample if configured *and* present on disk right now.
    pub fn reference_audio(&self) -> Option<&Path> {
        self.tts.reference_audio.as_deref().filter(|p| p.exists())
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
