//! **Text-to-Speech (TTS)** — voice models, the fallback chain and artifact storage.
//!
//! `TextToSpeech` walks an ordered list of `SynthesisStrategy`s (cloning voice, plain
//! voice, ...) and always ends with a silent placeholder, so every call yields a stored,
//! playable clip. Voice models are `VoiceModel` handles: loaded on first use, at most once,
//! then shared by every request.

use crate::audio::{silent_wav, WavInfo, PLACEHOLDER_SAMPLES, PLACEHOLDER_SAMPLE_RATE};
use crate::config::{TtsConfig, VoiceConfig};
use crate::error::{VoiceError, VoiceResult};
use crate::store::{ArtifactId, ArtifactStore};
use once_cell::sync::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One synthesis call. `reference_audio` switches cloning backends into voice-cloning mode.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub language: &'a str,
    pub reference_audio: Option<&'a Path>,
}

/// Backend that turns text into WAV bytes.
pub trait TtsBackend: Send + Sync {
    fn name(&self) -> &str;

    fn synthesize(&self, request: &SynthesisRequest<'_>) -> VoiceResult<Vec<u8>>;
}

/// Voice-cloning backend for an XTTS API server (`POST /tts_to_audio/`).
/// With a reference sample the server clones that voice; otherwise it uses `speaker`.
#[derive(Debug, Clone)]
pub struct XttsTts {
    pub base_url: String,
    pub speaker: String,
    client: reqwest::blocking::Client,
}

impl XttsTts {
    pub fn new(base_url: impl Into<String>, speaker: impl Into<String>, timeout: Duration) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            speaker: speaker.into(),
            client,
        })
    }

    pub fn from_config(cfg: &TtsConfig) -> VoiceResult<Self> {
        let base_url = cfg
            .clone_api_url
            .clone()
            .ok_or_else(|| VoiceError::Config("voice cloning requires XTTS_API_URL".to_string()))?;
        Self::new(base_url, cfg.speaker.clone(), Duration::from_secs(cfg.timeout_secs))
    }
}

impl TtsBackend for XttsTts {
    fn name(&self) -> &str {
        "xtts-clone"
    }

    fn synthesize(&self, request: &SynthesisRequest<'_>) -> VoiceResult<Vec<u8>> {
        let url = format!("{}/tts_to_audio/", self.base_url.trim_end_matches('/'));
        let speaker_wav = match request.reference_audio {
            Some(path) => path.display().to_string(),
            None => self.speaker.clone(),
        };
        let body = serde_json::json!({
            "text": request.text,
            "speaker_wav": speaker_wav,
            "language": request.language,
        });
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Tts(format!("XTTS API error {}: {}", status, body)));
        }
        let bytes = res.bytes().map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Plain TTS backend: OpenAI-compatible `/audio/speech`. Ignores the reference sample.
#[derive(Debug, Clone)]
pub struct OpenAiTts {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    pub api_key: String,
    /// tts-1 (fast) or tts-1-hd (higher quality).
    pub model: String,
    pub voice: String,
    client: reqwest::blocking::Client,
}

impl OpenAiTts {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
        timeout: Duration,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            voice: voice.into(),
            client,
        })
    }

    pub fn from_config(cfg: &TtsConfig) -> VoiceResult<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .ok_or_else(|| VoiceError::Config("TTS requires an API key (TTS_API_KEY)".to_string()))?;
        Self::new(
            cfg.api_url.clone(),
            api_key,
            cfg.model.clone(),
            cfg.voice.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }
}

impl TtsBackend for OpenAiTts {
    fn name(&self) -> &str {
        "openai-tts"
    }

    fn synthesize(&self, request: &SynthesisRequest<'_>) -> VoiceResult<Vec<u8>> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(VoiceError::Tts("nothing to synthesize".to_string()));
        }
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "response_format": "wav",
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Tts(format!("TTS API error {}: {}", status, body)));
        }
        let bytes = res.bytes().map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

type ModelLoader = Box<dyn Fn() -> VoiceResult<Box<dyn TtsBackend>> + Send + Sync>;

/// Lazily loaded voice model shared by all requests.
///
/// The loader runs on first `get`; concurrent first callers block until it finishes, so
/// it runs once. A failed load is remembered and reported on every later `get`.
pub struct VoiceModel {
    label: String,
    loader: ModelLoader,
    cell: OnceCell<Result<Box<dyn TtsBackend>, String>>,
}

impl VoiceModel {
    pub fn new<F>(label: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> VoiceResult<Box<dyn TtsBackend>> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// An already-loaded model.
    pub fn ready(label: impl Into<String>, backend: Box<dyn TtsBackend>) -> Self {
        Self {
            label: label.into(),
            loader: Box::new(|| Err(VoiceError::Config("model was preloaded".to_string()))),
            cell: OnceCell::with_value(Ok(backend)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether loading has been attempted (successfully or not).
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> VoiceResult<&dyn TtsBackend> {
        let loaded = self.cell.get_or_init(|| {
            info!(target: "shevanta::voice", model = %self.label, "loading voice model");
            match (self.loader)() {
                Ok(backend) => {
                    info!(target: "shevanta::voice", model = %self.label, backend = backend.name(), "voice model ready");
                    Ok(backend)
                }
                Err(e) => {
                    warn!(target: "shevanta::voice", model = %self.label, "voice model failed to load: {}", e);
                    Err(e.to_string())
                }
            }
        });
        match loaded {
            Ok(backend) => Ok(backend.as_ref()),
            Err(e) => Err(VoiceError::Tts(format!("{} unavailable: {}", self.label, e))),
        }
    }
}

impl fmt::Debug for VoiceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceModel")
            .field("label", &self.label)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// One step of the synthesis fallback chain.
pub trait SynthesisStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn render(&self, request: &SynthesisRequest<'_>) -> VoiceResult<Vec<u8>>;
}

/// Synthesize through a voice model; output must be a non-empty WAV.
#[derive(Debug)]
pub struct ModelStrategy {
    model: VoiceModel,
}

impl ModelStrategy {
    pub fn new(model: VoiceModel) -> Self {
        Self { model }
    }
}

impl SynthesisStrategy for ModelStrategy {
    fn name(&self) -> &str {
        self.model.label()
    }

    fn render(&self, request: &SynthesisRequest<'_>) -> VoiceResult<Vec<u8>> {
        let backend = self.model.get()?;
        let bytes = backend.synthesize(request)?;
        if bytes.is_empty() {
            return Err(VoiceError::Tts(format!("{} returned no audio", self.name())));
        }
        WavInfo::parse(&bytes)
            .map_err(|e| VoiceError::Tts(format!("{} returned unplayable audio: {}", self.name(), e)))?;
        Ok(bytes)
    }
}

/// Silent clip with a valid header; cannot fail.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderStrategy {
    pub sample_rate: u32,
    pub samples: usize,
}

impl Default for PlaceholderStrategy {
    fn default() -> Self {
        Self {
            sample_rate: PLACEHOLDER_SAMPLE_RATE,
            samples: PLACEHOLDER_SAMPLES,
        }
    }
}

impl PlaceholderStrategy {
    pub fn silence(&self) -> Vec<u8> {
        silent_wav(self.sample_rate, self.samples)
    }
}

impl SynthesisStrategy for PlaceholderStrategy {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn render(&self, _request: &SynthesisRequest<'_>) -> VoiceResult<Vec<u8>> {
        Ok(self.silence())
    }
}

/// Result of a synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub artifact_id: ArtifactId,
    /// Strategy that produced the clip.
    pub voice: String,
    /// True when anything other than the first strategy produced the clip.
    pub degraded: bool,
}

/// Synthesis adapter: ordered strategies, placeholder last, results stored for retrieval.
pub struct TextToSpeech {
    strategies: Vec<Box<dyn SynthesisStrategy>>,
    placeholder: PlaceholderStrategy,
    store: Arc<ArtifactStore>,
    language: String,
    reference_audio: Option<PathBuf>,
}

impl TextToSpeech {
    pub fn new(store: Arc<ArtifactStore>, language: impl Into<String>) -> Self {
        Self {
            strategies: Vec::new(),
            placeholder: PlaceholderStrategy::default(),
            store,
            language: language.into(),
            reference_audio: None,
        }
    }

    /// Append a strategy; earlier strategies are preferred.
    pub fn with_strategy(mut self, strategy: Box<dyn SynthesisStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with_model(self, model: VoiceModel) -> Self {
        self.with_strategy(Box::new(ModelStrategy::new(model)))
    }

    pub fn with_placeholder(mut self, placeholder: PlaceholderStrategy) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Reference sample for cloning; only used while the file exists.
    pub fn with_reference_audio(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference_audio = Some(path.into());
        self
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Strategy names in the order they are tried, placeholder included.
    pub fn chain(&self) -> Vec<String> {
        self.strategies
            .iter()
            .map(|s| s.name().to_string())
            .chain(std::iter::once(self.placeholder.name().to_string()))
            .collect()
    }

    /// Synthesize `text` and store the clip. Never fails: when every strategy fails the
    /// placeholder clip is stored instead.
    pub fn synthesize(&self, text: &str) -> Synthesis {
        let reference_audio = self.reference_audio.as_deref().filter(|p| p.exists());
        let request = SynthesisRequest {
            text,
            language: &self.language,
            reference_audio,
        };

        for (position, strategy) in self.strategies.iter().enumerate() {
            match strategy.render(&request) {
                Ok(bytes) => {
                    if position > 0 {
                        warn!(target: "shevanta::voice", voice = strategy.name(), "synthesis degraded to fallback voice");
                    }
                    return self.keep(bytes, strategy.name(), position > 0);
                }
                Err(e) => {
                    warn!(target: "shevanta::voice", voice = strategy.name(), "synthesis failed: {}", e);
                }
            }
        }

        if !self.strategies.is_empty() {
            warn!(target: "shevanta::voice", "all voices failed, storing placeholder clip");
        }
        self.keep(self.placeholder.silence(), self.placeholder.name(), true)
    }

    fn keep(&self, bytes: Vec<u8>, voice: &str, degraded: bool) -> Synthesis {
        let artifact_id = self.store.insert(bytes, voice, degraded);
        debug!(target: "shevanta::voice", id = %artifact_id, voice, degraded, "speech synthesized");
        Synthesis {
            artifact_id,
            voice: voice.to_string(),
            degraded,
        }
    }
}

/// Build the configured chain: cloning voice (when `clone_api_url` is set), then the
/// OpenAI-compatible voice (when an API key is set), then the placeholder.
pub fn build_text_to_speech(cfg: &VoiceConfig, store: Arc<ArtifactStore>) -> TextToSpeech {
    let mut tts = TextToSpeech::new(store, cfg.tts.language.clone()).with_placeholder(PlaceholderStrategy {
        sample_rate: cfg.placeholder.sample_rate,
        samples: cfg.placeholder.samples,
    });

    if cfg.tts.clone_api_url.is_some() {
        let tts_cfg = cfg.tts.clone();
        tts = tts.with_model(VoiceModel::new("xtts-clone", move || {
            XttsTts::from_config(&tts_cfg).map(|b| Box::new(b) as Box<dyn TtsBackend>)
        }));
    }
    if cfg.tts.api_key.is_some() {
        let tts_cfg = cfg.tts.clone();
        tts = tts.with_model(VoiceModel::new("openai-tts", move || {
            OpenAiTts::from_config(&tts_cfg).map(|b| Box::new(b) as Box<dyn TtsBackend>)
        }));
    }
    if let Some(ref path) = cfg.tts.reference_audio {
        tts = tts.with_reference_audio(path.clone());
    }
    tts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RetentionPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Render = Box<dyn Fn(&SynthesisRequest<'_>) -> VoiceResult<Vec<u8>> + Send + Sync>;

    struct FnTts {
        name: &'static str,
        render: Render,
    }

    impl TtsBackend for FnTts {
        fn name(&self) -> &str {
            self.name
        }

        fn synthesize(&self, request: &SynthesisRequest<'_>) -> VoiceResult<Vec<u8>> {
            (self.render)(request)
        }
    }

    fn model<F>(name: &'static str, render: F) -> VoiceModel
    where
        F: Fn(&SynthesisRequest<'_>) -> VoiceResult<Vec<u8>> + Send + Sync + 'static,
    {
        VoiceModel::ready(
            name,
            Box::new(FnTts {
                name,
                render: Box::new(render),
            }),
        )
    }

    fn store() -> Arc<ArtifactStore> {
        Arc::new(ArtifactStore::new(RetentionPolicy::default()))
    }

    fn tone() -> Vec<u8> {
        crate::audio::pcm_i16_to_wav(&[100, -100, 100, -100], 22_050)
    }

    fn ok_tone(_: &SynthesisRequest<'_>) -> VoiceResult<Vec<u8>> {
        Ok(tone())
    }

    #[test]
    fn primary_voice_used_when_healthy() {
        let store = store();
        let tts = TextToSpeech::new(store.clone(), "en")
            .with_model(model("primary", |_| Ok(tone())))
            .with_model(model("secondary", |_| panic!("must not be reached")));
        let out = tts.synthesize("hello");
        assert_eq!(out.voice, "primary");
        assert!(!out.degraded);
        assert_eq!(&*store.get(out.artifact_id.as_str()).unwrap().bytes, tone().as_slice());
    }

    #[test]
    fn primary_failure_falls_back_to_secondary() {
        let store = store();
        let tts = TextToSpeech::new(store.clone(), "en")
            .with_model(model("primary", |_| Err(VoiceError::Tts("model crashed".into()))))
            .with_model(model("secondary", |_| Ok(tone())));
        let out = tts.synthesize("hello");
        assert_eq!(out.voice, "secondary");
        assert!(out.degraded);
        assert!(store.get(out.artifact_id.as_str()).unwrap().degraded);
    }

    #[test]
    fn every_failure_still_yields_playable_clip() {
        let store = store();
        let tts = TextToSpeech::new(store.clone(), "en")
            .with_model(model("primary", |_| Err(VoiceError::Tts("init failed".into()))))
            .with_model(model("garbage", |_| Ok(b"<html>oops</html>".to_vec())))
            .with_model(model("silent", |_| Ok(Vec::new())));
        let out = tts.synthesize("नमस्कार");
        assert_eq!(out.voice, "placeholder");
        assert!(out.degraded);

        let clip = store.get(out.artifact_id.as_str()).unwrap();
        assert!(!clip.bytes.is_empty());
        let info = WavInfo::parse(&clip.bytes).unwrap();
        assert_eq!(info.channels, 1);
        assert!(info.data_len > 0);
    }

    #[test]
    fn chain_lists_placeholder_last() {
        let tts = TextToSpeech::new(store(), "en")
            .with_model(model("xtts-clone", |_| Ok(tone())))
            .with_model(model("openai-tts", |_| Ok(tone())));
        assert_eq!(tts.chain(), vec!["xtts-clone", "openai-tts", "placeholder"]);
    }

    #[test]
    fn model_loads_once_under_concurrency() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let voice = VoiceModel::new("lazy", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok(Box::new(FnTts {
                name: "lazy",
                render: Box::new(ok_tone),
            }) as Box<dyn TtsBackend>)
        });
        assert!(!voice.is_loaded());

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| assert!(voice.get().is_ok()));
            }
        });
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(voice.is_loaded());
    }

    #[test]
    fn failed_load_is_remembered() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let voice = VoiceModel::new("broken", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(VoiceError::Config("weights missing".into()))
        });
        for _ in 0..3 {
            match voice.get() {
                Err(VoiceError::Tts(msg)) => assert!(msg.contains("weights missing")),
                _ => panic!("expected load failure"),
            }
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reference_sample_only_sent_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let sample = dir.path().join("shevanta_voice.wav");
        let seen: Arc<Mutex<Vec<Option<PathBuf>>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();

        let tts = TextToSpeech::new(store(), "en")
            .with_model(model("clone", move |req| {
                recorder.lock().unwrap().push(req.reference_audio.map(Path::to_path_buf));
                assert_eq!(req.language, "en");
                Ok(tone())
            }))
            .with_reference_audio(&sample);

        tts.synthesize("one");
        std::fs::write(&sample, tone()).unwrap();
        tts.synthesize("two");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[None, Some(sample.clone())]);
    }

    #[test]
    fn openai_tts_requests_wav() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/audio/speech")
            .match_header("authorization", "Bearer sk-tts")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "tts-1",
                "input": "hello",
                "voice": "nova",
                "response_format": "wav",
            })))
            .with_status(200)
            .with_body(tone())
            .create();

        let backend = OpenAiTts::new(server.url(), "sk-tts", "tts-1", "nova", Duration::from_secs(5)).unwrap();
        let bytes = backend
            .synthesize(&SynthesisRequest {
                text: " hello ",
                language: "en",
                reference_audio: None,
            })
            .unwrap();
        assert_eq!(bytes, tone());
        mock.assert();
    }

    #[test]
    fn xtts_sends_reference_or_speaker() {
        let mut server = mockito::Server::new();
        let cloned = server
            .mock("POST", "/tts_to_audio/")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "speaker_wav": "/voices/shevanta.wav",
                "language": "en",
            })))
            .with_status(200)
            .with_body(tone())
            .create();
        let backend = XttsTts::new(server.url(), "female", Duration::from_secs(5)).unwrap();
        backend
            .synthesize(&SynthesisRequest {
                text: "नमस्कार",
                language: "en",
                reference_audio: Some(Path::new("/voices/shevanta.wav")),
            })
            .unwrap();
        cloned.assert();

        let mut plain = mockito::Server::new();
        let _down = plain.mock("POST", "/tts_to_audio/").with_status(503).create();
        let backend = XttsTts::new(plain.url(), "female", Duration::from_secs(5)).unwrap();
        let err = backend
            .synthesize(&SynthesisRequest {
                text: "x",
                language: "en",
                reference_audio: None,
            })
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn configured_chain_follows_config() {
        let mut cfg = VoiceConfig::default();
        assert_eq!(build_text_to_speech(&cfg, store()).chain(), vec!["placeholder"]);

        cfg.tts.clone_api_url = Some("http://127.0.0.1:1".into());
        cfg.tts.api_key = Some("sk".into());
        let tts = build_text_to_speech(&cfg, store());
        assert_eq!(tts.chain(), vec!["xtts-clone", "openai-tts", "placeholder"]);
    }
}
