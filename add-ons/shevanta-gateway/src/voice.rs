//! Voice Gateway Controller — startup status logging and the `--synthesize` self-test.

use shevanta_voice::{VoiceConfig, VoiceError, VoiceOrchestrator, VoiceResult};
use std::path::Path;
use tracing::{info, warn};

/// Log current STT and TTS backend status at startup.
pub fn log_voice_status(config: &VoiceConfig, orchestrator: &VoiceOrchestrator) {
    let stt_status = match orchestrator.stt().backend_name() {
        "placeholder" => {
            "STT: [Placeholder] (set STT_API_KEY or OPENAI_API_KEY for real transcription)".to_string()
        }
        name => format!(
            "STT: [{}] languages {} → {}",
            name, config.languages.primary, config.languages.secondary
        ),
    };
    info!(target: "shevanta::voice", "{}", stt_status);

    let chain = orchestrator.tts().chain();
    info!(target: "shevanta::voice", "TTS chain: {}", chain.join(" → "));
    if chain.len() == 1 {
        warn!(
            target: "shevanta::voice",
            "TTS: [Placeholder only] (set XTTS_API_URL or TTS_API_KEY for Shevanta to speak)"
        );
    }
    match (config.reference_audio(), config.tts.reference_audio.as_deref()) {
        (Some(path), _) => {
            info!(target: "shevanta::voice", "Voice cloning reference: {}", path.display())
        }
        (None, Some(path)) => warn!(
            target: "shevanta::voice",
            "Voice cloning reference {} not found; cloning server will use speaker '{}'",
            path.display(),
            config.tts.speaker
        ),
        (None, None) => {}
    }

    let policy = orchestrator.store().policy();
    info!(
        target: "shevanta::voice",
        ttl_secs = policy.ttl.as_secs(),
        max_artifacts = policy.max_artifacts,
        "artifact retention"
    );
}

/// One-shot synthesis through the configured chain; writes the clip to `out`.
/// Returns the voice that produced it.
pub fn run_synthesize(orchestrator: &VoiceOrchestrator, text: &str, out: &Path) -> VoiceResult<String> {
    let synthesis = orchestrator.tts().synthesize(text);
    let clip = orchestrator
        .fetch_audio(synthesis.artifact_id.as_str())
        .ok_or_else(|| VoiceError::Tts("synthesized clip vanished from the store".to_string()))?;
    std::fs::write(out, &clip.bytes[..])?;
    if synthesis.degraded {
        warn!(target: "shevanta::voice", voice = %synthesis.voice, "self-test used a fallback voice");
    }
    Ok(synthesis.voice)
}
