//! Integration tests for the voice pipeline against mock STT/TTS servers.

use shevanta_voice::{
    build_orchestrator, silent_wav, VoiceConfig, VoiceError, WavInfo, AUDIO_URL_PREFIX,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn tone() -> Vec<u8> {
    shevanta_voice::pcm_f32_to_wav(&[0.0, 0.25, 0.5, 0.25, 0.0, -0.25], 24_000)
}

#[test]
fn unconfigured_service_still_answers_text() {
    init_tracing();
    let orchestrator = build_orchestrator(&VoiceConfig::default());
    assert_eq!(orchestrator.tts().chain(), vec!["placeholder"]);
    assert_eq!(orchestrator.stt().backend_name(), "placeholder");

    let reply = orchestrator.process_text(Some("thank you")).unwrap();
    assert_eq!(reply.response, "तुमचे स्वागत आहे! मला तुमची मदत करून आनंद झाला.");
    let id = reply.audio_url.strip_prefix(AUDIO_URL_PREFIX).unwrap();
    let clip = orchestrator.fetch_audio(id).unwrap();
    assert_eq!(clip.voice, "placeholder");
    assert!(WavInfo::parse(&clip.bytes).is_ok());

    // Without a recognizer, voice requests report a service error.
    assert!(matches!(
        orchestrator.process_voice(Some(&silent_wav(16_000, 160))),
        Err(VoiceError::Service(_))
    ));
}

#[test]
fn full_pipeline_with_remote_backends() {
    init_tracing();
    let mut stt_server = mockito::Server::new();
    let stt_mock = stt_server
        .mock("POST", "/audio/transcriptions")
        .with_status(200)
        .with_body(r#"{"text":"Hello Shevanta"}"#)
        .create();

    let mut xtts_server = mockito::Server::new();
    let xtts_mock = xtts_server
        .mock("POST", "/tts_to_audio/")
        .with_status(500)
        .with_body("CUDA out of memory")
        .expect(2)
        .create();

    let mut tts_server = mockito::Server::new();
    let tts_mock = tts_server
        .mock("POST", "/audio/speech")
        .with_status(200)
        .with_body(tone())
        .expect(2)
        .create();

    let mut cfg = VoiceConfig::default();
    cfg.stt.api_url = stt_server.url();
    cfg.stt.api_key = Some("sk-stt".into());
    cfg.tts.clone_api_url = Some(xtts_server.url());
    cfg.tts.api_url = tts_server.url();
    cfg.tts.api_key = Some("sk-tts".into());

    let orchestrator = build_orchestrator(&cfg);
    assert_eq!(orchestrator.tts().chain(), vec!["xtts-clone", "openai-tts", "placeholder"]);

    let reply = orchestrator
        .process_voice(Some(&silent_wav(16_000, 1600)))
        .unwrap();
    assert_eq!(reply.transcript, "Hello Shevanta");
    assert_eq!(reply.response, "नमस्कार! मी शेवंता आहे. तुम्हाला कसे मदत करू शकते?");

    let id = reply.audio_url.strip_prefix(AUDIO_URL_PREFIX).unwrap();
    let clip = orchestrator.fetch_audio(id).unwrap();
    assert_eq!(clip.voice, "openai-tts");
    assert!(clip.degraded);
    assert_eq!(&*clip.bytes, tone().as_slice());

    let speech = orchestrator.generate_speech(Some("पुन्हा भेटूया")).unwrap();
    assert_eq!(speech.text, "पुन्हा भेटूया");

    stt_mock.assert();
    xtts_mock.assert();
    tts_mock.assert();
}

#[test]
fn unreachable_backends_degrade_to_placeholder() {
    init_tracing();
    let mut cfg = VoiceConfig::default();
    // Nothing listens on port 9 (discard) in the test environment.
    cfg.tts.clone_api_url = Some("http://127.0.0.1:9".into());
    cfg.tts.api_url = "http://127.0.0.1:9".into();
    cfg.tts.api_key = Some("sk".into());
    cfg.tts.timeout_secs = 2;

    let orchestrator = build_orchestrator(&cfg);
    let reply = orchestrator.process_text(Some("bye")).unwrap();
    assert_eq!(reply.response, "अलविदा! पुन्हा भेटूया!");

    let id = reply.audio_url.strip_prefix(AUDIO_URL_PREFIX).unwrap();
    let clip = orchestrator.fetch_audio(id).unwrap();
    assert_eq!(clip.voice, "placeholder");
    let info = WavInfo::parse(&clip.bytes).unwrap();
    assert_eq!(info.sample_rate, 44_100);
    assert_eq!(info.data_len, 2048);
}
