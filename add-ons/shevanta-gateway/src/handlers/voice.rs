//! Voice handlers: `/api/process-voice`, `/api/process-text`, `/api/generate-speech`,
//! `/api/get-audio/{identifier}`.
//!
//! The orchestrator blocks on STT/TTS HTTP calls, so every pipeline call runs on
//! `spawn_blocking`. Extractor rejections are folded into the JSON error envelope.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    body::Body,
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        Path, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shevanta_voice::{SpeechReply, VoiceReply, VoiceResult};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: Option<String>,
}

async fn run_blocking<T, F>(context: &'static str, job: F) -> Result<T, ApiError>
where
    F: FnOnce() -> VoiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result.map_err(|e| ApiError::from_voice(e, context)),
        Err(join) => Err(ApiError::internal(format!("{}: {}", context, join))),
    }
}

/// First `audio` field of the upload, if any.
async fn read_audio_field(mut multipart: Multipart) -> Result<Option<Vec<u8>>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), format!("Malformed upload: {}", e.body_text())))?
    {
        if field.name() == Some("audio") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::new(e.status(), format!("Malformed upload: {}", e.body_text())))?;
            return Ok(Some(bytes.to_vec()));
        }
    }
    Ok(None)
}

/// POST /api/process-voice (multipart field `audio`, WAV).
pub async fn process_voice(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VoiceReply>, ApiError> {
    let audio = match multipart {
        Ok(multipart) => read_audio_field(multipart).await?,
        Err(rejection) => {
            debug!(target: "shevanta::gateway", "not a multipart upload: {}", rejection);
            None
        }
    };
    let orchestrator = state.orchestrator.clone();
    let reply = run_blocking("Processing error", move || {
        orchestrator.process_voice(audio.as_deref())
    })
    .await?;
    Ok(Json(reply))
}

/// The `text` field. Unparseable JSON counts as missing text; a body that could not be
/// read at all (too large, aborted) keeps the rejection's own status.
fn text_field(body: Result<Json<TextRequest>, JsonRejection>) -> Result<Option<String>, ApiError> {
    match body {
        Ok(Json(request)) => Ok(request.text),
        Err(rejection @ JsonRejection::BytesRejection(_)) => {
            Err(ApiError::new(rejection.status(), rejection.body_text()))
        }
        Err(rejection) => {
            debug!(target: "shevanta::gateway", "unreadable JSON body: {}", rejection);
            Ok(None)
        }
    }
}

/// POST /api/process-text (`{"text": "..."}`).
pub async fn process_text(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<VoiceReply>, ApiError> {
    let text = text_field(body)?;
    let orchestrator = state.orchestrator.clone();
    let reply = run_blocking("Processing error", move || {
        orchestrator.process_text(text.as_deref())
    })
    .await?;
    Ok(Json(reply))
}

/// POST /api/generate-speech (`{"text": "..."}`): synthesize the text itself.
pub async fn generate_speech(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<SpeechReply>, ApiError> {
    let text = text_field(body)?;
    let orchestrator = state.orchestrator.clone();
    let reply = run_blocking("TTS error", move || {
        orchestrator.generate_speech(text.as_deref())
    })
    .await?;
    Ok(Json(reply))
}

/// GET /api/get-audio/{identifier}: the stored WAV, or 404.
pub async fn get_audio(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Response, ApiError> {
    let clip = state
        .orchestrator
        .fetch_audio(&identifier)
        .ok_or_else(|| ApiError::not_found("Audio file not found"))?;
    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", clip.id),
            ),
        ],
        Body::from(clip.bytes.to_vec()),
    )
        .into_response())
}
