//! JSON error envelope: every failure is `{ "error": "<message>" }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shevanta_voice::VoiceError;
use tracing::{debug, error};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Map a pipeline error. Client errors keep their message; unexpected failures are
    /// prefixed with `context` ("Processing error", "TTS error").
    pub fn from_voice(err: VoiceError, context: &str) -> Self {
        if err.is_client_error() {
            return Self::bad_request(err.to_string());
        }
        match err {
            VoiceError::Service(_) | VoiceError::Tts(_) => Self::internal(err.to_string()),
            other => Self::internal(format!("{}: {}", context, other)),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<VoiceError> for ApiError {
    fn from(err: VoiceError) -> Self {
        Self::from_voice(err, "Processing error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(target: "shevanta::gateway", status = %self.status, "{}", self.message);
        } else {
            debug!(target: "shevanta::gateway", status = %self.status, "{}", self.message);
        }
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_errors_map_to_status() {
        let e = ApiError::from(VoiceError::InputMissing("No text provided".into()));
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.message(), "No text provided");

        let e = ApiError::from(VoiceError::Unintelligible);
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.message(), "Could not understand audio");

        let e = ApiError::from(VoiceError::Service("quota".into()));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message(), "Speech recognition error: quota");

        let e = ApiError::from(VoiceError::Io(std::io::Error::other("disk full")));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message(), "Processing error: IO error: disk full");

        let e = ApiError::from(VoiceError::InvalidAudio("8 bytes is too short for a WAV header".into()));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            e.message(),
            "Processing error: Invalid audio file: 8 bytes is too short for a WAV header"
        );

        let e = ApiError::from_voice(VoiceError::Config("bad".into()), "TTS error");
        assert_eq!(e.message(), "TTS error: Configuration error: bad");
    }
}
