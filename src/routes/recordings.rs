use actix_web::{post, web, HttpResponse};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

pub const MAX_RECORDING_BYTES: usize = 500_000_000;

#[derive(Serialize)]
struct UploadResponse {
    url: String,
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// POST /api/v1/recordings/{name}
/// Store a finished recording blob and return its retrievable URL.
#[post("/api/v1/recordings/{name}")]
pub async fn upload_recording(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let name = path.into_inner();

    if !valid_name(&name) {
        return Err(AppError::BadRequest("invalid recording name".into()));
    }
    if body.is_empty() {
        return Err(AppError::BadRequest("empty recording body".into()));
    }
    if body.len() > MAX_RECORDING_BYTES {
        return Err(AppError::BadRequest("recording too large".into()));
    }

    let store = state
        .recordings
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("recording store not configured".into()))?;

    let url = store.store(&name, body).await?;
    Ok(HttpResponse::Ok().json(UploadResponse { url }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation_rejects_path_tricks() {
        assert!(valid_name("show-42_final"));
        assert!(!valid_name(""));
        assert!(!valid_name("../escape"));
        assert!(!valid_name("a/b"));
        assert!(!valid_name(&"x".repeat(129)));
    }
}
