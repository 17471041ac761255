//! Handlers issuing TRTC user signatures to browsers.
//!
//! `/api/trtc/usersig` fails when credentials are missing, while
//! `/api/trtc/config` falls back to a test-mode session so the frontend can
//! still be exercised locally.

use axum::extract::State;
use axum::Json;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Placeholder signature handed out in test mode.
const TEST_MODE_SIGNATURE: &str = "test_signature_for_development";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSigRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSigResponse {
    pub user_sig: String,
    pub sdk_app_id: u64,
    pub user_id: String,
    pub expire_time: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionRequest {
    pub user_id: Option<String>,
    pub room_id: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub sdk_app_id: u64,
    pub user_id: String,
    pub user_sig: String,
    pub room_id: Value,
    pub success: bool,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// POST /api/trtc/usersig
pub async fn generate_usersig(
    State(state): State<AppState>,
    Json(input): Json<UserSigRequest>,
) -> AppResult<Json<UserSigResponse>> {
    let now = chrono::Utc::now().timestamp();
    let user_id = resolve_user_id(input.user_id, || format!("user_{now}"))?;

    let trtc = &state.config.trtc;
    if !trtc.is_configured() {
        return Err(AppError::NotConfigured(
            "TRTC not configured. Please set TRTC_SDK_APP_ID and TRTC_SECRET_KEY environment variables."
                .into(),
        ));
    }

    let user_sig = trtc.user_sig(&user_id, now)?;
    tracing::info!(user_id = %user_id, "Issued TRTC user signature");

    Ok(Json(UserSigResponse {
        user_sig,
        sdk_app_id: trtc.sdk_app_id,
        user_id,
        expire_time: trtc.expire_secs,
    }))
}

/// POST /api/trtc/config
pub async fn session_config(
    State(state): State<AppState>,
    Json(input): Json<SessionRequest>,
) -> AppResult<Json<SessionResponse>> {
    let now = chrono::Utc::now().timestamp();
    let user_id = resolve_user_id(input.user_id, || {
        let suffix: [u8; 4] = rand::rng().random();
        let hex: String = suffix.iter().map(|b| format!("{b:02x}")).collect();
        format!("user_{now}_{hex}")
    })?;
    let room_id = input.room_id.unwrap_or_else(|| Value::from(0));

    tracing::info!(user_id = %user_id, room_id = %room_id, "TRTC session requested");

    let trtc = &state.config.trtc;
    if !trtc.is_configured() {
        tracing::warn!("TRTC not configured, returning test mode session");
        return Ok(Json(SessionResponse {
            sdk_app_id: 0,
            user_id,
            user_sig: TEST_MODE_SIGNATURE.to_string(),
            room_id,
            success: true,
            mode: "test",
            message: Some("TRTC not configured. Running in test mode."),
        }));
    }

    let user_sig = trtc.user_sig(&user_id, now)?;
    Ok(Json(SessionResponse {
        sdk_app_id: trtc.sdk_app_id,
        user_id,
        user_sig,
        room_id,
        success: true,
        mode: "production",
        message: None,
    }))
}

fn resolve_user_id(given: Option<String>, fallback: impl FnOnce() -> String) -> AppResult<String> {
    match given {
        None => Ok(fallback()),
        Some(id) if id.trim().is_empty() => {
            Err(AppError::BadRequest("userId must not be blank".into()))
        }
        Some(id) => Ok(id),
    }
}
