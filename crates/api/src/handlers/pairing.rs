//! Admin verification for the admin/guest pair room.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use voicechat_core::pairing::verify_password;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyAdminRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyAdminResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

/// POST /api/verify-admin
///
/// A wrong password is a normal `200` answer with `success: false`.
pub async fn verify_admin(
    State(state): State<AppState>,
    Json(input): Json<VerifyAdminRequest>,
) -> Json<VerifyAdminResponse> {
    if verify_password(&state.config.admin_password, &input.password) {
        tracing::info!("Admin password verified");
        return Json(VerifyAdminResponse {
            success: true,
            error: None,
        });
    }

    tracing::warn!("Admin password rejected");
    Json(VerifyAdminResponse {
        success: false,
        error: Some("Invalid password"),
    })
}
