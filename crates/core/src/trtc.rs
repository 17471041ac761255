//! TRTC (Tencent Real-Time Communication) user signatures.
//!
//! Browsers need a signed `UserSig` to enter a TRTC media session. The
//! signature is an HMAC-SHA256 over a fixed-format content string, keyed by
//! the application's secret key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CoreError;

/// Default signature lifetime in seconds (24 hours).
pub const DEFAULT_EXPIRE_SECS: i64 = 86_400;

type HmacSha256 = Hmac<Sha256>;

/// Credentials for issuing user signatures.
#[derive(Debug, Clone, Default)]
pub struct TrtcConfig {
    /// Application id from the TRTC console; `0` means unset.
    pub sdk_app_id: u64,
    /// Signing secret from the TRTC console.
    pub secret_key: String,
    /// Signature lifetime in seconds.
    pub expire_secs: i64,
}

impl TrtcConfig {
    pub fn is_configured(&self) -> bool {
        self.sdk_app_id != 0 && !self.secret_key.is_empty()
    }

    /// Sign `user_id` with this configuration at `issued_at` (Unix seconds).
    pub fn user_sig(&self, user_id: &str, issued_at: i64) -> Result<String, CoreError> {
        if !self.is_configured() {
            return Err(CoreError::Validation("TRTC credentials are not configured".into()));
        }
        generate_user_sig(
            user_id,
            self.sdk_app_id,
            &self.secret_key,
            issued_at,
            self.expire_secs,
        )
    }
}

/// Build the `"{time}:{expire}:{base64 signature}"` user signature.
pub fn generate_user_sig(
    user_id: &str,
    sdk_app_id: u64,
    secret_key: &str,
    issued_at: i64,
    expire_secs: i64,
) -> Result<String, CoreError> {
    let expire = issued_at
        .checked_add(expire_secs)
        .ok_or_else(|| CoreError::Validation(format!("expiry overflows: {expire_secs}")))?;

    let content = format!(
        "TLS.identifier:{user_id}\nTLS.sdkappid:{sdk_app_id}\nTLS.time:{issued_at}\nTLS.expire:{expire}\n"
    );

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| CoreError::Internal(format!("invalid signing key: {e}")))?;
    mac.update(content.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!("{issued_at}:{expire}:{signature}"))
}
