use std::path::PathBuf;
use std::str::FromStr;

use axum::http::HeaderValue;
use voicechat_core::pairing::DEFAULT_PAIR_ROOM_ID;
use voicechat_core::rooms::DEFAULT_HISTORY_LIMIT;
use voicechat_core::trtc::{TrtcConfig, DEFAULT_EXPIRE_SECS};

/// Password accepted by `/api/verify-admin` when `ADMIN_PASSWORD` is unset.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which origins the CORS layer admits.
#[derive(Debug, Clone)]
pub enum CorsOrigins {
    /// `*`: any origin, without credentials.
    Any,
    /// An explicit allow-list, with credentials.
    List(Vec<HeaderValue>),
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development and for the
/// container image.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: CorsOrigins,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Directory served for unmatched GET paths (default: `frontend`).
    pub static_dir: PathBuf,
    /// Directory holding `admin.html` and `guest.html` (default: `templates`).
    pub templates_dir: PathBuf,
    /// Password checked by `/api/verify-admin`.
    pub admin_password: String,
    /// Id reported for the admin/guest pair room.
    pub pair_room_id: String,
    /// Chat messages retained per room.
    pub room_history_limit: usize,
    /// Seconds between WebSocket heartbeat pings (default: `25`).
    pub ws_ping_interval_secs: u64,
    pub trtc: TrtcConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                 | Default                  |
    /// |-------------------------|--------------------------|
    /// | `HOST`                  | `0.0.0.0`                |
    /// | `PORT`                  | `5000`                   |
    /// | `CORS_ORIGINS`          | `*`                      |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                     |
    /// | `STATIC_DIR`            | `frontend`               |
    /// | `TEMPLATES_DIR`         | `templates`              |
    /// | `ADMIN_PASSWORD`        | `admin123`               |
    /// | `PAIR_ROOM_ID`          | `ADMIN-VOICE-ROOM-2024`  |
    /// | `ROOM_HISTORY_LIMIT`    | `200`                    |
    /// | `WS_PING_INTERVAL_SECS` | `25`                     |
    /// | `TRTC_SDK_APP_ID`       | `0` (unset)              |
    /// | `TRTC_SECRET_KEY`       | empty                    |
    /// | `TRTC_EXPIRE_SECS`      | `86400`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let cors_origins = parse_cors_origins(&text("CORS_ORIGINS", "*"))?;

        let trtc = TrtcConfig {
            sdk_app_id: parsed(&lookup, "TRTC_SDK_APP_ID", 0)?,
            secret_key: text("TRTC_SECRET_KEY", ""),
            expire_secs: positive(&lookup, "TRTC_EXPIRE_SECS", DEFAULT_EXPIRE_SECS)?,
        };

        Ok(Self {
            host: text("HOST", "0.0.0.0"),
            port: parsed(&lookup, "PORT", 5000)?,
            cors_origins,
            request_timeout_secs: parsed(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            static_dir: PathBuf::from(text("STATIC_DIR", "frontend")),
            templates_dir: PathBuf::from(text("TEMPLATES_DIR", "templates")),
            admin_password: text("ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
            pair_room_id: text("PAIR_ROOM_ID", DEFAULT_PAIR_ROOM_ID),
            room_history_limit: parsed(&lookup, "ROOM_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
            ws_ping_interval_secs: parsed(&lookup, "WS_PING_INTERVAL_SECS", 25)?,
            trtc,
        })
    }

    pub fn uses_default_admin_password(&self) -> bool {
        self.admin_password == DEFAULT_ADMIN_PASSWORD
    }
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value,
            reason: e.to_string(),
        }),
    }
}

/// Like [`parsed`], but rejects zero and negative values.
fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: i64,
) -> Result<i64, ConfigError> {
    let value = parsed(lookup, var, default)?;
    if value <= 0 {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

fn parse_cors_origins(raw: &str) -> Result<CorsOrigins, ConfigError> {
    let origins: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if origins.is_empty() || origins.contains(&"*") {
        return Ok(CorsOrigins::Any);
    }

    origins
        .into_iter()
        .map(|o| {
            HeaderValue::from_str(o).map_err(|e| ConfigError::Invalid {
                var: "CORS_ORIGINS",
                value: o.to_string(),
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(CorsOrigins::List)
}
