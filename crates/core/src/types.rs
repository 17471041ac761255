/// Identifier of a single WebSocket connection (UUID v4 string).
pub type ConnId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
