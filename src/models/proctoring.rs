// src/models/proctoring.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Suspicious client-side events reported during an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "proctoring_event_type")]
pub enum ProctoringEventType {
    #[sqlx(rename = "Tab Switch")]
    #[serde(rename = "Tab Switch")]
    TabSwitch,
    #[sqlx(rename = "Copy Paste")]
    #[serde(rename = "Copy Paste")]
    CopyPaste,
    #[sqlx(rename = "Right Click")]
    #[serde(rename = "Right Click")]
    RightClick,
    #[sqlx(rename = "Fullscreen Exit")]
    #[serde(rename = "Fullscreen Exit")]
    FullscreenExit,
    #[sqlx(rename = "Camera Off")]
    #[serde(rename = "Camera Off")]
    CameraOff,
    #[sqlx(rename = "Microphone Off")]
    #[serde(rename = "Microphone Off")]
    MicrophoneOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "severity_level")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Represents the append-only 'proctoring_logs' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProctoringLog {
    pub id: i64,
    pub submission_id: i64,
    pub user_id: Option<i64>,
    pub event_type: ProctoringEventType,
    pub severity: Severity,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// DTO for logging a proctoring event.
#[derive(Debug, Deserialize, Validate)]
pub struct LogEventRequest {
    pub submission_id: i64,
    pub event_type: ProctoringEventType,
    /// Defaults to Medium when omitted.
    pub severity: Option<Severity>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
}
