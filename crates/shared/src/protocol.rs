use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{CaseId, PerceptionStrategy, ProcessingStatus, ThoughtPhase};

/// One discrete unit of the engine's streamed intermediate reasoning.
///
/// The wire field is named `step` for historical reasons; it carries the
/// phase of the engine loop, not a step index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningStep {
    #[serde(rename = "step")]
    pub phase: ThoughtPhase,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<PerceptionStrategy>,
}

/// A persisted, replayable sequence of prompts. Immutable once stored;
/// the engine side assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: CaseId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub prompts: Vec<String>,
    /// The engine persists naive UTC timestamps (no offset suffix);
    /// RFC 3339 forms are accepted too.
    #[serde(deserialize_with = "deserialize_utc_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn deserialize_utc_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// One generated report artifact, served by the engine's read-only
/// HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: String,
    pub date: String,
    pub path: String,
}

/// Commands the console sends to the engine, framed as
/// `{"event": …, "payload": …}` JSON text messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ClientCommand {
    Message {
        data: String,
    },
    Stop {},
    Interact {
        x: f64,
        y: f64,
    },
    UpdateConfig {
        preset: String,
    },
    UpdateEnvConfig {
        key: String,
        value: String,
    },
    SaveCase {
        name: String,
        description: String,
        prompts: Vec<String>,
    },
    LoadCases {},
    ReplayCase {
        case_id: CaseId,
    },
}

/// Events the engine pushes to the console over the same channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum EngineEvent {
    ProcessingState {
        status: ProcessingStatus,
    },
    AgentThought(ReasoningStep),
    Response {
        data: String,
    },
    BrowserSnapshot {
        /// Base64-encoded image bytes of the latest browser frame.
        image: String,
    },
    ConfigUpdated {
        preset: String,
    },
    EnvConfigUpdated(BTreeMap<String, String>),
    SaveCaseSuccess {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<CaseId>,
    },
    CasesList(Vec<TestCase>),
    ReportGenerated,
}
