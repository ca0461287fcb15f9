//! UI/backend events and error modeling for the operator console.

use shared::{
    domain::ConnectionState,
    protocol::{EngineEvent, ReportSummary},
};

pub enum UiEvent {
    ConnectionChanged(ConnectionState),
    Engine(EngineEvent),
    SubmissionFailed { reason: String },
    ReportsLoaded(Vec<ReportSummary>),
    Info(String),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    SubmitRequest,
    CaseLibrary,
    ReportHistory,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("malformed")
            || message_lower.contains("empty")
            || message_lower.contains("blank")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("connect")
            || message_lower.contains("network")
            || message_lower.contains("transport")
            || message_lower.contains("unavailable")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// One-line rendering for the status bar, scoped by where the
    /// error came from.
    pub fn status_line(&self) -> String {
        let scope = match self.context {
            UiErrorContext::BackendStartup => "Backend",
            UiErrorContext::SubmitRequest => "Submit",
            UiErrorContext::CaseLibrary => "Case library",
            UiErrorContext::ReportHistory => "Reports",
            UiErrorContext::General => "Engine",
        };
        match self.category {
            UiErrorCategory::Transport => {
                format!("{scope}: {} (check the engine link)", self.message)
            }
            _ => format!("{scope}: {}", self.message),
        }
    }
}
