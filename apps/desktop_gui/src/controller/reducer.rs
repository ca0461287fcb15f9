//! Session state for the operator console. The conversation log and
//! processing flag live here; every mutation comes from an operator
//! action or an engine event, so the UI layer stays render-only.

use std::collections::BTreeMap;

use shared::{
    domain::{
        ConnectionState, EntryId, ProcessingStatus, Role, DEFAULT_DEVICE_PRESET,
    },
    error::CommandRejected,
    protocol::{EngineEvent, ReasoningStep, TestCase},
};

#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub id: EntryId,
    pub role: Role,
    pub content: String,
    pub thoughts: Vec<ReasoningStep>,
    pub in_progress: bool,
}

impl ConversationEntry {
    fn closed(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: EntryId::new(),
            role,
            content: content.into(),
            thoughts: Vec::new(),
            in_progress: false,
        }
    }
}

/// Ordered transcript with at most one open agent entry. The open
/// entry is tracked by id rather than by position so closing it does
/// not depend on it being last.
#[derive(Debug, Default)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
    open_entry: Option<EntryId>,
}

impl ConversationLog {
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn has_open_entry(&self) -> bool {
        self.open_entry.is_some()
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.entries.push(ConversationEntry::closed(Role::User, text));
    }

    pub fn append_system(&mut self, text: impl Into<String>) {
        self.entries
            .push(ConversationEntry::closed(Role::System, text));
    }

    /// Opens the agent entry that will collect the next task's
    /// reasoning. Any previously open entry is left as-is and simply
    /// stops being the open one.
    pub fn open_agent_entry(&mut self) -> EntryId {
        let entry = ConversationEntry {
            id: EntryId::new(),
            role: Role::Agent,
            content: String::new(),
            thoughts: Vec::new(),
            in_progress: true,
        };
        let id = entry.id;
        self.entries.push(entry);
        self.open_entry = Some(id);
        id
    }

    /// Attaches a reasoning step to the open agent entry, opening a
    /// new one when none is open (a thought arriving after the
    /// response belongs to the next unit of work).
    pub fn push_thought(&mut self, step: ReasoningStep) {
        let id = match self.open_entry {
            Some(id) => id,
            None => self.open_agent_entry(),
        };
        if let Some(entry) = self.entry_mut(id) {
            entry.thoughts.push(step);
        }
    }

    /// Closes the open agent entry with the final response text. A
    /// response with no open entry still lands in the log as a closed
    /// standalone entry.
    pub fn close_with_response(&mut self, data: impl Into<String>) {
        match self.open_entry.take() {
            Some(id) => {
                if let Some(entry) = self.entry_mut(id) {
                    entry.content = data.into();
                    entry.in_progress = false;
                }
            }
            None => {
                self.entries
                    .push(ConversationEntry::closed(Role::Agent, data));
            }
        }
    }

    /// Prompts the operator typed during this session, in order.
    pub fn user_prompts(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.role == Role::User)
            .map(|entry| entry.content.clone())
            .collect()
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut ConversationEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotFrame {
    pub image_b64: String,
}

pub struct Session {
    pub log: ConversationLog,
    pub connection_state: ConnectionState,
    pub processing: ProcessingStatus,
    /// Engine-acknowledged device preset id.
    pub device_preset: String,
    /// Preset selected locally but not yet acknowledged. Display only;
    /// never applied to `device_preset` without a `config_updated`.
    pub pending_preset: Option<String>,
    pub env_overrides: BTreeMap<String, String>,
    pub latest_snapshot: Option<SnapshotFrame>,
    /// Bumped on every snapshot so the UI re-uploads the texture only
    /// when a new frame actually arrived.
    pub snapshot_revision: u64,
    pub cases: Vec<TestCase>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            log: ConversationLog::default(),
            connection_state: ConnectionState::Disconnected,
            processing: ProcessingStatus::Idle,
            device_preset: DEFAULT_DEVICE_PRESET.to_string(),
            pending_preset: None,
            env_overrides: BTreeMap::new(),
            latest_snapshot: None,
            snapshot_revision: 0,
            cases: Vec::new(),
        }
    }
}

impl Session {
    pub fn can_submit(&self) -> bool {
        self.connection_state == ConnectionState::Connected
            && self.processing == ProcessingStatus::Idle
    }

    /// Records an accepted submission: the user entry, the agent
    /// placeholder that will collect thoughts, and the optimistic
    /// running flag all land atomically or not at all.
    pub fn submit_user_request(&mut self, text: &str) -> Result<(), CommandRejected> {
        if self.connection_state != ConnectionState::Connected {
            return Err(CommandRejected::NotConnected);
        }
        if self.processing == ProcessingStatus::Running {
            return Err(CommandRejected::TaskRunning);
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CommandRejected::EmptyRequest);
        }
        self.log.append_user(trimmed);
        self.log.open_agent_entry();
        self.processing = ProcessingStatus::Running;
        Ok(())
    }

    /// Records an accepted replay request. Replay streams back through
    /// the same pipeline as a live submission, so it takes the same
    /// guards and the same optimistic running flag.
    pub fn begin_replay(&mut self) -> Result<(), CommandRejected> {
        if self.connection_state != ConnectionState::Connected {
            return Err(CommandRejected::NotConnected);
        }
        if self.processing == ProcessingStatus::Running {
            return Err(CommandRejected::TaskRunning);
        }
        self.processing = ProcessingStatus::Running;
        Ok(())
    }

    /// Connection loss forces idle. The open entry stays open; only a
    /// response closes entries.
    pub fn apply_connection(&mut self, state: ConnectionState) {
        self.connection_state = state;
        if state != ConnectionState::Connected {
            self.processing = ProcessingStatus::Idle;
        }
    }

    /// Applies one engine event, returning a transient notice for the
    /// UI status line when the event warrants one.
    pub fn apply_engine_event(&mut self, event: EngineEvent) -> Option<String> {
        match event {
            EngineEvent::ProcessingState { status } => {
                self.processing = status;
                None
            }
            EngineEvent::AgentThought(step) => {
                self.log.push_thought(step);
                None
            }
            EngineEvent::Response { data } => {
                self.log.close_with_response(data);
                None
            }
            EngineEvent::BrowserSnapshot { image } => {
                self.latest_snapshot = Some(SnapshotFrame { image_b64: image });
                self.snapshot_revision += 1;
                None
            }
            EngineEvent::ConfigUpdated { preset } => {
                self.pending_preset = None;
                self.device_preset = preset.clone();
                Some(format!("Device preset switched to {preset}"))
            }
            EngineEvent::EnvConfigUpdated(overrides) => {
                self.env_overrides = overrides;
                None
            }
            EngineEvent::SaveCaseSuccess { name, .. } => {
                Some(format!("Saved case \"{name}\""))
            }
            EngineEvent::CasesList(cases) => {
                self.cases = cases;
                None
            }
            EngineEvent::ReportGenerated => Some("Run report generated".to_string()),
        }
    }

    /// The transport refused a submission that already passed local
    /// guards. Roll the optimistic running flag back and close the
    /// placeholder with the failure so the transcript explains itself.
    pub fn submission_failed(&mut self, reason: &str) {
        self.processing = ProcessingStatus::Idle;
        if self.log.has_open_entry() {
            self.log
                .close_with_response(format!("Request failed: {reason}"));
        } else {
            self.log.append_system(format!("Request failed: {reason}"));
        }
    }
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod reducer_tests;
