//! Engine-facing client runtime: websocket session supervision, typed
//! command submission with local guard checks, and a broadcast feed of
//! engine events for the UI layer.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use reqwest::Client;
use shared::{
    domain::{CaseId, ConnectionState},
    error::CommandRejected,
    protocol::{ClientCommand, EngineEvent, ReportSummary},
};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
};
use tracing::info;

pub mod reports;
pub mod transport;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod lib_tests;

/// Connection drops are retried this many times before the supervisor
/// gives up and waits for an operator-initiated reconnect.
pub const MAX_CONNECT_ATTEMPTS: u32 = 10;
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Everything the UI needs to observe about the engine session.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    ConnectionChanged(ConnectionState),
    Engine(EngineEvent),
}

struct EngineClientState {
    connection_state: ConnectionState,
    outbound: Option<mpsc::UnboundedSender<ClientCommand>>,
    supervisor: Option<JoinHandle<()>>,
}

pub struct EngineClient {
    engine_url: String,
    http: Client,
    events: broadcast::Sender<ClientEvent>,
    inner: Mutex<EngineClientState>,
}

impl EngineClient {
    pub fn new(engine_url: impl Into<String>) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            engine_url: engine_url.into(),
            http: Client::new(),
            events,
            inner: Mutex::new(EngineClientState {
                connection_state: ConnectionState::Disconnected,
                outbound: None,
                supervisor: None,
            }),
        })
    }

    pub fn engine_url(&self) -> &str {
        &self.engine_url
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.inner.lock().await.connection_state
    }

    /// Starts (or restarts) the session supervisor. Each call gets a
    /// fresh retry budget, so this doubles as the operator reconnect
    /// path after the supervisor has given up.
    pub async fn connect(self: &Arc<Self>) {
        let task = transport::spawn_session_supervisor(Arc::clone(self));
        let mut guard = self.inner.lock().await;
        if let Some(previous) = guard.supervisor.take() {
            previous.abort();
        }
        guard.supervisor = Some(task);
    }

    /// Submits a task request. Rejected locally while disconnected or
    /// when the text is blank; nothing is ever queued for later.
    pub async fn submit_request(&self, text: &str) -> Result<(), CommandRejected> {
        if text.trim().is_empty() {
            return Err(CommandRejected::EmptyRequest);
        }
        self.send(ClientCommand::Message {
            data: text.to_string(),
        })
        .await
    }

    pub async fn stop(&self) -> Result<(), CommandRejected> {
        self.send(ClientCommand::Stop {}).await
    }

    /// Forwards a pointer interaction in normalized page coordinates.
    /// The engine owns coordinate interpretation; no range check here.
    pub async fn interact(&self, x: f64, y: f64) -> Result<(), CommandRejected> {
        self.send(ClientCommand::Interact { x, y }).await
    }

    pub async fn update_config(&self, preset: &str) -> Result<(), CommandRejected> {
        self.send(ClientCommand::UpdateConfig {
            preset: preset.to_string(),
        })
        .await
    }

    pub async fn update_env_config(&self, key: &str, value: &str) -> Result<(), CommandRejected> {
        self.send(ClientCommand::UpdateEnvConfig {
            key: key.to_string(),
            value: value.to_string(),
        })
        .await
    }

    pub async fn save_case(
        &self,
        name: &str,
        description: &str,
        prompts: Vec<String>,
    ) -> Result<(), CommandRejected> {
        if name.trim().is_empty() {
            return Err(CommandRejected::BlankCaseName);
        }
        if prompts.is_empty() {
            return Err(CommandRejected::EmptyCase);
        }
        self.send(ClientCommand::SaveCase {
            name: name.to_string(),
            description: description.to_string(),
            prompts,
        })
        .await
    }

    pub async fn load_cases(&self) -> Result<(), CommandRejected> {
        self.send(ClientCommand::LoadCases {}).await
    }

    pub async fn replay_case(&self, case_id: CaseId) -> Result<(), CommandRejected> {
        self.send(ClientCommand::ReplayCase { case_id }).await
    }

    pub async fn fetch_reports(&self) -> Result<Vec<ReportSummary>> {
        reports::fetch_reports(&self.http, &self.engine_url).await
    }

    pub fn report_url(&self, path: &str) -> String {
        reports::report_url(&self.engine_url, path)
    }

    async fn send(&self, command: ClientCommand) -> Result<(), CommandRejected> {
        let guard = self.inner.lock().await;
        let Some(outbound) = guard.outbound.as_ref() else {
            return Err(CommandRejected::NotConnected);
        };
        if outbound.send(command).is_err() {
            return Err(CommandRejected::NotConnected);
        }
        Ok(())
    }

    pub(crate) async fn set_connection_state(&self, state: ConnectionState) {
        {
            let mut guard = self.inner.lock().await;
            if guard.connection_state == state {
                return;
            }
            guard.connection_state = state;
        }
        info!(?state, "engine connection state changed");
        let _ = self.events.send(ClientEvent::ConnectionChanged(state));
    }

    pub(crate) async fn install_outbound(&self, tx: mpsc::UnboundedSender<ClientCommand>) {
        self.inner.lock().await.outbound = Some(tx);
    }

    pub(crate) async fn clear_outbound(&self) {
        self.inner.lock().await.outbound = None;
    }

    pub(crate) fn emit_engine_event(&self, event: EngineEvent) {
        let _ = self.events.send(ClientEvent::Engine(event));
    }
}
