//! Runtime bridge between the UI command queue and the engine client.
//! Owns the backend thread, its tokio runtime, and the event-forward
//! task that feeds engine traffic back to the UI queue.

use std::{sync::Arc, thread};

use client_core::{ClientEvent, EngineClient};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(engine_url: String, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = EngineClient::new(engine_url);

            let mut events = client.subscribe_events();
            let ui_tx_clone = ui_tx.clone();
            tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    let evt = match event {
                        ClientEvent::ConnectionChanged(state) => UiEvent::ConnectionChanged(state),
                        ClientEvent::Engine(event) => UiEvent::Engine(event),
                    };
                    let _ = ui_tx_clone.try_send(evt);
                }
            });

            client.connect().await;
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                handle_command(&client, &ui_tx, cmd).await;
            }
        });
    });
}

async fn handle_command(client: &Arc<EngineClient>, ui_tx: &Sender<UiEvent>, cmd: BackendCommand) {
    match cmd {
        BackendCommand::SubmitRequest { text } => {
            if let Err(rejection) = client.submit_request(&text).await {
                let _ = ui_tx.try_send(UiEvent::SubmissionFailed {
                    reason: rejection.to_string(),
                });
            }
        }
        BackendCommand::StopTask => {
            if let Err(rejection) = client.stop().await {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::General,
                    rejection.to_string(),
                )));
            }
        }
        BackendCommand::Interact { x, y } => {
            if let Err(rejection) = client.interact(x, y).await {
                tracing::debug!(error = %rejection, "dropped pointer interaction");
            }
        }
        BackendCommand::SelectDevicePreset { preset } => {
            if let Err(rejection) = client.update_config(&preset).await {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::General,
                    rejection.to_string(),
                )));
            }
        }
        BackendCommand::SetEnvOverride { key, value } => {
            if let Err(rejection) = client.update_env_config(&key, &value).await {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::General,
                    rejection.to_string(),
                )));
            }
        }
        BackendCommand::SaveCase {
            name,
            description,
            prompts,
        } => {
            if let Err(rejection) = client.save_case(&name, &description, prompts).await {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::CaseLibrary,
                    rejection.to_string(),
                )));
            }
        }
        BackendCommand::LoadCases => {
            if let Err(rejection) = client.load_cases().await {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::CaseLibrary,
                    rejection.to_string(),
                )));
            }
        }
        BackendCommand::ReplayCase { case_id } => {
            // Replay claimed the optimistic running flag; report the
            // rejection through the same path so it gets rolled back.
            if let Err(rejection) = client.replay_case(case_id).await {
                let _ = ui_tx.try_send(UiEvent::SubmissionFailed {
                    reason: rejection.to_string(),
                });
            }
        }
        BackendCommand::FetchReports => match client.fetch_reports().await {
            Ok(reports) => {
                let _ = ui_tx.try_send(UiEvent::ReportsLoaded(reports));
            }
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::ReportHistory,
                    err.to_string(),
                )));
            }
        },
        BackendCommand::Reconnect => {
            client.connect().await;
            let _ = ui_tx.try_send(UiEvent::Info("Reconnecting to engine...".to_string()));
        }
    }
}
