//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = match &cmd {
        BackendCommand::SubmitRequest { .. } => "submit_request",
        BackendCommand::StopTask => "stop_task",
        BackendCommand::Interact { .. } => "interact",
        BackendCommand::SelectDevicePreset { .. } => "select_device_preset",
        BackendCommand::SetEnvOverride { .. } => "set_env_override",
        BackendCommand::SaveCase { .. } => "save_case",
        BackendCommand::LoadCases => "load_cases",
        BackendCommand::ReplayCase { .. } => "replay_case",
        BackendCommand::FetchReports => "fetch_reports",
        BackendCommand::Reconnect => "reconnect",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Backend command processor disconnected (possible startup/runtime failure); restart the app"
                .to_string();
        }
    }
}
