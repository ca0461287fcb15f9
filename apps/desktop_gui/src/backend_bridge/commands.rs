//! Backend commands queued from UI to backend worker.

use shared::domain::CaseId;

pub enum BackendCommand {
    SubmitRequest {
        text: String,
    },
    StopTask,
    Interact {
        x: f64,
        y: f64,
    },
    SelectDevicePreset {
        preset: String,
    },
    SetEnvOverride {
        key: String,
        value: String,
    },
    SaveCase {
        name: String,
        description: String,
        prompts: Vec<String>,
    },
    LoadCases,
    ReplayCase {
        case_id: CaseId,
    },
    FetchReports,
    Reconnect,
}
