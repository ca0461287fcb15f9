use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseId(pub i64);

/// Identifier of one conversation entry. Assigned at creation, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    System,
}

/// Which stage of the engine's loop produced a reasoning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtPhase {
    Plan,
    Execute,
    Act,
}

/// Analysis mode behind a reasoning step. Informational only; never
/// consulted for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerceptionStrategy {
    Structural,
    Visual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Idle,
    Running,
}

/// A viewport profile the engine can emulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePreset {
    pub id: &'static str,
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
}

pub const DEFAULT_DEVICE_PRESET: &str = "desktop";

pub const DEVICE_PRESETS: &[DevicePreset] = &[
    DevicePreset {
        id: "desktop",
        label: "Desktop",
        width: 1280,
        height: 800,
    },
    DevicePreset {
        id: "iphone-14-pro",
        label: "iPhone 14 Pro",
        width: 393,
        height: 852,
    },
    DevicePreset {
        id: "half-screen",
        label: "Split Screen",
        width: 900,
        height: 1080,
    },
    DevicePreset {
        id: "pixel-7",
        label: "Pixel 7",
        width: 412,
        height: 915,
    },
    DevicePreset {
        id: "ipad-pro",
        label: "iPad Pro",
        width: 1024,
        height: 1366,
    },
];

pub fn device_preset(id: &str) -> Option<&'static DevicePreset> {
    DEVICE_PRESETS.iter().find(|preset| preset.id == id)
}
