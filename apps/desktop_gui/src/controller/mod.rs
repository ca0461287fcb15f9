//! Controller layer: UI events, session state transitions, case capture,
//! and command orchestration.

pub mod events;
pub mod orchestration;
pub mod recorder;
pub mod reducer;
