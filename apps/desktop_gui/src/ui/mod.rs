//! UI layer for the operator console: app shell, transcript, snapshot
//! viewport, case library, and report history.

pub mod app;

pub use app::ConsoleApp;
