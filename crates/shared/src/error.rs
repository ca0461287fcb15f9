use thiserror::Error;

/// Guard violations. Every variant is raised synchronously and locally,
/// before anything touches the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandRejected {
    #[error("engine link is not connected")]
    NotConnected,
    #[error("a task is already running")]
    TaskRunning,
    #[error("request text is empty")]
    EmptyRequest,
    #[error("conversation has no user turns to record")]
    EmptyCase,
    #[error("case name must not be blank")]
    BlankCaseName,
}
