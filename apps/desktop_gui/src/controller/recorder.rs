//! Case capture: turning the current conversation into a replayable
//! case draft.

use shared::error::CommandRejected;

use crate::controller::reducer::ConversationLog;

#[derive(Debug, Clone, Default)]
pub struct CaseDraft {
    pub name: String,
    pub description: String,
    pub prompts: Vec<String>,
}

impl CaseDraft {
    /// Captures the operator prompts from the current session. Fails
    /// when there is nothing worth saving.
    pub fn from_conversation(log: &ConversationLog) -> Result<Self, CommandRejected> {
        let prompts = log.user_prompts();
        if prompts.is_empty() {
            return Err(CommandRejected::EmptyCase);
        }
        Ok(Self {
            name: String::new(),
            description: String::new(),
            prompts,
        })
    }

    pub fn validate(&self) -> Result<(), CommandRejected> {
        if self.name.trim().is_empty() {
            return Err(CommandRejected::BlankCaseName);
        }
        if self.prompts.is_empty() {
            return Err(CommandRejected::EmptyCase);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/recorder_tests.rs"]
mod recorder_tests;
