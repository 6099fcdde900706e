use crate::gate::ActionKind;

pub type Result<T> = std::result::Result<T, CallError>;

/// Failures at the controller and gate boundary.
///
/// None of these are fatal. They are reported to the user through [`crate::Notice::Failure`]
/// unless [`CallError::is_user_visible`] says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("a call is already in progress with {active_agent_id}")]
    SessionConflict { active_agent_id: String },
    #[error("no active session to stop")]
    NoActiveSession,
    #[error("the call could not be started: {0}")]
    ProviderStartFailure(String),
    #[error("the call could not be ended cleanly: {0}")]
    ProviderEndFailure(String),
    #[error("the call dropped: {0}")]
    ProviderFailure(String),
    #[error("{agent_id} does not support {action}")]
    ActionUnsupported { agent_id: String, action: ActionKind },
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error("no action is awaiting confirmation")]
    NothingPending,
    #[error("could not call {telephone_number}: {reason}")]
    Dial {
        telephone_number: String,
        reason: String,
    },
}

impl CallError {
    /// Benign outcomes of UI races are not shown to the user.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, CallError::NoActiveSession | CallError::NothingPending)
    }
}
