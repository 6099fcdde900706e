use std::fmt;

use crate::Notice;
use crate::agent::Agent;
use crate::context::CallContext;
use crate::controller::CallController;
use crate::dialer::Dialer;
use crate::error::{CallError, Result};
use crate::session_provider::SessionProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    StartSession,
    DialDirect,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::StartSession => write!(f, "session calls"),
            ActionKind::DialDirect => write!(f, "direct dialing"),
        }
    }
}

/// A session-affecting action waiting for the user to confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    StartSession {
        agent_id: String,
        agent_name: String,
        session_provider_id: String,
    },
    DialDirect {
        agent_id: String,
        agent_name: String,
        telephone_number: String,
    },
}

impl PendingAction {
    pub fn start_session(agent: &Agent) -> Result<Self> {
        match agent.session_provider_id.as_deref() {
            Some(id) if agent.can_start_session() => Ok(PendingAction::StartSession {
                agent_id: agent.id.clone(),
                agent_name: agent.name.clone(),
                session_provider_id: id.to_string(),
            }),
            _ => Err(CallError::ActionUnsupported {
                agent_id: agent.id.clone(),
                action: ActionKind::StartSession,
            }),
        }
    }

    pub fn dial_direct(agent: &Agent) -> Result<Self> {
        match agent.telephone_number.as_deref() {
            Some(number) if agent.can_dial() => Ok(PendingAction::DialDirect {
                agent_id: agent.id.clone(),
                agent_name: agent.name.clone(),
                telephone_number: number.to_string(),
            }),
            _ => Err(CallError::ActionUnsupported {
                agent_id: agent.id.clone(),
                action: ActionKind::DialDirect,
            }),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            PendingAction::StartSession { .. } => ActionKind::StartSession,
            PendingAction::DialDirect { .. } => ActionKind::DialDirect,
        }
    }

    pub fn target_agent_id(&self) -> &str {
        match self {
            PendingAction::StartSession { agent_id, .. } => agent_id,
            PendingAction::DialDirect { agent_id, .. } => agent_id,
        }
    }

    /// The question put to the user.
    pub fn prompt(&self) -> String {
        match self {
            PendingAction::StartSession { agent_name, .. } => {
                format!("Do you want to start a call with {}?", agent_name)
            }
            PendingAction::DialDirect {
                agent_name,
                telephone_number,
                ..
            } => format!("Do you want to call {} at {}?", agent_name, telephone_number),
        }
    }
}

/// Holds at most one [`PendingAction`] between the trigger and the user's answer.
pub struct ConfirmationGate {
    pending: Option<PendingAction>,
    context: CallContext,
}

impl ConfirmationGate {
    pub fn new(context: CallContext) -> Self {
        Self {
            pending: None,
            context,
        }
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    /// Puts an action up for confirmation.
    ///
    /// Returns `false` and drops `action` when another one is already outstanding.
    pub fn propose(&mut self, action: PendingAction) -> bool {
        if let Some(outstanding) = &self.pending {
            tracing::warn!(
                "Dropping proposal for {} while {} awaits confirmation",
                action.target_agent_id(),
                outstanding.target_agent_id()
            );
            return false;
        }
        tracing::debug!("Awaiting confirmation: {}", action.prompt());
        self.context
            .notify(Notice::ConfirmationRequested(action.clone()));
        self.pending = Some(action);
        true
    }

    /// Executes the outstanding action. It is cleared whether or not the execution succeeds.
    pub async fn confirm<P, D>(
        &mut self,
        controller: &mut CallController<P>,
        dialer: &D,
    ) -> Result<ActionKind>
    where
        P: SessionProvider,
        D: Dialer + ?Sized,
    {
        let action = self.pending.take().ok_or(CallError::NothingPending)?;
        let kind = action.kind();
        match action {
            PendingAction::StartSession {
                agent_id,
                session_provider_id,
                ..
            } => {
                controller
                    .request_start(&agent_id, &session_provider_id)
                    .await?;
            }
            PendingAction::DialDirect {
                telephone_number, ..
            } => {
                if let Err(e) = dialer.dial(&telephone_number) {
                    tracing::error!("Failed to hand {} to the dialer: {:#}", telephone_number, e);
                    let error = CallError::Dial {
                        telephone_number,
                        reason: e.to_string(),
                    };
                    self.context.notify(Notice::Failure(error.clone()));
                    return Err(error);
                }
                tracing::info!("Handed {} to the dialer", telephone_number);
                self.context.notify(Notice::Dialing { telephone_number });
            }
        }
        Ok(kind)
    }

    /// Discards the outstanding action without side effects.
    pub fn cancel(&mut self) -> Option<PendingAction> {
        let cancelled = self.pending.take();
        if let Some(action) = &cancelled {
            tracing::debug!("Cancelled action for {}", action.target_agent_id());
        }
        cancelled
    }
}
