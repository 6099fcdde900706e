use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::Notice;
use crate::registry::{CallSession, SessionRegistry, SessionState};

/// Application-level state shared by the controller, the gate, provider event handlers and
/// the feedback surface.
///
/// Cloning is cheap and every clone sees the same registry. Event handlers keep a clone, so
/// they stay valid after the surface that subscribed them is gone.
#[derive(Clone)]
pub struct CallContext {
    registry: Arc<Mutex<SessionRegistry>>,
    notices: mpsc::Sender<Notice>,
}

impl CallContext {
    /// Creates an empty registry and the notice channel the surface should drain.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notice>) {
        let (notices, notice_rx) = mpsc::channel(capacity.max(1));
        let context = Self {
            registry: Arc::new(Mutex::new(SessionRegistry::new())),
            notices,
        };
        (context, notice_rx)
    }

    /// Runs `f` with the registry locked. Never hold the lock across an await.
    pub fn with_registry<R>(&self, f: impl FnOnce(&mut SessionRegistry) -> R) -> R {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut registry)
    }

    pub fn current_session(&self) -> Option<CallSession> {
        self.with_registry(|registry| registry.current().cloned())
    }

    pub fn state_of(&self, agent_id: &str) -> SessionState {
        self.with_registry(|registry| registry.state_of(agent_id))
    }

    /// True while the provider reports a live call.
    pub fn is_call_active(&self) -> bool {
        self.with_registry(|registry| {
            registry
                .current()
                .is_some_and(|session| session.state == SessionState::Active)
        })
    }

    pub fn notify(&self, notice: Notice) {
        if let Err(e) = self.notices.try_send(notice) {
            tracing::warn!("Failed to deliver notice to the surface: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_registry() {
        let (context, _notices) = CallContext::new(4);
        let other = context.clone();

        context
            .with_registry(|registry| registry.begin("a", "provider-a"))
            .unwrap();

        assert_eq!(other.state_of("a"), SessionState::Requesting);
        assert!(!other.is_call_active());
    }

    #[test]
    fn notify_survives_a_full_channel() {
        let (context, mut notices) = CallContext::new(1);
        context.notify(Notice::Dialing {
            telephone_number: "1".to_string(),
        });
        context.notify(Notice::Dialing {
            telephone_number: "2".to_string(),
        });

        assert_eq!(
            notices.try_recv().unwrap(),
            Notice::Dialing {
                telephone_number: "1".to_string()
            }
        );
        assert!(notices.try_recv().is_err());
    }
}
