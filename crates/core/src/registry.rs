use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{CallError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Active,
    Ending,
}

impl SessionState {
    /// `Requesting` or `Active`: the states a stop request applies to.
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Requesting | SessionState::Active)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallSession {
    pub agent_id: String,
    pub session_provider_id: String,
    pub state: SessionState,
    pub connected_at: Option<Instant>,
}

impl CallSession {
    /// Time since the provider reported the call as live.
    pub fn elapsed(&self) -> Option<Duration> {
        self.connected_at.map(|at| at.elapsed())
    }
}

/// Which agent is in a call, and in which state.
///
/// Idle sessions are not stored: an agent missing from the map is `Idle`. The provider
/// carries one call at a time, so at most one entry exists; `Ending` still occupies the slot
/// until the provider confirms the end.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, CallSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_of(&self, agent_id: &str) -> SessionState {
        self.sessions
            .get(agent_id)
            .map(|session| session.state)
            .unwrap_or(SessionState::Idle)
    }

    /// The session occupying the provider, in any non-idle state.
    pub fn current(&self) -> Option<&CallSession> {
        self.sessions.values().next()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Records a new session in `Requesting`, unless the provider is already occupied.
    pub fn begin(&mut self, agent_id: &str, session_provider_id: &str) -> Result<()> {
        if let Some(current) = self.current() {
            return Err(CallError::SessionConflict {
                active_agent_id: current.agent_id.clone(),
            });
        }
        self.sessions.insert(
            agent_id.to_string(),
            CallSession {
                agent_id: agent_id.to_string(),
                session_provider_id: session_provider_id.to_string(),
                state: SessionState::Requesting,
                connected_at: None,
            },
        );
        Ok(())
    }

    /// Moves the `Requesting` session to `Active`.
    ///
    /// When the provider names the session it started, only a matching one is promoted.
    /// Returns `None` for a start that matches nothing.
    pub fn mark_active(&mut self, reported_provider_id: Option<&str>) -> Option<CallSession> {
        let session = self.sessions.values_mut().find(|session| {
            session.state == SessionState::Requesting
                && reported_provider_id.is_none_or(|id| id == session.session_provider_id)
        })?;
        session.state = SessionState::Active;
        session.connected_at = Some(Instant::now());
        Some(session.clone())
    }

    /// Moves the live session to `Ending`.
    pub fn mark_ending(&mut self) -> Option<CallSession> {
        let session = self
            .sessions
            .values_mut()
            .find(|session| session.state.is_live())?;
        session.state = SessionState::Ending;
        Some(session.clone())
    }

    /// Removes whichever session is not idle. The removed copy is returned in state `Idle`.
    pub fn end_current(&mut self) -> Option<CallSession> {
        let agent_id = self.current()?.agent_id.clone();
        let mut session = self.sessions.remove(&agent_id)?;
        session.state = SessionState::Idle;
        Some(session)
    }

    /// Removes the session of `agent_id` only if it is still in `state`.
    pub fn discard(&mut self, agent_id: &str, state: SessionState) -> Option<CallSession> {
        if self.state_of(agent_id) != state {
            return None;
        }
        let mut session = self.sessions.remove(agent_id)?;
        session.state = SessionState::Idle;
        Some(session)
    }

    pub fn snapshot(&self) -> Vec<CallSession> {
        self.sessions.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_and_idle() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.state_of("sales-pro"), SessionState::Idle);
        assert!(registry.current().is_none());
    }

    #[test]
    fn begin_rejects_second_session() {
        let mut registry = SessionRegistry::new();
        registry.begin("a", "provider-a").unwrap();

        let result = registry.begin("b", "provider-b");
        assert_eq!(
            result,
            Err(CallError::SessionConflict {
                active_agent_id: "a".to_string()
            })
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.state_of("a"), SessionState::Requesting);
        assert_eq!(registry.state_of("b"), SessionState::Idle);
    }

    #[test]
    fn ending_session_still_blocks_new_start() {
        let mut registry = SessionRegistry::new();
        registry.begin("a", "provider-a").unwrap();
        registry.mark_active(None).unwrap();
        registry.mark_ending().unwrap();

        assert!(registry.mark_ending().is_none());
        assert!(registry.begin("b", "provider-b").is_err());
    }

    #[test]
    fn mark_active_requires_matching_provider_id() {
        let mut registry = SessionRegistry::new();
        registry.begin("a", "provider-a").unwrap();

        assert!(registry.mark_active(Some("provider-z")).is_none());
        assert_eq!(registry.state_of("a"), SessionState::Requesting);

        let session = registry.mark_active(Some("provider-a")).unwrap();
        assert_eq!(session.state, SessionState::Active);
        assert!(session.connected_at.is_some());
    }

    #[test]
    fn mark_active_twice_is_stray() {
        let mut registry = SessionRegistry::new();
        registry.begin("a", "provider-a").unwrap();
        assert!(registry.mark_active(None).is_some());
        assert!(registry.mark_active(None).is_none());
    }

    #[test]
    fn end_current_removes_from_any_state() {
        for advance in 0..3 {
            let mut registry = SessionRegistry::new();
            registry.begin("a", "provider-a").unwrap();
            if advance >= 1 {
                registry.mark_active(None).unwrap();
            }
            if advance >= 2 {
                registry.mark_ending().unwrap();
            }

            let ended = registry.end_current().unwrap();
            assert_eq!(ended.state, SessionState::Idle);
            assert!(registry.is_empty());
        }
    }

    #[test]
    fn discard_only_matches_expected_state() {
        let mut registry = SessionRegistry::new();
        registry.begin("a", "provider-a").unwrap();
        registry.mark_active(None).unwrap();

        assert!(registry.discard("a", SessionState::Requesting).is_none());
        assert_eq!(registry.state_of("a"), SessionState::Active);
        assert!(registry.discard("a", SessionState::Active).is_some());
        assert!(registry.is_empty());
    }
}
