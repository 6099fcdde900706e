use tokio::sync::mpsc;

use crate::Notice;
use crate::context::CallContext;
use crate::error::{CallError, Result};
use crate::registry::{CallSession, SessionState};
use crate::session_provider::{ProviderEvent, SessionProvider};

/// Mediates every interaction with the voice-session provider.
///
/// Commands go out through [`CallController::request_start`] and
/// [`CallController::request_stop`]; the provider's answers come back through
/// [`handle_provider_event`], usually driven by a [`Subscription`].
pub struct CallController<P: SessionProvider> {
    provider: P,
    context: CallContext,
}

impl<P: SessionProvider> CallController<P> {
    pub fn new(provider: P, context: CallContext) -> Self {
        Self { provider, context }
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// Records a `Requesting` session and asks the provider to start it.
    ///
    /// Returns once the command is issued; the session only becomes `Active` when the
    /// provider reports the start.
    pub async fn request_start(&mut self, agent_id: &str, session_provider_id: &str) -> Result<()> {
        if let Err(e) = self
            .context
            .with_registry(|registry| registry.begin(agent_id, session_provider_id))
        {
            tracing::warn!("Rejected session start for {}: {}", agent_id, e);
            self.context.notify(Notice::Failure(e.clone()));
            return Err(e);
        }

        tracing::info!(
            "Requesting session for {} (provider id {})",
            agent_id,
            session_provider_id
        );

        if let Err(e) = self.provider.start_session(session_provider_id).await {
            tracing::error!("Provider rejected session start for {}: {:#}", agent_id, e);
            self.context
                .with_registry(|registry| registry.discard(agent_id, SessionState::Requesting));
            let error = CallError::ProviderStartFailure(e.to_string());
            self.context.notify(Notice::Failure(error.clone()));
            return Err(error);
        }

        self.context.notify(Notice::SessionRequested {
            agent_id: agent_id.to_string(),
        });
        Ok(())
    }

    /// Moves the live session to `Ending` and asks the provider to stop it.
    ///
    /// With nothing live this is a no-op that reports [`CallError::NoActiveSession`]; the
    /// provider may already have ended the call on its own.
    pub async fn request_stop(&mut self) -> Result<()> {
        let Some(session) = self.context.with_registry(|registry| registry.mark_ending()) else {
            tracing::debug!("Stop requested with no live session, ignoring");
            return Err(CallError::NoActiveSession);
        };

        tracing::info!("Ending session for {}", session.agent_id);

        if let Err(e) = self.provider.stop_session().await {
            tracing::error!("Provider failed to stop session for {}: {:#}", session.agent_id, e);
            let ended = self.context.with_registry(|registry| {
                registry.discard(&session.agent_id, SessionState::Ending)
            });
            let error = CallError::ProviderEndFailure(e.to_string());
            self.context.notify(Notice::Failure(error.clone()));
            if let Some(ended) = ended {
                self.context.notify(Notice::SessionEnded {
                    duration: ended.elapsed(),
                    agent_id: ended.agent_id,
                });
            }
            return Err(error);
        }
        Ok(())
    }

    /// Drops whatever session the registry still holds, without waiting for the provider.
    ///
    /// For teardown, once provider events are no longer applied.
    pub fn force_end(&self) -> Option<CallSession> {
        let session = self.context.with_registry(|registry| registry.end_current())?;
        tracing::info!("Force-ended session for {}", session.agent_id);
        self.context.notify(Notice::SessionEnded {
            duration: session.elapsed(),
            agent_id: session.agent_id.clone(),
        });
        Some(session)
    }

    /// Takes the provider's event stream and starts applying it to the registry.
    pub fn subscribe(&mut self) -> anyhow::Result<Subscription> {
        let events = self.provider.events()?;
        Ok(Subscription::spawn(self.context.clone(), events))
    }
}

/// Applies one provider event to the registry.
///
/// Safe to call at any time: events that match no local session are logged and dropped.
pub fn handle_provider_event(context: &CallContext, event: ProviderEvent) {
    match event {
        ProviderEvent::SessionStarted {
            session_provider_id,
        } => {
            match context
                .with_registry(|registry| registry.mark_active(session_provider_id.as_deref()))
            {
                Some(session) => {
                    tracing::info!("Session for {} is active", session.agent_id);
                    context.notify(Notice::SessionStarted {
                        agent_id: session.agent_id,
                    });
                }
                None => {
                    tracing::warn!(
                        "Ignoring stray session start (provider id {:?})",
                        session_provider_id
                    );
                }
            }
        }
        ProviderEvent::SessionEnded { reason } => {
            match context.with_registry(|registry| registry.end_current()) {
                Some(session) => {
                    tracing::info!(
                        "Session for {} ended ({})",
                        session.agent_id,
                        reason.as_deref().unwrap_or("no reason given")
                    );
                    context.notify(Notice::SessionEnded {
                        duration: session.elapsed(),
                        agent_id: session.agent_id,
                    });
                }
                None => {
                    tracing::warn!("Ignoring stray session end ({:?})", reason);
                }
            }
        }
        ProviderEvent::Failed(reason) => {
            let ended = context.with_registry(|registry| {
                let prior = registry.current().map(|session| session.state);
                registry.end_current().zip(prior)
            });
            match ended {
                Some((session, SessionState::Requesting)) => {
                    tracing::error!("Session for {} failed to start: {}", session.agent_id, reason);
                    context.notify(Notice::Failure(CallError::ProviderStartFailure(reason)));
                }
                Some((session, _)) => {
                    tracing::error!("Session for {} failed: {}", session.agent_id, reason);
                    context.notify(Notice::Failure(CallError::ProviderFailure(reason)));
                    context.notify(Notice::SessionEnded {
                        duration: session.elapsed(),
                        agent_id: session.agent_id,
                    });
                }
                None => {
                    tracing::warn!("Ignoring provider failure with no session: {}", reason);
                }
            }
        }
    }
}

/// A running pump from the provider's event stream into the registry.
///
/// Dropping it unsubscribes.
pub struct Subscription {
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Subscription {
    pub fn spawn(context: CallContext, mut events: mpsc::Receiver<ProviderEvent>) -> Self {
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                handle_provider_event(&context, event);
            }
            tracing::debug!("Provider event stream closed");
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops applying provider events. Calling it again does nothing.
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Unsubscribed from provider events");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_provider::MockSessionProvider;

    fn drain(notices: &mut mpsc::Receiver<Notice>) -> Vec<Notice> {
        let mut drained = Vec::new();
        while let Ok(notice) = notices.try_recv() {
            drained.push(notice);
        }
        drained
    }

    fn accepting_provider() -> MockSessionProvider {
        let mut provider = MockSessionProvider::new();
        provider.expect_start_session().returning(|_| Ok(()));
        provider.expect_stop_session().returning(|| Ok(()));
        provider
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn start_moves_to_requesting_and_calls_provider() {
        let (context, mut notices) = CallContext::new(16);
        let mut provider = MockSessionProvider::new();
        provider
            .expect_start_session()
            .withf(|id| id == "7224bb63")
            .times(1)
            .returning(|_| Ok(()));
        let mut controller = CallController::new(provider, context.clone());

        controller.request_start("sales-pro", "7224bb63").await.unwrap();

        assert_eq!(context.state_of("sales-pro"), SessionState::Requesting);
        assert_eq!(
            drain(&mut notices),
            vec![Notice::SessionRequested {
                agent_id: "sales-pro".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn second_start_is_a_conflict() {
        let (context, mut notices) = CallContext::new(16);
        let mut provider = MockSessionProvider::new();
        provider
            .expect_start_session()
            .times(1)
            .returning(|_| Ok(()));
        let mut controller = CallController::new(provider, context.clone());

        controller.request_start("a", "provider-a").await.unwrap();
        let result = controller.request_start("b", "provider-b").await;

        let conflict = CallError::SessionConflict {
            active_agent_id: "a".to_string(),
        };
        assert_eq!(result, Err(conflict.clone()));
        assert_eq!(context.state_of("a"), SessionState::Requesting);
        assert_eq!(context.state_of("b"), SessionState::Idle);
        assert!(drain(&mut notices).contains(&Notice::Failure(conflict)));
    }

    #[tokio::test]
    async fn at_most_one_live_session_across_many_starts() {
        let (context, _notices) = CallContext::new(64);
        let mut controller = CallController::new(accepting_provider(), context.clone());

        for i in 0..8 {
            let agent = format!("agent-{}", i);
            let _ = controller.request_start(&agent, "provider").await;
            if i % 3 == 0 {
                handle_provider_event(
                    &context,
                    ProviderEvent::SessionStarted {
                        session_provider_id: None,
                    },
                );
            }
            let live = context.with_registry(|registry| {
                registry
                    .snapshot()
                    .iter()
                    .filter(|session| session.state.is_live())
                    .count()
            });
            assert!(live <= 1);
        }
    }

    #[tokio::test]
    async fn provider_start_failure_rolls_back() {
        let (context, mut notices) = CallContext::new(16);
        let mut provider = MockSessionProvider::new();
        provider
            .expect_start_session()
            .returning(|_| Err(anyhow::anyhow!("assistant not found")));
        let mut controller = CallController::new(provider, context.clone());

        let result = controller.request_start("a", "provider-a").await;

        assert!(matches!(result, Err(CallError::ProviderStartFailure(_))));
        assert_eq!(context.state_of("a"), SessionState::Idle);
        assert!(context.current_session().is_none());
        assert!(matches!(
            drain(&mut notices).as_slice(),
            [Notice::Failure(CallError::ProviderStartFailure(_))]
        ));
    }

    #[tokio::test]
    async fn stop_without_session_is_a_no_op() {
        let (context, mut notices) = CallContext::new(16);
        let mut provider = MockSessionProvider::new();
        provider.expect_stop_session().never();
        let mut controller = CallController::new(provider, context.clone());

        assert_eq!(controller.request_stop().await, Err(CallError::NoActiveSession));
        assert_eq!(controller.request_stop().await, Err(CallError::NoActiveSession));
        assert!(context.current_session().is_none());
        assert!(drain(&mut notices).is_empty());
    }

    #[tokio::test]
    async fn stop_active_session_moves_to_ending() {
        let (context, _notices) = CallContext::new(16);
        let mut provider = MockSessionProvider::new();
        provider.expect_start_session().returning(|_| Ok(()));
        provider.expect_stop_session().times(1).returning(|| Ok(()));
        let mut controller = CallController::new(provider, context.clone());

        controller.request_start("a", "provider-a").await.unwrap();
        handle_provider_event(
            &context,
            ProviderEvent::SessionStarted {
                session_provider_id: Some("provider-a".to_string()),
            },
        );
        assert!(context.is_call_active());

        controller.request_stop().await.unwrap();
        assert_eq!(context.state_of("a"), SessionState::Ending);

        // Ending is not live; a second stop has nothing to do.
        assert_eq!(controller.request_stop().await, Err(CallError::NoActiveSession));
    }

    #[tokio::test]
    async fn stop_failure_rolls_back_to_idle() {
        let (context, mut notices) = CallContext::new(16);
        let mut provider = MockSessionProvider::new();
        provider.expect_start_session().returning(|_| Ok(()));
        provider
            .expect_stop_session()
            .returning(|| Err(anyhow::anyhow!("socket gone")));
        let mut controller = CallController::new(provider, context.clone());

        controller.request_start("a", "provider-a").await.unwrap();
        let result = controller.request_stop().await;

        assert!(matches!(result, Err(CallError::ProviderEndFailure(_))));
        assert_eq!(context.state_of("a"), SessionState::Idle);
        let notices = drain(&mut notices);
        assert!(
            notices
                .iter()
                .any(|n| matches!(n, Notice::Failure(CallError::ProviderEndFailure(_))))
        );
    }

    #[tokio::test]
    async fn remote_end_wins_over_local_stop() {
        let (context, _notices) = CallContext::new(16);
        let mut controller = CallController::new(accepting_provider(), context.clone());

        controller.request_start("a", "provider-a").await.unwrap();
        handle_provider_event(
            &context,
            ProviderEvent::SessionStarted {
                session_provider_id: None,
            },
        );
        controller.request_stop().await.unwrap();
        assert_eq!(context.state_of("a"), SessionState::Ending);

        handle_provider_event(&context, ProviderEvent::SessionEnded { reason: None });
        assert_eq!(context.state_of("a"), SessionState::Idle);
        assert!(context.current_session().is_none());
    }

    #[tokio::test]
    async fn remote_end_before_local_stop_makes_stop_a_no_op() {
        let (context, _notices) = CallContext::new(16);
        let mut provider = MockSessionProvider::new();
        provider.expect_start_session().returning(|_| Ok(()));
        provider.expect_stop_session().never();
        let mut controller = CallController::new(provider, context.clone());

        controller.request_start("a", "provider-a").await.unwrap();
        handle_provider_event(
            &context,
            ProviderEvent::SessionStarted {
                session_provider_id: None,
            },
        );
        handle_provider_event(
            &context,
            ProviderEvent::SessionEnded {
                reason: Some("customer-ended-call".to_string()),
            },
        );

        assert_eq!(controller.request_stop().await, Err(CallError::NoActiveSession));
        assert!(context.current_session().is_none());
    }

    #[tokio::test]
    async fn remote_end_while_requesting_goes_straight_to_idle() {
        let (context, mut notices) = CallContext::new(16);
        let mut controller = CallController::new(accepting_provider(), context.clone());

        controller.request_start("a", "provider-a").await.unwrap();
        drain(&mut notices);
        handle_provider_event(&context, ProviderEvent::SessionEnded { reason: None });

        assert_eq!(context.state_of("a"), SessionState::Idle);
        assert_eq!(
            drain(&mut notices),
            vec![Notice::SessionEnded {
                agent_id: "a".to_string(),
                duration: None
            }]
        );
    }

    #[test]
    fn stray_events_are_ignored() {
        let (context, mut notices) = CallContext::new(16);

        handle_provider_event(
            &context,
            ProviderEvent::SessionStarted {
                session_provider_id: Some("nobody".to_string()),
            },
        );
        handle_provider_event(&context, ProviderEvent::SessionEnded { reason: None });
        handle_provider_event(&context, ProviderEvent::Failed("late".to_string()));

        assert!(context.current_session().is_none());
        assert!(drain(&mut notices).is_empty());
    }

    #[tokio::test]
    async fn start_event_for_another_session_is_stray() {
        let (context, _notices) = CallContext::new(16);
        let mut controller = CallController::new(accepting_provider(), context.clone());

        controller.request_start("a", "provider-a").await.unwrap();
        handle_provider_event(
            &context,
            ProviderEvent::SessionStarted {
                session_provider_id: Some("provider-b".to_string()),
            },
        );

        assert_eq!(context.state_of("a"), SessionState::Requesting);
    }

    #[tokio::test]
    async fn failure_while_requesting_is_a_start_failure() {
        let (context, mut notices) = CallContext::new(16);
        let mut controller = CallController::new(accepting_provider(), context.clone());

        controller.request_start("a", "provider-a").await.unwrap();
        drain(&mut notices);
        handle_provider_event(&context, ProviderEvent::Failed("handshake refused".to_string()));

        assert_eq!(context.state_of("a"), SessionState::Idle);
        assert_eq!(
            drain(&mut notices),
            vec![Notice::Failure(CallError::ProviderStartFailure(
                "handshake refused".to_string()
            ))]
        );
    }

    #[tokio::test]
    async fn force_end_frees_an_ending_session() {
        let (context, mut notices) = CallContext::new(16);
        let mut controller = CallController::new(accepting_provider(), context.clone());

        controller.request_start("a", "provider-a").await.unwrap();
        handle_provider_event(
            &context,
            ProviderEvent::SessionStarted {
                session_provider_id: None,
            },
        );
        controller.request_stop().await.unwrap();
        drain(&mut notices);

        let ended = controller.force_end().unwrap();
        assert_eq!(ended.state, SessionState::Idle);
        assert!(context.current_session().is_none());
        assert!(matches!(
            drain(&mut notices).as_slice(),
            [Notice::SessionEnded { agent_id, duration: Some(_) }] if agent_id == "a"
        ));

        assert!(controller.force_end().is_none());
        assert!(drain(&mut notices).is_empty());
        controller.request_start("b", "provider-b").await.unwrap();
    }

    #[tokio::test]
    async fn subscription_applies_events_until_unsubscribed() {
        let (context, _notices) = CallContext::new(16);
        let (event_tx, event_rx) = mpsc::channel(8);
        let mut provider = accepting_provider();
        provider.expect_events().return_once(move || Ok(event_rx));
        let mut controller = CallController::new(provider, context.clone());

        let mut subscription = controller.subscribe().unwrap();
        assert!(subscription.is_subscribed());

        controller.request_start("a", "provider-a").await.unwrap();
        event_tx
            .send(ProviderEvent::SessionStarted {
                session_provider_id: None,
            })
            .await
            .unwrap();
        settle().await;
        assert!(context.is_call_active());

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_subscribed());

        let _ = event_tx
            .send(ProviderEvent::SessionEnded { reason: None })
            .await;
        settle().await;
        assert!(context.is_call_active());
    }
}
