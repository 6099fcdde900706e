use crate::agent::Agent;
use crate::context::CallContext;
use crate::controller::{CallController, Subscription};
use crate::dialer::Dialer;
use crate::error::{CallError, Result};
use crate::gate::{ActionKind, ConfirmationGate, PendingAction};
use crate::registry::CallSession;
use crate::session_provider::SessionProvider;
use crate::waveform::AnimationHandle;

/// The calling surface: the controller, the gate, the provider subscription and any live
/// waveform animations, opened together and torn down together.
pub struct CallDesk<P: SessionProvider, D: Dialer> {
    context: CallContext,
    controller: CallController<P>,
    gate: ConfirmationGate,
    dialer: D,
    subscription: Option<Subscription>,
    animations: Vec<AnimationHandle>,
}

impl<P: SessionProvider, D: Dialer> CallDesk<P, D> {
    /// Subscribes to the provider's events. Fails if the provider's stream was already taken.
    pub fn open(context: CallContext, provider: P, dialer: D) -> anyhow::Result<Self> {
        let mut controller = CallController::new(provider, context.clone());
        let subscription = controller.subscribe()?;
        Ok(Self {
            gate: ConfirmationGate::new(context.clone()),
            context,
            controller,
            dialer,
            subscription: Some(subscription),
            animations: Vec::new(),
        })
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.gate.pending()
    }

    pub fn current_session(&self) -> Option<CallSession> {
        self.context.current_session()
    }

    /// Proposes `action` for `agent`. Unsupported actions never reach the gate.
    ///
    /// Returns whether the proposal is now the one awaiting confirmation.
    pub fn propose(&mut self, agent: &Agent, action: ActionKind) -> Result<bool> {
        let pending = match action {
            ActionKind::StartSession => PendingAction::start_session(agent),
            ActionKind::DialDirect => PendingAction::dial_direct(agent),
        }?;
        Ok(self.gate.propose(pending))
    }

    pub async fn confirm(&mut self) -> Result<ActionKind> {
        self.gate.confirm(&mut self.controller, &self.dialer).await
    }

    pub fn cancel(&mut self) -> Option<PendingAction> {
        self.gate.cancel()
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.controller.request_stop().await
    }

    /// Ties a waveform animation to this surface so it is cancelled on [`CallDesk::leave`].
    pub fn attach_animation(&mut self, animation: AnimationHandle) {
        self.animations.push(animation);
    }

    /// Leaves the calling surface.
    ///
    /// Stops a live session, cancels every animation, drops any pending confirmation and
    /// unsubscribes from the provider. The provider's end event can no longer arrive after
    /// that, so any session still held is ended locally and the registry is left idle.
    /// Safe to call more than once.
    pub async fn leave(&mut self) {
        match self.controller.request_stop().await {
            Ok(()) => tracing::info!("Ended live session on leave"),
            Err(CallError::NoActiveSession) => {}
            Err(e) => tracing::warn!("Session did not end cleanly on leave: {}", e),
        }
        for animation in &mut self.animations {
            animation.cancel();
        }
        self.animations.clear();
        self.gate.cancel();
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.controller.force_end();
    }
}
