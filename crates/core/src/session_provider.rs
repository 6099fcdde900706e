use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Lifecycle events a voice-session provider reports back, in the order it emits them.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// The call is live. Providers that know which session started pass its provider id.
    SessionStarted { session_provider_id: Option<String> },
    /// The call is over. Always authoritative, whichever side ended it.
    SessionEnded { reason: Option<String> },
    /// The provider failed after accepting the start request.
    Failed(String),
}

/// An external real-time voice service that the controller starts and stops calls against.
///
/// Both operations only issue the command. Whether the call actually went live or ended is
/// reported later on the stream returned by `events`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionProvider: Send {
    async fn start_session(&mut self, session_provider_id: &str) -> Result<()>;

    async fn stop_session(&mut self) -> Result<()>;

    /// Hands out the event stream. Providers only give it out once.
    fn events(&mut self) -> Result<tokio::sync::mpsc::Receiver<ProviderEvent>>;
}
