pub mod agent;
pub mod context;
pub mod controller;
pub mod desk;
pub mod dialer;
pub mod error;
pub mod gate;
pub mod registry;
pub mod session_provider;
pub mod waveform;

use std::time::Duration;

use crate::error::CallError;
use crate::gate::PendingAction;

/// User-facing notices that the core logic hands to whatever surface is presenting it.
///
/// The core never prints or renders anything itself; the runtime drains these from the
/// receiver returned by [`context::CallContext::new`].
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// An action is waiting for the user to confirm or cancel it.
    ConfirmationRequested(PendingAction),
    /// The provider accepted the start request; the call is connecting.
    SessionRequested { agent_id: String },
    /// The provider reported the call as live.
    SessionStarted { agent_id: String },
    /// The call is over, whichever side ended it.
    SessionEnded {
        agent_id: String,
        duration: Option<Duration>,
    },
    /// A number was handed to the host dialer.
    Dialing { telephone_number: String },
    /// A recoverable failure the user should see.
    Failure(CallError),
}

/// Formats a call duration the way the monitor clock shows it: `mm:ss`.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
