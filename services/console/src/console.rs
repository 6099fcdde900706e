//! Operator console: the command grammar and the text shown for catalog, status and notices.

use std::fmt::Write as _;
use std::str::FromStr;

use switchboard_core::agent::{AgentCatalog, AgentStatus};
use switchboard_core::gate::ActionKind;
use switchboard_core::registry::{CallSession, SessionState};
use switchboard_core::waveform::Channel;
use switchboard_core::{Notice, format_duration};

pub const HELP: &str = "\
commands:
  agents            list agents and what they support
  start <agent-id>  propose a voice session with an agent
  dial <agent-id>   propose dialing an agent's number
  confirm | y       run the proposed action
  cancel | n        drop the proposed action
  stop              end the current session
  status            show the current session
  pause             pause or resume the waveform
  mute ai|human     mute or unmute a waveform channel
  help              show this text
  quit              end any call and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Agents,
    Propose { agent_id: String, action: ActionKind },
    Confirm,
    Cancel,
    Stop,
    Status,
    Pause,
    Mute(Channel),
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}, try \"help\"")]
    Unknown(String),
    #[error("{0} needs an agent id")]
    MissingAgent(&'static str),
    #[error("mute takes \"ai\" or \"human\", got {0:?}")]
    UnknownChannel(String),
}

impl FromStr for ConsoleCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Err(ParseCommandError::Empty);
        };
        let argument = words.next();

        let propose = |name: &'static str, action| {
            argument
                .map(|agent_id| ConsoleCommand::Propose {
                    agent_id: agent_id.to_string(),
                    action,
                })
                .ok_or(ParseCommandError::MissingAgent(name))
        };

        match command.to_ascii_lowercase().as_str() {
            "agents" | "ls" => Ok(ConsoleCommand::Agents),
            "start" => propose("start", ActionKind::StartSession),
            "dial" => propose("dial", ActionKind::DialDirect),
            "confirm" | "y" | "yes" => Ok(ConsoleCommand::Confirm),
            "cancel" | "n" | "no" => Ok(ConsoleCommand::Cancel),
            "stop" | "end" => Ok(ConsoleCommand::Stop),
            "status" => Ok(ConsoleCommand::Status),
            "pause" => Ok(ConsoleCommand::Pause),
            "mute" => match argument.map(str::to_ascii_lowercase).as_deref() {
                Some("ai") => Ok(ConsoleCommand::Mute(Channel::Synthetic)),
                Some("human") => Ok(ConsoleCommand::Mute(Channel::Counterpart)),
                other => Err(ParseCommandError::UnknownChannel(
                    other.unwrap_or_default().to_string(),
                )),
            },
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            other => Err(ParseCommandError::Unknown(other.to_string())),
        }
    }
}

fn status_label(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Active => "active",
        AgentStatus::Idle => "idle",
        AgentStatus::Busy => "busy",
    }
}

/// The agent table. The agent holding the call is marked, whatever state the call is in.
pub fn agent_table(catalog: &AgentCatalog, session: Option<&CallSession>) -> String {
    let mut table = format!(
        "{:<22} {:<24} {:<7} {:>5} {:>7} {:>8}  {}\n",
        "ID", "NAME", "STATUS", "CALLS", "SUCCESS", "AVG", "ACTIONS"
    );
    for agent in catalog.iter() {
        let mut actions = Vec::new();
        if agent.can_start_session() {
            actions.push("start");
        }
        if agent.can_dial() {
            actions.push("dial");
        }
        if actions.is_empty() {
            actions.push("-");
        }
        let in_call = session.is_some_and(|session| session.agent_id == agent.id);
        let _ = writeln!(
            table,
            "{:<22} {:<24} {:<7} {:>5} {:>6}% {:>8}  {}{}",
            agent.id,
            agent.name,
            status_label(agent.status),
            agent.calls_today,
            agent.success_rate,
            agent.avg_duration,
            actions.join(","),
            if in_call { "  [in call]" } else { "" }
        );
    }
    table
}

pub fn status_line(session: Option<&CallSession>) -> String {
    let Some(session) = session else {
        return "no call".to_string();
    };
    match session.state {
        SessionState::Requesting => format!("connecting to {}...", session.agent_id),
        SessionState::Active => format!(
            "in call with {} ({})",
            session.agent_id,
            format_duration(session.elapsed().unwrap_or_default())
        ),
        SessionState::Ending => format!("ending call with {}...", session.agent_id),
        SessionState::Idle => "no call".to_string(),
    }
}

/// The text shown for a notice, or `None` for notices the user should not see.
pub fn describe_notice(notice: &Notice) -> Option<String> {
    match notice {
        Notice::ConfirmationRequested(action) => Some(format!("{} [y/n]", action.prompt())),
        Notice::SessionRequested { agent_id } => Some(format!("Connecting to {}...", agent_id)),
        Notice::SessionStarted { agent_id } => Some(format!("Call with {} is live.", agent_id)),
        Notice::SessionEnded { agent_id, duration } => Some(match duration {
            Some(duration) => format!(
                "Call with {} ended after {}.",
                agent_id,
                format_duration(*duration)
            ),
            None => format!("Call with {} ended.", agent_id),
        }),
        Notice::Dialing { telephone_number } => Some(format!("Dialing {}...", telephone_number)),
        Notice::Failure(error) if error.is_user_visible() => Some(format!("Error: {}", error)),
        Notice::Failure(_) => None,
    }
}
