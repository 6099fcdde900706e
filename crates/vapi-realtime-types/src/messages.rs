/// Control frames sent by the client over the call websocket.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "end-call")]
    EndCall,
}

/// `status-update` message
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// ex: "scheduled", "queued", "ringing", "in-progress", "forwarding", "ended"
    status: String,
    #[serde(default)]
    ended_reason: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
            ended_reason: None,
        }
    }

    pub fn with_ended_reason(mut self, reason: &str) -> Self {
        self.ended_reason = Some(reason.to_string());
        self
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn ended_reason(&self) -> Option<&str> {
        self.ended_reason.as_deref()
    }

    pub fn is_ended(&self) -> bool {
        self.status == "ended"
    }
}

/// `speech-update` message
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpeechUpdate {
    /// "assistant" | "user"
    role: String,
    /// "started" | "stopped"
    status: String,
}

impl SpeechUpdate {
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

/// `transcript` message
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    role: String,
    #[serde(default)]
    transcript_type: Option<String>,
    transcript: String,
}

impl Transcript {
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn is_final(&self) -> bool {
        self.transcript_type.as_deref() == Some("final")
    }
}

/// `error` message
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorMessage {
    #[serde(default, alias = "error")]
    message: Option<String>,
}

impl ErrorMessage {
    pub fn new(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("unknown provider error")
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Emitted locally when the websocket closes; never sent by the server.
    #[serde(rename = "close")]
    Close { reason: Option<String> },
    #[serde(rename = "status-update")]
    StatusUpdate(StatusUpdate),
    #[serde(rename = "speech-update")]
    SpeechUpdate(SpeechUpdate),
    #[serde(rename = "transcript")]
    Transcript(Transcript),
    #[serde(rename = "hang")]
    Hang,
    #[serde(rename = "error")]
    Error(ErrorMessage),
    #[serde(other)]
    Unknown,
}
