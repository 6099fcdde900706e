pub const WEBSOCKET_TRANSPORT: &str = "vapi.websocket";

/// Raw PCM audio description for the websocket transport.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFormat {
    /// ex: "pcm_s16le"
    format: String,
    /// ex: "raw"
    container: String,
    sample_rate: u32,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            format: "pcm_s16le".to_string(),
            container: "raw".to_string(),
            sample_rate: 16_000,
        }
    }
}

impl AudioFormat {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportRequest {
    provider: String,
    audio_format: AudioFormat,
}

impl TransportRequest {
    pub fn websocket(audio_format: AudioFormat) -> Self {
        Self {
            provider: WEBSOCKET_TRANSPORT.to_string(),
            audio_format,
        }
    }
}

/// `POST /call` body
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallRequest {
    assistant_id: String,
    transport: TransportRequest,
}

impl CreateCallRequest {
    pub fn new(assistant_id: &str) -> Self {
        Self {
            assistant_id: assistant_id.to_string(),
            transport: TransportRequest::websocket(AudioFormat::default()),
        }
    }

    pub fn with_audio_format(mut self, audio_format: AudioFormat) -> Self {
        self.transport = TransportRequest::websocket(audio_format);
        self
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTransport {
    #[serde(default)]
    provider: Option<String>,
    websocket_call_url: Option<String>,
}

impl CallTransport {
    pub fn websocket_call_url(&self) -> Option<&str> {
        self.websocket_call_url.as_deref()
    }
}

/// A call as returned by `POST /call`. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    id: String,
    #[serde(default)]
    assistant_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    transport: Option<CallTransport>,
}

impl Call {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn assistant_id(&self) -> Option<&str> {
        self.assistant_id.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn websocket_call_url(&self) -> Option<&str> {
        self.transport.as_ref().and_then(|t| t.websocket_call_url())
    }
}
