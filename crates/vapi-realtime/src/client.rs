use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use tokio_tungstenite::tungstenite::Message;

use crate::types::{Call, ControlMessage, CreateCallRequest, ServerMessage};

pub(crate) mod config;
mod consts;
mod utils;

use config::Config;

pub type ControlTx = tokio::sync::mpsc::Sender<ControlMessage>;
pub type ServerRx = tokio::sync::broadcast::Receiver<ServerMessage>;

// Creates calls over the REST API. Each call is then driven over its own websocket.
pub struct Client {
    config: Config,
    http: reqwest::Client,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// The calls API as seen by a session provider. Implemented by [`Client`]; mocked in tests.
#[async_trait]
pub trait CallApi: Send + Sync + 'static {
    async fn create_call(&self, assistant_id: &str) -> Result<Call>;

    /// Opens the call's websocket and hands back its control sender and message stream.
    async fn open_call(&self, call: &Call) -> Result<(ControlTx, ServerRx)>;

    /// Sends the `end-call` control frame. The socket is closed right after it.
    async fn end_call(&self, control: &ControlTx) -> Result<()> {
        control
            .send(ControlMessage::EndCall)
            .await
            .map_err(|_| anyhow!("call connection already closed"))
    }
}

#[async_trait]
impl CallApi for Client {
    /// Asks the API to start a call with the given assistant over the websocket transport.
    async fn create_call(&self, assistant_id: &str) -> Result<Call> {
        let request = CreateCallRequest::new(assistant_id)
            .with_audio_format(self.config.audio_format().clone());

        let response = self
            .http
            .post(utils::call_url(&self.config))
            .bearer_auth(self.config.api_key().expose_secret())
            .json(&request)
            .send()
            .await
            .context("failed to reach the call endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("call creation rejected ({}): {}", status, body));
        }

        let call: Call = response
            .json()
            .await
            .context("failed to decode call response")?;
        tracing::debug!("created call id={}, status={:?}", call.id(), call.status());
        Ok(call)
    }

    async fn open_call(&self, call: &Call) -> Result<(ControlTx, ServerRx)> {
        connect(call, self.config.capacity()).await
    }
}

/// Opens the websocket transport of a created call.
///
/// The returned receiver is subscribed before any frame is read, so no message is missed.
pub async fn connect(call: &Call, capacity: usize) -> Result<(ControlTx, ServerRx)> {
    let url = call
        .websocket_call_url()
        .ok_or_else(|| anyhow!("call {} has no websocket transport", call.id()))?;
    let request = utils::websocket_request(url)?;

    let (ws_stream, _) = tokio_tungstenite::connect_async(request)
        .await
        .context("failed to open call websocket")?;
    tracing::info!("call websocket open: {}", call.id());

    let (mut write, mut read) = ws_stream.split();

    let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<ControlMessage>(capacity);
    let (s_tx, s_rx) = tokio::sync::broadcast::channel(capacity);

    // Both tasks outlive this call: the sender stops after `end-call` or once every
    // `ControlTx` is dropped, the reader when the socket closes.
    tokio::spawn(async move {
        while let Some(control) = c_rx.recv().await {
            match serde_json::to_string(&control) {
                Ok(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        tracing::error!("failed to send control message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("failed to serialize control message: {}", e);
                }
            }
            if matches!(control, ControlMessage::EndCall) {
                if let Err(e) = write.send(Message::Close(None)).await {
                    tracing::debug!("failed to close call websocket: {}", e);
                }
                break;
            }
        }
    });

    tokio::spawn(async move {
        let mut close_reason = None;
        while let Some(message) = read.next().await {
            let message = match message {
                Err(e) => {
                    tracing::error!("failed to read message: {}", e);
                    close_reason = Some(e.to_string());
                    break;
                }
                Ok(message) => message,
            };
            match message {
                Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(message) => {
                        if s_tx.send(message).is_err() {
                            tracing::debug!("no subscribers for server message");
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to deserialize message: {}, text=> {:?}", e, text);
                    }
                },
                Message::Binary(bin) => {
                    tracing::trace!("ignoring {} bytes of call audio", bin.len());
                }
                Message::Close(frame) => {
                    tracing::info!("call websocket closed: {:?}", frame);
                    close_reason = frame.map(|f| f.reason.to_string());
                    break;
                }
                _ => {}
            }
        }
        if s_tx
            .send(ServerMessage::Close {
                reason: close_reason,
            })
            .is_err()
        {
            tracing::debug!("no subscribers for close notification");
        }
    });

    Ok((c_tx, s_rx))
}
