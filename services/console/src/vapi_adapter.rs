use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use switchboard_core::session_provider::{ProviderEvent, SessionProvider};
use tokio::sync::{broadcast, mpsc};
use vapi_realtime::types::{Call, ServerMessage};
use vapi_realtime::{CallApi, ControlTx, ServerRx};

const EVENT_CAPACITY: usize = 128;

type ControlSlot = Arc<Mutex<Option<ControlTx>>>;

/// The call currently owned by the adapter. `control` stays empty until the socket is open.
struct OpenCall {
    id: String,
    control: ControlSlot,
    task: tokio::task::JoinHandle<()>,
}

/// An adapter that implements the core `SessionProvider` trait on top of the Vapi calls API.
/// It is generic over `CallApi` so the underlying client can be mocked in tests.
pub struct VapiAdapter<C: CallApi> {
    client: Arc<C>,
    event_tx: mpsc::Sender<ProviderEvent>,
    event_rx: Option<mpsc::Receiver<ProviderEvent>>,
    call: Option<OpenCall>,
}

impl<C: CallApi> VapiAdapter<C> {
    pub fn new(client: C) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
        Self {
            client: Arc::new(client),
            event_tx,
            event_rx: Some(event_rx),
            call: None,
        }
    }

    fn control_of(call: &OpenCall) -> Option<ControlTx> {
        call.control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl<C: CallApi> SessionProvider for VapiAdapter<C> {
    async fn start_session(&mut self, session_provider_id: &str) -> Result<()> {
        if let Some(call) = &self.call {
            if !call.task.is_finished() {
                return Err(anyhow!("call {} is still in progress", call.id));
            }
        }

        let call = self
            .client
            .create_call(session_provider_id)
            .await
            .context("Adapter failed to create call")?;
        tracing::info!("Created call {} for assistant {}", call.id(), session_provider_id);

        let control: ControlSlot = Arc::new(Mutex::new(None));
        let id = call.id().to_string();
        let task = tokio::spawn(run_call(
            self.client.clone(),
            call,
            control.clone(),
            self.event_tx.clone(),
        ));
        self.call = Some(OpenCall { id, control, task });
        Ok(())
    }

    async fn stop_session(&mut self) -> Result<()> {
        let Some(call) = self.call.as_ref().filter(|call| !call.task.is_finished()) else {
            return Err(anyhow!("no call in progress"));
        };

        match Self::control_of(call) {
            Some(control) => {
                tracing::info!("Ending call {}", call.id);
                self.client
                    .end_call(&control)
                    .await
                    .with_context(|| format!("Failed to end call {}", call.id))
            }
            None => {
                tracing::info!("Call {} ended while still connecting", call.id);
                call.task.abort();
                self.call = None;
                emit(
                    &self.event_tx,
                    ProviderEvent::SessionEnded {
                        reason: Some("cancelled-before-connect".to_string()),
                    },
                )
                .await;
                Ok(())
            }
        }
    }

    fn events(&mut self) -> Result<mpsc::Receiver<ProviderEvent>> {
        self.event_rx
            .take()
            .ok_or_else(|| anyhow!("server_events channel has already been taken"))
    }
}

impl<C: CallApi> Drop for VapiAdapter<C> {
    fn drop(&mut self) {
        if let Some(call) = self.call.take() {
            call.task.abort();
        }
    }
}

/// Connects the call's socket and reports its lifecycle until it ends.
async fn run_call<C: CallApi>(
    client: Arc<C>,
    call: Call,
    control: ControlSlot,
    events: mpsc::Sender<ProviderEvent>,
) {
    let (control_tx, server_rx) = match client.open_call(&call).await {
        Ok(opened) => opened,
        Err(e) => {
            tracing::error!("Failed to connect call {}: {:#}", call.id(), e);
            emit(&events, ProviderEvent::Failed(format!("{:#}", e))).await;
            return;
        }
    };
    *control.lock().unwrap_or_else(PoisonError::into_inner) = Some(control_tx);

    emit(
        &events,
        ProviderEvent::SessionStarted {
            session_provider_id: call.assistant_id().map(str::to_string),
        },
    )
    .await;

    let last = pump(call.id(), server_rx).await;
    emit(&events, last).await;
    control.lock().unwrap_or_else(PoisonError::into_inner).take();
}

/// Follows the server messages of one call and returns the event that ends it.
async fn pump(call_id: &str, mut server_rx: ServerRx) -> ProviderEvent {
    loop {
        let message = match server_rx.recv().await {
            Ok(message) => message,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Call {} lagged, skipped {} messages", call_id, skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                return ProviderEvent::SessionEnded { reason: None };
            }
        };
        if let Some(event) = translate(&message) {
            return event;
        }
    }
}

/// Maps one server message onto the end of the call, if it is one. Most messages only get logged.
fn translate(message: &ServerMessage) -> Option<ProviderEvent> {
    match message {
        ServerMessage::StatusUpdate(update) if update.is_ended() => Some(ProviderEvent::SessionEnded {
            reason: update.ended_reason().map(str::to_string),
        }),
        ServerMessage::StatusUpdate(update) => {
            tracing::debug!("Call status: {}", update.status());
            None
        }
        ServerMessage::Close { reason } => Some(ProviderEvent::SessionEnded {
            reason: reason.clone(),
        }),
        ServerMessage::Error(error) => Some(ProviderEvent::Failed(error.message().to_string())),
        ServerMessage::SpeechUpdate(speech) => {
            tracing::debug!("{} speech {}", speech.role(), speech.status());
            None
        }
        ServerMessage::Transcript(transcript) => {
            if transcript.is_final() {
                tracing::info!("{} said: {:?}", transcript.role(), transcript.transcript());
            }
            None
        }
        ServerMessage::Hang => {
            tracing::warn!("Call reported a hang");
            None
        }
        ServerMessage::Unknown => None,
    }
}

async fn emit(events: &mpsc::Sender<ProviderEvent>, event: ProviderEvent) {
    if events.send(event).await.is_err() {
        tracing::warn!("Provider event receiver dropped");
    }
}
