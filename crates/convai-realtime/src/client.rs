use crate::client::translate::Translator;
use anyhow::{Context, Result};
use convai_types::{CloseEvent, Credentials, EngineEvent, Fault};
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{oneshot, watch};
use tokio_tungstenite::tungstenite::Message;

pub mod config;
mod consts;
mod translate;
mod utils;

/// Where the client delivers engine events.
pub type EventTx = tokio::sync::mpsc::Sender<EngineEvent>;
type OutboundTx = tokio::sync::mpsc::Sender<Message>;
type SessionSlot = Arc<Mutex<Option<OpenSession>>>;

/// Handles of the session that is open, or being opened.
struct OpenSession {
    // Sender into the session's writer task.
    outbound: OutboundTx,
    // Turns true once the session has reported its disconnect and left the slot.
    closed: watch::Receiver<bool>,
    // Makes the reader give up on a server that never answers a close frame.
    shutdown: Option<oneshot::Sender<()>>,
}

/// Websocket client for one conversation at a time.
///
/// Opening the socket only means the request was accepted; the session is live
/// once the server's initiation metadata arrives, which is reported as
/// [`EngineEvent::Connect`]. Every session ends with exactly one
/// [`EngineEvent::Disconnect`], delivered before the next session can open.
pub struct Client {
    config: config::Config,
    events: EventTx,
    session: SessionSlot,
}

impl Client {
    pub fn new(config: config::Config, events: EventTx) -> Self {
        Self {
            config,
            events,
            session: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.session
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub async fn start_session(&self, credentials: Credentials) -> Result<()> {
        let request = utils::build_request(&self.config, &credentials)?;
        drop(credentials);

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<Message>(self.config.capacity());
        let (closed_tx, closed_rx) = watch::channel(false);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        {
            let mut slot = self.slot()?;
            if slot.is_some() {
                return Err(anyhow::anyhow!("a conversation session is already open"));
            }
            *slot = Some(OpenSession {
                outbound: c_tx.clone(),
                closed: closed_rx,
                shutdown: Some(shutdown_tx),
            });
        }
        let mut reservation = Reservation {
            session: self.session.clone(),
            outbound: c_tx.clone(),
            closed: Arc::new(closed_tx),
            armed: true,
        };

        let (ws_stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .context("failed to open conversation websocket")?;
        reservation.armed = false;
        let closed = reservation.closed.clone();
        let (mut write, mut read) = ws_stream.split();

        // Writer: forwards queued messages to the socket until a close is sent.
        tokio::spawn(async move {
            while let Some(message) = c_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = write.send(message).await {
                    tracing::error!("failed to send message: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let events = self.events.clone();
        let session = self.session.clone();
        let mut translator = Translator::new(self.config.vad_threshold());
        // Reader: turns server messages into engine events and answers pings.
        tokio::spawn(async move {
            let mut close = None;
            loop {
                let message = tokio::select! {
                    message = read.next() => message,
                    _ = &mut shutdown_rx => {
                        tracing::warn!("dropping conversation socket");
                        break;
                    }
                };
                let message = match message {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        tracing::error!("failed to read message: {}", e);
                        emit(&events, EngineEvent::Error(Fault::Message(e.to_string()))).await;
                        break;
                    }
                    None => break,
                };
                match message {
                    Message::Text(text) => {
                        let translation = translator.translate(&text);
                        if let Some(reply) = translation.reply {
                            match serde_json::to_string(&reply) {
                                Ok(reply) => {
                                    if let Err(e) = c_tx.send(Message::Text(reply)).await {
                                        tracing::warn!("failed to queue reply: {}", e);
                                    }
                                }
                                Err(e) => tracing::error!("failed to serialize reply: {}", e),
                            }
                        }
                        for event in translation.events {
                            emit(&events, event).await;
                        }
                    }
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message ({} bytes)", bin.len());
                    }
                    Message::Close(frame) => {
                        tracing::info!("connection closed: {:?}", frame);
                        close = frame.map(|frame| CloseEvent::new(u16::from(frame.code), &frame.reason));
                        break;
                    }
                    _ => {}
                }
            }

            for event in translator.finish() {
                emit(&events, event).await;
            }
            emit(&events, EngineEvent::Disconnect(close)).await;
            // Only now may the next session open.
            release(&session, &c_tx);
            closed.send_replace(true);
        });

        Ok(())
    }

    /// Sends a close frame and waits until the session has reported its disconnect.
    ///
    /// A server that does not answer within the configured close timeout gets its
    /// connection dropped.
    pub async fn end_session(&self) -> Result<()> {
        let (outbound, mut closed) = {
            let slot = self.slot()?;
            let session = slot
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("no conversation session is open"))?;
            (session.outbound.clone(), session.closed.clone())
        };
        outbound
            .send(Message::Close(None))
            .await
            .context("conversation writer has already stopped")?;

        let limit = self.config.close_timeout();
        if tokio::time::timeout(limit, closed.wait_for(|closed| *closed))
            .await
            .is_ok()
        {
            return Ok(());
        }

        tracing::warn!("close not answered within {:?}", limit);
        let shutdown = self
            .slot()?
            .as_mut()
            .filter(|session| session.outbound.same_channel(&outbound))
            .and_then(|session| session.shutdown.take());
        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(());
        }
        let _ = closed.wait_for(|closed| *closed).await;
        Ok(())
    }

    fn slot(&self) -> Result<MutexGuard<'_, Option<OpenSession>>> {
        self.session
            .lock()
            .map_err(|_| anyhow::anyhow!("session slot lock poisoned"))
    }
}

/// Frees a reserved slot if the session never got going, including when the
/// opening future is dropped halfway.
struct Reservation {
    session: SessionSlot,
    outbound: OutboundTx,
    closed: Arc<watch::Sender<bool>>,
    armed: bool,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed {
            release(&self.session, &self.outbound);
            self.closed.send_replace(true);
        }
    }
}

fn release(session: &SessionSlot, outbound: &OutboundTx) {
    if let Ok(mut slot) = session.lock() {
        if slot
            .as_ref()
            .is_some_and(|session| session.outbound.same_channel(outbound))
        {
            *slot = None;
        }
    }
}

async fn emit(events: &EventTx, event: EngineEvent) {
    if let Err(e) = events.send(event).await {
        tracing::warn!("engine event receiver dropped: {}", e);
    }
}
