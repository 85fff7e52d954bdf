//! Sync Session - one connected client and its document
//!
//! Every connection gets its own copy of the template document. Inbound
//! triggers are dispatched to the shared handlers, and whatever they changed
//! goes back to the client as one batch per trigger.

use dom::{Document, DomParser, ParserConfig};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::events::{EventBus, SessionEvent};
use crate::handler::HandlerSet;
use crate::protocol::TriggerEvent;

pub const DEFAULT_TEMPLATE: &str =
    "<!DOCTYPE html><html><head><title>sync</title></head><body></body></html>";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Markup every new session starts from. Replicas must start from the same.
    pub template: String,
    #[serde(default)]
    pub parser: ParserConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
            parser: ParserConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse the configured template
    pub fn load_template(&self) -> Result<Document> {
        let parser = DomParser::with_config(self.parser.clone());
        Ok(Document::parse_with(&self.template, parser)?)
    }
}

pub struct SyncSession {
    id: Uuid,
    document: Document,
    handlers: Arc<HandlerSet>,
    event_bus: EventBus,
}

impl SyncSession {
    pub fn new(document: Document, handlers: Arc<HandlerSet>, event_bus: EventBus) -> Self {
        Self {
            id: Uuid::now_v7(),
            document,
            handlers,
            event_bus,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Decode one inbound frame and run the handlers on it.
    ///
    /// Neither a bad frame nor a failing handler ends the session. Edits
    /// made before a handler failed are already in the tree and stay queued.
    pub async fn handle_frame(&mut self, text: &str) {
        let event = match TriggerEvent::decode(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(session_id = %self.id, "Ignoring undecodable trigger: {}", e);
                return;
            }
        };

        tracing::debug!(
            session_id = %self.id,
            event_type = %event.event_type,
            message = %event.message,
            "Dispatching trigger"
        );

        if let Err(e) = self.handlers.dispatch(&event, &mut self.document).await {
            tracing::warn!(session_id = %self.id, "{}", e);
        }
    }

    /// Send the pending changes as one text frame. The changelog is only
    /// cleared once the frame went out.
    async fn flush<S>(&mut self, ws: &mut WebSocketStream<S>) -> Result<usize>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.document
            .changelog_mut()
            .flush_async(|batch| async move {
                ws.send(Message::Text(batch)).await?;
                Ok::<(), SessionError>(())
            })
            .await
    }

    /// Drive the session until the peer goes away.
    ///
    /// A close frame, end of stream or read error is a normal end. Failing
    /// to send a batch is returned as an error.
    pub async fn run<S>(mut self, mut ws: WebSocketStream<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        tracing::info!(session_id = %self.id, "Session started");

        loop {
            let text = match ws.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::debug!(session_id = %self.id, "Read failed: {}", e);
                    break;
                }
            };

            self.handle_frame(&text).await;

            let records = self.flush(&mut ws).await?;
            self.event_bus.publish(SessionEvent::Flushed {
                session_id: self.id,
                records,
            });
        }

        tracing::info!(session_id = %self.id, "Session ended");
        Ok(())
    }
}
