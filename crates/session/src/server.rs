//! Sync Server - accepts WebSocket clients and runs one session per connection
//!
//! Sessions share nothing but the handler set and the event bus. Each runs
//! in its own task, so a slow or broken client never stalls another.

use dashmap::DashMap;
use dom::Document;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use uuid::Uuid;

use crate::error::Result;
use crate::events::{EventBus, SessionEvent};
use crate::handler::HandlerSet;
use crate::session::{ServerConfig, SyncSession};

/// Registry entry for a live session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub peer: String,
}

pub struct SyncServer {
    listener: TcpListener,
    template: Document,
    handlers: Arc<HandlerSet>,
    event_bus: EventBus,
    sessions: Arc<DashMap<Uuid, SessionInfo>>,
}

impl SyncServer {
    /// Parse the template and bind the listener. Nothing is accepted until
    /// [`SyncServer::run`] is called.
    pub async fn bind(config: ServerConfig, handlers: HandlerSet) -> Result<Self> {
        let template = config.load_template()?;
        let listener = TcpListener::bind(&config.bind_addr).await?;

        Ok(Self {
            listener,
            template,
            handlers: Arc::new(handlers),
            event_bus: EventBus::new(),
            sessions: Arc::new(DashMap::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn active_sessions(&self) -> Vec<SessionInfo> {
        self.sessions.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Accept connections forever
    pub async fn run(&self) -> Result<()> {
        tracing::info!("Sync server listening on {}", self.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => self.spawn_session(stream, peer),
                Err(e) => tracing::warn!("Failed to accept connection: {}", e),
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let session = SyncSession::new(
            self.template.clone(),
            self.handlers.clone(),
            self.event_bus.clone(),
        );
        let sessions = self.sessions.clone();
        let event_bus = self.event_bus.clone();

        tokio::spawn(async move {
            let ws = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    tracing::warn!("WebSocket handshake with {} failed: {}", peer, e);
                    return;
                }
            };

            let session_id = session.id();
            sessions.insert(
                session_id,
                SessionInfo {
                    id: session_id,
                    peer: peer.to_string(),
                },
            );
            event_bus.publish(SessionEvent::Connected {
                session_id,
                peer: peer.to_string(),
            });

            let outcome = session.run(ws).await;
            sessions.remove(&session_id);

            match outcome {
                Ok(()) => event_bus.publish(SessionEvent::Disconnected { session_id }),
                Err(e) => {
                    tracing::warn!(session_id = %session_id, "Session failed: {}", e);
                    event_bus.publish(SessionEvent::Failed {
                        session_id,
                        reason: e.to_string(),
                    });
                }
            }
        });
    }
}
