//! Trigger handlers - application code that reacts to client events
//!
//! A handler gets every inbound event together with the session's document
//! and edits it through `Document::edit`. It decides for itself which
//! events it cares about. Edits are recorded in the document's changelog and
//! flushed by the session once every handler has run.

use async_trait::async_trait;
use dom::Document;
use std::sync::Arc;

use crate::error::{Result, SessionError};
use crate::protocol::TriggerEvent;

#[async_trait]
pub trait TriggerHandler: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// Handle one inbound event. Called for EVERY event.
    async fn on_trigger(&self, event: &TriggerEvent, doc: &mut Document) -> Result<()>;
}

/// Adapter for plain synchronous closures
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&TriggerEvent, &mut Document) -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> TriggerHandler for FnHandler<F>
where
    F: Fn(&TriggerEvent, &mut Document) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_trigger(&self, event: &TriggerEvent, doc: &mut Document) -> Result<()> {
        (self.f)(event, doc)
    }
}

/// Ordered set of handlers shared by every session of a server
#[derive(Clone, Default)]
pub struct HandlerSet {
    handlers: Vec<Arc<dyn TriggerHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler; dispatch order is registration order
    pub fn register(&mut self, handler: impl TriggerHandler + 'static) -> &mut Self {
        tracing::debug!("Registered trigger handler: {}", handler.name());
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every handler in order against `doc`.
    ///
    /// Stops at the first failure. Edits already made stay in the tree and
    /// in the changelog.
    pub async fn dispatch(&self, event: &TriggerEvent, doc: &mut Document) -> Result<()> {
        for handler in &self.handlers {
            handler.on_trigger(event, doc).await.map_err(|e| match e {
                SessionError::Handler { .. } => e,
                other => SessionError::handler(handler.name(), other.to_string()),
            })?;
        }
        Ok(())
    }
}
