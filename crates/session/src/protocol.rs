//! Wire protocol
//!
//! Keep it minimal: one inbound message shape, one outbound.
//!
//! - client → server: a [`TriggerEvent`] per text frame
//! - server → client: one text frame per trigger, holding the flushed
//!   changelog as a JSON array of [`PatchRecord`]s (possibly `[]`)

use dom::PatchRecord;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Something happened on the client, e.g. a click on an element carrying
/// an `sc-click` attribute. `message` is that attribute's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub message: String,
}

impl TriggerEvent {
    pub fn new(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            message: message.into(),
        }
    }

    pub fn click(message: impl Into<String>) -> Self {
        Self::new("click", message)
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Outbound batch as received by a replica
pub type PatchBatch = Vec<PatchRecord>;

pub fn decode_batch(text: &str) -> Result<PatchBatch> {
    Ok(dom::decode_batch(text)?)
}
