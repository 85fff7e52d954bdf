//! Sync Sessions - serve tracked documents over WebSocket
//!
//! A server owns one [`dom::Document`] per connected client. Client events
//! run application handlers against it; the edits they record are flushed
//! back as one JSON batch per event, and the client replays them on its own
//! copy of the same template.
//!
//! ```text
//! client ── {"type":"click","message":"increment"} ──► SyncSession
//!                                                         │ HandlerSet::dispatch
//!                                                         ▼
//! ReplicaClient ◄──── [{"path":[..],"insertChild":..}] ── Changelog
//! ```

pub mod error;
pub mod events;
pub mod handler;
pub mod protocol;
pub mod replica;
pub mod server;
pub mod session;

pub use error::{Result, SessionError};
pub use events::{EventBus, SessionEvent};
pub use handler::{FnHandler, HandlerSet, TriggerHandler};
pub use protocol::{PatchBatch, TriggerEvent};
pub use replica::ReplicaClient;
pub use server::{SessionInfo, SyncServer};
pub use session::{ServerConfig, SyncSession, DEFAULT_TEMPLATE};
