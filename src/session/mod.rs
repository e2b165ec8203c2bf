//! Session management: persisted transcript, context toggle, caps meter.
//!
//! State lives as one JSON document per storage key under the state
//! directory. The store recomputes the caps meter from the transcript on
//! every mutation and persists before returning.

pub mod repository;
pub mod store;
pub mod types;

pub use repository::{FileSessionRepository, MemorySessionRepository, SessionRepository};
pub use store::{SessionStore, GREETING};
pub use types::{Message, PersistedSession, Role, CAPS_CEILING};
