//! The conversation store: transcript, context toggle, and the caps meter.

use super::repository::SessionRepository;
use super::types::{Message, PersistedSession, CAPS_CEILING};
use anyhow::Result;
use tracing::debug;

/// Greeting seeded into an empty transcript, priced at zero caps.
pub const GREETING: &str = "Hi there! Ask me anything!";

/// Owns the session state and keeps it durable: every mutation persists the
/// full state through the repository before returning.
///
/// The remaining-caps meter is always recomputed from the whole transcript,
/// never adjusted incrementally, so it cannot drift from the messages that
/// back it.
pub struct SessionStore {
    repository: Box<dyn SessionRepository>,
    state: PersistedSession,
    remaining_caps: i64,
}

impl SessionStore {
    /// Open the session: load persisted state, seed the greeting into an
    /// empty transcript, and write both keys back so they exist from the
    /// first run on.
    ///
    /// Corrupt persisted data propagates as an error. It is never silently
    /// replaced with a fresh session.
    pub fn open(repository: Box<dyn SessionRepository>) -> Result<Self> {
        let mut state = repository.load()?;
        if state.messages.is_empty() {
            debug!("empty transcript, seeding greeting");
            state.messages.push(Message::assistant(GREETING, Some(0)));
        }

        let store = Self {
            remaining_caps: compute_remaining(&state.messages),
            repository,
            state,
        };
        store.repository.save(&store.state)?;
        Ok(store)
    }

    /// Append one message in arrival order, recompute the meter from the
    /// full transcript, and persist.
    pub fn append(&mut self, message: Message) -> Result<()> {
        self.state.messages.push(message);
        self.remaining_caps = compute_remaining(&self.state.messages);
        self.repository.save(&self.state)
    }

    /// Flip the context-inclusion preference and persist it. Transcript and
    /// meter are untouched.
    pub fn set_include_context(&mut self, include: bool) -> Result<()> {
        self.state.include_context = include;
        self.repository.save(&self.state)
    }

    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    pub fn include_context(&self) -> bool {
        self.state.include_context
    }

    /// What is left of the prepaid allowance. Derived, possibly negative.
    pub fn remaining_caps(&self) -> i64 {
        self.remaining_caps
    }
}

/// `CAPS_CEILING` minus every cost that is present and non-negative.
/// Negative costs are bad data and do not count; the result itself can go
/// negative once spending passes the ceiling.
fn compute_remaining(messages: &[Message]) -> i64 {
    let spent: i64 = messages
        .iter()
        .filter_map(|m| m.caps)
        .filter(|caps| *caps >= 0)
        .sum();
    CAPS_CEILING - spent
}
