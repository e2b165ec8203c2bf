mod client;

pub use client::{ChatClient, ChatReply, DEFAULT_TIMEOUT, TIMEOUT_MESSAGE};
