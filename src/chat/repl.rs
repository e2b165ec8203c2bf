//! The chat front: an interactive line loop, or a single one-shot prompt,
//! over the persisted session.

use super::render;
use crate::config::Config;
use crate::exchange::ChatClient;
use crate::session::repository::FileSessionRepository;
use crate::session::store::SessionStore;
use crate::session::types::Message;
use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write as _;
use std::time::Duration;
use tokio::io::{self, AsyncBufReadExt, BufReader};

/// Run the chat front. `one_shot` sends a single prompt against the
/// persisted session and exits; otherwise this is the interactive loop.
pub async fn run(config: Config, one_shot: Option<String>) -> Result<()> {
    let repository = Box::new(FileSessionRepository::new(&config.state_dir));
    let mut store = SessionStore::open(repository)?;
    let client = ChatClient::new(&config.base_url);

    if let Some(prompt) = one_shot {
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            anyhow::bail!("refusing to send an empty prompt");
        }
        let replied = exchange(&mut store, &client, prompt).await?;
        render::caps_meter(store.remaining_caps());
        if !replied {
            anyhow::bail!("no reply from {}", config.base_url);
        }
        return Ok(());
    }

    banner(&config);
    render::transcript(store.messages());
    render::caps_meter(store.remaining_caps());

    let stdin = io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    loop {
        prompt_marker();
        let line = match lines.next_line().await {
            Ok(Some(line)) => line.trim().to_string(),
            Ok(None) | Err(_) => break,
        };
        if line.is_empty() {
            continue;
        }

        match line.as_str() {
            "/quit" | "/exit" => break,
            "/caps" => {
                render::caps_meter(store.remaining_caps());
                continue;
            }
            "/context" => {
                let flipped = !store.include_context();
                store.set_include_context(flipped)?;
                println!(
                    "Context inclusion: {}",
                    if flipped { "on" } else { "off" }
                );
                continue;
            }
            _ => {}
        }

        exchange(&mut store, &client, line).await?;
        render::caps_meter(store.remaining_caps());
    }

    Ok(())
}

/// One prompt round trip: append and render the user message, hold the
/// typing dots while the request is out, then append and render whatever
/// came back. Returns whether a reply landed in the transcript.
///
/// When nothing comes back (the exchange already logged why), the
/// transcript and the meter stay untouched.
async fn exchange(store: &mut SessionStore, client: &ChatClient, prompt: String) -> Result<bool> {
    let user = Message::user(prompt);
    store.append(user.clone())?;
    render::message(&user);

    let dots = typing_dots();
    let reply = client.send_prompt(&user.text).await;
    // Cleared on every path: reply, timeout substitute, or failure.
    dots.finish_and_clear();

    match reply {
        Some(reply) => {
            let assistant = Message::assistant(reply.message, reply.caps);
            store.append(assistant.clone())?;
            render::message(&assistant);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// The typing indicator: one dot, two, three, on a half-second cadence.
fn typing_dots() -> ProgressBar {
    let dots = ProgressBar::new_spinner();
    dots.set_style(
        ProgressStyle::with_template("{spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&[".", "..", "...", ""]),
    );
    dots.enable_steady_tick(Duration::from_millis(500));
    dots
}

fn banner(config: &Config) {
    println!("{}", style("💬 capchat").bold());
    println!("Endpoint: {}", config.base_url);
    println!("Type /quit to exit, /context to toggle context, /caps for the meter.");
    println!();
}

fn prompt_marker() {
    print!("{} ", style("›").bold());
    let _ = std::io::stdout().flush();
}
