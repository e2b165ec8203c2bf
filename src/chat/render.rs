//! Terminal rendering for the chat view. The scrollback is the viewport:
//! every appended message is printed immediately, newest always last.

use crate::session::types::{Message, Role};
use crate::util::format_caps;
use console::style;

/// Print one transcript entry.
pub fn message(message: &Message) {
    match message.role {
        Role::User => println!("{} {}", style("you ›").cyan().bold(), message.text),
        Role::Assistant => println!("{} {}", style("bot ›").green().bold(), message.text),
    }
}

/// Print the whole transcript in order.
pub fn transcript(messages: &[Message]) {
    for entry in messages {
        message(entry);
    }
}

/// The caps meter line. Negative balances show up red.
pub fn caps_meter(remaining: i64) {
    let line = format!("Caps remaining: {}", format_caps(remaining));
    if remaining < 0 {
        println!("{}", style(line).red());
    } else {
        println!("{}", style(line).dim());
    }
}
