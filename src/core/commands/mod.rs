// src/core/commands/mod.rs

//! Parses inbound text lines into `Command` values.
//!
//! A line is split into a verb and the raw rest-of-line argument string at the
//! first run of whitespace. Verbs are matched case-insensitively against the
//! fixed `Verb` table; anything else becomes `Verb::Unknown` and keeps its
//! original spelling so the client can be told exactly what was rejected.

use std::str::FromStr;
use strum_macros::EnumString;

pub mod helpers;

pub use helpers::{split_first, split_pair};

/// Every verb the line protocol understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Verb {
    // --- Transport / authorization ---
    Starttls,
    Pass,

    // --- Identity and buddy list ---
    Whoami,
    List,
    Remove,
    Add,
    Typing,
    Status,
    Client,
    Name,
    Description,
    Message,
    Block,
    Allow,
    Broadcast,

    // --- Group chats ---
    Groupchats,
    GroupchatParticipants,
    GroupchatInvite,
    GroupchatLeave,
    GroupchatMessage,

    // --- Diagnostics ---
    Latency,

    /// A verb outside the table above.
    #[strum(disabled)]
    Unknown,
}

impl Verb {
    /// Verbs the authorization gate lets through regardless of connection state.
    pub fn bypasses_authorization(self) -> bool {
        matches!(self, Verb::Starttls | Verb::Pass)
    }
}

/// One parsed inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    /// The verb exactly as the client spelled it.
    pub name: String,
    /// Everything after the first whitespace run, `None` if nothing follows.
    pub args: Option<String>,
}

impl Command {
    /// Parses a single line. Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let (name, rest) = split_first(line)?;
        let verb = Verb::from_str(name).unwrap_or(Verb::Unknown);
        Some(Self {
            verb,
            name: name.to_string(),
            args: rest.map(str::to_string),
        })
    }

    /// The raw argument string, if any.
    pub fn args(&self) -> Option<&str> {
        self.args.as_deref()
    }
}
