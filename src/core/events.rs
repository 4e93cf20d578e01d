// src/core/events.rs

//! Asynchronous events a messaging profile reports to the gateway.

use crate::core::profile::{BuddyInfo, PingId};
use std::time::Duration;

/// Everything a profile can tell the gateway after the fact.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileEvent {
    /// An outgoing peer connection is being attempted. Logged only.
    ConnectTo { address: String, port: u16 },
    /// An outgoing peer connection failed. Logged only.
    ConnectFailure { buddy_id: String },
    /// A buddy's identity has been verified. Logged only.
    Verified { buddy_id: String },
    /// A buddy is connected and ready; carries the attributes known so far.
    Ready { buddy: BuddyInfo },
    Disconnected { buddy_id: String },
    Removed { buddy_id: String },
    /// Content a buddy sent over the peer transport.
    Packet(Packet),
    Typing { buddy_id: String, mode: String },
    Broadcast { message: String },
    GroupChat(GroupChatEvent),
    /// A pong for an earlier latency probe.
    Latency {
        buddy_id: String,
        ping_id: PingId,
        amount: Duration,
    },
    /// File-transfer progress. Logged only.
    FileTransfer {
        stage: FileTransferStage,
        transfer_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTransferStage {
    Start,
    Stop,
    Complete,
}

/// Group-chat lifecycle as seen by this profile. `*Self` variants concern us,
/// the others concern a buddy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupChatEvent {
    Created {
        chat_id: String,
    },
    Invited {
        chat_id: String,
        buddy_id: String,
    },
    Joined {
        chat_id: String,
        buddy_id: String,
        invited_by: Option<String>,
    },
    JoinedSelf {
        chat_id: String,
        participants: Vec<String>,
    },
    Left {
        chat_id: String,
        buddy_id: String,
        reason: Option<String>,
    },
    LeftSelf {
        chat_id: String,
        reason: Option<String>,
    },
    Message {
        chat_id: String,
        buddy_id: String,
        message: String,
    },
    Destroyed {
        chat_id: String,
    },
}

/// An inbound unit of content from a buddy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub from: String,
    pub kind: PacketKind,
    /// Packets belonging to protocol extensions are not relayed.
    pub extension: bool,
}

impl Packet {
    pub fn new(from: impl Into<String>, kind: PacketKind) -> Self {
        Self {
            from: from.into(),
            kind,
            extension: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketKind {
    Message(String),
    Status(String),
    Client(String),
    Version(String),
    ProfileName(String),
    ProfileText(String),
    RemoveMe,
    /// Any packet type the gateway does not relay.
    Other(String),
}
