// src/core/broadcast.rs

//! Turns asynchronous profile events into protocol lines and fans them out
//! to every authorized connection, in registry order.
//!
//! Rendering is kept separate from delivery so the exact line format of each
//! event can be checked on its own. Rendering is not pure, though: connect,
//! disconnect and latency events update `KnownBuddies` and the latency tracker.

use crate::core::events::{FileTransferStage, GroupChatEvent, Packet, PacketKind, ProfileEvent};
use crate::core::profile::{BuddyInfo, MessagingProfile};
use crate::core::state::{Audience, GatewayState};
use tracing::{debug, info};

impl<P: MessagingProfile> GatewayState<P> {
    /// Renders `event` and delivers every resulting line to authorized connections.
    pub fn on_profile_event(&mut self, event: ProfileEvent) {
        let lines = self.render_event(event);
        self.broadcast_lines(&lines, Audience::Authorized);
    }

    /// Delivers `lines` to `audience`, line by line.
    pub fn broadcast_lines(&self, lines: &[String], audience: Audience) {
        for line in lines {
            self.registry.broadcast(line, audience);
        }
    }

    /// Formats one event into the lines clients should see, applying the
    /// bookkeeping the event implies. Log-only events render nothing.
    pub fn render_event(&mut self, event: ProfileEvent) -> Vec<String> {
        match event {
            ProfileEvent::ConnectTo { address, port } => {
                debug!("Connecting to {}:{}.", address, port);
                Vec::new()
            }
            ProfileEvent::ConnectFailure { buddy_id } => {
                debug!("Connection to {} failed.", buddy_id);
                Vec::new()
            }
            ProfileEvent::Verified { buddy_id } => {
                debug!("{} verified.", buddy_id);
                Vec::new()
            }
            ProfileEvent::Ready { buddy } => self.buddy_connected(&buddy),
            ProfileEvent::Disconnected { buddy_id } => {
                if !self.known_buddies.remove(&buddy_id) {
                    return Vec::new();
                }
                info!("{} disconnected, {} still connected.", buddy_id, self.known_buddies.len());
                vec![format!("{buddy_id} DISCONNECTED")]
            }
            ProfileEvent::Removed { buddy_id } => {
                // The buddy stays in the known set until it disconnects.
                if !self.known_buddies.contains(&buddy_id) {
                    return Vec::new();
                }
                vec![format!("{buddy_id} REMOVE")]
            }
            ProfileEvent::Packet(packet) => self.render_packet(packet),
            ProfileEvent::Typing { buddy_id, mode } => vec![format!("{buddy_id} TYPING {mode}")],
            ProfileEvent::Broadcast { message } => vec![format!("BROADCAST {message}")],
            ProfileEvent::GroupChat(event) => render_group_chat(event),
            ProfileEvent::Latency {
                buddy_id,
                ping_id,
                amount,
            } => match self.pings.resolve(&buddy_id, &ping_id) {
                Some(payload) => {
                    debug!("Pong {} from {} after {:?}.", ping_id, buddy_id, amount);
                    vec![format!("{buddy_id} LATENCY {payload}")]
                }
                None => {
                    debug!("Ignoring pong {} from {}, no pending probe.", ping_id, buddy_id);
                    Vec::new()
                }
            },
            ProfileEvent::FileTransfer { stage, transfer_id } => {
                match stage {
                    FileTransferStage::Start => info!("File transfer {} started.", transfer_id),
                    FileTransferStage::Stop => info!("File transfer {} stopped.", transfer_id),
                    FileTransferStage::Complete => {
                        info!("File transfer {} completed.", transfer_id)
                    }
                }
                Vec::new()
            }
        }
    }

    fn buddy_connected(&mut self, buddy: &BuddyInfo) -> Vec<String> {
        self.known_buddies.insert(&buddy.id);
        info!("{} connected, {} connected in total.", buddy.id, self.known_buddies.len());

        let id = &buddy.id;
        let mut lines = vec![format!("{id} CONNECTED")];
        if let Some(name) = &buddy.name {
            lines.push(format!("{id} NAME {name}"));
        }
        if let Some(description) = &buddy.description {
            lines.push(format!("{id} DESCRIPTION {description}"));
        }
        if let Some(name) = &buddy.client.name {
            lines.push(format!("{id} CLIENT_NAME {name}"));
        }
        if let Some(version) = &buddy.client.version {
            lines.push(format!("{id} CLIENT_VERSION {version}"));
        }
        lines
    }

    fn render_packet(&self, packet: Packet) -> Vec<String> {
        if packet.extension {
            return Vec::new();
        }
        if !self.known_buddies.contains(&packet.from) {
            debug!("Dropping packet from unknown buddy {}.", packet.from);
            return Vec::new();
        }

        let from = packet.from;
        match packet.kind {
            PacketKind::Message(text) => text
                .lines()
                .map(|line| format!("{from} MESSAGE {line}"))
                .collect(),
            PacketKind::Status(status) => vec![format!("{from} STATUS {status}")],
            PacketKind::Client(name) => vec![format!("{from} CLIENT_NAME {name}")],
            PacketKind::Version(version) => vec![format!("{from} CLIENT_VERSION {version}")],
            PacketKind::ProfileName(name) if !name.is_empty() => {
                vec![format!("{from} NAME {name}")]
            }
            PacketKind::ProfileText(text) if !text.is_empty() => {
                vec![format!("{from} DESCRIPTION {text}")]
            }
            PacketKind::RemoveMe => vec![format!("{from} REMOVE")],
            PacketKind::ProfileName(_) | PacketKind::ProfileText(_) => Vec::new(),
            PacketKind::Other(kind) => {
                debug!("Not relaying {} packet from {}.", kind, from);
                Vec::new()
            }
        }
    }
}

fn render_group_chat(event: GroupChatEvent) -> Vec<String> {
    match event {
        GroupChatEvent::Created { chat_id } => vec![format!("GROUPCHAT_CREATE {chat_id}")],
        GroupChatEvent::Invited { chat_id, buddy_id } => {
            vec![format!("{buddy_id} GROUPCHAT_INVITE {chat_id}")]
        }
        GroupChatEvent::Joined {
            chat_id,
            buddy_id,
            invited_by,
        } => vec![format!(
            "{buddy_id} GROUPCHAT_JOIN {chat_id}{}",
            with_suffix(invited_by)
        )],
        GroupChatEvent::JoinedSelf {
            chat_id,
            participants,
        } => vec![
            format!("GROUPCHAT_JOINED {chat_id}"),
            format!("GROUPCHAT_PARTICIPANTS {chat_id} {}", participants.join(" ")),
        ],
        GroupChatEvent::Left {
            chat_id,
            buddy_id,
            reason,
        } => vec![format!(
            "{buddy_id} GROUPCHAT_LEAVE {chat_id}{}",
            with_suffix(reason)
        )],
        GroupChatEvent::LeftSelf { chat_id, reason } => {
            vec![format!("GROUPCHAT_LEFT {chat_id}{}", with_suffix(reason))]
        }
        GroupChatEvent::Message {
            chat_id,
            buddy_id,
            message,
        } => vec![format!("{buddy_id} GROUPCHAT_MESSAGE {chat_id} {message}")],
        GroupChatEvent::Destroyed { chat_id } => vec![format!("GROUPCHAT_DESTROY {chat_id}")],
    }
}

fn with_suffix(value: Option<String>) -> String {
    value.map(|v| format!(" {v}")).unwrap_or_default()
}
