// src/core/profile/mod.rs

//! The seam between the gateway core and the messaging profile.
//!
//! The profile owns identity, the buddy list, group chats and the peer
//! transport. The core only ever sees identifiers and read-only snapshots,
//! and drives the profile through the non-blocking `MessagingProfile` trait.

use crate::core::GatewayError;
use crate::core::events::ProfileEvent;
use std::fmt;
use tokio::sync::mpsc;

pub mod id;
pub mod local;

pub use id::is_onion_id;
pub use local::{LocalProfile, ProfileAction};

/// The result type returned by every profile operation.
pub type ProfileResult<T> = Result<T, GatewayError>;

/// The channel a profile publishes its asynchronous events on.
pub type ProfileEventSender = mpsc::UnboundedSender<ProfileEvent>;
pub type ProfileEventReceiver = mpsc::UnboundedReceiver<ProfileEvent>;

/// Identifies one outstanding latency probe. Opaque to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PingId(pub String);

impl fmt::Display for PingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What a buddy reports about the client software it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// A read-only snapshot of a buddy's attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuddyInfo {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub client: ClientInfo,
    pub supports_latency: bool,
    pub blocked: bool,
    pub temporary: bool,
}

impl BuddyInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            status: "offline".to_string(),
            client: ClientInfo::default(),
            supports_latency: false,
            blocked: false,
            temporary: false,
        }
    }
}

/// The operations the gateway needs from a messaging profile.
///
/// Every method must return promptly: work that touches the network is
/// expected to be handed off and reported later as a `ProfileEvent`.
pub trait MessagingProfile: Send {
    /// Our own identifier.
    fn id(&self) -> &str;

    /// The identifier handed to clients on successful authorization.
    fn session_id(&self) -> String;

    /// Whether `candidate` is syntactically a buddy identifier.
    fn is_valid_id(&self, candidate: &str) -> bool {
        is_onion_id(candidate)
    }

    // --- Buddy list ---
    fn buddy_ids(&self) -> Vec<String>;
    fn buddy(&self, id: &str) -> Option<BuddyInfo>;
    fn add_buddy(&mut self, id: &str) -> ProfileResult<()>;
    fn add_temporary_buddy(&mut self, id: &str) -> ProfileResult<()>;
    fn remove_buddy(&mut self, id: &str) -> ProfileResult<()>;
    fn block_buddy(&mut self, id: &str) -> ProfileResult<()>;
    fn allow_buddy(&mut self, id: &str) -> ProfileResult<()>;

    // --- Messaging ---
    fn send_typing(&mut self, id: &str, mode: &str) -> ProfileResult<()>;
    fn send_message(&mut self, id: &str, text: &str) -> ProfileResult<()>;
    fn send_broadcast(&mut self, text: &str) -> ProfileResult<()>;

    // --- Own attributes ---
    fn set_status(&mut self, status: &str) -> ProfileResult<()>;
    fn set_name(&mut self, name: &str) -> ProfileResult<()>;
    fn set_description(&mut self, description: &str) -> ProfileResult<()>;

    // --- Group chats ---
    fn group_chat_ids(&self) -> Vec<String>;
    fn group_chat_participants(&self, chat_id: &str) -> Option<Vec<String>>;
    fn create_group_chat(&mut self) -> ProfileResult<String>;
    fn invite_to_group_chat(&mut self, chat_id: &str, buddy_id: &str) -> ProfileResult<()>;
    fn leave_group_chat(&mut self, chat_id: &str, reason: Option<&str>) -> ProfileResult<()>;
    fn send_group_chat_message(&mut self, chat_id: &str, text: &str) -> ProfileResult<()>;

    // --- Latency ---
    /// Sends a latency probe and returns its identifier. The matching pong
    /// arrives later as `ProfileEvent::Latency`.
    fn ping(&mut self, buddy_id: &str) -> ProfileResult<PingId>;

    // --- Lifecycle ---
    fn start(&mut self, events: ProfileEventSender) -> ProfileResult<()>;
    fn go_online(&mut self) -> ProfileResult<()>;
    fn stop(&mut self);
}
