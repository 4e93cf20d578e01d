// src/core/profile/local.rs

//! An in-memory messaging profile with no peer transport.
//!
//! `LocalProfile` keeps identity, the buddy list and group chats in memory and
//! journals every outgoing action instead of sending it anywhere. The daemon
//! runs on it when no networked profile is embedded; tests use the journal to
//! observe exactly which side effects a command produced.

use super::{
    BuddyInfo, MessagingProfile, PingId, ProfileEventSender, ProfileResult,
};
use crate::config::ProfileConfig;
use crate::core::GatewayError;
use crate::core::events::{GroupChatEvent, ProfileEvent};
use indexmap::IndexMap;
use tracing::{debug, info};
use uuid::Uuid;

/// A side effect requested of the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileAction {
    AddBuddy(String),
    AddTemporaryBuddy(String),
    RemoveBuddy(String),
    Block(String),
    Allow(String),
    Typing { buddy_id: String, mode: String },
    Message { buddy_id: String, text: String },
    Broadcast(String),
    SetStatus(String),
    SetName(String),
    SetDescription(String),
    CreateGroupChat(String),
    Invite { chat_id: String, buddy_id: String },
    Leave { chat_id: String, reason: Option<String> },
    GroupChatMessage { chat_id: String, text: String },
    Ping { buddy_id: String, ping_id: PingId },
    Online,
}

#[derive(Debug)]
pub struct LocalProfile {
    id: String,
    session_id: String,
    name: Option<String>,
    description: Option<String>,
    status: String,
    buddies: IndexMap<String, BuddyInfo>,
    group_chats: IndexMap<String, Vec<String>>,
    events: Option<ProfileEventSender>,
    next_ping: u64,
    next_chat: u64,
    journal: Vec<ProfileAction>,
}

impl LocalProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id: Uuid::new_v4().simple().to_string(),
            name: None,
            description: None,
            status: "available".to_string(),
            buddies: IndexMap::new(),
            group_chats: IndexMap::new(),
            events: None,
            next_ping: 0,
            next_chat: 0,
            journal: Vec::new(),
        }
    }

    /// Replaces the generated session identifier.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Builds a profile with the configured self attributes and buddy list.
    pub fn from_config(id: impl Into<String>, config: &ProfileConfig) -> Self {
        let mut profile = Self::new(id);
        profile.name = config.name.clone();
        profile.description = config.description.clone();
        profile.status = config.status.clone();
        for buddy_id in &config.buddies {
            profile.insert_buddy(BuddyInfo::new(buddy_id.as_str()));
        }
        profile
    }

    /// The sender handed over by `start`, for publishing events from outside.
    pub fn event_sender(&self) -> Option<ProfileEventSender> {
        self.events.clone()
    }

    /// Inserts or replaces a buddy snapshot without journaling it.
    pub fn insert_buddy(&mut self, buddy: BuddyInfo) {
        self.buddies.insert(buddy.id.clone(), buddy);
    }

    /// Inserts a group chat with the given participants without journaling it.
    pub fn insert_group_chat(&mut self, chat_id: impl Into<String>, participants: Vec<String>) {
        self.group_chats.insert(chat_id.into(), participants);
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Every action requested so far, oldest first.
    pub fn journal(&self) -> &[ProfileAction] {
        &self.journal
    }

    /// Drains the journal.
    pub fn take_journal(&mut self) -> Vec<ProfileAction> {
        std::mem::take(&mut self.journal)
    }

    fn buddy_mut(&mut self, id: &str) -> ProfileResult<&mut BuddyInfo> {
        self.buddies
            .get_mut(id)
            .ok_or_else(|| GatewayError::Profile(format!("unknown buddy '{id}'")))
    }

    fn ensure_group_chat(&self, chat_id: &str) -> ProfileResult<()> {
        if self.group_chats.contains_key(chat_id) {
            Ok(())
        } else {
            Err(GatewayError::Profile(format!("unknown group chat '{chat_id}'")))
        }
    }

    fn emit(&self, event: ProfileEvent) {
        if let Some(events) = &self.events
            && events.send(event).is_err()
        {
            debug!("Profile event dropped: gateway is no longer listening.");
        }
    }
}

impl MessagingProfile for LocalProfile {
    fn id(&self) -> &str {
        &self.id
    }

    fn session_id(&self) -> String {
        self.session_id.clone()
    }

    fn buddy_ids(&self) -> Vec<String> {
        self.buddies.keys().cloned().collect()
    }

    fn buddy(&self, id: &str) -> Option<BuddyInfo> {
        self.buddies.get(id).cloned()
    }

    fn add_buddy(&mut self, id: &str) -> ProfileResult<()> {
        self.buddies
            .entry(id.to_string())
            .or_insert_with(|| BuddyInfo::new(id))
            .temporary = false;
        self.journal.push(ProfileAction::AddBuddy(id.to_string()));
        Ok(())
    }

    fn add_temporary_buddy(&mut self, id: &str) -> ProfileResult<()> {
        self.buddies
            .entry(id.to_string())
            .or_insert_with(|| BuddyInfo {
                temporary: true,
                ..BuddyInfo::new(id)
            });
        self.journal
            .push(ProfileAction::AddTemporaryBuddy(id.to_string()));
        Ok(())
    }

    fn remove_buddy(&mut self, id: &str) -> ProfileResult<()> {
        if self.buddies.shift_remove(id).is_some() {
            self.journal.push(ProfileAction::RemoveBuddy(id.to_string()));
            self.emit(ProfileEvent::Removed {
                buddy_id: id.to_string(),
            });
        }
        Ok(())
    }

    fn block_buddy(&mut self, id: &str) -> ProfileResult<()> {
        self.buddy_mut(id)?.blocked = true;
        self.journal.push(ProfileAction::Block(id.to_string()));
        Ok(())
    }

    fn allow_buddy(&mut self, id: &str) -> ProfileResult<()> {
        self.buddy_mut(id)?.blocked = false;
        self.journal.push(ProfileAction::Allow(id.to_string()));
        Ok(())
    }

    fn send_typing(&mut self, id: &str, mode: &str) -> ProfileResult<()> {
        self.journal.push(ProfileAction::Typing {
            buddy_id: id.to_string(),
            mode: mode.to_string(),
        });
        Ok(())
    }

    fn send_message(&mut self, id: &str, text: &str) -> ProfileResult<()> {
        self.journal.push(ProfileAction::Message {
            buddy_id: id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn send_broadcast(&mut self, text: &str) -> ProfileResult<()> {
        self.journal.push(ProfileAction::Broadcast(text.to_string()));
        Ok(())
    }

    fn set_status(&mut self, status: &str) -> ProfileResult<()> {
        self.status = status.to_string();
        self.journal.push(ProfileAction::SetStatus(status.to_string()));
        Ok(())
    }

    fn set_name(&mut self, name: &str) -> ProfileResult<()> {
        self.name = Some(name.to_string());
        self.journal.push(ProfileAction::SetName(name.to_string()));
        Ok(())
    }

    fn set_description(&mut self, description: &str) -> ProfileResult<()> {
        self.description = Some(description.to_string());
        self.journal
            .push(ProfileAction::SetDescription(description.to_string()));
        Ok(())
    }

    fn group_chat_ids(&self) -> Vec<String> {
        self.group_chats.keys().cloned().collect()
    }

    fn group_chat_participants(&self, chat_id: &str) -> Option<Vec<String>> {
        self.group_chats.get(chat_id).cloned()
    }

    fn create_group_chat(&mut self) -> ProfileResult<String> {
        self.next_chat += 1;
        let chat_id = format!("{}-{}", self.id, self.next_chat);
        self.group_chats.insert(chat_id.clone(), Vec::new());
        self.journal
            .push(ProfileAction::CreateGroupChat(chat_id.clone()));
        self.emit(ProfileEvent::GroupChat(GroupChatEvent::Created {
            chat_id: chat_id.clone(),
        }));
        Ok(chat_id)
    }

    fn invite_to_group_chat(&mut self, chat_id: &str, buddy_id: &str) -> ProfileResult<()> {
        self.ensure_group_chat(chat_id)?;
        self.journal.push(ProfileAction::Invite {
            chat_id: chat_id.to_string(),
            buddy_id: buddy_id.to_string(),
        });
        Ok(())
    }

    fn leave_group_chat(&mut self, chat_id: &str, reason: Option<&str>) -> ProfileResult<()> {
        self.ensure_group_chat(chat_id)?;
        self.group_chats.shift_remove(chat_id);
        self.journal.push(ProfileAction::Leave {
            chat_id: chat_id.to_string(),
            reason: reason.map(str::to_string),
        });
        self.emit(ProfileEvent::GroupChat(GroupChatEvent::LeftSelf {
            chat_id: chat_id.to_string(),
            reason: reason.map(str::to_string),
        }));
        Ok(())
    }

    fn send_group_chat_message(&mut self, chat_id: &str, text: &str) -> ProfileResult<()> {
        self.ensure_group_chat(chat_id)?;
        self.journal.push(ProfileAction::GroupChatMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn ping(&mut self, buddy_id: &str) -> ProfileResult<PingId> {
        self.next_ping += 1;
        let ping_id = PingId(self.next_ping.to_string());
        self.journal.push(ProfileAction::Ping {
            buddy_id: buddy_id.to_string(),
            ping_id: ping_id.clone(),
        });
        Ok(ping_id)
    }

    fn start(&mut self, events: ProfileEventSender) -> ProfileResult<()> {
        info!("Local profile {} started (no peer transport).", self.id);
        self.events = Some(events);
        Ok(())
    }

    fn go_online(&mut self) -> ProfileResult<()> {
        self.journal.push(ProfileAction::Online);
        Ok(())
    }

    fn stop(&mut self) {
        info!("Local profile {} stopped.", self.id);
        self.events = None;
    }
}
