// src/core/handler/dispatcher.rs

//! Executes authorized commands against the messaging profile.
//!
//! Each handler returns the response lines to send back. A reference to a
//! buddy or group chat the profile does not know is a silent no-op: no
//! action, no response. Any `Err` is a handler fault; the gate logs it and
//! keeps the connection open.

use crate::core::GatewayError;
use crate::core::commands::{Command, Verb, split_first, split_pair};
use crate::core::profile::{BuddyInfo, MessagingProfile};
use crate::core::state::GatewayState;
use tokio::time::Instant;
use tracing::debug;

/// The outcome of one handler.
pub type HandlerResult = Result<Vec<String>, GatewayError>;

/// Which self/buddy attribute a `STATUS`, `NAME` or `DESCRIPTION` command addresses.
#[derive(Debug, Clone, Copy)]
enum Attribute {
    Status,
    Name,
    Description,
}

impl Attribute {
    fn label(self) -> &'static str {
        match self {
            Attribute::Status => "STATUS",
            Attribute::Name => "NAME",
            Attribute::Description => "DESCRIPTION",
        }
    }

    fn of(self, buddy: &BuddyInfo) -> String {
        match self {
            Attribute::Status => buddy.status.clone(),
            Attribute::Name => buddy.name.clone().unwrap_or_default(),
            Attribute::Description => buddy.description.clone().unwrap_or_default(),
        }
    }
}

fn no_response() -> HandlerResult {
    Ok(Vec::new())
}

impl<P: MessagingProfile> GatewayState<P> {
    /// Runs a command for an already authorized connection.
    pub fn dispatch(&mut self, command: &Command) -> HandlerResult {
        let args = command.args();
        match command.verb {
            Verb::Whoami => Ok(vec![format!("WHOAMI {}", self.profile.id())]),
            Verb::List => Ok(vec![format!(
                "LIST {}",
                self.profile.buddy_ids().join(" ")
            )]),
            Verb::Remove => self.remove(args),
            Verb::Add => self.add(args),
            Verb::Typing => self.typing(args),
            Verb::Status => self.attribute(Attribute::Status, args),
            Verb::Client => self.client(args),
            Verb::Name => self.attribute(Attribute::Name, args),
            Verb::Description => self.attribute(Attribute::Description, args),
            Verb::Message => self.message(args),
            Verb::Block => self.set_blocked(args, true),
            Verb::Allow => self.set_blocked(args, false),
            Verb::Broadcast => {
                let text = args.ok_or(GatewayError::MissingArgument("BROADCAST"))?;
                self.profile.send_broadcast(text)?;
                no_response()
            }
            Verb::Groupchats => Ok(vec![format!(
                "GROUPCHATS {}",
                self.profile.group_chat_ids().join(" ")
            )]),
            Verb::GroupchatParticipants => self.group_chat_participants(args),
            Verb::GroupchatInvite => self.group_chat_invite(args),
            Verb::GroupchatLeave => self.group_chat_leave(args),
            Verb::GroupchatMessage => self.group_chat_message(args),
            Verb::Latency => self.latency(args),
            // Handled by the gate before dispatch.
            Verb::Starttls | Verb::Pass => no_response(),
            Verb::Unknown => Ok(vec![format!("UNIMPLEMENTED {}", command.name)]),
        }
    }

    fn known_buddy(&self, id: &str) -> Option<BuddyInfo> {
        let buddy = self.profile.buddy(id);
        if buddy.is_none() {
            debug!("No buddy '{}', nothing to do.", id);
        }
        buddy
    }

    fn known_group_chat(&self, chat_id: &str) -> bool {
        let known = self.profile.group_chat_participants(chat_id).is_some();
        if !known {
            debug!("No group chat '{}', nothing to do.", chat_id);
        }
        known
    }

    fn remove(&mut self, args: Option<&str>) -> HandlerResult {
        let id = args.ok_or(GatewayError::MissingArgument("REMOVE"))?;
        if self.known_buddy(id).is_some() {
            self.profile.remove_buddy(id)?;
        }
        no_response()
    }

    fn add(&mut self, args: Option<&str>) -> HandlerResult {
        let (first, second) = split_pair(args.unwrap_or_default());
        match (first, second) {
            (Some("tmp"), Some(id)) => self.profile.add_temporary_buddy(id)?,
            (Some(id), _) => self.profile.add_buddy(id)?,
            (None, _) => return Err(GatewayError::MissingArgument("ADD")),
        }
        no_response()
    }

    fn typing(&mut self, args: Option<&str>) -> HandlerResult {
        let (Some(id), Some(mode)) = split_pair(args.unwrap_or_default()) else {
            return Err(GatewayError::MissingArgument("TYPING"));
        };
        if self.known_buddy(id).is_some() {
            self.profile.send_typing(id, mode)?;
        }
        no_response()
    }

    /// `VERB <id>` queries a buddy; anything else sets our own attribute.
    fn attribute(&mut self, attribute: Attribute, args: Option<&str>) -> HandlerResult {
        match args {
            Some(id) if self.profile.is_valid_id(id) => Ok(self
                .known_buddy(id)
                .map(|buddy| vec![format!("{id} {} {}", attribute.label(), attribute.of(&buddy))])
                .unwrap_or_default()),
            value => {
                let value = value.unwrap_or_default();
                match attribute {
                    Attribute::Status => self.profile.set_status(value)?,
                    Attribute::Name => self.profile.set_name(value)?,
                    Attribute::Description => self.profile.set_description(value)?,
                }
                no_response()
            }
        }
    }

    fn client(&mut self, args: Option<&str>) -> HandlerResult {
        let id = args.ok_or(GatewayError::MissingArgument("CLIENT"))?;
        let Some(buddy) = self.known_buddy(id) else {
            return no_response();
        };

        let mut responses = Vec::with_capacity(2);
        if let Some(name) = &buddy.client.name {
            responses.push(format!("{id} CLIENT_NAME {name}"));
        }
        if let Some(version) = &buddy.client.version {
            responses.push(format!("{id} CLIENT_VERSION {version}"));
        }
        Ok(responses)
    }

    fn message(&mut self, args: Option<&str>) -> HandlerResult {
        let Some((id, Some(text))) = args.and_then(split_first) else {
            return Err(GatewayError::MissingArgument("MESSAGE"));
        };
        if self.known_buddy(id).is_some() {
            self.profile.send_message(id, text)?;
        }
        no_response()
    }

    fn set_blocked(&mut self, args: Option<&str>, blocked: bool) -> HandlerResult {
        let id = args.ok_or(GatewayError::MissingArgument(if blocked {
            "BLOCK"
        } else {
            "ALLOW"
        }))?;
        if self.known_buddy(id).is_some() {
            if blocked {
                self.profile.block_buddy(id)?;
            } else {
                self.profile.allow_buddy(id)?;
            }
        }
        no_response()
    }

    fn group_chat_participants(&mut self, args: Option<&str>) -> HandlerResult {
        let chat_id = args.ok_or(GatewayError::MissingArgument("GROUPCHAT_PARTICIPANTS"))?;
        Ok(self
            .profile
            .group_chat_participants(chat_id)
            .map(|participants| {
                vec![format!(
                    "GROUPCHAT_PARTICIPANTS {chat_id} {}",
                    participants.join(" ")
                )]
            })
            .unwrap_or_default())
    }

    /// `GROUPCHAT_INVITE <chat> <buddy>` invites into an existing chat,
    /// `GROUPCHAT_INVITE <buddy>` starts a new one.
    fn group_chat_invite(&mut self, args: Option<&str>) -> HandlerResult {
        match split_pair(args.unwrap_or_default()) {
            (Some(chat_id), Some(buddy_id)) => {
                if self.known_buddy(buddy_id).is_some() && self.known_group_chat(chat_id) {
                    self.profile.invite_to_group_chat(chat_id, buddy_id)?;
                }
            }
            (Some(buddy_id), None) => {
                if self.known_buddy(buddy_id).is_some() {
                    let chat_id = self.profile.create_group_chat()?;
                    self.profile.invite_to_group_chat(&chat_id, buddy_id)?;
                }
            }
            (None, _) => return Err(GatewayError::MissingArgument("GROUPCHAT_INVITE")),
        }
        no_response()
    }

    fn group_chat_leave(&mut self, args: Option<&str>) -> HandlerResult {
        let (chat_id, reason) =
            split_first(args.unwrap_or_default()).ok_or(GatewayError::MissingArgument("GROUPCHAT_LEAVE"))?;
        if self.known_group_chat(chat_id) {
            self.profile.leave_group_chat(chat_id, reason)?;
        }
        no_response()
    }

    fn group_chat_message(&mut self, args: Option<&str>) -> HandlerResult {
        let Some((chat_id, Some(text))) = args.and_then(split_first) else {
            return Err(GatewayError::MissingArgument("GROUPCHAT_MESSAGE"));
        };
        if self.known_group_chat(chat_id) {
            self.profile.send_group_chat_message(chat_id, text)?;
        }
        no_response()
    }

    /// Probes a buddy and remembers the payload until the pong comes back.
    fn latency(&mut self, args: Option<&str>) -> HandlerResult {
        let (id, payload) =
            split_first(args.unwrap_or_default()).ok_or(GatewayError::MissingArgument("LATENCY"))?;
        let supported = self
            .known_buddy(id)
            .is_some_and(|buddy| buddy.supports_latency);
        if !supported {
            debug!("Buddy '{}' cannot be probed for latency.", id);
            return no_response();
        }

        let ping_id =
            self.pings
                .ping(&mut self.profile, id, payload.unwrap_or_default(), Instant::now())?;
        debug!("Latency probe {} sent to {}.", ping_id, id);
        no_response()
    }
}
