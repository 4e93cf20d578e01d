// tests/integration/broadcast_test.rs

//! Profile events rendered into protocol lines and fanned out to clients.

use super::test_helpers::{ALICE, BOB, CHAT_ID, TestContext, alice, bob};
use buddygate::core::events::{
    FileTransferStage, GroupChatEvent, Packet, PacketKind, ProfileEvent,
};
use buddygate::core::profile::PingId;
use buddygate::core::state::Audience;
use std::time::Duration;
use tokio::time::Instant;

fn connected(ctx: &mut TestContext, buddy_id: &str) {
    let buddy = if buddy_id == ALICE { alice() } else { bob() };
    ctx.event(ProfileEvent::Ready { buddy });
}

fn packet(from: &str, kind: PacketKind) -> ProfileEvent {
    ProfileEvent::Packet(Packet::new(from, kind))
}

#[test]
fn test_ready_announces_buddy_with_known_attributes() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();

    connected(&mut ctx, ALICE);
    assert_eq!(
        client.lines(),
        vec![
            format!("{ALICE} CONNECTED"),
            format!("{ALICE} NAME Alice"),
            format!("{ALICE} DESCRIPTION Hello from Alice"),
            format!("{ALICE} CLIENT_NAME TorChat"),
            format!("{ALICE} CLIENT_VERSION 0.9.9"),
        ]
    );
    assert!(ctx.state.known_buddies.contains(ALICE));
}

#[test]
fn test_ready_without_attributes() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();

    connected(&mut ctx, BOB);
    assert_eq!(client.lines(), vec![format!("{BOB} CONNECTED")]);
}

#[test]
fn test_disconnected_only_for_known_buddies() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();

    ctx.event(ProfileEvent::Disconnected {
        buddy_id: BOB.to_string(),
    });
    assert!(client.lines().is_empty());

    connected(&mut ctx, BOB);
    client.lines();
    ctx.event(ProfileEvent::Disconnected {
        buddy_id: BOB.to_string(),
    });
    assert_eq!(client.lines(), vec![format!("{BOB} DISCONNECTED")]);
    assert!(!ctx.state.known_buddies.contains(BOB));
}

#[test]
fn test_removed_keeps_buddy_known() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();

    ctx.event(ProfileEvent::Removed {
        buddy_id: BOB.to_string(),
    });
    assert!(client.lines().is_empty());

    connected(&mut ctx, BOB);
    client.lines();
    ctx.event(ProfileEvent::Removed {
        buddy_id: BOB.to_string(),
    });
    assert_eq!(client.lines(), vec![format!("{BOB} REMOVE")]);
    assert!(ctx.state.known_buddies.contains(BOB));
}

#[test]
fn test_packets_from_unknown_buddies_are_dropped() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();

    ctx.event(packet(ALICE, PacketKind::Message("hi".to_string())));
    ctx.event(packet(ALICE, PacketKind::Status("away".to_string())));
    assert!(client.lines().is_empty());
}

#[test]
fn test_message_packet_is_split_per_line() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();
    connected(&mut ctx, BOB);
    client.lines();

    ctx.event(packet(BOB, PacketKind::Message("first\nsecond\r\nthird".to_string())));
    assert_eq!(
        client.lines(),
        vec![
            format!("{BOB} MESSAGE first"),
            format!("{BOB} MESSAGE second"),
            format!("{BOB} MESSAGE third"),
        ]
    );
}

#[test]
fn test_attribute_packets() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();
    connected(&mut ctx, BOB);
    client.lines();

    ctx.event(packet(BOB, PacketKind::Status("xa".to_string())));
    ctx.event(packet(BOB, PacketKind::Client("Jerry".to_string())));
    ctx.event(packet(BOB, PacketKind::Version("1.2".to_string())));
    ctx.event(packet(BOB, PacketKind::ProfileName("Bob".to_string())));
    ctx.event(packet(BOB, PacketKind::ProfileText("about bob".to_string())));
    ctx.event(packet(BOB, PacketKind::RemoveMe));
    assert_eq!(
        client.lines(),
        vec![
            format!("{BOB} STATUS xa"),
            format!("{BOB} CLIENT_NAME Jerry"),
            format!("{BOB} CLIENT_VERSION 1.2"),
            format!("{BOB} NAME Bob"),
            format!("{BOB} DESCRIPTION about bob"),
            format!("{BOB} REMOVE"),
        ]
    );
}

#[test]
fn test_empty_profile_packets_and_other_kinds_are_not_relayed() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();
    connected(&mut ctx, BOB);
    client.lines();

    ctx.event(packet(BOB, PacketKind::ProfileName(String::new())));
    ctx.event(packet(BOB, PacketKind::ProfileText(String::new())));
    ctx.event(packet(BOB, PacketKind::Other("filedata".to_string())));
    ctx.event(ProfileEvent::Packet(Packet {
        extension: true,
        ..Packet::new(BOB, PacketKind::Message("hidden".to_string()))
    }));
    assert!(client.lines().is_empty());
}

#[test]
fn test_typing_and_broadcast_events() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();

    ctx.event(ProfileEvent::Typing {
        buddy_id: ALICE.to_string(),
        mode: "typing".to_string(),
    });
    ctx.event(ProfileEvent::Broadcast {
        message: "hello world".to_string(),
    });
    assert_eq!(
        client.lines(),
        vec![format!("{ALICE} TYPING typing"), "BROADCAST hello world".to_string()]
    );
}

#[test]
fn test_group_chat_events() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();

    let events = [
        GroupChatEvent::Created {
            chat_id: CHAT_ID.to_string(),
        },
        GroupChatEvent::Invited {
            chat_id: CHAT_ID.to_string(),
            buddy_id: ALICE.to_string(),
        },
        GroupChatEvent::Joined {
            chat_id: CHAT_ID.to_string(),
            buddy_id: ALICE.to_string(),
            invited_by: Some(BOB.to_string()),
        },
        GroupChatEvent::Joined {
            chat_id: CHAT_ID.to_string(),
            buddy_id: BOB.to_string(),
            invited_by: None,
        },
        GroupChatEvent::JoinedSelf {
            chat_id: CHAT_ID.to_string(),
            participants: vec![ALICE.to_string(), BOB.to_string()],
        },
        GroupChatEvent::Message {
            chat_id: CHAT_ID.to_string(),
            buddy_id: ALICE.to_string(),
            message: "hi all".to_string(),
        },
        GroupChatEvent::Left {
            chat_id: CHAT_ID.to_string(),
            buddy_id: BOB.to_string(),
            reason: Some("bye now".to_string()),
        },
        GroupChatEvent::LeftSelf {
            chat_id: CHAT_ID.to_string(),
            reason: None,
        },
        GroupChatEvent::Destroyed {
            chat_id: CHAT_ID.to_string(),
        },
    ];
    for event in events {
        ctx.event(ProfileEvent::GroupChat(event));
    }

    assert_eq!(
        client.lines(),
        vec![
            format!("GROUPCHAT_CREATE {CHAT_ID}"),
            format!("{ALICE} GROUPCHAT_INVITE {CHAT_ID}"),
            format!("{ALICE} GROUPCHAT_JOIN {CHAT_ID} {BOB}"),
            format!("{BOB} GROUPCHAT_JOIN {CHAT_ID}"),
            format!("GROUPCHAT_JOINED {CHAT_ID}"),
            format!("GROUPCHAT_PARTICIPANTS {CHAT_ID} {ALICE} {BOB}"),
            format!("{ALICE} GROUPCHAT_MESSAGE {CHAT_ID} hi all"),
            format!("{BOB} GROUPCHAT_LEAVE {CHAT_ID} bye now"),
            format!("GROUPCHAT_LEFT {CHAT_ID}"),
            format!("GROUPCHAT_DESTROY {CHAT_ID}"),
        ]
    );
}

#[test]
fn test_latency_pong_resolves_once() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();
    ctx.state
        .pings
        .record(ALICE, PingId::from("7"), "payload-1", Instant::now());

    let pong = ProfileEvent::Latency {
        buddy_id: ALICE.to_string(),
        ping_id: PingId::from("7"),
        amount: Duration::from_millis(250),
    };
    ctx.event(pong.clone());
    assert_eq!(client.lines(), vec![format!("{ALICE} LATENCY payload-1")]);

    ctx.event(pong);
    assert!(client.lines().is_empty());
}

#[test]
fn test_unsolicited_pong_is_ignored() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();

    ctx.event(ProfileEvent::Latency {
        buddy_id: ALICE.to_string(),
        ping_id: PingId::from("42"),
        amount: Duration::from_millis(1),
    });
    assert!(client.lines().is_empty());
}

#[test]
fn test_log_only_events_render_nothing() {
    let mut ctx = TestContext::new();
    let mut client = ctx.connect();

    ctx.event(ProfileEvent::ConnectTo {
        address: "example.onion".to_string(),
        port: 11009,
    });
    ctx.event(ProfileEvent::ConnectFailure {
        buddy_id: ALICE.to_string(),
    });
    ctx.event(ProfileEvent::Verified {
        buddy_id: ALICE.to_string(),
    });
    ctx.event(ProfileEvent::FileTransfer {
        stage: FileTransferStage::Complete,
        transfer_id: "t1".to_string(),
    });
    assert!(client.lines().is_empty());
}

#[test]
fn test_events_reach_only_authorized_connections() {
    let mut ctx = TestContext::with_password(Some("secret"));
    let mut first = ctx.connect();
    let mut outsider = ctx.connect();
    let mut second = ctx.connect();
    ctx.send(&mut first, "PASS secret");
    ctx.send(&mut second, "PASS secret");

    ctx.event(ProfileEvent::Broadcast {
        message: "hello".to_string(),
    });
    assert_eq!(first.lines(), vec!["BROADCAST hello".to_string()]);
    assert_eq!(second.lines(), vec!["BROADCAST hello".to_string()]);
    assert!(outsider.lines().is_empty());
}

#[test]
fn test_broadcast_to_everyone_includes_unauthorized() {
    let mut ctx = TestContext::with_password(Some("secret"));
    let mut outsider = ctx.connect();

    ctx.state
        .broadcast_lines(&["NOTICE maintenance".to_string()], Audience::Everyone);
    assert_eq!(outsider.lines(), vec!["NOTICE maintenance".to_string()]);
}

#[test]
fn test_closed_connection_stops_receiving() {
    let mut ctx = TestContext::new();
    let mut gone = ctx.connect();
    let mut staying = ctx.connect();
    ctx.state.close_connection(gone.id);

    ctx.event(ProfileEvent::Broadcast {
        message: "still here".to_string(),
    });
    assert!(gone.lines().is_empty());
    assert_eq!(staying.lines(), vec!["BROADCAST still here".to_string()]);
}
