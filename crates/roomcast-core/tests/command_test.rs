//! Command interpreter tests
//!
//! Each verb driven through a live session, plus the inert and malformed
//! cases that must leave state untouched.

use std::sync::Arc;

use roomcast_core::{Registry, RoomConfig, SessionConfig};
use roomcast_harness::{Received, SimClient, SimEnv};
use roomcast_proto::{HELP_TEXT, WireRecord};

fn setup() -> (Arc<Registry<SimEnv>>, Arc<SessionConfig>) {
    (Registry::new(SimEnv::default(), RoomConfig::default()), Arc::new(SessionConfig::default()))
}

async fn named(
    registry: &Arc<Registry<SimEnv>>,
    config: &Arc<SessionConfig>,
    name: &str,
) -> SimClient {
    let mut client = SimClient::connect_greeted(registry, config).await;
    client.say(format!("/name {name}"));
    client.expect_content(&format!("New User set their name to {name}")).await;
    client
}

#[tokio::test]
async fn join_moves_session_between_rooms() {
    let (registry, config) = setup();
    let mut alice = named(&registry, &config, "alice").await;
    let mut bob = named(&registry, &config, "bob").await;
    alice.expect_content("New User set their name to bob").await;

    bob.say("/join bravo");
    assert_eq!(
        bob.skip_until(|r| matches!(r, Received::RoomChange(_))).await,
        Received::RoomChange("bravo".into())
    );
    bob.expect_content("bob joined the room").await;
    alice.expect_content("bob left the room").await;

    assert_eq!(registry.room("waitingRoom").unwrap().member_names(), vec!["alice"]);
    assert_eq!(registry.room("bravo").unwrap().member_names(), vec!["bob"]);
}

#[tokio::test]
async fn arrival_notice_uses_current_name() {
    let (registry, config) = setup();
    let mut carol = named(&registry, &config, "carol").await;
    carol.say("/join bravo");
    carol.expect_content("carol joined the room").await;

    let alice = named(&registry, &config, "alice").await;
    alice.say("/join bravo");
    let notice = carol.expect_content("alice joined the room").await;
    assert_eq!(notice.sender, "Server");
}

#[tokio::test]
async fn joining_replays_room_history() {
    let (registry, config) = setup();
    let mut alice = named(&registry, &config, "alice").await;
    alice.say("/join bravo");
    alice.say("first");
    alice.expect_content("first").await;

    let mut bob = named(&registry, &config, "bob").await;
    bob.say("/join bravo");
    let replayed = bob.expect_content("first").await;
    assert_eq!(replayed.sender, "alice");
    bob.expect_content("bob joined the room").await;
}

#[tokio::test]
async fn rooms_and_users_reply_to_requester_only() {
    let (registry, config) = setup();
    let mut alice = named(&registry, &config, "alice").await;
    let mut bob = named(&registry, &config, "bob").await;
    alice.expect_content("New User set their name to bob").await;

    bob.say("/rooms");
    bob.expect_content("Room List: waitingRoom").await;
    bob.say("/users");
    bob.expect_content("Client List: alice, bob").await;
    bob.say("/help");
    assert_eq!(bob.next_record().await.unwrap().content, HELP_TEXT);

    // alice shares the room and sees none of it
    assert!(alice.is_quiet().await);
}

#[tokio::test]
async fn rooms_lists_every_room_sorted() {
    let (registry, config) = setup();
    let mut alice = named(&registry, &config, "alice").await;
    let mut bob = named(&registry, &config, "bob").await;

    bob.say("/join bravo");
    bob.expect_content("bob joined the room").await;

    alice.say("/rooms");
    alice.expect_content("Room List: bravo, waitingRoom").await;
}

#[tokio::test]
async fn users_lists_current_room_sorted() {
    let (registry, config) = setup();
    let mut zed = named(&registry, &config, "zed").await;
    let mut amy = named(&registry, &config, "amy").await;
    zed.expect_content("New User set their name to amy").await;

    zed.say("/users");
    zed.expect_content("Client List: amy, zed").await;
    assert!(amy.is_quiet().await);
}

#[tokio::test]
async fn users_outside_any_room_is_empty() {
    let registry = Registry::new(SimEnv::default(), RoomConfig::default());
    let config = Arc::new(SessionConfig { lobby: None, ..SessionConfig::default() });
    let mut client = SimClient::connect_greeted(&registry, &config).await;

    client.say("/users");
    client.expect_content("Client List: ").await;
}

#[tokio::test]
async fn rename_outside_room_is_silent() {
    let registry = Registry::new(SimEnv::default(), RoomConfig::default());
    let config = Arc::new(SessionConfig { lobby: None, ..SessionConfig::default() });
    let mut client = SimClient::connect_greeted(&registry, &config).await;

    client.say("/name alice");
    client.say("/join bravo");
    assert_eq!(client.next_record().await.unwrap().content, "alice joined the room");
}

#[tokio::test]
async fn unknown_verb_is_inert() {
    let (registry, config) = setup();
    let mut client = named(&registry, &config, "alice").await;

    client.say("/dance wildly");
    client.say("/help");
    assert_eq!(client.next_record().await.unwrap().content, HELP_TEXT);
    assert_eq!(registry.room("waitingRoom").unwrap().member_names(), vec!["alice"]);
}

#[tokio::test]
async fn malformed_join_changes_nothing() {
    let (registry, config) = setup();
    let mut client = named(&registry, &config, "alice").await;

    client.say("/join");
    client.say("/join one two");
    client.say("/users");
    assert_eq!(client.next_record().await.unwrap().content, "Client List: alice");
    assert_eq!(registry.room_names(), vec!["waitingRoom"]);
}

#[tokio::test]
async fn room_with_delimiter_is_rejected() {
    let (registry, config) = setup();
    let mut client = named(&registry, &config, "alice").await;

    client.say("/join a|b");
    client.say("/rooms");
    assert_eq!(
        client.recv().await,
        Some(Received::Record(WireRecord::new("Server", "09:15", "Room List: waitingRoom")))
    );
    assert_eq!(registry.room_names(), vec!["waitingRoom"]);
}

#[tokio::test]
async fn name_with_delimiter_is_rejected() {
    let (registry, config) = setup();
    let mut client = named(&registry, &config, "alice").await;

    client.say("/name a|b");
    client.say("hello");
    assert_eq!(client.next_record().await.unwrap().sender, "alice");
}

#[tokio::test]
async fn extra_arguments_to_plain_verbs_are_ignored() {
    let (registry, config) = setup();
    let mut client = named(&registry, &config, "alice").await;

    client.say("/rooms please");
    assert_eq!(client.next_record().await.unwrap().content, "Room List: waitingRoom");
}
