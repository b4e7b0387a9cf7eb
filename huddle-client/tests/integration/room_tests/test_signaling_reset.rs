use std::time::Duration;

use huddle_client::RoomEvent;
use huddle_core::{ParticipantId, SignalMessage};

use crate::integration::{
    announce_participant, create_test_room, init_tracing, join_room, wait_for_event, wait_until,
};

#[tokio::test]
async fn test_abnormal_close_resets_and_reconnects() {
    init_tracing();
    let mut room = create_test_room("alice");
    join_room(&room, "standup").await;

    let bob = ParticipantId::from("bob");
    announce_participant(&room, "bob").await;
    let factory = room.factory.clone();
    wait_until(|| factory.created_count() == 1).await;

    // 1006: the transport broke without a close handshake.
    room.socket.push_close(Some(1006)).await;

    wait_for_event(&mut room.events, |e| matches!(e, RoomEvent::SignalingReset)).await;
    let session = room.factory.session_for(&bob).expect("no session for bob");
    assert!(session.is_closed(), "negotiation must not outlive the channel");

    // Reconnect fires after the configured delay and re-announces us.
    let socket = room.socket.clone();
    wait_until(|| socket.connect_count() == 2).await;
    let joins = room
        .socket
        .sent_messages()
        .iter()
        .filter(|m| matches!(m, SignalMessage::Join { .. }))
        .count();
    assert_eq!(joins, 2);
}

#[tokio::test]
async fn test_normal_close_does_not_reconnect() {
    init_tracing();
    let room = create_test_room("alice");
    join_room(&room, "standup").await;

    room.socket.push_close(Some(1000)).await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(room.socket.connect_count(), 1);
}

#[tokio::test]
async fn test_messages_after_reconnect_are_processed() {
    init_tracing();
    let room = create_test_room("alice");
    join_room(&room, "standup").await;

    room.socket.push_close(Some(1006)).await;
    let socket = room.socket.clone();
    wait_until(|| socket.connect_count() == 2).await;

    // The replacement connection carries live traffic again.
    announce_participant(&room, "bob").await;
    let factory = room.factory.clone();
    wait_until(|| factory.created_count() == 1).await;
}
