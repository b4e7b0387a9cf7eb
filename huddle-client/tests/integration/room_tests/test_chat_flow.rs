use huddle_client::RoomEvent;
use huddle_core::{
    ChatHistoryData, ChatKind, ChatMessage, ParticipantId, RoomId, SignalMessage,
};

use crate::integration::{create_test_room, init_tracing, join_room, wait_for_event, wait_until};

fn chat_from(sender: &str, content: &str) -> ChatMessage {
    ChatMessage {
        content: content.to_string(),
        sender_id: ParticipantId::from(sender),
        sender_name: sender.to_string(),
        kind: ChatKind::Text,
        timestamp: Some(1_725_000_000_000),
    }
}

#[tokio::test]
async fn test_inbound_chat_is_surfaced() {
    init_tracing();
    let mut room = create_test_room("alice");
    join_room(&room, "standup").await;

    room.socket
        .push_message(&SignalMessage::Chat {
            room_id: RoomId::from("standup"),
            data: chat_from("bob", "hello there"),
        })
        .await;

    let event = wait_for_event(&mut room.events, |e| matches!(e, RoomEvent::Chat { .. })).await;
    if let RoomEvent::Chat { message } = event {
        assert_eq!(message.content, "hello there");
        assert_eq!(message.sender_id, ParticipantId::from("bob"));
    }
}

#[tokio::test]
async fn test_chat_history_replay() {
    init_tracing();
    let mut room = create_test_room("alice");
    join_room(&room, "standup").await;

    room.socket
        .push_message(&SignalMessage::ChatHistory {
            data: ChatHistoryData {
                messages: vec![chat_from("bob", "first"), chat_from("carol", "second")],
            },
        })
        .await;

    let event = wait_for_event(&mut room.events, |e| {
        matches!(e, RoomEvent::ChatHistory { .. })
    })
    .await;
    if let RoomEvent::ChatHistory { messages } = event {
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
    }
}

#[tokio::test]
async fn test_outbound_chat_rides_signaling() {
    init_tracing();
    let room = create_test_room("alice");
    join_room(&room, "standup").await;

    room.handle.send_chat("good morning").await.expect("send failed");

    let socket = room.socket.clone();
    wait_until(|| {
        socket.sent_messages().iter().any(|m| {
            matches!(
                m,
                SignalMessage::Chat { data, .. }
                    if data.content == "good morning"
                        && data.sender_id == ParticipantId::from("alice")
            )
        })
    })
    .await;
}
