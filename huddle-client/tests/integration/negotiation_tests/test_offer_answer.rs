use std::time::Duration;

use huddle_core::{ParticipantId, RoomId, SessionDescription, SignalMessage};

use crate::integration::{
    announce_participant, create_test_room, init_tracing, join_room, wait_until,
};

fn offer_from(sender: &str, target: &str, sdp: &str) -> SignalMessage {
    SignalMessage::Offer {
        room_id: RoomId::from("standup"),
        sender_id: Some(ParticipantId::from(sender)),
        target_session_id: Some(ParticipantId::from(target)),
        data: SessionDescription::offer(sdp),
    }
}

fn answer_from(sender: &str, target: &str, sdp: &str) -> SignalMessage {
    SignalMessage::Answer {
        room_id: RoomId::from("standup"),
        sender_id: Some(ParticipantId::from(sender)),
        target_session_id: Some(ParticipantId::from(target)),
        data: SessionDescription::answer(sdp),
    }
}

#[tokio::test]
async fn test_inbound_offer_is_answered() {
    init_tracing();
    let room = create_test_room("alice");
    join_room(&room, "standup").await;

    room.socket
        .push_message(&offer_from("bob", "alice", "v=0 bob-offer"))
        .await;

    let bob = ParticipantId::from("bob");
    let socket = room.socket.clone();
    wait_until(|| {
        socket.sent_messages().iter().any(|m| {
            matches!(
                m,
                SignalMessage::Answer { target_session_id: Some(target), .. } if *target == bob
            )
        })
    })
    .await;

    // The negotiator was created lazily for the unseen sender.
    let session = room.factory.session_for(&bob).expect("no session for bob");
    assert_eq!(session.remote_descriptions().len(), 1);
    assert_eq!(session.remote_descriptions()[0].sdp, "v=0 bob-offer");
    assert_eq!(session.attached_track_ids().len(), 2);
}

#[tokio::test]
async fn test_answer_applied_only_while_offer_outstanding() {
    init_tracing();
    let room = create_test_room("alice");
    join_room(&room, "standup").await;

    // An answer from a participant we never offered to goes nowhere.
    room.socket
        .push_message(&answer_from("bob", "alice", "v=0 unsolicited"))
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(room.factory.created_count(), 0);

    // Offer out, answer in: applied.
    announce_participant(&room, "bob").await;
    let bob = ParticipantId::from("bob");
    let factory = room.factory.clone();
    wait_until(|| factory.created_count() == 1).await;
    let session = room.factory.session_for(&bob).expect("no session for bob");

    room.socket
        .push_message(&answer_from("bob", "alice", "v=0 first"))
        .await;
    let watched = session.clone();
    wait_until(|| watched.remote_descriptions().len() == 1).await;

    // Signaling is stable again; a second answer is stale.
    room.socket
        .push_message(&answer_from("bob", "alice", "v=0 second"))
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(session.remote_descriptions().len(), 1);
    assert_eq!(session.remote_descriptions()[0].sdp, "v=0 first");
}
