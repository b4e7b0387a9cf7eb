use std::time::Duration;

use huddle_core::{ParticipantId, RoomId, SessionDescription, SignalMessage};

use crate::integration::{
    announce_participant, create_test_room, init_tracing, join_room, wait_until,
};

fn offer_from(sender: &str, target: &str) -> SignalMessage {
    SignalMessage::Offer {
        room_id: RoomId::from("standup"),
        sender_id: Some(ParticipantId::from(sender)),
        target_session_id: Some(ParticipantId::from(target)),
        data: SessionDescription::offer(format!("v=0 offer-of-{}", sender)),
    }
}

#[tokio::test]
async fn test_glare_smaller_id_keeps_its_offer() {
    init_tracing();
    // "alice" < "bob": alice is the side that holds on.
    let room = create_test_room("alice");
    join_room(&room, "standup").await;

    announce_participant(&room, "bob").await;
    let bob = ParticipantId::from("bob");
    let factory = room.factory.clone();
    wait_until(|| factory.created_count() == 1).await;
    let session = room.factory.session_for(&bob).expect("no session for bob");

    // Bob's offer crosses ours on the wire. We ignore it.
    room.socket.push_message(&offer_from("bob", "alice")).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(session.remote_descriptions().is_empty());
    assert_eq!(room.factory.created_count(), 1);
    assert!(
        !room
            .socket
            .sent_messages()
            .iter()
            .any(|m| matches!(m, SignalMessage::Answer { .. })),
        "the smaller id must not answer during glare"
    );
}

#[tokio::test]
async fn test_glare_larger_id_rolls_back_and_answers() {
    init_tracing();
    // "carol" > "bob": carol yields her own offer.
    let room = create_test_room("carol");
    join_room(&room, "standup").await;

    announce_participant(&room, "bob").await;
    let bob = ParticipantId::from("bob");
    let factory = room.factory.clone();
    wait_until(|| factory.created_count() == 1).await;

    room.socket.push_message(&offer_from("bob", "carol")).await;

    // Rollback means a fresh session that answers bob's offer.
    let factory = room.factory.clone();
    wait_until(|| factory.created_count() == 2).await;
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

    let sessions = room.factory.sessions_for(&bob);
    assert!(sessions[0].is_closed());
    assert_eq!(sessions[1].remote_descriptions().len(), 1);
    assert_eq!(sessions[1].remote_descriptions()[0].sdp, "v=0 offer-of-bob");
}
