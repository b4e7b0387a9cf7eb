use huddle_client::RoomEvent;
use huddle_client::media::MediaTrack;
use huddle_core::ParticipantId;

use crate::integration::{
    announce_participant, create_test_room, init_tracing, join_room, wait_for_event, wait_until,
};

#[tokio::test]
async fn test_screen_share_round_trip() {
    init_tracing();
    let room = create_test_room("alice");
    join_room(&room, "standup").await;

    announce_participant(&room, "bob").await;
    let bob = ParticipantId::from("bob");
    let factory = room.factory.clone();
    wait_until(|| factory.created_count() == 1).await;
    let session = room.factory.session_for(&bob).expect("no session for bob");

    room.handle.start_screen_share().await.expect("start failed");

    let screen = room.media.last_screen().expect("no screen capture");
    let camera = room.media.last_camera().expect("no camera");
    assert_eq!(session.substituted_track_ids(), vec![screen.id().to_string()]);
    // The camera is parked, not stopped.
    assert!(camera.is_live());

    room.handle.stop_screen_share().await.expect("stop failed");

    assert_eq!(
        session.substituted_track_ids(),
        vec![screen.id().to_string(), camera.id().to_string()]
    );
    assert!(!screen.is_live());
    assert!(camera.is_live());
    // The original camera came back; nothing was recaptured.
    assert_eq!(room.media.user_capture_count(), 1);
    assert_eq!(room.media.display_capture_count(), 1);
}

#[tokio::test]
async fn test_screen_share_source_ending_restores_camera() {
    init_tracing();
    let mut room = create_test_room("alice");
    join_room(&room, "standup").await;

    announce_participant(&room, "bob").await;
    let bob = ParticipantId::from("bob");
    let factory = room.factory.clone();
    wait_until(|| factory.created_count() == 1).await;
    let session = room.factory.session_for(&bob).expect("no session for bob");

    room.handle.start_screen_share().await.expect("start failed");
    wait_for_event(&mut room.events, |e| {
        matches!(e, RoomEvent::ScreenShareChanged { active: true })
    })
    .await;

    // The user ends the capture from the OS picker.
    let screen = room.media.last_screen().expect("no screen capture");
    screen.fire_ended();

    wait_for_event(&mut room.events, |e| {
        matches!(e, RoomEvent::ScreenShareChanged { active: false })
    })
    .await;
    let camera = room.media.last_camera().expect("no camera");
    let watched = session.clone();
    wait_until(move || watched.substituted_track_ids().len() == 2).await;
    assert_eq!(
        session.substituted_track_ids().last().map(String::as_str),
        Some(camera.id())
    );
}

#[tokio::test]
async fn test_stopping_share_recaptures_a_dead_camera() {
    init_tracing();
    let room = create_test_room("alice");
    join_room(&room, "standup").await;

    room.handle.start_screen_share().await.expect("start failed");

    // The parked camera dies while the share is running.
    let first_camera = room.media.last_camera().expect("no camera");
    first_camera.stop();

    room.handle.stop_screen_share().await.expect("stop failed");

    assert_eq!(room.media.user_capture_count(), 2);
    let fresh_camera = room.media.last_camera().expect("no recaptured camera");
    assert!(fresh_camera.is_live());
    // Only the video half of the recapture is wanted.
    let stray_microphone = room.media.last_microphone().expect("no microphone");
    assert!(!stray_microphone.is_live());
}

#[tokio::test]
async fn test_video_off_state_survives_screen_share() {
    init_tracing();
    let room = create_test_room("alice");
    join_room(&room, "standup").await;

    // Camera off, then share, then stop: the restored camera must stay
    // disabled.
    assert!(room.handle.toggle_video().await.expect("toggle failed"));
    room.handle.start_screen_share().await.expect("start failed");
    room.handle.stop_screen_share().await.expect("stop failed");

    let camera = room.media.last_camera().expect("no camera");
    assert!(!camera.is_enabled());
}
