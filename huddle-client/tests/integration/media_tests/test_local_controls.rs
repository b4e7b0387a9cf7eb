use huddle_client::RoomError;
use huddle_client::media::MediaTrack;
use huddle_core::RoomId;

use crate::integration::{create_test_room, init_tracing, join_room};

#[tokio::test]
async fn test_capture_denied_blocks_join() {
    init_tracing();
    let room = create_test_room("alice");
    room.media.set_deny_user_media(true);

    let result = room.handle.join(RoomId::from("standup")).await;

    assert!(matches!(result, Err(RoomError::Capture(_))));
    // No media, no membership: the channel is never dialed.
    assert_eq!(room.socket.connect_count(), 0);
}

#[tokio::test]
async fn test_mute_toggle_flips_audio_enabled() {
    init_tracing();
    let room = create_test_room("alice");
    join_room(&room, "standup").await;

    let microphone = room.media.last_microphone().expect("no local capture");
    assert!(microphone.is_enabled());

    assert!(room.handle.toggle_mute().await.expect("toggle failed"));
    assert!(!microphone.is_enabled());
    // The track stays live: muting never detaches.
    assert!(microphone.is_live());

    assert!(!room.handle.toggle_mute().await.expect("toggle failed"));
    assert!(microphone.is_enabled());
}

#[tokio::test]
async fn test_video_toggle_flips_camera_enabled() {
    init_tracing();
    let room = create_test_room("alice");
    join_room(&room, "standup").await;

    let camera = room.media.last_camera().expect("no local capture");

    assert!(room.handle.toggle_video().await.expect("toggle failed"));
    assert!(!camera.is_enabled());
    assert!(camera.is_live());

    assert!(!room.handle.toggle_video().await.expect("toggle failed"));
    assert!(camera.is_enabled());
}
