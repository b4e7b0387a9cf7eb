use crate::error::CaptureError;
use crate::media::track::MediaStream;
use async_trait::async_trait;

/// Capture provider boundary, the getUserMedia/getDisplayMedia
/// equivalent. Implemented outside this crate (or by test fakes); the
/// session engine never talks to devices directly.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Camera + microphone stream for the local participant.
    async fn capture_user_media(&self) -> Result<MediaStream, CaptureError>;

    /// Secondary video source for screen sharing.
    async fn capture_display_media(&self) -> Result<MediaStream, CaptureError>;
}
