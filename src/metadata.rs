//! Stream metadata captured at open time.

use std::time::Duration;

/// Properties of the selected video stream.
///
/// Resolved once when the source is opened and never updated afterwards; in
/// particular `width` and `height` are the dimensions of every frame the
/// reader produces.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct StreamMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame count as declared by the container, or estimated from duration
    /// and frame rate. Zero when neither is available. This is only a hint:
    /// the number of frames actually decoded may differ.
    pub frame_count: u64,
    /// Average frame rate; zero when unknown.
    pub frames_per_second: f64,
    /// Decoder name (e.g. `"h264"`, `"mpeg4"`).
    pub codec: String,
    /// Index of the selected stream within the container.
    pub stream_index: usize,
    /// Container duration; zero when unknown.
    pub duration: Duration,
}

impl StreamMetadata {
    /// Size in bytes of one packed 3-channel frame.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * crate::PixelFormat::CHANNELS
    }
}

/// Pick the best available frame count: the container's declared count when
/// present, otherwise `duration * fps`.
pub(crate) fn estimate_frame_count(
    declared: i64,
    duration: Duration,
    frames_per_second: f64,
) -> u64 {
    if declared > 0 {
        declared as u64
    } else if frames_per_second > 0.0 {
        (duration.as_secs_f64() * frames_per_second).round() as u64
    } else {
        0
    }
}
