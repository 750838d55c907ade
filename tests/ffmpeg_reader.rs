//! FrameReader integration tests against real FFmpeg decoding.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`
//! and are skipped, with a note on stderr, when those are missing.

use std::path::Path;

use framereader::{
    FrameReader, FrameReaderError, PixelFormat, ReaderOptions, ScalingAlgorithm, Source,
};

const FIXTURE_FRAMES: u64 = 10;
const FIXTURE_WIDTH: u32 = 64;
const FIXTURE_HEIGHT: u32 = 48;

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn sample_video_only_path() -> &'static str {
    "tests/fixtures/sample_video_only.mp4"
}

fn sample_audio_only_path() -> &'static str {
    "tests/fixtures/sample_audio_only.mp4"
}

/// Whether `path` exists; prints a skip note otherwise so missing fixtures
/// do not pass silently.
fn fixture_available(path: &str) -> bool {
    let available = Path::new(path).exists();
    if !available {
        eprintln!("Skipping: fixture {path} not found (run tests/fixtures/generate_fixtures.sh)");
    }
    available
}

fn count_frames(reader: &mut FrameReader) -> u64 {
    let mut count = 0;
    while let Some(frame) = reader.read().expect("Read error") {
        assert_eq!(
            frame.data().len(),
            (FIXTURE_WIDTH * FIXTURE_HEIGHT * 3) as usize
        );
        count += 1;
    }
    count
}

// ── open ───────────────────────────────────────────────────────────

#[test]
fn open_reports_native_dimensions() {
    let path = sample_video_only_path();
    if !fixture_available(path) {
        return;
    }

    let reader = FrameReader::from_source(path).expect("Failed to open fixture");
    assert!(reader.is_opened());
    assert_eq!(reader.width(), FIXTURE_WIDTH);
    assert_eq!(reader.height(), FIXTURE_HEIGHT);

    let metadata = reader.metadata().expect("Missing metadata");
    assert_eq!(metadata.codec, "mpeg4");
    assert!(metadata.frames_per_second > 24.0 && metadata.frames_per_second < 26.0);
}

#[test]
fn open_audio_only_reports_no_video_stream() {
    let path = sample_audio_only_path();
    if !fixture_available(path) {
        return;
    }

    let mut reader = FrameReader::new();
    let error = reader.open(path).expect_err("Expected missing video stream");
    assert!(matches!(error, FrameReaderError::NoVideoStream));
    assert!(!reader.is_opened());
}

// ── reading ────────────────────────────────────────────────────────

#[test]
fn reads_every_frame_then_exhausts() {
    let path = sample_video_only_path();
    if !fixture_available(path) {
        return;
    }

    let mut reader = FrameReader::from_source(path).expect("Failed to open fixture");
    assert_eq!(count_frames(&mut reader), FIXTURE_FRAMES);
    assert!(reader.is_exhausted());
    assert!(reader.read().expect("Read error").is_none());
    assert!(reader.read().expect("Read error").is_none());
}

#[test]
fn audio_packets_are_skipped() {
    let path = sample_video_path();
    if !fixture_available(path) {
        return;
    }

    let mut reader = FrameReader::from_source(path).expect("Failed to open fixture");
    assert_eq!(count_frames(&mut reader), FIXTURE_FRAMES);
}

#[test]
fn frames_have_increasing_timestamps() {
    let path = sample_video_only_path();
    if !fixture_available(path) {
        return;
    }

    let mut reader = FrameReader::from_source(path).expect("Failed to open fixture");
    let timestamps: Vec<_> = reader
        .frames()
        .map(|frame| frame.expect("Read error").view().timestamp())
        .collect();

    assert_eq!(timestamps.len() as u64, FIXTURE_FRAMES);
    for window in timestamps.windows(2) {
        assert!(window[1] > window[0], "Timestamps should increase: {window:?}");
    }
}

#[test]
fn rgb_and_bgr_are_channel_swaps() {
    let path = sample_video_only_path();
    if !fixture_available(path) {
        return;
    }

    let mut bgr_reader = FrameReader::from_source(path).expect("Failed to open fixture");
    let mut rgb_reader = FrameReader::new();
    rgb_reader
        .open_with_options(path, &ReaderOptions::new().with_pixel_format(PixelFormat::Rgb24))
        .expect("Failed to open fixture");

    let bgr = bgr_reader
        .read()
        .expect("Read error")
        .expect("Missing frame")
        .to_image()
        .expect("Image conversion failed");
    let rgb = rgb_reader
        .read()
        .expect("Read error")
        .expect("Missing frame")
        .to_image()
        .expect("Image conversion failed");

    assert_eq!(bgr.dimensions(), (FIXTURE_WIDTH, FIXTURE_HEIGHT));
    assert_eq!(bgr.as_raw(), rgb.as_raw());
}

#[test]
fn scaling_choice_keeps_dimensions() {
    let path = sample_video_only_path();
    if !fixture_available(path) {
        return;
    }

    let options = ReaderOptions::new().with_scaling(ScalingAlgorithm::Point);
    let mut reader = FrameReader::new();
    reader
        .open_with_options(Source::from(path), &options)
        .expect("Failed to open fixture");
    let frame = reader.read().expect("Read error").expect("Missing frame");
    assert_eq!((frame.width(), frame.height()), (FIXTURE_WIDTH, FIXTURE_HEIGHT));
}

#[test]
fn reopen_starts_from_the_beginning() {
    let path = sample_video_only_path();
    if !fixture_available(path) {
        return;
    }

    let mut reader = FrameReader::from_source(path).expect("Failed to open fixture");
    reader.read().expect("Read error");
    reader.read().expect("Read error");

    reader.open(path).expect("Failed to reopen fixture");
    assert_eq!(reader.frames_read(), 0);
    assert_eq!(count_frames(&mut reader), FIXTURE_FRAMES);
}

#[test]
fn drop_mid_stream_is_clean() {
    let path = sample_video_path();
    if !fixture_available(path) {
        return;
    }

    for frames_before_drop in 0..3 {
        let mut reader = FrameReader::from_source(path).expect("Failed to open fixture");
        for _ in 0..frames_before_drop {
            reader.read().expect("Read error");
        }
        drop(reader);
    }
}
