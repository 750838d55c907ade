//! Benchmarks for the frame read loop.
//!
//! Run with: cargo bench
//!
//! The FFmpeg benchmarks require fixture files from
//! `tests/fixtures/generate_fixtures.sh`; the synthetic ones always run.

use std::{hint::black_box, ops::ControlFlow, path::Path, time::Duration};

use criterion::{BenchmarkId, Criterion};
use framereader::{
    FfmpegLogLevel, FrameReader, PixelFormat, ReaderOptions, ScalingAlgorithm, SyntheticSource,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

fn benchmark_synthetic_read(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("synthetic read loop");

    for (width, height) in [(64, 48), (640, 480), (1920, 1080)] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &(width, height),
            |bencher, &(width, height)| {
                bencher.iter(|| {
                    let service = SyntheticSource::new(width, height, 10).open().unwrap();
                    let mut reader = FrameReader::with_service(service);
                    let mut checksum = 0_u64;
                    while let Some(frame) = reader.read().unwrap() {
                        checksum += u64::from(frame.data()[0]);
                    }
                    black_box(checksum)
                });
            },
        );
    }

    group.finish();
}

fn benchmark_decoder_delay(criterion: &mut Criterion) {
    criterion.bench_function("synthetic read with decoder delay", |bencher| {
        bencher.iter(|| {
            let service = SyntheticSource::new(320, 240, 50)
                .with_decoder_delay(4)
                .with_interleaved_packets(2)
                .open()
                .unwrap();
            let mut reader = FrameReader::with_service(service);
            let delivered = reader
                .for_each_frame(|frame| {
                    black_box(frame.data());
                    ControlFlow::Continue(())
                })
                .unwrap();
            black_box(delivered)
        });
    });
}

fn benchmark_owned_frames(criterion: &mut Criterion) {
    criterion.bench_function("synthetic frames iterator (owned copies)", |bencher| {
        bencher.iter(|| {
            let service = SyntheticSource::new(320, 240, 20).open().unwrap();
            let mut reader = FrameReader::with_service(service);
            let frames: Vec<_> = reader.frames().collect::<Result<_, _>>().unwrap();
            black_box(frames.len())
        });
    });
}

fn benchmark_ffmpeg_read(criterion: &mut Criterion) {
    framereader::set_ffmpeg_log_level(FfmpegLogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    let mut group = criterion.benchmark_group("ffmpeg read loop");
    group.measurement_time(Duration::from_secs(10));

    for (label, options) in [
        ("bgr24 bicubic", ReaderOptions::new()),
        (
            "rgb24 bilinear",
            ReaderOptions::new()
                .with_pixel_format(PixelFormat::Rgb24)
                .with_scaling(ScalingAlgorithm::Bilinear),
        ),
        (
            "bgr24 point",
            ReaderOptions::new().with_scaling(ScalingAlgorithm::Point),
        ),
    ] {
        group.bench_function(label, |bencher| {
            bencher.iter(|| {
                let mut reader = FrameReader::new();
                reader.open_with_options(SAMPLE_VIDEO, &options).unwrap();
                let mut count = 0_u64;
                while let Some(frame) = reader.read().unwrap() {
                    black_box(frame.data());
                    count += 1;
                }
                black_box(count)
            });
        });
    }

    group.finish();
}

fn benchmark_open_close(criterion: &mut Criterion) {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    criterion.bench_function("open and drop", |bencher| {
        bencher.iter(|| {
            let reader = FrameReader::from_source(SAMPLE_VIDEO).unwrap();
            black_box(reader.width())
        });
    });
}

criterion::criterion_group!(
    benches,
    benchmark_synthetic_read,
    benchmark_decoder_delay,
    benchmark_owned_frames,
    benchmark_ffmpeg_read,
    benchmark_open_close,
);
criterion::criterion_main!(benches);
