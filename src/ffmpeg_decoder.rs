//! [`DecodeService`] backed by FFmpeg through `ffmpeg-next`.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::context::Input,
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::Context as ScalingContext,
    util::error::EAGAIN,
};

use crate::buffer::FrameBuffer;
use crate::configuration::{PixelFormat, ReaderOptions};
use crate::error::FrameReaderError;
use crate::metadata::{StreamMetadata, estimate_frame_count};
use crate::service::{DecodeService, DecodedFrameInfo, Demuxed};
use crate::source::Source;

/// Demuxer, decoder and scaler for the best video stream of one source.
///
/// Created with [`FfmpegDecoder::open`], usually indirectly through
/// [`FrameReader::open`](crate::FrameReader::open).
pub struct FfmpegDecoder {
    // Fields drop top to bottom: frames, scaler, decoder, then the demuxer,
    // the reverse of the order `open` acquires them in.
    scaled_frame: VideoFrame,
    decoded_frame: VideoFrame,
    scaler: ScalingContext,
    decoder: VideoDecoder,
    input_context: Input,
    time_base: Rational,
    pixel_format: PixelFormat,
    metadata: StreamMetadata,
}

// SAFETY: every FFmpeg handle in the struct is owned exclusively by it and
// only reached through `&mut self`, so moving the whole decoder to another
// thread cannot create aliased access. It is deliberately not `Sync`.
unsafe impl Send for FfmpegDecoder {}

impl Debug for FfmpegDecoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegDecoder")
            .field("metadata", &self.metadata)
            .field("pixel_format", &self.pixel_format)
            .field("time_base", &self.time_base)
            .finish_non_exhaustive()
    }
}

impl FfmpegDecoder {
    /// Open `source`, select its best video stream, and prepare a decoder
    /// and a scaler converting to `options.pixel_format` at native size.
    ///
    /// # Errors
    ///
    /// - [`FrameReaderError::UnsupportedSource`] for [`Source::Device`].
    /// - [`FrameReaderError::SourceUnopenable`] if FFmpeg cannot open or
    ///   probe the source.
    /// - [`FrameReaderError::NoVideoStream`] if there is no video stream.
    /// - [`FrameReaderError::DecoderInitFailed`] if the decoder or scaler
    ///   cannot be created.
    ///
    /// Anything acquired before a failure is released before returning.
    pub fn open(source: &Source, options: &ReaderOptions) -> Result<Self, FrameReaderError> {
        log::debug!("Opening video source: {source}");

        if let Source::Device(_) = source {
            return Err(FrameReaderError::UnsupportedSource(format!(
                "{source}: capture devices are not supported"
            )));
        }

        let unopenable = |reason: String| FrameReaderError::SourceUnopenable {
            source_name: source.to_string(),
            reason,
        };

        // ffmpeg-next needs the locator as UTF-8 to build its C string.
        let locator = source
            .locator()
            .ok_or_else(|| unopenable("path is not valid UTF-8".to_string()))?;

        ffmpeg_next::init()
            .map_err(|error| unopenable(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(locator).map_err(|error| unopenable(error.to_string()))?;

        let duration = match input_context.duration() {
            micros if micros > 0 => Duration::from_micros(micros as u64),
            _ => Duration::ZERO,
        };

        let (stream_index, time_base, frames_per_second, declared_frames, decoder) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or(FrameReaderError::NoVideoStream)?;

            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|error| {
                    FrameReaderError::DecoderInitFailed(format!(
                        "stream {}: {error}",
                        stream.index()
                    ))
                })?;

            (
                stream.index(),
                stream.time_base(),
                rational_to_f64(stream.avg_frame_rate())
                    .or_else(|| rational_to_f64(stream.rate()))
                    .unwrap_or(0.0),
                stream.frames(),
                decoder,
            )
        };

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(FrameReaderError::DecoderInitFailed(format!(
                "stream {stream_index} reports invalid dimensions {width}x{height}"
            )));
        }

        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            options.pixel_format.to_ffmpeg_pixel(),
            width,
            height,
            options.scaling.to_ffmpeg_flags(),
        )
        .map_err(|error| {
            FrameReaderError::DecoderInitFailed(format!("scaler setup failed: {error}"))
        })?;

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = StreamMetadata {
            width,
            height,
            frame_count: estimate_frame_count(declared_frames, duration, frames_per_second),
            frames_per_second,
            codec,
            stream_index,
            duration,
        };

        log::debug!(
            "Selected video stream {stream_index}: {}x{} {} @ {:.3} fps",
            metadata.width,
            metadata.height,
            metadata.codec,
            metadata.frames_per_second,
        );

        Ok(Self {
            scaled_frame: VideoFrame::empty(),
            decoded_frame: VideoFrame::empty(),
            scaler,
            decoder,
            input_context,
            time_base,
            pixel_format: options.pixel_format,
            metadata,
        })
    }
}

impl DecodeService for FfmpegDecoder {
    type Packet = Packet;

    fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    fn read_packet(&mut self) -> Result<Demuxed<Packet>, FrameReaderError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.input_context) {
            Ok(()) => Ok(Demuxed::Packet {
                stream_index: packet.stream(),
                packet,
            }),
            Err(FfmpegError::Eof) => Ok(Demuxed::EndOfStream),
            Err(error) => Err(FrameReaderError::ReadFailed(error.to_string())),
        }
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<(), FrameReaderError> {
        match self.decoder.send_packet(packet) {
            Ok(()) | Err(FfmpegError::Eof) => Ok(()),
            Err(error) => Err(FrameReaderError::DecodeFailed(error.to_string())),
        }
    }

    fn send_eof(&mut self) -> Result<(), FrameReaderError> {
        match self.decoder.send_eof() {
            Ok(()) | Err(FfmpegError::Eof) => Ok(()),
            Err(error) => Err(FrameReaderError::DecodeFailed(error.to_string())),
        }
    }

    fn receive_frame(&mut self) -> Result<Option<DecodedFrameInfo>, FrameReaderError> {
        match self.decoder.receive_frame(&mut self.decoded_frame) {
            Ok(()) => {
                let pts = self.decoded_frame.pts();
                Ok(Some(DecodedFrameInfo {
                    pts,
                    timestamp: pts.and_then(|pts| pts_to_duration(pts, self.time_base)),
                }))
            }
            Err(FfmpegError::Eof) => Ok(None),
            Err(FfmpegError::Other { errno }) if errno == EAGAIN => Ok(None),
            Err(error) => Err(FrameReaderError::DecodeFailed(error.to_string())),
        }
    }

    fn rescale_into(&mut self, buffer: &mut FrameBuffer) -> Result<(), FrameReaderError> {
        self.scaler
            .run(&self.decoded_frame, &mut self.scaled_frame)
            .map_err(|error| FrameReaderError::ScaleFailed(error.to_string()))?;
        buffer.copy_from_plane(self.scaled_frame.data(0), self.scaled_frame.stride(0))
    }
}

fn rational_to_f64(rate: Rational) -> Option<f64> {
    (rate.numerator() > 0 && rate.denominator() > 0)
        .then(|| rate.numerator() as f64 / rate.denominator() as f64)
}

fn pts_to_duration(pts: i64, time_base: Rational) -> Option<Duration> {
    if pts < 0 || time_base.numerator() <= 0 || time_base.denominator() <= 0 {
        return None;
    }
    let seconds = pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    Duration::try_from_secs_f64(seconds).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_rejects_unknown_rates() {
        assert_eq!(rational_to_f64(Rational::new(0, 1)), None);
        assert_eq!(rational_to_f64(Rational::new(25, 0)), None);
        assert_eq!(rational_to_f64(Rational::new(30000, 1001)).map(|fps| fps.round()), Some(30.0));
    }

    #[test]
    fn pts_converts_through_time_base() {
        let time_base = Rational::new(1, 90_000);
        assert_eq!(pts_to_duration(90_000, time_base), Some(Duration::from_secs(1)));
        assert_eq!(pts_to_duration(-3, time_base), None);
    }

    #[test]
    fn pts_from_corrupt_time_base_is_dropped() {
        assert_eq!(pts_to_duration(10, Rational::new(-1, 25)), None);
        assert_eq!(pts_to_duration(10, Rational::new(1, -25)), None);
        assert_eq!(pts_to_duration(10, Rational::new(0, 1)), None);
        assert_eq!(pts_to_duration(i64::MAX / 2, Rational::new(1001, 1)), None);
    }

    #[test]
    fn devices_are_rejected_before_ffmpeg() {
        let error = FfmpegDecoder::open(&Source::Device(0), &ReaderOptions::default()).unwrap_err();
        assert!(matches!(error, FrameReaderError::UnsupportedSource(_)));
    }
}
