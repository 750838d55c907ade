//! In-memory [`DecodeService`] producing generated frames.
//!
//! [`SyntheticSource`] describes a fake container: how many frames its video
//! stream holds, how large they are, and which awkward behaviours to
//! exercise (decoder delay, interleaved packets of another stream, injected
//! failures). [`SyntheticSource::open`] turns the description into a
//! [`SyntheticDecoder`] that a [`FrameReader`](crate::FrameReader) drives
//! exactly like an FFmpeg-backed one, without media files or codecs.
//!
//! # Example
//!
//! ```
//! use framereader::{FrameReader, SyntheticSource};
//!
//! let service = SyntheticSource::new(64, 48, 10).with_decoder_delay(2).open()?;
//! let mut reader = FrameReader::with_service(service);
//!
//! let mut frames = 0;
//! while let Some(frame) = reader.read()? {
//!     assert_eq!(frame.data().len(), 64 * 48 * 3);
//!     frames += 1;
//! }
//! assert_eq!(frames, 10);
//! # Ok::<(), framereader::FrameReaderError>(())
//! ```

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use crate::buffer::FrameBuffer;
use crate::configuration::PixelFormat;
use crate::error::FrameReaderError;
use crate::metadata::StreamMetadata;
use crate::service::{DecodeService, DecodedFrameInfo, Demuxed};

/// Stream index of the generated video stream.
pub const VIDEO_STREAM_INDEX: usize = 0;
/// Stream index used for interleaved non-video packets.
pub const OTHER_STREAM_INDEX: usize = 1;

const FRAMES_PER_SECOND: u32 = 25;

/// Description of a generated source.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_count: u64,
    decoder_delay: usize,
    interleaved_packets: usize,
    has_video_stream: bool,
    unopenable: bool,
    read_failure_at: Option<u64>,
    decode_failure_at: Option<u64>,
    pixel_format: PixelFormat,
    release_counter: Option<Arc<AtomicUsize>>,
}

impl SyntheticSource {
    /// A source whose video stream holds `frame_count` frames of
    /// `width` x `height`.
    pub fn new(width: u32, height: u32, frame_count: u64) -> Self {
        Self {
            width,
            height,
            frame_count,
            decoder_delay: 0,
            interleaved_packets: 0,
            has_video_stream: true,
            unopenable: false,
            read_failure_at: None,
            decode_failure_at: None,
            pixel_format: PixelFormat::default(),
            release_counter: None,
        }
    }

    /// Hold back `frames` decoded frames until more packets arrive, the way
    /// codecs with B-frames do. Held frames come out after end of input.
    #[must_use]
    pub fn with_decoder_delay(mut self, frames: usize) -> Self {
        self.decoder_delay = frames;
        self
    }

    /// Emit `count` packets of another stream before every video packet.
    #[must_use]
    pub fn with_interleaved_packets(mut self, count: usize) -> Self {
        self.interleaved_packets = count;
        self
    }

    /// Describe a container with no video stream at all.
    #[must_use]
    pub fn without_video_stream(mut self) -> Self {
        self.has_video_stream = false;
        self
    }

    /// Make [`open`](Self::open) fail as if the container were unreadable.
    #[must_use]
    pub fn unopenable(mut self) -> Self {
        self.unopenable = true;
        self
    }

    /// Fail the `call`-th (zero-based) packet read once, without consuming a
    /// packet.
    #[must_use]
    pub fn with_read_failure_at(mut self, call: u64) -> Self {
        self.read_failure_at = Some(call);
        self
    }

    /// Reject the video packet carrying frame `frame`; that frame is lost.
    #[must_use]
    pub fn with_decode_failure_at(mut self, frame: u64) -> Self {
        self.decode_failure_at = Some(frame);
        self
    }

    #[must_use]
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Increment `counter` when the opened decoder is dropped.
    #[must_use]
    pub fn with_release_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.release_counter = Some(counter);
        self
    }

    /// The RGB value of pixel (`x`, `y`) in frame `frame`.
    pub fn pattern(frame: u64, x: u32, y: u32) -> [u8; 3] {
        [frame as u8, x as u8, y as u8]
    }

    /// Open the described source.
    ///
    /// # Errors
    ///
    /// [`FrameReaderError::SourceUnopenable`] for an
    /// [`unopenable`](Self::unopenable) source,
    /// [`FrameReaderError::NoVideoStream`] when there is no video stream.
    pub fn open(self) -> Result<SyntheticDecoder, FrameReaderError> {
        if self.unopenable {
            return Err(FrameReaderError::SourceUnopenable {
                source_name: "synthetic".to_string(),
                reason: "source marked unopenable".to_string(),
            });
        }
        if !self.has_video_stream {
            return Err(FrameReaderError::NoVideoStream);
        }

        let metadata = StreamMetadata {
            width: self.width,
            height: self.height,
            frame_count: self.frame_count,
            frames_per_second: f64::from(FRAMES_PER_SECOND),
            codec: "synthetic".to_string(),
            stream_index: VIDEO_STREAM_INDEX,
            duration: frame_time(self.frame_count),
        };

        Ok(SyntheticDecoder {
            source: self,
            metadata,
            next_frame: 0,
            other_packets_pending: 0,
            read_calls: 0,
            decoder_queue: VecDeque::new(),
            current: None,
            eof_sent: false,
        })
    }
}

/// A demuxed synthetic packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticPacket {
    /// Carries one video frame.
    Video(u64),
    /// Belongs to another stream.
    Other,
}

/// The opened form of a [`SyntheticSource`].
#[derive(Debug)]
pub struct SyntheticDecoder {
    source: SyntheticSource,
    metadata: StreamMetadata,
    /// Next video frame the demuxer will emit.
    next_frame: u64,
    /// Other-stream packets still to emit before `next_frame`.
    other_packets_pending: usize,
    read_calls: u64,
    decoder_queue: VecDeque<u64>,
    /// Frame last handed out by `receive_frame`.
    current: Option<u64>,
    eof_sent: bool,
}

impl SyntheticDecoder {
    /// Number of `read_packet` calls made so far.
    pub fn packets_read(&self) -> u64 {
        self.read_calls
    }
}

impl DecodeService for SyntheticDecoder {
    type Packet = SyntheticPacket;

    fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    fn pixel_format(&self) -> PixelFormat {
        self.source.pixel_format
    }

    fn read_packet(&mut self) -> Result<Demuxed<SyntheticPacket>, FrameReaderError> {
        let call = self.read_calls;
        self.read_calls += 1;

        if self.source.read_failure_at == Some(call) {
            return Err(FrameReaderError::ReadFailed(format!(
                "injected failure on read {call}"
            )));
        }

        if self.next_frame >= self.source.frame_count {
            return Ok(Demuxed::EndOfStream);
        }

        if self.other_packets_pending == 0 && self.source.interleaved_packets > 0 {
            // Start a new group: other-stream packets first, then the frame.
            self.other_packets_pending = self.source.interleaved_packets + 1;
        }
        if self.other_packets_pending > 1 {
            self.other_packets_pending -= 1;
            return Ok(Demuxed::Packet {
                stream_index: OTHER_STREAM_INDEX,
                packet: SyntheticPacket::Other,
            });
        }
        self.other_packets_pending = 0;

        let frame = self.next_frame;
        self.next_frame += 1;
        Ok(Demuxed::Packet {
            stream_index: VIDEO_STREAM_INDEX,
            packet: SyntheticPacket::Video(frame),
        })
    }

    fn send_packet(&mut self, packet: &SyntheticPacket) -> Result<(), FrameReaderError> {
        match *packet {
            SyntheticPacket::Video(frame) if self.source.decode_failure_at == Some(frame) => Err(
                FrameReaderError::DecodeFailed(format!("injected failure on frame {frame}")),
            ),
            SyntheticPacket::Video(frame) => {
                if !self.eof_sent {
                    self.decoder_queue.push_back(frame);
                }
                Ok(())
            }
            SyntheticPacket::Other => Err(FrameReaderError::DecodeFailed(
                "packet does not belong to the video stream".to_string(),
            )),
        }
    }

    fn send_eof(&mut self) -> Result<(), FrameReaderError> {
        self.eof_sent = true;
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Option<DecodedFrameInfo>, FrameReaderError> {
        if !self.eof_sent && self.decoder_queue.len() <= self.source.decoder_delay {
            return Ok(None);
        }
        let Some(frame) = self.decoder_queue.pop_front() else {
            return Ok(None);
        };
        self.current = Some(frame);
        Ok(Some(DecodedFrameInfo {
            pts: Some(frame as i64),
            timestamp: Some(frame_time(frame)),
        }))
    }

    fn rescale_into(&mut self, buffer: &mut FrameBuffer) -> Result<(), FrameReaderError> {
        let frame = self
            .current
            .ok_or_else(|| FrameReaderError::ScaleFailed("no decoded frame".to_string()))?;
        let swap = buffer.pixel_format() == PixelFormat::Bgr24;
        let width = buffer.width();
        let pixels = buffer.data_mut().chunks_exact_mut(PixelFormat::CHANNELS);

        for (position, pixel) in pixels.enumerate() {
            let x = (position as u64 % u64::from(width)) as u32;
            let y = (position as u64 / u64::from(width)) as u32;
            let mut value = SyntheticSource::pattern(frame, x, y);
            if swap {
                value.reverse();
            }
            pixel.copy_from_slice(&value);
        }
        Ok(())
    }
}

impl Drop for SyntheticDecoder {
    fn drop(&mut self) {
        if let Some(counter) = &self.source.release_counter {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn frame_time(frame: u64) -> Duration {
    Duration::from_secs_f64(frame as f64 / f64::from(FRAMES_PER_SECOND))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_packets(decoder: &mut SyntheticDecoder) -> Vec<(usize, SyntheticPacket)> {
        let mut packets = Vec::new();
        while let Demuxed::Packet {
            stream_index,
            packet,
        } = decoder.read_packet().unwrap()
        {
            packets.push((stream_index, packet));
        }
        packets
    }

    #[test]
    fn packets_interleave_before_each_frame() {
        let mut decoder = SyntheticSource::new(4, 4, 2)
            .with_interleaved_packets(2)
            .open()
            .unwrap();
        let packets = drain_packets(&mut decoder);
        assert_eq!(
            packets,
            vec![
                (OTHER_STREAM_INDEX, SyntheticPacket::Other),
                (OTHER_STREAM_INDEX, SyntheticPacket::Other),
                (VIDEO_STREAM_INDEX, SyntheticPacket::Video(0)),
                (OTHER_STREAM_INDEX, SyntheticPacket::Other),
                (OTHER_STREAM_INDEX, SyntheticPacket::Other),
                (VIDEO_STREAM_INDEX, SyntheticPacket::Video(1)),
            ]
        );
    }

    #[test]
    fn delayed_frames_need_eof() {
        let mut decoder = SyntheticSource::new(4, 4, 3)
            .with_decoder_delay(2)
            .open()
            .unwrap();
        decoder.send_packet(&SyntheticPacket::Video(0)).unwrap();
        decoder.send_packet(&SyntheticPacket::Video(1)).unwrap();
        assert_eq!(decoder.receive_frame().unwrap(), None);

        decoder.send_eof().unwrap();
        assert_eq!(decoder.receive_frame().unwrap().and_then(|info| info.pts), Some(0));
        assert_eq!(decoder.receive_frame().unwrap().and_then(|info| info.pts), Some(1));
        assert_eq!(decoder.receive_frame().unwrap(), None);
    }

    #[test]
    fn rescale_writes_pattern_in_channel_order() {
        let mut decoder = SyntheticSource::new(3, 2, 1)
            .with_pixel_format(PixelFormat::Bgr24)
            .open()
            .unwrap();
        decoder.send_packet(&SyntheticPacket::Video(0)).unwrap();
        decoder.receive_frame().unwrap();

        let mut buffer = FrameBuffer::new(3, 2, PixelFormat::Bgr24);
        decoder.rescale_into(&mut buffer).unwrap();
        let offset = buffer.stride() + 2 * 3;
        assert_eq!(&buffer.data()[offset..offset + 3], &[1, 2, 0]);
    }

    #[test]
    fn open_reports_distinct_failures() {
        let missing = SyntheticSource::new(4, 4, 1).without_video_stream().open();
        assert!(matches!(missing, Err(FrameReaderError::NoVideoStream)));

        let unreadable = SyntheticSource::new(4, 4, 1).unopenable().open();
        assert!(matches!(
            unreadable,
            Err(FrameReaderError::SourceUnopenable { .. })
        ));
    }
}
