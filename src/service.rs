//! The boundary between [`FrameReader`](crate::FrameReader) and whatever
//! actually demuxes, decodes and converts video.
//!
//! A [`DecodeService`] is opened against one source and exposes the four
//! primitive steps the reader sequences: pull a packet, feed it to the
//! decoder, take a decoded frame out, and rescale that frame into the
//! reader's buffer. [`FfmpegDecoder`](crate::FfmpegDecoder) is the
//! production implementation; [`SyntheticDecoder`](crate::SyntheticDecoder)
//! produces generated frames for tests and benchmarks.

use std::time::Duration;

use crate::buffer::FrameBuffer;
use crate::configuration::PixelFormat;
use crate::error::FrameReaderError;
use crate::metadata::StreamMetadata;

/// Result of pulling one packet from the demuxer.
#[derive(Debug)]
pub enum Demuxed<P> {
    /// A packet belonging to the stream at `stream_index`.
    Packet { stream_index: usize, packet: P },
    /// The source has no more packets.
    EndOfStream,
}

/// Timing information for the frame most recently taken from the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodedFrameInfo {
    /// Presentation timestamp in stream time base units.
    pub pts: Option<i64>,
    /// `pts` converted to wall time.
    pub timestamp: Option<Duration>,
}

/// Demux, decode and rescale for a single selected video stream.
///
/// Implementations own every native resource they allocate and release it
/// on drop, whatever state they are in.
pub trait DecodeService {
    /// The demuxed packet type handed back to [`send_packet`](Self::send_packet).
    type Packet;

    /// Metadata of the selected video stream.
    fn metadata(&self) -> &StreamMetadata;

    /// Channel order [`rescale_into`](Self::rescale_into) writes.
    fn pixel_format(&self) -> PixelFormat;

    /// Pull the next packet of any stream.
    ///
    /// Errors other than end of input are reported as
    /// [`FrameReaderError::ReadFailed`].
    fn read_packet(&mut self) -> Result<Demuxed<Self::Packet>, FrameReaderError>;

    /// Feed a packet of the selected stream to the decoder.
    fn send_packet(&mut self, packet: &Self::Packet) -> Result<(), FrameReaderError>;

    /// Tell the decoder no more packets follow so it releases buffered
    /// frames.
    fn send_eof(&mut self) -> Result<(), FrameReaderError>;

    /// Take the next decoded frame, if the decoder has one.
    ///
    /// `Ok(None)` means the decoder needs more input, or after
    /// [`send_eof`](Self::send_eof), that it is fully drained.
    fn receive_frame(&mut self) -> Result<Option<DecodedFrameInfo>, FrameReaderError>;

    /// Convert the frame last returned by
    /// [`receive_frame`](Self::receive_frame) into `buffer`.
    fn rescale_into(&mut self, buffer: &mut FrameBuffer) -> Result<(), FrameReaderError>;
}
