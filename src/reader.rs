//! [`FrameReader`], the frame-at-a-time video reader.
//!
//! A reader owns one [`DecodeService`] and one [`FrameBuffer`]. Each
//! [`read`](FrameReader::read) pulls packets until the decoder hands back a
//! frame, rescales it into the buffer and returns a borrowed view of it.
//! When the source runs out of packets the reader switches to flush mode so
//! the decoder can release any frames it is still holding; once those are
//! drained the reader is exhausted for good.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    ops::ControlFlow,
};

use crate::buffer::{FrameBuffer, FrameView};
use crate::configuration::{PixelFormat, ReaderOptions};
use crate::error::FrameReaderError;
use crate::ffmpeg_decoder::FfmpegDecoder;
use crate::frame_iterator::FrameIterator;
use crate::metadata::StreamMetadata;
use crate::service::{DecodeService, DecodedFrameInfo, Demuxed};
use crate::source::Source;

/// Reads the primary video stream of a source one frame at a time.
///
/// Every frame is written into a single buffer allocated at open time, sized
/// `width * height * 3` for the stream's native dimensions. The returned
/// [`FrameView`] borrows that buffer, so it must be dropped (or copied)
/// before the next `read`.
///
/// Dropping the reader releases the scaler, decoder, demuxer and buffer in
/// whatever state the reader is in.
///
/// # Example
///
/// ```no_run
/// use framereader::FrameReader;
///
/// let mut reader = FrameReader::from_source("input.mp4")?;
/// let metadata = reader.metadata().cloned();
/// println!("{metadata:?}");
///
/// while let Some(frame) = reader.read()? {
///     println!("frame {} ({} bytes)", frame.index(), frame.data().len());
/// }
/// # Ok::<(), framereader::FrameReaderError>(())
/// ```
pub struct FrameReader<S: DecodeService = FfmpegDecoder> {
    opened: Option<OpenedSource<S>>,
}

/// Everything that exists only while a source is open.
struct OpenedSource<S> {
    // Dropped first: allocated after the service.
    buffer: FrameBuffer,
    service: S,
    stream_index: usize,
    frames_read: u64,
    /// End of input has been signalled to the decoder.
    flushing: bool,
    /// Flush finished and no frame came out. Terminal.
    exhausted: bool,
    last_frame: Option<(u64, DecodedFrameInfo)>,
}

impl<S: DecodeService> OpenedSource<S> {
    fn new(service: S) -> Self {
        let metadata = service.metadata();
        let buffer = FrameBuffer::new(metadata.width, metadata.height, service.pixel_format());
        let stream_index = metadata.stream_index;
        Self {
            buffer,
            service,
            stream_index,
            frames_read: 0,
            flushing: false,
            exhausted: false,
            last_frame: None,
        }
    }
}

impl<S: DecodeService> Default for FrameReader<S> {
    fn default() -> Self {
        Self { opened: None }
    }
}

impl<S: DecodeService> Debug for FrameReader<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut debug = f.debug_struct("FrameReader");
        debug.field("opened", &self.is_opened());
        if let Some(opened) = &self.opened {
            debug
                .field("metadata", opened.service.metadata())
                .field("frames_read", &opened.frames_read)
                .field("exhausted", &opened.exhausted);
        }
        debug.finish()
    }
}

impl FrameReader<FfmpegDecoder> {
    /// Create a reader with no source. [`read`](Self::read) fails with
    /// [`FrameReaderError::NotOpened`] until [`open`](Self::open) succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader and open `source` with default options.
    ///
    /// # Errors
    ///
    /// See [`FfmpegDecoder::open`].
    pub fn from_source(source: impl Into<Source>) -> Result<Self, FrameReaderError> {
        let mut reader = Self::new();
        reader.open(source)?;
        Ok(reader)
    }

    /// Open `source` with default options (BGR output, bicubic scaling).
    ///
    /// Any previously open source is closed first. On failure the reader is
    /// left unopened and everything acquired during the attempt has been
    /// released.
    ///
    /// # Errors
    ///
    /// See [`FfmpegDecoder::open`].
    pub fn open(&mut self, source: impl Into<Source>) -> Result<(), FrameReaderError> {
        self.open_with_options(source, &ReaderOptions::default())
    }

    /// Open `source` with explicit [`ReaderOptions`].
    ///
    /// # Errors
    ///
    /// See [`FfmpegDecoder::open`].
    pub fn open_with_options(
        &mut self,
        source: impl Into<Source>,
        options: &ReaderOptions,
    ) -> Result<(), FrameReaderError> {
        self.close();
        let service = FfmpegDecoder::open(&source.into(), options)?;
        self.attach(service);
        Ok(())
    }
}

impl<S: DecodeService> FrameReader<S> {
    /// Create a reader around an already opened service.
    pub fn with_service(service: S) -> Self {
        let mut reader = Self::default();
        reader.attach(service);
        reader
    }

    /// Replace the current source (if any) with `service` and allocate a
    /// fresh output buffer for it.
    pub fn attach(&mut self, service: S) {
        self.close();
        let opened = OpenedSource::new(service);
        log::debug!(
            "Frame reader attached: {}x{} stream {}, {} byte buffer",
            opened.buffer.width(),
            opened.buffer.height(),
            opened.stream_index,
            opened.buffer.data().len(),
        );
        self.opened = Some(opened);
    }

    /// Release the current source and buffer. The reader becomes unopened.
    /// Does nothing if no source is open.
    pub fn close(&mut self) {
        if let Some(opened) = self.opened.take() {
            log::debug!("Closing frame reader after {} frame(s)", opened.frames_read);
        }
    }

    /// Whether a source is open.
    pub fn is_opened(&self) -> bool {
        self.opened.is_some()
    }

    /// Metadata of the selected stream, when open.
    pub fn metadata(&self) -> Option<&StreamMetadata> {
        self.opened.as_ref().map(|opened| opened.service.metadata())
    }

    /// Frame width, or 0 when unopened.
    pub fn width(&self) -> u32 {
        self.opened.as_ref().map_or(0, |opened| opened.buffer.width())
    }

    /// Frame height, or 0 when unopened.
    pub fn height(&self) -> u32 {
        self.opened.as_ref().map_or(0, |opened| opened.buffer.height())
    }

    /// Output channel order, when open.
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.opened.as_ref().map(|opened| opened.buffer.pixel_format())
    }

    /// Number of successful reads since the source was opened.
    pub fn frames_read(&self) -> u64 {
        self.opened.as_ref().map_or(0, |opened| opened.frames_read)
    }

    /// Whether the open source has been fully drained.
    pub fn is_exhausted(&self) -> bool {
        self.opened.as_ref().is_some_and(|opened| opened.exhausted)
    }

    /// The underlying service, when open.
    pub fn service(&self) -> Option<&S> {
        self.opened.as_ref().map(|opened| &opened.service)
    }

    /// The frame produced by the last successful read, without advancing.
    pub fn current_frame(&self) -> Option<FrameView<'_>> {
        let opened = self.opened.as_ref()?;
        let (index, info) = opened.last_frame?;
        Some(FrameView::new(&opened.buffer, index, info.pts, info.timestamp))
    }

    /// Advance by exactly one decodable video frame.
    ///
    /// Returns `Ok(Some(frame))` when a frame was produced and `Ok(None)`
    /// once the stream is exhausted; every later call also returns
    /// `Ok(None)`. Packets of other streams are skipped.
    ///
    /// On error or exhaustion the buffer keeps its previous contents.
    ///
    /// # Errors
    ///
    /// - [`FrameReaderError::NotOpened`] if no source is open.
    /// - [`FrameReaderError::ReadFailed`], [`FrameReaderError::DecodeFailed`]
    ///   or [`FrameReaderError::ScaleFailed`] from the service. These do not
    ///   exhaust the reader; calling `read` again continues with the next
    ///   packet.
    pub fn read(&mut self) -> Result<Option<FrameView<'_>>, FrameReaderError> {
        let opened = self.opened.as_mut().ok_or(FrameReaderError::NotOpened)?;
        if opened.exhausted {
            return Ok(None);
        }

        loop {
            if let Some(info) = opened.service.receive_frame()? {
                opened.service.rescale_into(&mut opened.buffer)?;
                let index = opened.frames_read;
                opened.frames_read += 1;
                opened.last_frame = Some((index, info));
                return Ok(Some(FrameView::new(
                    &opened.buffer,
                    index,
                    info.pts,
                    info.timestamp,
                )));
            }

            if opened.flushing {
                opened.exhausted = true;
                log::debug!("Video stream exhausted after {} frame(s)", opened.frames_read);
                return Ok(None);
            }

            let demuxed = opened.service.read_packet().inspect_err(|error| {
                log::warn!("{error}");
            })?;

            match demuxed {
                Demuxed::Packet {
                    stream_index,
                    packet,
                } => {
                    if stream_index == opened.stream_index {
                        opened.service.send_packet(&packet)?;
                    }
                }
                Demuxed::EndOfStream => {
                    log::debug!("End of input, flushing decoder");
                    opened.service.send_eof()?;
                    opened.flushing = true;
                }
            }
        }
    }

    /// Call `callback` with every remaining frame until the stream is
    /// exhausted or the callback breaks. Returns how many frames were
    /// delivered.
    ///
    /// # Errors
    ///
    /// Stops at the first error from [`read`](Self::read).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::ops::ControlFlow;
    ///
    /// use framereader::FrameReader;
    ///
    /// let mut reader = FrameReader::from_source("input.mp4")?;
    /// let delivered = reader.for_each_frame(|frame| {
    ///     if frame.index() == 99 {
    ///         return ControlFlow::Break(());
    ///     }
    ///     ControlFlow::Continue(())
    /// })?;
    /// println!("{delivered} frames");
    /// # Ok::<(), framereader::FrameReaderError>(())
    /// ```
    pub fn for_each_frame<F>(&mut self, mut callback: F) -> Result<u64, FrameReaderError>
    where
        F: FnMut(FrameView<'_>) -> ControlFlow<()>,
    {
        let mut delivered = 0;
        while let Some(frame) = self.read()? {
            delivered += 1;
            if callback(frame).is_break() {
                break;
            }
        }
        Ok(delivered)
    }

    /// An iterator copying each remaining frame into an
    /// [`OwnedFrame`](crate::OwnedFrame).
    pub fn frames(&mut self) -> FrameIterator<'_, S> {
        FrameIterator::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{SyntheticDecoder, SyntheticSource};

    #[test]
    fn unopened_reader_refuses_reads() {
        let mut reader = FrameReader::<SyntheticDecoder>::default();
        assert!(!reader.is_opened());
        assert!(matches!(reader.read(), Err(FrameReaderError::NotOpened)));
        assert_eq!(reader.width(), 0);
        assert!(reader.current_frame().is_none());
    }

    #[test]
    fn current_frame_tracks_last_read() {
        let service = SyntheticSource::new(2, 2, 2).open().unwrap();
        let mut reader = FrameReader::with_service(service);
        assert!(reader.current_frame().is_none());

        reader.read().unwrap().unwrap();
        reader.read().unwrap().unwrap();
        assert_eq!(reader.current_frame().map(|frame| frame.index()), Some(1));

        assert!(reader.read().unwrap().is_none());
        assert_eq!(reader.current_frame().map(|frame| frame.index()), Some(1));
    }

    #[test]
    fn close_resets_state() {
        let service = SyntheticSource::new(2, 2, 1).open().unwrap();
        let mut reader = FrameReader::with_service(service);
        reader.read().unwrap();
        reader.close();
        assert!(!reader.is_opened());
        assert_eq!(reader.frames_read(), 0);
        assert!(!reader.is_exhausted());
        reader.close();
    }

    #[test]
    fn debug_output_reports_state() {
        let service = SyntheticSource::new(2, 2, 1).open().unwrap();
        let reader = FrameReader::with_service(service);
        let debug = format!("{reader:?}");
        assert!(debug.contains("opened: true"));
        assert!(debug.contains("frames_read: 0"));
    }
}
