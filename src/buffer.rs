//! The reusable output buffer and the views handed to callers.
//!
//! A [`FrameReader`](crate::FrameReader) allocates exactly one
//! [`FrameBuffer`] when it opens a source and rescales every decoded frame
//! into it. [`FrameView`] borrows that buffer, so the compiler rejects any
//! attempt to hold a view across the next `read`. Copy with
//! [`FrameView::to_owned_frame`] or [`FrameView::to_image`] to keep a frame.

use std::{fs, path::Path, time::Duration};

use image::{
    ImageError, RgbImage,
    error::{ParameterError, ParameterErrorKind},
};

use crate::configuration::PixelFormat;
use crate::error::FrameReaderError;

/// A fixed-size, tightly packed 3-channel 8-bit frame buffer.
///
/// The length is `width * height * 3` for the whole life of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
}

impl FrameBuffer {
    /// Allocate a zeroed buffer for `width` x `height` frames.
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let len = width as usize * height as usize * PixelFormat::CHANNELS;
        Self {
            data: vec![0; len],
            width,
            height,
            pixel_format,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Bytes per row (no padding).
    pub fn stride(&self) -> usize {
        self.width as usize * PixelFormat::CHANNELS
    }

    /// The packed pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access for decode services writing a frame. The length
    /// cannot change through this slice.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Copy a plane that may carry per-row padding into this buffer.
    ///
    /// `source_stride` is the distance in bytes between row starts in
    /// `plane`. Fails if the plane is too short for the buffer's
    /// dimensions.
    pub fn copy_from_plane(
        &mut self,
        plane: &[u8],
        source_stride: usize,
    ) -> Result<(), FrameReaderError> {
        let row_bytes = self.stride();
        let rows = self.height as usize;
        if rows == 0 || row_bytes == 0 {
            return Ok(());
        }

        let needed = source_stride * (rows - 1) + row_bytes;
        if source_stride < row_bytes || plane.len() < needed {
            return Err(FrameReaderError::ScaleFailed(format!(
                "plane of {} bytes (stride {source_stride}) cannot fill a {}x{} frame",
                plane.len(),
                self.width,
                self.height,
            )));
        }

        if source_stride == row_bytes {
            self.data.copy_from_slice(&plane[..row_bytes * rows]);
        } else {
            for (row, target) in self.data.chunks_exact_mut(row_bytes).enumerate() {
                let start = row * source_stride;
                target.copy_from_slice(&plane[start..start + row_bytes]);
            }
        }
        Ok(())
    }
}

/// A borrowed view of the most recently decoded frame.
///
/// Valid until the next call that mutably borrows the reader.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    buffer: &'a FrameBuffer,
    index: u64,
    pts: Option<i64>,
    timestamp: Option<Duration>,
}

impl<'a> FrameView<'a> {
    pub(crate) fn new(
        buffer: &'a FrameBuffer,
        index: u64,
        pts: Option<i64>,
        timestamp: Option<Duration>,
    ) -> Self {
        Self {
            buffer,
            index,
            pts,
            timestamp,
        }
    }

    /// Zero-based position of this frame among the frames read so far.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Presentation timestamp in stream time base units, when the decoder
    /// reported one.
    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    /// Presentation time, when both PTS and the stream time base are known.
    pub fn timestamp(&self) -> Option<Duration> {
        self.timestamp
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn stride(&self) -> usize {
        self.buffer.stride()
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.buffer.pixel_format()
    }

    /// The packed pixel bytes, `width * height * 3` long.
    pub fn data(&self) -> &'a [u8] {
        self.buffer.data()
    }

    /// The three channel values of the pixel at (`x`, `y`) in buffer order.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let offset = y as usize * self.stride() + x as usize * PixelFormat::CHANNELS;
        let data = self.data();
        Some([data[offset], data[offset + 1], data[offset + 2]])
    }

    /// Copy the pixels out.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data().to_vec()
    }

    /// Copy the frame and its timing into an owned value.
    pub fn to_owned_frame(&self) -> OwnedFrame {
        OwnedFrame {
            buffer: self.buffer.clone(),
            index: self.index,
            pts: self.pts,
            timestamp: self.timestamp,
        }
    }

    /// Copy the frame into an [`RgbImage`], swapping channels if the buffer
    /// is BGR.
    ///
    /// # Errors
    ///
    /// [`FrameReaderError::ImageError`] if the pixel data does not match the
    /// frame dimensions.
    pub fn to_image(&self) -> Result<RgbImage, FrameReaderError> {
        let mut pixels = self.to_vec();
        if self.pixel_format() == PixelFormat::Bgr24 {
            for pixel in pixels.chunks_exact_mut(PixelFormat::CHANNELS) {
                pixel.swap(0, 2);
            }
        }
        RgbImage::from_raw(self.width(), self.height(), pixels).ok_or_else(|| {
            ImageError::Parameter(ParameterError::from_kind(
                ParameterErrorKind::DimensionMismatch,
            ))
            .into()
        })
    }

    /// Encode the frame to `path`, choosing the format from its extension.
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// [`FrameReaderError::IoError`] if the parent directory cannot be
    /// created, [`FrameReaderError::ImageError`] if the extension is not a
    /// supported image format or encoding fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FrameReaderError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.to_image()?.save(path)?;
        Ok(())
    }
}

/// A frame copied out of the reader, independent of later reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedFrame {
    buffer: FrameBuffer,
    index: u64,
    pts: Option<i64>,
    timestamp: Option<Duration>,
}

impl OwnedFrame {
    /// Borrow this frame as a [`FrameView`].
    pub fn view(&self) -> FrameView<'_> {
        FrameView::new(&self.buffer, self.index, self.pts, self.timestamp)
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn data(&self) -> &[u8] {
        self.buffer.data()
    }

    /// Take the pixel bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.buffer.data
    }
}
