//! Error types for the `framereader` crate.
//!
//! [`FrameReaderError`] is returned by every fallible operation. Nothing in
//! the library terminates the process: open, read, decode and rescale
//! failures all come back to the caller, who decides whether to retry, skip
//! the frame, or drop the reader.

use std::io::Error as IoError;

use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framereader` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameReaderError {
    /// The source could not be opened at all.
    #[error("Failed to open source {source_name}: {reason}")]
    SourceUnopenable {
        /// Display form of the [`Source`](crate::Source) that was opened.
        source_name: String,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The source opened but carries no video stream.
    #[error("No video stream found in source")]
    NoVideoStream,

    /// The decoder or the scaler for the selected stream could not be set up.
    #[error("Failed to initialise decoder: {0}")]
    DecoderInitFailed(String),

    /// Reading the next packet from the demuxer failed (other than end of
    /// input).
    #[error("Failed to read packet: {0}")]
    ReadFailed(String),

    /// The decoder rejected a packet or failed while producing a frame.
    #[error("Failed to decode video frame: {0}")]
    DecodeFailed(String),

    /// Converting a decoded frame into the output layout failed.
    #[error("Failed to rescale video frame: {0}")]
    ScaleFailed(String),

    /// The source kind is recognised but no decode service handles it.
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// A read was attempted on a reader that has no open source.
    #[error("Frame reader is not opened")]
    NotOpened,

    /// An I/O error occurred while writing a frame to disk.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while converting or encoding a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

/// Fieldless classification of a [`FrameReaderError`].
///
/// Handy for `match` arms and assertions that do not care about the
/// diagnostic payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    SourceUnopenable,
    NoVideoStream,
    DecoderInitFailed,
    ReadFailed,
    DecodeFailed,
    ScaleFailed,
    UnsupportedSource,
    NotOpened,
    Io,
    Image,
}

impl FrameReaderError {
    /// The kind of this error, without its context.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FrameReaderError::SourceUnopenable { .. } => ErrorKind::SourceUnopenable,
            FrameReaderError::NoVideoStream => ErrorKind::NoVideoStream,
            FrameReaderError::DecoderInitFailed(_) => ErrorKind::DecoderInitFailed,
            FrameReaderError::ReadFailed(_) => ErrorKind::ReadFailed,
            FrameReaderError::DecodeFailed(_) => ErrorKind::DecodeFailed,
            FrameReaderError::ScaleFailed(_) => ErrorKind::ScaleFailed,
            FrameReaderError::UnsupportedSource(_) => ErrorKind::UnsupportedSource,
            FrameReaderError::NotOpened => ErrorKind::NotOpened,
            FrameReaderError::IoError(_) => ErrorKind::Io,
            FrameReaderError::ImageError(_) => ErrorKind::Image,
        }
    }

    /// Whether calling [`FrameReader::read`](crate::FrameReader::read) again
    /// after this error can make progress.
    ///
    /// Packet read and decode failures leave the reader usable; everything
    /// else means the reader has no usable source.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameReaderError::ReadFailed(_)
                | FrameReaderError::DecodeFailed(_)
                | FrameReaderError::ScaleFailed(_)
        )
    }
}
