//! # framereader
//!
//! Read the primary video stream of a file or network source one frame at a
//! time, as packed 3-channel 8-bit pixels, powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! A [`FrameReader`] opens the source, picks its best video stream, and
//! decodes on demand. Each [`read`](FrameReader::read) rescales the next
//! frame into a single buffer owned by the reader and returns a borrowed
//! [`FrameView`] of it; nothing is allocated per frame.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framereader::FrameReader;
//!
//! let mut reader = FrameReader::from_source("input.mp4")?;
//! let mut count = 0;
//! while let Some(frame) = reader.read()? {
//!     assert_eq!(frame.data().len(), (frame.width() * frame.height() * 3) as usize);
//!     count += 1;
//! }
//! println!("Number of frames processed: {count}");
//! # Ok::<(), framereader::FrameReaderError>(())
//! ```
//!
//! ### Keeping frames
//!
//! A [`FrameView`] is only valid until the next read. Copy what you need:
//!
//! ```no_run
//! use framereader::FrameReader;
//!
//! let mut reader = FrameReader::from_source("input.mp4")?;
//! if let Some(frame) = reader.read()? {
//!     frame.to_image()?.save("first_frame.png")?;
//! }
//! # Ok::<(), framereader::FrameReaderError>(())
//! ```
//!
//! ## Errors
//!
//! Nothing here exits the process. Opening distinguishes an unreadable
//! source ([`FrameReaderError::SourceUnopenable`]) from one with no video
//! ([`FrameReaderError::NoVideoStream`]); packet and decode failures during
//! [`read`](FrameReader::read) are returned and leave the reader usable.
//!
//! ## Testing without media files
//!
//! [`SyntheticSource`] implements the same [`DecodeService`] seam as
//! [`FfmpegDecoder`] with generated frames, so code built on
//! [`FrameReader`] can be exercised without fixtures.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

mod buffer;
pub mod configuration;
pub mod error;
pub mod ffmpeg;
mod ffmpeg_decoder;
pub mod frame_iterator;
pub mod metadata;
pub mod reader;
pub mod service;
pub mod source;
pub mod synthetic;

pub use buffer::{FrameBuffer, FrameView, OwnedFrame};
pub use configuration::{PixelFormat, ReaderOptions, ScalingAlgorithm};
pub use error::{ErrorKind, FrameReaderError};
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use ffmpeg_decoder::FfmpegDecoder;
pub use frame_iterator::FrameIterator;
pub use metadata::StreamMetadata;
pub use reader::FrameReader;
pub use service::{DecodeService, DecodedFrameInfo, Demuxed};
pub use source::Source;
pub use synthetic::{SyntheticDecoder, SyntheticPacket, SyntheticSource};
