//! Owning iteration over a reader's remaining frames.
//!
//! [`FrameReader::read`](crate::FrameReader::read) lends out its single
//! buffer, which the standard [`Iterator`] trait cannot express. Callers who
//! want `map`, `take`, `collect` and friends use [`FrameIterator`] instead,
//! paying one copy per frame.
//!
//! ```no_run
//! use framereader::FrameReader;
//!
//! let mut reader = FrameReader::from_source("input.mp4")?;
//! let first_ten = reader
//!     .frames()
//!     .take(10)
//!     .collect::<Result<Vec<_>, _>>()?;
//! # Ok::<(), framereader::FrameReaderError>(())
//! ```

use crate::buffer::OwnedFrame;
use crate::error::FrameReaderError;
use crate::reader::FrameReader;
use crate::service::DecodeService;

/// Iterator yielding a copy of each frame.
///
/// Ends at exhaustion. After yielding an error it also ends; the reader
/// itself stays usable and can be read again directly.
pub struct FrameIterator<'a, S: DecodeService> {
    reader: &'a mut FrameReader<S>,
    done: bool,
}

impl<'a, S: DecodeService> FrameIterator<'a, S> {
    pub(crate) fn new(reader: &'a mut FrameReader<S>) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<S: DecodeService> Iterator for FrameIterator<'_, S> {
    type Item = Result<OwnedFrame, FrameReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.read() {
            Ok(Some(frame)) => Some(Ok(frame.to_owned_frame())),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::reader::FrameReader;
    use crate::synthetic::SyntheticSource;

    #[test]
    fn yields_copies_in_order() {
        let service = SyntheticSource::new(4, 2, 3).open().unwrap();
        let mut reader = FrameReader::with_service(service);
        let frames: Vec<_> = reader.frames().map(Result::unwrap).collect();

        let indices: Vec<u64> = frames.iter().map(|frame| frame.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        // Copies do not alias the reader's buffer.
        assert_ne!(frames[0].data(), frames[2].data());
    }

    #[test]
    fn stops_after_error_but_reader_continues() {
        let service = SyntheticSource::new(2, 2, 3)
            .with_read_failure_at(1)
            .open()
            .unwrap();
        let mut reader = FrameReader::with_service(service);

        let results: Vec<_> = reader.frames().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());

        let remaining = reader.frames().filter(Result::is_ok).count();
        assert_eq!(remaining, 2);
    }
}
