//! Media source descriptions.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

/// Where a [`FrameReader`](crate::FrameReader) pulls its video from.
///
/// Strings convert with [`From`]: anything containing `://` becomes a
/// [`Source::Url`], everything else a [`Source::File`].
///
/// ```
/// use framereader::Source;
///
/// assert!(matches!(Source::from("clip.mp4"), Source::File(_)));
/// assert!(matches!(Source::from("rtsp://camera.local/stream"), Source::Url(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A container file on disk.
    File(PathBuf),
    /// A network stream handed to FFmpeg's protocol layer as-is
    /// (`http://`, `rtsp://`, `udp://`, ...).
    Url(String),
    /// A capture device by index. Not handled by
    /// [`FfmpegDecoder`](crate::FfmpegDecoder); see
    /// [`FrameReaderError::UnsupportedSource`](crate::FrameReaderError::UnsupportedSource).
    Device(u32),
}

impl Source {
    /// The string FFmpeg's demuxer is given for this source, if any.
    pub(crate) fn locator(&self) -> Option<&str> {
        match self {
            Source::File(path) => path.to_str(),
            Source::Url(url) => Some(url),
            Source::Device(_) => None,
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Url(url) => f.write_str(url),
            Source::Device(index) => write!(f, "device #{index}"),
        }
    }
}

impl From<&str> for Source {
    fn from(value: &str) -> Self {
        if value.contains("://") {
            Source::Url(value.to_string())
        } else {
            Source::File(PathBuf::from(value))
        }
    }
}

impl From<String> for Source {
    fn from(value: String) -> Self {
        Source::from(value.as_str())
    }
}

impl From<&Path> for Source {
    fn from(value: &Path) -> Self {
        Source::File(value.to_path_buf())
    }
}

impl From<PathBuf> for Source {
    fn from(value: PathBuf) -> Self {
        Source::File(value)
    }
}

impl From<&PathBuf> for Source {
    fn from(value: &PathBuf) -> Self {
        Source::File(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_split_on_scheme() {
        assert_eq!(Source::from("a/b.mp4"), Source::File(PathBuf::from("a/b.mp4")));
        assert_eq!(
            Source::from("http://host/feed.mjpg".to_string()),
            Source::Url("http://host/feed.mjpg".into())
        );
    }

    #[test]
    fn devices_have_no_locator() {
        assert_eq!(Source::Device(0).locator(), None);
        assert_eq!(Source::Device(2).to_string(), "device #2");
        assert_eq!(Source::from("x.mkv").locator(), Some("x.mkv"));
    }
}
