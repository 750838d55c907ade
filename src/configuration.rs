//! Reader configuration.
//!
//! [`ReaderOptions`] is a small builder that fixes the output layout and the
//! scaler's interpolation before a source is opened. Both choices are locked
//! in for the lifetime of the opened source.
//!
//! # Example
//!
//! ```no_run
//! use framereader::{FrameReader, PixelFormat, ReaderOptions, ScalingAlgorithm};
//!
//! let options = ReaderOptions::new()
//!     .with_pixel_format(PixelFormat::Rgb24)
//!     .with_scaling(ScalingAlgorithm::Bilinear);
//!
//! let mut reader = FrameReader::new();
//! reader.open_with_options("input.mp4", &options)?;
//! # Ok::<(), framereader::FrameReaderError>(())
//! ```

use std::str::FromStr;

use ffmpeg_next::{format::Pixel, software::scaling::Flags as ScalingFlags};

/// Channel order of the packed output buffer.
///
/// Both layouts are three interleaved 8-bit channels, so a frame always
/// occupies `width * height * 3` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// Blue, green, red. This is the default.
    #[default]
    Bgr24,
    /// Red, green, blue.
    Rgb24,
}

impl PixelFormat {
    /// Bytes per pixel of the packed layout.
    pub const CHANNELS: usize = 3;

    pub(crate) fn to_ffmpeg_pixel(self) -> Pixel {
        match self {
            PixelFormat::Bgr24 => Pixel::BGR24,
            PixelFormat::Rgb24 => Pixel::RGB24,
        }
    }
}

impl FromStr for PixelFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "bgr24" | "bgr" => Ok(PixelFormat::Bgr24),
            "rgb24" | "rgb" => Ok(PixelFormat::Rgb24),
            other => Err(format!("unsupported pixel format: {other}")),
        }
    }
}

/// Interpolation used when converting decoded frames to the output layout.
///
/// Output dimensions always equal the stream's native dimensions, so this
/// mostly affects chroma upsampling quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalingAlgorithm {
    /// Bicubic. This is the default.
    #[default]
    Bicubic,
    Bilinear,
    FastBilinear,
    /// Nearest neighbour.
    Point,
    Area,
    Lanczos,
}

impl ScalingAlgorithm {
    pub(crate) fn to_ffmpeg_flags(self) -> ScalingFlags {
        match self {
            ScalingAlgorithm::Bicubic => ScalingFlags::BICUBIC,
            ScalingAlgorithm::Bilinear => ScalingFlags::BILINEAR,
            ScalingAlgorithm::FastBilinear => ScalingFlags::FAST_BILINEAR,
            ScalingAlgorithm::Point => ScalingFlags::POINT,
            ScalingAlgorithm::Area => ScalingFlags::AREA,
            ScalingAlgorithm::Lanczos => ScalingFlags::LANCZOS,
        }
    }
}

impl FromStr for ScalingAlgorithm {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().replace('_', "-").as_str() {
            "bicubic" => Ok(ScalingAlgorithm::Bicubic),
            "bilinear" => Ok(ScalingAlgorithm::Bilinear),
            "fast-bilinear" => Ok(ScalingAlgorithm::FastBilinear),
            "point" | "nearest" => Ok(ScalingAlgorithm::Point),
            "area" => Ok(ScalingAlgorithm::Area),
            "lanczos" => Ok(ScalingAlgorithm::Lanczos),
            other => Err(format!("unsupported scaling algorithm: {other}")),
        }
    }
}

/// Settings applied when a source is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Channel order of the output buffer.
    pub pixel_format: PixelFormat,
    /// Scaler interpolation.
    pub scaling: ScalingAlgorithm,
}

impl ReaderOptions {
    /// Defaults: [`PixelFormat::Bgr24`], [`ScalingAlgorithm::Bicubic`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output channel order.
    #[must_use]
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Set the scaler interpolation.
    #[must_use]
    pub fn with_scaling(mut self, scaling: ScalingAlgorithm) -> Self {
        self.scaling = scaling;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_bgr_bicubic() {
        let options = ReaderOptions::new();
        assert_eq!(options.pixel_format, PixelFormat::Bgr24);
        assert_eq!(options.scaling, ScalingAlgorithm::Bicubic);
    }

    #[test]
    fn parse_pixel_format_aliases() {
        assert_eq!("BGR24".parse::<PixelFormat>(), Ok(PixelFormat::Bgr24));
        assert_eq!("rgb".parse::<PixelFormat>(), Ok(PixelFormat::Rgb24));
        assert!("rgba".parse::<PixelFormat>().is_err());
    }

    #[test]
    fn parse_scaling_aliases() {
        assert_eq!(
            "fast_bilinear".parse::<ScalingAlgorithm>(),
            Ok(ScalingAlgorithm::FastBilinear)
        );
        assert_eq!("nearest".parse::<ScalingAlgorithm>(), Ok(ScalingAlgorithm::Point));
        assert!("spline".parse::<ScalingAlgorithm>().is_err());
    }
}
