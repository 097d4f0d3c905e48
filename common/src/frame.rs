use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Pixel layout of a raw video frame, named the way the host spells them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Gray8,
    Rgb,
    Bgr,
    Rgba,
    Bgra,
    Rgbx,
    Bgrx,
    /// Planar 4:2:0. Only the leading Y plane is read or written.
    I420,
    /// Semi-planar 4:2:0. Only the leading Y plane is read or written.
    Nv12,
    /// A format this filter has no luma path for.
    Other(String),
}

impl PixelFormat {
    /// Bytes per pixel of the first (or only) plane.
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            PixelFormat::Gray8 | PixelFormat::I420 | PixelFormat::Nv12 => Some(1),
            PixelFormat::Rgb | PixelFormat::Bgr => Some(3),
            PixelFormat::Rgba | PixelFormat::Bgra | PixelFormat::Rgbx | PixelFormat::Bgrx => {
                Some(4)
            }
            PixelFormat::Other(_) => None,
        }
    }

    /// Byte offsets of the red, green and blue channels inside a packed pixel.
    pub fn rgb_offsets(&self) -> Option<[usize; 3]> {
        match self {
            PixelFormat::Rgb | PixelFormat::Rgba | PixelFormat::Rgbx => Some([0, 1, 2]),
            PixelFormat::Bgr | PixelFormat::Bgra | PixelFormat::Bgrx => Some([2, 1, 0]),
            _ => None,
        }
    }

    /// True when the first plane is already single-channel intensity.
    pub fn has_luma_plane(&self) -> bool {
        matches!(
            self,
            PixelFormat::Gray8 | PixelFormat::I420 | PixelFormat::Nv12
        )
    }
}

impl FromStr for PixelFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "GRAY8" => PixelFormat::Gray8,
            "RGB" => PixelFormat::Rgb,
            "BGR" => PixelFormat::Bgr,
            "RGBA" => PixelFormat::Rgba,
            "BGRA" => PixelFormat::Bgra,
            "RGBx" => PixelFormat::Rgbx,
            "BGRx" => PixelFormat::Bgrx,
            "I420" => PixelFormat::I420,
            "NV12" => PixelFormat::Nv12,
            other => PixelFormat::Other(other.to_string()),
        })
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::Gray8 => "GRAY8",
            PixelFormat::Rgb => "RGB",
            PixelFormat::Bgr => "BGR",
            PixelFormat::Rgba => "RGBA",
            PixelFormat::Bgra => "BGRA",
            PixelFormat::Rgbx => "RGBx",
            PixelFormat::Bgrx => "BGRx",
            PixelFormat::I420 => "I420",
            PixelFormat::Nv12 => "NV12",
            PixelFormat::Other(name) => name,
        };
        f.write_str(name)
    }
}

/// Negotiated geometry of a frame buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Row stride of the first plane, in bytes.
    pub stride: usize,
}

impl FrameInfo {
    /// Geometry with rows packed back to back (no padding).
    pub fn packed(format: PixelFormat, width: u32, height: u32) -> Self {
        let stride = width as usize * format.bytes_per_pixel().unwrap_or(1);
        Self {
            format,
            width,
            height,
            stride,
        }
    }

    /// True if both frames can be compared pixel for pixel.
    pub fn same_geometry(&self, other: &FrameInfo) -> bool {
        self.format == other.format && self.width == other.width && self.height == other.height
    }

    /// Checks the declared geometry against a buffer of `len` bytes.
    pub fn check_buffer(&self, len: usize) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        let Some(bpp) = self.format.bytes_per_pixel() else {
            return Ok(());
        };
        let row = self.width as usize * bpp;
        if self.stride < row {
            return Err(FrameError::StrideTooSmall {
                stride: self.stride,
                row,
            });
        }
        let expected = self.stride * (self.height as usize - 1) + row;
        if len < expected {
            return Err(FrameError::TooShort { got: len, expected });
        }
        Ok(())
    }
}

/// A frame handed over by the host for in-place processing.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub info: FrameInfo,
    pub data: Vec<u8>,
    /// Presentation timestamp in nanoseconds, if the host supplied one.
    pub pts_ns: Option<u64>,
    /// Attached by the motion filter on frames it analysed.
    pub motion_meta: Option<MotionMeta>,
}

impl VideoFrame {
    pub fn new(info: FrameInfo, data: Vec<u8>, pts_ns: Option<u64>) -> Self {
        Self {
            info,
            data,
            pts_ns,
            motion_meta: None,
        }
    }
}

/// Bounding box of one connected area of change, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MotionRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Number of set mask pixels in the component.
    pub area: u32,
}

/// Per-frame detection result carried downstream with the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MotionMeta {
    pub has_motion: bool,
    pub regions: Vec<MotionRegion>,
    /// Debounced state after this frame.
    pub active: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame buffer too short: got {got} bytes, expected at least {expected}")]
    TooShort { got: usize, expected: usize },
    #[error("row stride {stride} is smaller than a row of {row} bytes")]
    StrideTooSmall { stride: usize, row: usize },
    #[error("frame has a zero dimension: {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_roundtrip() {
        for name in ["GRAY8", "RGB", "BGR", "RGBA", "BGRA", "RGBx", "BGRx", "I420", "NV12"] {
            let format: PixelFormat = name.parse().unwrap();
            assert!(!matches!(format, PixelFormat::Other(_)), "{name} should be known");
            assert_eq!(format.to_string(), name);
        }
        let unknown: PixelFormat = "YUY2".parse().unwrap();
        assert_eq!(unknown, PixelFormat::Other("YUY2".into()));
        assert!(unknown.bytes_per_pixel().is_none());
    }

    #[test]
    fn packed_stride() {
        assert_eq!(FrameInfo::packed(PixelFormat::Rgb, 10, 2).stride, 30);
        assert_eq!(FrameInfo::packed(PixelFormat::Bgrx, 10, 2).stride, 40);
        assert_eq!(FrameInfo::packed(PixelFormat::I420, 10, 2).stride, 10);
    }

    #[test]
    fn check_buffer_rejects_short_data() {
        let info = FrameInfo::packed(PixelFormat::Gray8, 4, 4);
        assert!(info.check_buffer(16).is_ok());
        assert!(matches!(
            info.check_buffer(15),
            Err(FrameError::TooShort { got: 15, expected: 16 })
        ));
    }

    #[test]
    fn check_buffer_allows_unpadded_last_row() {
        let info = FrameInfo {
            format: PixelFormat::Gray8,
            width: 4,
            height: 2,
            stride: 8,
        };
        assert!(info.check_buffer(12).is_ok());
    }

    #[test]
    fn check_buffer_rejects_bad_geometry() {
        let info = FrameInfo {
            format: PixelFormat::Rgb,
            width: 4,
            height: 2,
            stride: 8,
        };
        assert!(matches!(
            info.check_buffer(64),
            Err(FrameError::StrideTooSmall { stride: 8, row: 12 })
        ));
        let info = FrameInfo::packed(PixelFormat::Gray8, 0, 2);
        assert!(matches!(info.check_buffer(64), Err(FrameError::ZeroDimension { .. })));
    }

    #[test]
    fn same_geometry_compares_format_and_size() {
        let a = FrameInfo::packed(PixelFormat::Gray8, 4, 4);
        let mut b = a.clone();
        b.stride = 16;
        assert!(a.same_geometry(&b));
        b.format = PixelFormat::Rgb;
        assert!(!a.same_geometry(&b));
    }
}
