use image::GrayImage;
use motiondetect_common::frame::{FrameError, PixelFormat, VideoFrame};
use std::borrow::Cow;

/// Single-channel intensity view of a frame.
///
/// Gray frames and the Y plane of planar YUV frames are borrowed straight
/// from the host buffer. Packed RGB variants are converted into an owned,
/// tightly packed plane.
#[derive(Debug, Clone)]
pub struct LumaView<'a> {
    pixels: Cow<'a, [u8]>,
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> LumaView<'a> {
    /// Borrows an already normalised image, e.g. the stored reference.
    pub fn from_image(image: &'a GrayImage) -> Self {
        Self {
            pixels: Cow::Borrowed(image.as_raw().as_slice()),
            width: image.width(),
            height: image.height(),
            stride: image.width() as usize,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True when no pixel data was copied to build this view.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.pixels, Cow::Borrowed(_))
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.pixels[start..start + self.width as usize]
    }

    /// Copies the view into an owned, tightly packed image.
    pub fn to_image(&self) -> GrayImage {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        // Length is exactly width * height.
        GrayImage::from_raw(self.width, self.height, out)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("unsupported pixel format {0}")]
    Unsupported(PixelFormat),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Builds the luma view the detection stages run on.
pub fn adapt(frame: &VideoFrame) -> Result<LumaView<'_>, FormatError> {
    let info = &frame.info;
    if matches!(info.format, PixelFormat::Other(_)) {
        return Err(FormatError::Unsupported(info.format.clone()));
    }
    info.check_buffer(frame.data.len())?;

    if info.format.has_luma_plane() {
        return Ok(LumaView {
            pixels: Cow::Borrowed(&frame.data),
            width: info.width,
            height: info.height,
            stride: info.stride,
        });
    }

    let (Some(bpp), Some([r, g, b])) = (info.format.bytes_per_pixel(), info.format.rgb_offsets())
    else {
        return Err(FormatError::Unsupported(info.format.clone()));
    };

    let width = info.width as usize;
    let mut luma = Vec::with_capacity(width * info.height as usize);
    for y in 0..info.height as usize {
        let row = &frame.data[y * info.stride..y * info.stride + width * bpp];
        luma.extend(
            row.chunks_exact(bpp)
                .map(|px| bt601_luma(px[r], px[g], px[b])),
        );
    }

    Ok(LumaView {
        pixels: Cow::Owned(luma),
        width: info.width,
        height: info.height,
        stride: width,
    })
}

/// Integer BT.601 luma, weights summing to 256.
fn bt601_luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32 + 128) >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use motiondetect_common::frame::FrameInfo;

    #[test]
    fn gray_frames_are_borrowed() {
        let frame = VideoFrame::new(
            FrameInfo::packed(PixelFormat::Gray8, 3, 2),
            vec![1, 2, 3, 4, 5, 6],
            None,
        );
        let view = adapt(&frame).unwrap();
        assert!(view.is_borrowed());
        assert_eq!(view.row(1), &[4, 5, 6]);
    }

    #[test]
    fn padded_stride_is_respected() {
        let info = FrameInfo {
            format: PixelFormat::I420,
            width: 2,
            height: 2,
            stride: 4,
        };
        // Y plane with two padding bytes per row, then chroma.
        let frame = VideoFrame::new(info, vec![10, 20, 0, 0, 30, 40, 0, 0, 128, 128], None);
        let view = adapt(&frame).unwrap();
        assert!(view.is_borrowed());
        assert_eq!(view.to_image().as_raw(), &vec![10, 20, 30, 40]);
    }

    #[test]
    fn rgb_is_converted_to_luma() {
        let frame = VideoFrame::new(
            FrameInfo::packed(PixelFormat::Rgb, 2, 1),
            vec![255, 255, 255, 0, 0, 0],
            None,
        );
        let view = adapt(&frame).unwrap();
        assert!(!view.is_borrowed());
        assert_eq!(view.row(0), &[255, 0]);
    }

    #[test]
    fn channel_order_matters() {
        let rgb = VideoFrame::new(FrameInfo::packed(PixelFormat::Rgbx, 1, 1), vec![255, 0, 0, 0], None);
        let bgr = VideoFrame::new(FrameInfo::packed(PixelFormat::Bgrx, 1, 1), vec![255, 0, 0, 0], None);
        let red = adapt(&rgb).unwrap().row(0)[0];
        let blue = adapt(&bgr).unwrap().row(0)[0];
        assert_eq!(red, bt601_luma(255, 0, 0));
        assert_eq!(blue, bt601_luma(0, 0, 255));
        assert!(red > blue);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let frame = VideoFrame::new(
            FrameInfo {
                format: PixelFormat::Other("YUY2".into()),
                width: 2,
                height: 2,
                stride: 4,
            },
            vec![0; 8],
            None,
        );
        assert!(matches!(adapt(&frame), Err(FormatError::Unsupported(_))));
    }

    #[test]
    fn short_buffer_is_rejected() {
        let frame = VideoFrame::new(FrameInfo::packed(PixelFormat::Gray8, 4, 4), vec![0; 10], None);
        assert!(matches!(adapt(&frame), Err(FormatError::Frame(_))));
    }
}
