use image::{Luma, Rgb};
use imageproc::drawing::{draw_hollow_rect_mut, Canvas};
use imageproc::rect::Rect;
use motiondetect_common::frame::{MotionRegion, VideoFrame};

/// Single-byte plane inside a host buffer: GRAY8 or the Y plane of YUV.
struct PlaneCanvas<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    stride: usize,
}

impl Canvas for PlaneCanvas<'_> {
    type Pixel = Luma<u8>;

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn get_pixel(&self, x: u32, y: u32) -> Luma<u8> {
        Luma([self.data[y as usize * self.stride + x as usize]])
    }

    fn draw_pixel(&mut self, x: u32, y: u32, color: Luma<u8>) {
        self.data[y as usize * self.stride + x as usize] = color[0];
    }
}

/// Packed RGB-family buffer with arbitrary channel order and padding byte.
struct PackedCanvas<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    stride: usize,
    bpp: usize,
    offsets: [usize; 3],
}

impl PackedCanvas<'_> {
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride + x as usize * self.bpp
    }
}

impl Canvas for PackedCanvas<'_> {
    type Pixel = Rgb<u8>;

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn get_pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        let i = self.index(x, y);
        let [r, g, b] = self.offsets;
        Rgb([self.data[i + r], self.data[i + g], self.data[i + b]])
    }

    fn draw_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>) {
        let i = self.index(x, y);
        for (offset, value) in self.offsets.iter().zip(color.0) {
            self.data[i + offset] = value;
        }
    }
}

fn rect_of(region: &MotionRegion) -> Rect {
    Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height)
}

/// Outlines every region directly in the frame buffer.
///
/// Packed RGB frames get `color`; gray and YUV frames get full-intensity
/// luma. Returns false if the format has no drawing path. The frame geometry
/// must already have been validated against the buffer.
pub fn draw_regions(frame: &mut VideoFrame, regions: &[MotionRegion], color: [u8; 3]) -> bool {
    let info = &frame.info;
    let (width, height, stride) = (info.width, info.height, info.stride);

    if info.format.has_luma_plane() {
        let mut canvas = PlaneCanvas {
            data: &mut frame.data,
            width,
            height,
            stride,
        };
        for region in regions {
            draw_hollow_rect_mut(&mut canvas, rect_of(region), Luma([255]));
        }
        return true;
    }

    let (Some(bpp), Some(offsets)) = (info.format.bytes_per_pixel(), info.format.rgb_offsets())
    else {
        return false;
    };
    let mut canvas = PackedCanvas {
        data: &mut frame.data,
        width,
        height,
        stride,
        bpp,
        offsets,
    };
    for region in regions {
        draw_hollow_rect_mut(&mut canvas, rect_of(region), Rgb(color));
    }
    true
}
