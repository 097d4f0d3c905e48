use image::GrayImage;

use crate::adapter::LumaView;

/// One absolute-difference magnitude per pixel, same size as the inputs.
pub type DifferenceMap = GrayImage;

/// Absolute intensity difference between two equally sized views.
///
/// With `block_size > 1` every pixel carries the mean difference of the
/// `block_size` square block it falls in, which smooths out per-pixel sensor
/// noise while keeping the map in pixel coordinates. Blocks at the right and
/// bottom edges may be partial.
pub fn diff(reference: &LumaView<'_>, current: &LumaView<'_>, block_size: u32) -> DifferenceMap {
    debug_assert_eq!(reference.width(), current.width());
    debug_assert_eq!(reference.height(), current.height());

    let (width, height) = (current.width(), current.height());
    let mut map = GrayImage::new(width, height);
    for (y, row) in map.rows_mut().enumerate() {
        let y = y as u32;
        for ((px, a), b) in row.zip(reference.row(y)).zip(current.row(y)) {
            px[0] = a.abs_diff(*b);
        }
    }

    if block_size > 1 {
        average_blocks(&mut map, block_size);
    }
    map
}

fn average_blocks(map: &mut GrayImage, block_size: u32) {
    let (width, height) = map.dimensions();
    for by in (0..height).step_by(block_size as usize) {
        let y_end = (by + block_size).min(height);
        for bx in (0..width).step_by(block_size as usize) {
            let x_end = (bx + block_size).min(width);

            let mut sum = 0u32;
            for y in by..y_end {
                for x in bx..x_end {
                    sum += map.get_pixel(x, y)[0] as u32;
                }
            }
            let count = (y_end - by) * (x_end - bx);
            let mean = (sum / count) as u8;

            for y in by..y_end {
                for x in bx..x_end {
                    map.get_pixel_mut(x, y)[0] = mean;
                }
            }
        }
    }
}
