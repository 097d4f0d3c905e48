use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::diff::DifferenceMap;

/// Binary 0/255 image marking changed pixels.
pub type MotionMask = GrayImage;

pub const SET: u8 = 255;
pub const CLEAR: u8 = 0;

/// Marks every cell whose magnitude is at least `sensitivity`.
pub fn binarize(map: &DifferenceMap, sensitivity: u8) -> MotionMask {
    let mut mask = MotionMask::new(map.width(), map.height());
    for (dst, src) in mask.pixels_mut().zip(map.pixels()) {
        *dst = Luma([if src[0] >= sensitivity { SET } else { CLEAR }]);
    }
    mask
}

/// Clears mask pixels lying under black areas of the detection mask.
///
/// Returns false, leaving `mask` untouched, when the sizes differ.
pub fn apply_detection_mask(mask: &mut MotionMask, detection_mask: &GrayImage) -> bool {
    if mask.dimensions() != detection_mask.dimensions() {
        return false;
    }
    for (dst, keep) in mask.pixels_mut().zip(detection_mask.pixels()) {
        if keep[0] == 0 {
            dst[0] = CLEAR;
        }
    }
    true
}

/// Erode-then-dilate with a square structuring element of the given radius.
///
/// Clusters narrower than `2 * radius + 1` in either direction disappear;
/// anything wider keeps its shape.
pub fn denoise(mask: &MotionMask, radius: u8) -> MotionMask {
    if radius == 0 {
        return mask.clone();
    }
    morphology::open(mask, Norm::LInf, radius)
}
