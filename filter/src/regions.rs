use image::Luma;
use imageproc::region_labelling::{self, Connectivity as LabelConnectivity};
use motiondetect_common::config::Connectivity;
use motiondetect_common::frame::MotionRegion;

use crate::threshold::{MotionMask, CLEAR};

struct Component {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u32,
}

impl Component {
    fn new(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            area: 0,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.area += 1;
    }

    fn region(&self) -> MotionRegion {
        MotionRegion {
            x: self.min_x,
            y: self.min_y,
            width: self.max_x - self.min_x + 1,
            height: self.max_y - self.min_y + 1,
            area: self.area,
        }
    }
}

/// Labels connected set pixels and returns one region per component whose
/// pixel count is at least `min_area`.
///
/// Regions come back in raster-scan order of each component's first pixel.
pub fn extract_regions(
    mask: &MotionMask,
    min_area: u32,
    connectivity: Connectivity,
) -> Vec<MotionRegion> {
    let conn = match connectivity {
        Connectivity::Four => LabelConnectivity::Four,
        Connectivity::Eight => LabelConnectivity::Eight,
    };
    let labels = region_labelling::connected_components(mask, conn, Luma([CLEAR]));

    // Slot per label, filled in the order labels are first met.
    let mut slot_of_label: Vec<Option<usize>> = Vec::new();
    let mut components: Vec<Component> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if slot_of_label.len() <= label {
            slot_of_label.resize(label + 1, None);
        }
        let slot = *slot_of_label[label].get_or_insert_with(|| {
            components.push(Component::new(x, y));
            components.len() - 1
        });
        components[slot].add(x, y);
    }

    components
        .iter()
        .filter(|c| c.area >= min_area)
        .map(Component::region)
        .collect()
}
