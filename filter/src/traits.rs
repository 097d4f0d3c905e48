use motiondetect_common::config::{ConfigError, FilterConfig};
use motiondetect_common::frame::VideoFrame;

use crate::detector::FrameReport;

/// In-place frame transform driven by a host pipeline.
///
/// The host calls `process_frame` once per frame in presentation order and
/// forwards the (possibly annotated) frame downstream afterwards. Every input
/// frame yields exactly one output frame.
pub trait FrameTransform: Send {
    /// Replaces the whole configuration. On error the previous one stays.
    fn configure(&mut self, config: FilterConfig) -> Result<(), ConfigError>;

    fn process_frame(&mut self, frame: &mut VideoFrame) -> FrameReport;

    /// Pipeline stop/flush: forget the reference and go back to INACTIVE.
    fn reset(&mut self);

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
