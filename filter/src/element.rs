use image::GrayImage;
use motiondetect_common::config::{ConfigError, FilterConfig};
use motiondetect_common::frame::VideoFrame;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::detector::{self, DetectorState, FrameReport, ReferenceReason};
use crate::message::MessageSink;
use crate::state::DetectionState;
use crate::traits::FrameTransform;

/// The motion detection filter as a host pipeline sees it.
///
/// Owns the configuration, the detector state and the sinks events are
/// posted to. All processing is synchronous and in place.
pub struct MotionDetectElement {
    config: FilterConfig,
    state: DetectorState,
    sinks: Vec<Box<dyn MessageSink>>,
}

impl Default for MotionDetectElement {
    fn default() -> Self {
        Self {
            config: FilterConfig::default(),
            state: DetectorState::default(),
            sinks: Vec::new(),
        }
    }
}

impl MotionDetectElement {
    pub fn new(config: FilterConfig) -> Result<Self, ConfigError> {
        let mut element = Self::default();
        element.configure(config)?;
        Ok(element)
    }

    pub fn add_sink(&mut self, sink: impl MessageSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn detection_state(&self) -> DetectionState {
        self.state.detection_state()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Switching detection off holds the state INACTIVE without an event;
    /// switching it back on makes the next frame a fresh reference.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled != enabled {
            info!(enabled, "motion detection toggled");
            self.state.reset(ReferenceReason::Resumed);
            self.config.enabled = enabled;
        }
    }

    pub fn sensitivity(&self) -> u32 {
        self.config.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: u32) -> Result<(), ConfigError> {
        self.update(|c| c.sensitivity = sensitivity)
    }

    pub fn set_min_region_area(&mut self, area: Option<u32>) -> Result<(), ConfigError> {
        self.update(|c| c.min_region_area = area)
    }

    pub fn set_min_active_frames(&mut self, frames: u32) -> Result<(), ConfigError> {
        self.update(|c| c.min_active_frames = frames)
    }

    pub fn set_min_cooldown_frames(&mut self, frames: u32) -> Result<(), ConfigError> {
        self.update(|c| c.min_cooldown_frames = frames)
    }

    pub fn draw_overlay(&self) -> bool {
        self.config.draw_overlay
    }

    pub fn set_draw_overlay(&mut self, draw_overlay: bool) {
        self.config.draw_overlay = draw_overlay;
    }

    pub fn set_mask_path(&mut self, path: Option<PathBuf>) -> Result<(), ConfigError> {
        self.update(|c| c.mask_path = path)
    }

    pub fn set_debug_directory(&mut self, dir: Option<PathBuf>) -> Result<(), ConfigError> {
        self.update(|c| c.debug_directory = dir)
    }

    fn update(&mut self, change: impl FnOnce(&mut FilterConfig)) -> Result<(), ConfigError> {
        let mut candidate = self.config.clone();
        change(&mut candidate);
        self.configure(candidate)
    }
}

fn load_mask(path: &Path) -> Result<GrayImage, ConfigError> {
    let mask = image::open(path).map_err(|e| ConfigError::Mask {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(mask.to_luma8())
}

impl FrameTransform for MotionDetectElement {
    fn configure(&mut self, config: FilterConfig) -> Result<(), ConfigError> {
        if let Err(e) = config.validate() {
            warn!(error = %e, "rejected filter configuration, keeping previous");
            return Err(e);
        }

        if config.mask_path != self.config.mask_path {
            let mask = match config.mask_path.as_deref().map(load_mask).transpose() {
                Ok(mask) => mask,
                Err(e) => {
                    warn!(error = %e, "rejected detection mask, keeping previous");
                    return Err(e);
                }
            };
            self.state.set_detection_mask(mask);
        }
        if config.debug_directory != self.config.debug_directory {
            self.state.set_debug_directory(config.debug_directory.as_deref());
        }

        let enabled = config.enabled;
        self.config = FilterConfig {
            enabled: self.config.enabled,
            ..config
        };
        self.set_enabled(enabled);
        Ok(())
    }

    fn process_frame(&mut self, frame: &mut VideoFrame) -> FrameReport {
        let report = detector::process(&mut self.state, &self.config, frame);
        if let Some(event) = &report.event {
            for sink in &mut self.sinks {
                sink.post(event.clone());
            }
        }
        report
    }

    fn reset(&mut self) {
        info!("resetting motion detection state");
        self.state.reset(ReferenceReason::Reset);
    }

    fn name(&self) -> &str {
        "motiondetect"
    }
}
