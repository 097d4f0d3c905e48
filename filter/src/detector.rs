use image::GrayImage;
use motiondetect_common::config::FilterConfig;
use motiondetect_common::frame::{FrameInfo, MotionMeta, MotionRegion, PixelFormat, VideoFrame};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

use crate::adapter::{adapt, FormatError, LumaView};
use crate::debug::DebugDumper;
use crate::diff::diff;
use crate::message::{MotionEvent, MotionEventKind};
use crate::regions::extract_regions;
use crate::state::{DetectionState, DetectionStateMachine, Transition};
use crate::threshold::{apply_detection_mask, binarize, denoise};

/// Baseline the next frame is compared against.
#[derive(Debug, Clone)]
pub struct ReferenceFrame {
    pub image: GrayImage,
    pub info: FrameInfo,
    pub pts_ns: Option<u64>,
}

/// Why the reference was (re)initialised instead of diffed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceReason {
    FirstFrame,
    FormatChange,
    Resumed,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum FrameOutcome {
    /// Detection is switched off; the frame went through untouched.
    Disabled,
    /// The frame became the new reference; nothing was compared.
    ReferenceInitialised { reason: ReferenceReason },
    Analysed,
    /// The frame could not be analysed and went through untouched.
    PassThrough { error: String },
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub frame_number: u64,
    pub pts_ns: Option<u64>,
    #[serde(flatten)]
    pub outcome: FrameOutcome,
    pub regions: Vec<MotionRegion>,
    pub state: DetectionState,
    pub event: Option<MotionEvent>,
}

/// Everything the filter remembers between frames.
#[derive(Debug, Default)]
pub struct DetectorState {
    reference: Option<ReferenceFrame>,
    machine: DetectionStateMachine,
    frames_since_reference: u32,
    frame_number: u64,
    next_reason: Option<ReferenceReason>,
    detection_mask: Option<GrayImage>,
    mask_mismatch_warned: bool,
    debug: Option<DebugDumper>,
    warned_formats: HashSet<PixelFormat>,
}

impl DetectorState {
    pub fn reference(&self) -> Option<&ReferenceFrame> {
        self.reference.as_ref()
    }

    pub fn detection_state(&self) -> DetectionState {
        self.machine.state()
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Drops the reference and returns to INACTIVE without an event.
    pub fn reset(&mut self, reason: ReferenceReason) {
        if self.reference.take().is_some() {
            debug!(?reason, "discarded reference frame");
        }
        self.machine.reset();
        self.frames_since_reference = 0;
        self.next_reason = Some(reason);
    }

    pub fn set_detection_mask(&mut self, mask: Option<GrayImage>) {
        self.detection_mask = mask;
        self.mask_mismatch_warned = false;
    }

    pub fn set_debug_directory(&mut self, root: Option<&Path>) {
        self.debug = root.map(DebugDumper::new);
    }

    fn store_reference(&mut self, view: &LumaView<'_>, frame: &VideoFrame) {
        self.reference = Some(ReferenceFrame {
            image: view.to_image(),
            info: frame.info.clone(),
            pts_ns: frame.pts_ns,
        });
        self.frames_since_reference = 0;
    }
}

/// Runs detection for one frame and annotates it in place.
///
/// Never fails: frames that cannot be analysed pass through unchanged and
/// leave the detection state as it was.
pub fn process(state: &mut DetectorState, config: &FilterConfig, frame: &mut VideoFrame) -> FrameReport {
    let frame_number = state.frame_number;
    let pts_ns = frame.pts_ns;
    state.frame_number += 1;
    frame.motion_meta = None;

    let report = |outcome, regions, state: &DetectorState, event| FrameReport {
        frame_number,
        pts_ns,
        outcome,
        regions,
        state: state.machine.state(),
        event,
    };

    if !config.enabled {
        return report(FrameOutcome::Disabled, Vec::new(), state, None);
    }

    let view = match adapt(frame) {
        Ok(view) => view,
        Err(e) => {
            match &e {
                FormatError::Unsupported(format) => {
                    if state.warned_formats.insert(format.clone()) {
                        warn!(%format, "unsupported pixel format, passing frames through");
                    }
                }
                FormatError::Frame(_) => {
                    warn!(error = %e, frame_number, "malformed frame, passing through");
                }
            }
            return report(
                FrameOutcome::PassThrough {
                    error: e.to_string(),
                },
                Vec::new(),
                state,
                None,
            );
        }
    };

    let reference = match state.reference.take() {
        Some(reference) if reference.info.same_geometry(&frame.info) => reference,
        previous => {
            let reason = match previous {
                Some(old) => {
                    debug!(
                        old_format = %old.info.format,
                        old_width = old.info.width,
                        old_height = old.info.height,
                        format = %frame.info.format,
                        width = frame.info.width,
                        height = frame.info.height,
                        "frame format changed, reinitialising reference"
                    );
                    ReferenceReason::FormatChange
                }
                None => state.next_reason.take().unwrap_or(ReferenceReason::FirstFrame),
            };
            debug!(?reason, frame_number, "storing reference frame");
            state.store_reference(&view, frame);
            return report(
                FrameOutcome::ReferenceInitialised { reason },
                Vec::new(),
                state,
                None,
            );
        }
    };

    let map = diff(
        &LumaView::from_image(&reference.image),
        &view,
        config.block_size,
    );
    let mut mask = binarize(&map, config.sensitivity.min(255) as u8);
    if let Some(detection_mask) = &state.detection_mask {
        if !apply_detection_mask(&mut mask, detection_mask) && !state.mask_mismatch_warned {
            warn!(
                mask_width = detection_mask.width(),
                mask_height = detection_mask.height(),
                width = frame.info.width,
                height = frame.info.height,
                "detection mask size does not match frame, ignoring mask"
            );
            state.mask_mismatch_warned = true;
        }
    }
    let cleaned = denoise(&mask, config.denoise_radius.min(u8::MAX as u32) as u8);
    let min_area = config.resolve_min_region_area(frame.info.width, frame.info.height);
    let regions = extract_regions(&cleaned, min_area, config.connectivity);

    if let Some(dumper) = state.debug.as_mut() {
        dumper.dump_or_warn(frame_number, "difference", &map);
        dumper.dump_or_warn(frame_number, "mask", &mask);
        dumper.dump_or_warn(frame_number, "denoised", &cleaned);
    }

    state.frames_since_reference += 1;
    if state.frames_since_reference >= config.reference_interval {
        state.store_reference(&view, frame);
    } else {
        state.reference = Some(reference);
    }

    let has_motion = !regions.is_empty();
    let transition = state.machine.update(
        has_motion,
        config.min_active_frames,
        config.min_cooldown_frames,
    );
    let event = transition.map(|t| MotionEvent {
        kind: match t {
            Transition::Started => MotionEventKind::MotionStarted,
            Transition::Stopped => MotionEventKind::MotionStopped,
        },
        regions: match t {
            Transition::Started => regions.clone(),
            Transition::Stopped => Vec::new(),
        },
        pts_ns,
        frame_number,
    });

    debug!(
        frame_number,
        regions = regions.len(),
        min_area,
        active = state.machine.is_active(),
        "analysed frame"
    );

    if config.draw_overlay && has_motion {
        crate::overlay::draw_regions(frame, &regions, config.overlay_color);
    }
    frame.motion_meta = Some(MotionMeta {
        has_motion,
        regions: regions.clone(),
        active: state.machine.is_active(),
    });

    report(FrameOutcome::Analysed, regions, state, event)
}
