use motiondetect_common::frame::MotionRegion;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MotionEventKind {
    MotionStarted,
    MotionStopped,
}

/// Posted to the host whenever the debounced state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MotionEvent {
    pub kind: MotionEventKind,
    /// Regions of the frame that triggered the transition. Empty on stop.
    pub regions: Vec<MotionRegion>,
    pub pts_ns: Option<u64>,
    pub frame_number: u64,
}

/// Where state-change events are delivered. Must not block.
pub trait MessageSink: Send {
    fn post(&mut self, event: MotionEvent);
}

impl MessageSink for Vec<MotionEvent> {
    fn post(&mut self, event: MotionEvent) {
        self.push(event);
    }
}

impl MessageSink for UnboundedSender<MotionEvent> {
    fn post(&mut self, event: MotionEvent) {
        if let Err(e) = self.send(event) {
            warn!(kind = ?e.0.kind, "event receiver dropped, discarding motion event");
        }
    }
}
