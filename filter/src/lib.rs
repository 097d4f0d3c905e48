pub mod adapter;
pub mod debug;
pub mod detector;
pub mod diff;
pub mod element;
pub mod message;
pub mod overlay;
pub mod regions;
pub mod state;
pub mod threshold;
pub mod traits;

pub use element::MotionDetectElement;
pub use message::{MessageSink, MotionEvent, MotionEventKind};
pub use traits::FrameTransform;
