use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionState {
    #[default]
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Stopped,
}

/// Debounces per-frame motion into an active/inactive state.
///
/// Motion must persist for `min_active_frames` consecutive frames before the
/// state turns active, and stillness for `min_cooldown_frames` before it
/// turns back. At most one transition happens per frame.
#[derive(Debug, Clone, Default)]
pub struct DetectionStateMachine {
    state: DetectionState,
    consecutive_motion: u32,
    consecutive_still: u32,
}

impl DetectionStateMachine {
    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == DetectionState::Active
    }

    /// Feeds one analysed frame. Both thresholds are clamped to at least 1.
    pub fn update(
        &mut self,
        has_motion: bool,
        min_active_frames: u32,
        min_cooldown_frames: u32,
    ) -> Option<Transition> {
        match self.state {
            DetectionState::Inactive => {
                if !has_motion {
                    self.consecutive_motion = 0;
                    return None;
                }
                self.consecutive_motion += 1;
                if self.consecutive_motion < min_active_frames.max(1) {
                    return None;
                }
                info!(
                    frames = self.consecutive_motion,
                    "INACTIVE→ACTIVE: motion started"
                );
                self.state = DetectionState::Active;
                self.consecutive_motion = 0;
                self.consecutive_still = 0;
                Some(Transition::Started)
            }
            DetectionState::Active => {
                if has_motion {
                    self.consecutive_still = 0;
                    return None;
                }
                self.consecutive_still += 1;
                if self.consecutive_still < min_cooldown_frames.max(1) {
                    return None;
                }
                info!(
                    frames = self.consecutive_still,
                    "ACTIVE→INACTIVE: motion stopped"
                );
                self.state = DetectionState::Inactive;
                self.consecutive_motion = 0;
                self.consecutive_still = 0;
                Some(Transition::Stopped)
            }
        }
    }

    /// Back to INACTIVE with cleared counters, silently.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(sm: &mut DetectionStateMachine, frames: &[bool], active: u32, cooldown: u32) -> Vec<Option<Transition>> {
        frames.iter().map(|&m| sm.update(m, active, cooldown)).collect()
    }

    #[test]
    fn starts_inactive() {
        let sm = DetectionStateMachine::default();
        assert_eq!(sm.state(), DetectionState::Inactive);
    }

    #[test]
    fn single_frame_debounce() {
        let mut sm = DetectionStateMachine::default();
        let out = feed(&mut sm, &[false, true, true, false, false], 1, 1);
        assert_eq!(
            out,
            vec![None, Some(Transition::Started), None, Some(Transition::Stopped), None]
        );
    }

    #[test]
    fn short_burst_never_starts() {
        let mut sm = DetectionStateMachine::default();
        let out = feed(&mut sm, &[true, true, false, true, true, false], 3, 1);
        assert!(out.iter().all(Option::is_none));
        assert!(!sm.is_active());
    }

    #[test]
    fn sustained_motion_starts_on_nth_frame() {
        let mut sm = DetectionStateMachine::default();
        let out = feed(&mut sm, &[true, true, true, true], 3, 1);
        assert_eq!(out, vec![None, None, Some(Transition::Started), None]);
    }

    #[test]
    fn cooldown_tolerates_gaps() {
        let mut sm = DetectionStateMachine::default();
        sm.update(true, 1, 2);
        let out = feed(&mut sm, &[false, true, false, false], 1, 2);
        assert_eq!(out, vec![None, None, None, Some(Transition::Stopped)]);
    }

    #[test]
    fn reset_is_silent() {
        let mut sm = DetectionStateMachine::default();
        sm.update(true, 1, 1);
        assert!(sm.is_active());
        sm.reset();
        assert!(!sm.is_active());
        assert_eq!(sm.update(false, 1, 1), None);
    }
}
