use crate::settings::InputMode;
use std::time::{Duration, Instant};

/// Decides, once per update tick, whether local audio is transmitted.
///
/// In push-to-talk mode every [`set_input`] call acts as a heartbeat
/// which expires after the configured window. In voice activity mode the
/// gate opens when a tick's level exceeds the threshold, and stays open
/// for the hold-over period after the level falls back below it.
///
/// [`set_input`]: ActivityGate::set_input
#[derive(Clone, Debug)]
pub struct ActivityGate {
    mode: InputMode,
    threshold: f32,
    hold_over: Duration,
    push_to_talk_window: Duration,
    input_deadline: Option<Instant>,
    last_above_threshold: Option<Instant>,
    transmitting: bool,
}

impl ActivityGate {
    /// Creates a closed gate.
    pub fn new(
        mode: InputMode,
        threshold: f32,
        hold_over: Duration,
        push_to_talk_window: Duration,
    ) -> Self {
        Self {
            mode,
            threshold,
            hold_over,
            push_to_talk_window,
            input_deadline: None,
            last_above_threshold: None,
            transmitting: false,
        }
    }

    /// Changes the input policy, forgetting any state from the old one.
    pub fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            self.mode = mode;
            self.input_deadline = None;
            self.last_above_threshold = None;
            self.transmitting = false;
        }
    }

    /// Current input policy.
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Changes the voice activity threshold, in decibels.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Records the host's push-to-talk state at `now`.
    ///
    /// `true` renews the heartbeat; `false` closes it immediately.
    pub fn set_input(&mut self, active: bool, now: Instant) {
        self.input_deadline = if active {
            Some(now + self.push_to_talk_window)
        } else {
            None
        };
    }

    /// Evaluates the gate for a tick whose captured level was `level_db`.
    pub fn evaluate(&mut self, level_db: f32, now: Instant) -> bool {
        self.transmitting = match self.mode {
            InputMode::PushToTalk => self.input_deadline.map_or(false, |d| now < d),
            InputMode::VoiceActivity => {
                if level_db > self.threshold {
                    self.last_above_threshold = Some(now);
                }

                self.last_above_threshold
                    .map_or(false, |t| now.saturating_duration_since(t) < self.hold_over)
            },
        };

        self.transmitting
    }

    /// Result of the last evaluation.
    pub fn is_transmitting(&self) -> bool {
        self.transmitting
    }

    /// Closes the gate and clears all timers.
    pub fn reset(&mut self) {
        self.input_deadline = None;
        self.last_above_threshold = None;
        self.transmitting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capture::decibels,
        constants::{DEFAULT_HOLD_OVER, PUSH_TO_TALK_WINDOW, TIMESTEP_LENGTH},
    };

    fn gate(mode: InputMode) -> ActivityGate {
        ActivityGate::new(mode, -50.0, DEFAULT_HOLD_OVER, PUSH_TO_TALK_WINDOW)
    }

    #[test]
    fn push_to_talk_expires_after_window() {
        let mut g = gate(InputMode::PushToTalk);
        let start = Instant::now();

        assert!(!g.evaluate(0.0, start));
        g.set_input(true, start);
        assert!(g.evaluate(-96.0, start));
        assert!(g.evaluate(-96.0, start + Duration::from_millis(999)));
        assert!(!g.evaluate(-96.0, start + Duration::from_secs(1)));
    }

    #[test]
    fn push_to_talk_heartbeat_renews() {
        let mut g = gate(InputMode::PushToTalk);
        let start = Instant::now();

        g.set_input(true, start);
        g.set_input(true, start + Duration::from_millis(800));
        assert!(g.evaluate(-96.0, start + Duration::from_millis(1500)));
        g.set_input(false, start + Duration::from_millis(1500));
        assert!(!g.evaluate(-96.0, start + Duration::from_millis(1500)));
    }

    #[test]
    fn voice_activity_holds_over_after_drop() {
        let mut g = gate(InputMode::VoiceActivity);
        let start = Instant::now();

        assert!(g.evaluate(-10.0, start));
        assert!(g.evaluate(-96.0, start + Duration::from_millis(49)));
        assert!(!g.evaluate(-96.0, start + DEFAULT_HOLD_OVER));
    }

    #[test]
    fn voice_activity_frame_sequence() {
        // Mono capture at -50dB threshold:
        // 2 silent frames, 5 full-scale frames, then silence.
        let silence = utils::make_silence(320, false);
        let tone: Vec<i16> = (0..320)
            .map(|i| if i % 2 == 0 { i16::MAX } else { -i16::MAX })
            .collect();

        let mut frames = vec![&silence; 2];
        frames.extend(vec![&tone; 5]);
        frames.extend(vec![&silence; 3]);

        let mut g = gate(InputMode::VoiceActivity);
        let start = Instant::now();
        let states: Vec<bool> = frames
            .iter()
            .enumerate()
            .map(|(i, f)| g.evaluate(decibels(f), start + TIMESTEP_LENGTH * i as u32))
            .collect();

        assert_eq!(
            states,
            vec![false, false, true, true, true, true, true, true, true, false]
        );
    }

    #[test]
    fn mode_change_closes_gate() {
        let mut g = gate(InputMode::PushToTalk);
        let now = Instant::now();
        g.set_input(true, now);
        assert!(g.evaluate(-96.0, now));

        g.set_mode(InputMode::VoiceActivity);
        assert!(!g.is_transmitting());
        assert!(!g.evaluate(-96.0, now));
    }
}
