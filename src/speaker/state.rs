use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a speaker within the registry.
///
/// A speaker is `Bound` once its decoders and stream exist, becomes
/// `Active` when a frame decodes successfully, and falls back to `Idle`
/// after a period without audio. `Removed` speakers have left the session;
/// handles to them may still exist but they are no longer mixed.
///
/// An id which was never referenced is simply absent from the registry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SpeakerState {
    /// Decoders and playback stream exist; no audio received yet.
    Bound,
    /// Present in the active set, contributing to the mix.
    Active,
    /// Bound, but silent for longer than the idle timeout.
    Idle,
    /// Erased from the registry after the participant departed.
    Removed,
}

impl SpeakerState {
    const fn to_raw(self) -> u8 {
        match self {
            Self::Bound => 0,
            Self::Active => 1,
            Self::Idle => 2,
            Self::Removed => 3,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Bound,
            1 => Self::Active,
            2 => Self::Idle,
            _ => Self::Removed,
        }
    }

    /// Whether this speaker may legally move to `next`.
    pub fn can_transition(self, next: Self) -> bool {
        use SpeakerState::*;
        matches!(
            (self, next),
            (Bound, Active) | (Idle, Active) | (Active, Idle) | (Bound | Active | Idle, Removed)
        )
    }
}

#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn new(state: SpeakerState) -> Self {
        Self(AtomicU8::new(state.to_raw()))
    }

    pub(crate) fn load(&self) -> SpeakerState {
        SpeakerState::from_raw(self.0.load(Ordering::Acquire))
    }

    /// Moves to `next` if that is a legal transition from the current state.
    pub(crate) fn transition(&self, next: SpeakerState) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                SpeakerState::from_raw(raw)
                    .can_transition(next)
                    .then(|| next.to_raw())
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SpeakerState::*;

    #[test]
    fn legal_paths() {
        let s = AtomicState::new(Bound);
        assert!(s.transition(Active));
        assert!(s.transition(Idle));
        assert!(s.transition(Active));
        assert!(s.transition(Removed));
        assert_eq!(s.load(), Removed);
    }

    #[test]
    fn removed_is_terminal() {
        let s = AtomicState::new(Removed);
        assert!(!s.transition(Active));
        assert!(!s.transition(Bound));
        assert_eq!(s.load(), Removed);
    }

    #[test]
    fn bound_cannot_idle() {
        let s = AtomicState::new(Bound);
        assert!(!s.transition(Idle));
        assert_eq!(s.load(), Bound);
    }
}
