//! Per-song play button state machine.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// Toggle on an id that is not the current session.
    Load,
    /// Media backend finished loading and playback started.
    Ready,
    /// Load or playback error.
    Fail,
    /// User toggle or native pause on the current session.
    Pause,
    /// User toggle or native play on the current session.
    Resume,
    /// Media reached its end.
    Ended,
    /// Another id took over the session.
    Retire,
}

impl ButtonState {
    /// Transition table. `None` means the event does not apply in this state.
    pub fn on(self, event: ButtonEvent) -> Option<ButtonState> {
        use ButtonEvent as E;
        use ButtonState as S;

        match (self, event) {
            (S::Idle | S::Paused | S::Error, E::Load) => Some(S::Loading),
            (S::Loading, E::Ready) => Some(S::Playing),
            (S::Loading | S::Playing | S::Paused, E::Fail) => Some(S::Error),
            (S::Playing, E::Pause) => Some(S::Paused),
            (S::Paused, E::Resume) => Some(S::Playing),
            (S::Playing, E::Ended) => Some(S::Paused),
            (S::Playing | S::Paused, E::Retire) => Some(S::Paused),
            // A superseded load never started playing.
            (S::Loading, E::Retire) => Some(S::Idle),
            _ => None,
        }
    }

    pub fn is_busy(self) -> bool {
        self == ButtonState::Loading
    }
}

#[cfg(test)]
mod tests {
    use super::ButtonEvent as E;
    use super::ButtonState as S;

    #[test]
    fn test_happy_path() {
        let s = S::Idle.on(E::Load).unwrap();
        assert_eq!(s, S::Loading);
        let s = s.on(E::Ready).unwrap();
        assert_eq!(s, S::Playing);
        let s = s.on(E::Pause).unwrap();
        assert_eq!(s, S::Paused);
        assert_eq!(s.on(E::Resume), Some(S::Playing));
    }

    #[test]
    fn test_errors_are_retryable() {
        assert_eq!(S::Loading.on(E::Fail), Some(S::Error));
        assert_eq!(S::Playing.on(E::Fail), Some(S::Error));
        assert_eq!(S::Error.on(E::Load), Some(S::Loading));
    }

    #[test]
    fn test_ended_pauses() {
        assert_eq!(S::Playing.on(E::Ended), Some(S::Paused));
        assert_eq!(S::Paused.on(E::Ended), None);
    }

    #[test]
    fn test_retire() {
        assert_eq!(S::Playing.on(E::Retire), Some(S::Paused));
        assert_eq!(S::Paused.on(E::Retire), Some(S::Paused));
        assert_eq!(S::Loading.on(E::Retire), Some(S::Idle));
        assert_eq!(S::Error.on(E::Retire), None);
    }

    #[test]
    fn test_rejected_transitions() {
        assert_eq!(S::Loading.on(E::Load), None);
        assert_eq!(S::Playing.on(E::Load), None);
        assert_eq!(S::Idle.on(E::Ready), None);
        assert_eq!(S::Idle.on(E::Pause), None);
        assert_eq!(S::Error.on(E::Resume), None);
    }
}
