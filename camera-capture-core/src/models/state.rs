/// Camera session state machine.
///
/// State transitions:
/// ```text
/// idle → opening → configured → previewing → stopping → idle
///          ↓            ↓                        ↑
///          └────────────┴────────────────────────┘   (failed open/configure)
///
/// any state → destroyed   (terminal)
/// ```
///
/// Exactly one mutating transition is in flight at a time; the session lock
/// serializes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Opening,
    Configured,
    Previewing,
    Stopping,
    Destroyed,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_previewing(&self) -> bool {
        matches!(self, Self::Previewing)
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, Self::Destroyed)
    }

    /// Whether a device handle may exist in this state.
    pub fn holds_device(&self) -> bool {
        matches!(
            self,
            Self::Opening | Self::Configured | Self::Previewing | Self::Stopping
        )
    }

    /// Legal transitions. Everything may enter `Destroyed`; nothing leaves it.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        if self.is_destroyed() {
            return false;
        }
        match (self, next) {
            (_, Destroyed) => true,
            (Idle, Opening) => true,
            (Opening, Configured) => true,
            // Failed open or configure falls back to idle directly.
            (Opening, Idle) | (Configured, Idle) => true,
            (Configured, Previewing) => true,
            // Stop is reachable from every device-holding state.
            (Opening, Stopping) | (Configured, Stopping) | (Previewing, Stopping) => true,
            (Stopping, Idle) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Opening => "opening",
            SessionState::Configured => "configured",
            SessionState::Previewing => "previewing",
            SessionState::Stopping => "stopping",
            SessionState::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn happy_path_is_legal() {
        let path = [Idle, Opening, Configured, Previewing, Stopping, Idle];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn failed_open_falls_back_to_idle() {
        assert!(Opening.can_transition_to(Idle));
        assert!(Configured.can_transition_to(Idle));
    }

    #[test]
    fn destroyed_is_terminal() {
        for state in [Idle, Opening, Configured, Previewing, Stopping] {
            assert!(state.can_transition_to(Destroyed));
        }
        for state in [Idle, Opening, Configured, Previewing, Stopping, Destroyed] {
            assert!(!Destroyed.can_transition_to(state));
        }
    }

    #[test]
    fn illegal_shortcuts_rejected() {
        assert!(!Idle.can_transition_to(Previewing));
        assert!(!Idle.can_transition_to(Configured));
        assert!(!Previewing.can_transition_to(Opening));
        assert!(!Stopping.can_transition_to(Previewing));
    }

    #[test]
    fn device_holding_states() {
        assert!(!Idle.holds_device());
        assert!(!Destroyed.holds_device());
        assert!(Opening.holds_device());
        assert!(Previewing.holds_device());
    }
}
