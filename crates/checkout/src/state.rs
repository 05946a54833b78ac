//! Checkout state machine.

use std::fmt;

/// The stage a checkout has reached.
///
/// State transitions:
/// ```text
/// Validating ──► Locking ──► Reserving ──► Assembling ──┬──► Finalizing ──► Committed
///                   ▲                                   │
///                   └───────────────────────────────────┘
/// ```
/// Every non-terminal state may also move to `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckoutState {
    /// Cart shape and address ownership are being checked.
    #[default]
    Validating,

    /// A product row lock is being acquired.
    Locking,

    /// Stock of the locked row is being checked and decremented.
    Reserving,

    /// The product snapshot and order line for a cart line are being staged.
    Assembling,

    /// The order header and lines are being written.
    Finalizing,

    /// The unit of work committed (terminal state).
    Committed,

    /// The unit of work was rolled back (terminal state).
    Aborted,
}

impl CheckoutState {
    /// Returns true if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: CheckoutState) -> bool {
        use CheckoutState::*;

        match (self, next) {
            (_, Aborted) => !self.is_terminal(),
            (Validating, Locking)
            | (Locking, Reserving)
            | (Reserving, Assembling)
            | (Assembling, Locking)
            | (Assembling, Finalizing)
            | (Finalizing, Committed) => true,
            _ => false,
        }
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Committed | CheckoutState::Aborted)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Validating => "Validating",
            CheckoutState::Locking => "Locking",
            CheckoutState::Reserving => "Reserving",
            CheckoutState::Assembling => "Assembling",
            CheckoutState::Finalizing => "Finalizing",
            CheckoutState::Committed => "Committed",
            CheckoutState::Aborted => "Aborted",
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CheckoutState::*;

    const ALL: [CheckoutState; 7] = [
        Validating, Locking, Reserving, Assembling, Finalizing, Committed, Aborted,
    ];

    #[test]
    fn test_default_state_is_validating() {
        assert_eq!(CheckoutState::default(), Validating);
    }

    #[test]
    fn test_happy_path_with_two_lines() {
        let path = [
            Validating, Locking, Reserving, Assembling, Locking, Reserving, Assembling,
            Finalizing, Committed,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be allowed",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_every_live_state_can_abort() {
        for state in ALL {
            assert_eq!(state.can_transition_to(Aborted), !state.is_terminal());
        }
    }

    #[test]
    fn test_no_skipping_reservation() {
        assert!(!Locking.can_transition_to(Assembling));
        assert!(!Validating.can_transition_to(Finalizing));
        assert!(!Reserving.can_transition_to(Committed));
        assert!(!Finalizing.can_transition_to(Locking));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in ALL {
            assert!(!Committed.can_transition_to(next));
            assert!(!Aborted.can_transition_to(next));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Validating.to_string(), "Validating");
        assert_eq!(Finalizing.to_string(), "Finalizing");
        assert_eq!(Aborted.to_string(), "Aborted");
    }
}
