//! Coordinator phases and their legal transitions
//!
//! ```text
//! Idle ──▶ Processing ──▶ Done ─────────────┐
//!               │    └──▶ DoneWithRollback ─┤
//!               └───────────────────────────┴──▶ Idle
//! ```
//!
//! Detection runs outside the coordinator, so there is no detecting phase
//! here. Processing may return straight to Idle when a transaction fails.

/// Coordinator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Ready to accept an incident
    Idle = 0,
    /// One transaction in flight
    Processing = 1,
    /// Transaction finished (denied, or executed without rollback)
    Done = 2,
    /// Transaction finished after rolling back
    DoneWithRollback = 3,
}

impl Phase {
    /// Every phase
    pub const ALL: [Phase; 4] =
        [Phase::Idle, Phase::Processing, Phase::Done, Phase::DoneWithRollback];

    /// Decode from the atomic representation
    #[must_use]
    pub fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| *p as u8 == raw)
    }

    /// Whether this phase ends a transaction
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::DoneWithRollback)
    }
}

/// Illegal phase change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal phase transition: {from:?} -> {to:?}")]
pub struct PhaseError {
    /// Current phase
    pub from: Phase,
    /// Requested phase
    pub to: Phase,
}

/// Phases reachable from `from`
#[must_use]
pub fn allowed_transitions(from: Phase) -> Vec<Phase> {
    use Phase::{Done, DoneWithRollback, Idle, Processing};
    match from {
        Idle => vec![Processing],
        Processing => vec![Done, DoneWithRollback, Idle],
        Done | DoneWithRollback => vec![Idle],
    }
}

/// Validate a phase change
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), PhaseError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PhaseError { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn happy_path() {
        assert!(validate_transition(Phase::Idle, Phase::Processing).is_ok());
        assert!(validate_transition(Phase::Processing, Phase::Done).is_ok());
        assert!(validate_transition(Phase::Processing, Phase::DoneWithRollback).is_ok());
        assert!(validate_transition(Phase::Done, Phase::Idle).is_ok());
        assert!(validate_transition(Phase::DoneWithRollback, Phase::Idle).is_ok());
    }

    #[test]
    fn no_shortcuts() {
        assert!(validate_transition(Phase::Idle, Phase::Done).is_err());
        assert!(validate_transition(Phase::Processing, Phase::Processing).is_err());
        assert!(validate_transition(Phase::Done, Phase::Processing).is_err());
    }

    #[test]
    fn u8_roundtrip() {
        for p in Phase::ALL {
            assert_eq!(Phase::from_u8(p as u8), Some(p));
        }
        assert_eq!(Phase::from_u8(9), None);
    }

    proptest! {
        #[test]
        fn prop_terminal_phases_only_return_to_idle(
            from in proptest::sample::select(Phase::ALL.to_vec()),
            to in proptest::sample::select(Phase::ALL.to_vec()),
        ) {
            let ok = validate_transition(from, to).is_ok();
            prop_assert_eq!(ok, allowed_transitions(from).contains(&to));
            if from.is_terminal() {
                prop_assert_eq!(ok, to == Phase::Idle);
            }
        }
    }
}
