//! Control loop states.
//!
//! One iteration runs: IdleHome → AwaitingBattle → Selecting → Placing →
//! Confirming → Monitoring → Resolving → IdleHome. Collecting is entered
//! before the iteration body on every Nth loop.

/// Why the iteration ended in the cancel-recovery procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// First reading was below the low threshold
    LowPercent,
    /// Monitoring ran past its deadline
    Timeout,
    /// Monitoring saw a reading above the high threshold
    HighPercent,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::LowPercent => write!(f, "percent < 20"),
            Resolution::Timeout => write!(f, "timeout"),
            Resolution::HighPercent => write!(f, "percent > 60"),
        }
    }
}

/// Control loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// At (or returning to) the home screen
    IdleHome,
    /// Fight requested, waiting for the battle screen
    AwaitingBattle,
    /// Clicking one random select target
    Selecting,
    /// Clicking every place target in shuffled order
    Placing,
    /// Clicking the select targets in order
    Confirming,
    /// Polling the percentage
    Monitoring,
    /// Running the cancel-recovery procedure
    Resolving(Resolution),
    /// Periodic collect sequence
    Collecting,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::IdleHome => write!(f, "Idle (home)"),
            LoopState::AwaitingBattle => write!(f, "Awaiting battle"),
            LoopState::Selecting => write!(f, "Selecting"),
            LoopState::Placing => write!(f, "Placing"),
            LoopState::Confirming => write!(f, "Confirming"),
            LoopState::Monitoring => write!(f, "Monitoring percent"),
            LoopState::Resolving(r) => write!(f, "Resolving ({})", r),
            LoopState::Collecting => write!(f, "Collecting"),
        }
    }
}

/// How one iteration of the control loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Ran to the cancel-recovery procedure
    Resolved(Resolution),
    /// Home came back before the battle screen did
    FightNotStarted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(format!("{}", LoopState::IdleHome), "Idle (home)");
        assert_eq!(format!("{}", LoopState::Monitoring), "Monitoring percent");
        assert_eq!(
            format!("{}", LoopState::Resolving(Resolution::Timeout)),
            "Resolving (timeout)"
        );
        assert_eq!(
            format!("{}", LoopState::Resolving(Resolution::LowPercent)),
            "Resolving (percent < 20)"
        );
    }
}
