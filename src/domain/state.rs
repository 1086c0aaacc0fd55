use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision cycle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CyclePhase {
    /// Between cycles, ready to start
    Idle,
    /// Gathering market, account, news, order and ledger data
    Snapshotting,
    /// Prompt sent, waiting for the advisor
    AwaitingAdvice,
    /// Turning advice text into a directive
    Parsing,
    /// Executing the directive against the venue
    Dispatching,
    /// Fixed wait before the next cycle
    Sleeping,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Idle => "IDLE",
            CyclePhase::Snapshotting => "SNAPSHOTTING",
            CyclePhase::AwaitingAdvice => "AWAITING_ADVICE",
            CyclePhase::Parsing => "PARSING",
            CyclePhase::Dispatching => "DISPATCHING",
            CyclePhase::Sleeping => "SLEEPING",
        }
    }

    /// Check if this phase can transition to another phase
    pub fn can_transition_to(&self, target: CyclePhase) -> bool {
        use CyclePhase::*;

        match (self, target) {
            (Idle, Snapshotting) => true,

            (Snapshotting, AwaitingAdvice) => true,
            (Snapshotting, Sleeping) => true, // Snapshot failed

            (AwaitingAdvice, Parsing) => true,
            (AwaitingAdvice, Sleeping) => true, // Advisor failed

            (Parsing, Dispatching) => true,
            (Parsing, Sleeping) => true, // Parse failure skips dispatch

            (Dispatching, Sleeping) => true,

            (Sleeping, Idle) => true,

            _ => false,
        }
    }

    /// Get valid next phases from the current phase
    pub fn valid_transitions(&self) -> Vec<CyclePhase> {
        use CyclePhase::*;

        match self {
            Idle => vec![Snapshotting],
            Snapshotting => vec![AwaitingAdvice, Sleeping],
            AwaitingAdvice => vec![Parsing, Sleeping],
            Parsing => vec![Dispatching, Sleeping],
            Dispatching => vec![Sleeping],
            Sleeping => vec![Idle],
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CyclePhase; 6] = [
        CyclePhase::Idle,
        CyclePhase::Snapshotting,
        CyclePhase::AwaitingAdvice,
        CyclePhase::Parsing,
        CyclePhase::Dispatching,
        CyclePhase::Sleeping,
    ];

    #[test]
    fn transition_table_matches_valid_transitions() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    from.valid_transitions().contains(&to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn dispatching_always_ends_in_sleep() {
        assert_eq!(CyclePhase::Dispatching.valid_transitions(), vec![CyclePhase::Sleeping]);
        assert!(!CyclePhase::Parsing.can_transition_to(CyclePhase::Idle));
        assert!(!CyclePhase::Sleeping.can_transition_to(CyclePhase::Snapshotting));
    }
}
