//! Recycle-bin entry state machine and listing filters.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Consolidated warnings list at most this many sample entries.
pub const MAX_NOTIFICATION_SAMPLES: usize = 5;

/// Window used by the statistics view for "expiring soon".
pub const EXPIRING_SOON_DAYS: i64 = 7;

/// Lifecycle state of a ledger entry.
///
/// `Purged` never appears on a stored row: purging removes the row. It exists
/// so callers can reason about the full state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Pending,
    Restored,
    Purged,
}

impl EntryState {
    /// Derive the state of a stored row.
    pub fn of(restored_at: Option<Timestamp>) -> Self {
        if restored_at.is_some() {
            EntryState::Restored
        } else {
            EntryState::Pending
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, EntryState::Pending)
    }

    /// Validate a transition. Only `Pending` may move, and only to a terminal state.
    pub fn transition(self, to: EntryState) -> Result<EntryState, String> {
        match (self, to) {
            (EntryState::Pending, EntryState::Restored | EntryState::Purged) => Ok(to),
            (EntryState::Restored, _) => Err("Entry has already been restored".to_string()),
            (EntryState::Purged, _) => Err("Entry has already been purged".to_string()),
            (EntryState::Pending, EntryState::Pending) => {
                Err("Entry is already pending".to_string())
            }
        }
    }
}

/// State filter accepted by ledger listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFilter {
    #[default]
    Pending,
    Restored,
    All,
}

impl StateFilter {
    /// SQL predicate over an unqualified `restored_at` column.
    pub fn predicate(self) -> &'static str {
        match self {
            StateFilter::Pending => "restored_at IS NULL",
            StateFilter::Restored => "restored_at IS NOT NULL",
            StateFilter::All => "TRUE",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "pending" => Ok(StateFilter::Pending),
            "restored" => Ok(StateFilter::Restored),
            "all" => Ok(StateFilter::All),
            other => Err(format!(
                "Invalid state '{other}'. Must be one of: pending, restored, all"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_of_row() {
        assert_eq!(EntryState::of(None), EntryState::Pending);
        assert_eq!(EntryState::of(Some(chrono::Utc::now())), EntryState::Restored);
    }

    #[test]
    fn test_pending_moves_to_terminal_states() {
        assert_eq!(
            EntryState::Pending.transition(EntryState::Restored),
            Ok(EntryState::Restored)
        );
        assert_eq!(
            EntryState::Pending.transition(EntryState::Purged),
            Ok(EntryState::Purged)
        );
    }

    #[test]
    fn test_terminal_states_never_move() {
        for from in [EntryState::Restored, EntryState::Purged] {
            assert!(from.is_terminal());
            for to in [EntryState::Pending, EntryState::Restored, EntryState::Purged] {
                assert!(from.transition(to).is_err(), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn test_state_filter_predicates() {
        assert_eq!(StateFilter::default(), StateFilter::Pending);
        assert_eq!(StateFilter::Restored.predicate(), "restored_at IS NOT NULL");
        assert!(StateFilter::parse("purged").is_err());
    }
}
