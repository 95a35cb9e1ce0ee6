//! Retention policy math for the recycle bin.
//!
//! A [`RetentionPolicy`] is loaded per module and passed explicitly to the
//! lifecycle engine (to stamp `auto_delete_at`) and to the scheduler jobs (to
//! pick warning windows). Nothing here reads ambient configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Days a soft-deleted record stays recoverable when a module has no row.
pub const DEFAULT_RETENTION_DAYS: i32 = 30;
/// Days before the deadline at which the first warning goes out.
pub const DEFAULT_WARNING_DAYS_BEFORE: i32 = 7;
/// Days before the deadline at which the final warning goes out.
pub const DEFAULT_FINAL_WARNING_DAYS_BEFORE: i32 = 1;

/// A final warning is not repeated to the same user within this many hours.
pub const FINAL_WARNING_DEDUP_HOURS: i64 = 12;

/// Retention settings for one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub retention_days: i32,
    pub auto_delete_enabled: bool,
    pub warning_days_before: i32,
    pub final_warning_days_before: i32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            auto_delete_enabled: true,
            warning_days_before: DEFAULT_WARNING_DAYS_BEFORE,
            final_warning_days_before: DEFAULT_FINAL_WARNING_DAYS_BEFORE,
        }
    }
}

/// The two advance notices the scheduler sends before a purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Warning,
    FinalWarning,
}

impl RetentionPolicy {
    /// Check `0 < final_warning < warning < retention`.
    pub fn validate(&self) -> Result<(), String> {
        if self.retention_days <= 0 {
            return Err("retention_days must be greater than 0".to_string());
        }
        if self.final_warning_days_before <= 0 {
            return Err("final_warning_days_before must be greater than 0".to_string());
        }
        if self.warning_days_before >= self.retention_days {
            return Err(format!(
                "warning_days_before ({}) must be less than retention_days ({})",
                self.warning_days_before, self.retention_days
            ));
        }
        if self.final_warning_days_before >= self.warning_days_before {
            return Err(format!(
                "final_warning_days_before ({}) must be less than warning_days_before ({})",
                self.final_warning_days_before, self.warning_days_before
            ));
        }
        Ok(())
    }

    /// Deadline for an entity soft-deleted at `deleted_at`.
    pub fn auto_delete_at(&self, deleted_at: Timestamp) -> Timestamp {
        deleted_at + Duration::days(i64::from(self.retention_days))
    }

    /// Deadline window `(lower, upper]` an entry must fall in to get `kind`.
    ///
    /// - `Warning`: `now + final_warning_days < auto_delete_at <= now + warning_days`
    /// - `FinalWarning`: `now < auto_delete_at <= now + final_warning_days`
    pub fn warning_window(&self, kind: WarningKind, now: Timestamp) -> (Timestamp, Timestamp) {
        let final_edge = now + Duration::days(i64::from(self.final_warning_days_before));
        match kind {
            WarningKind::Warning => (
                final_edge,
                now + Duration::days(i64::from(self.warning_days_before)),
            ),
            WarningKind::FinalWarning => (now, final_edge),
        }
    }

    /// How long a user is left alone after receiving `kind`.
    ///
    /// The first warning covers the gap until the final warning takes over,
    /// so a daily job cannot repeat it while the same entries are in range.
    pub fn dedup_window(&self, kind: WarningKind) -> Duration {
        match kind {
            WarningKind::Warning => Duration::days(i64::from(
                self.warning_days_before - self.final_warning_days_before,
            )),
            WarningKind::FinalWarning => Duration::hours(FINAL_WARNING_DEDUP_HOURS),
        }
    }
}

/// Whether a pending entry's deadline has passed.
pub fn is_expired(auto_delete_at: Timestamp, now: Timestamp) -> bool {
    auto_delete_at <= now
}

/// Whole hours left before `auto_delete_at`, never negative.
pub fn hours_remaining(auto_delete_at: Timestamp, now: Timestamp) -> i64 {
    (auto_delete_at - now).num_hours().max(0)
}

/// Whole days left before `auto_delete_at`, never negative.
pub fn days_remaining(auto_delete_at: Timestamp, now: Timestamp) -> i64 {
    (auto_delete_at - now).num_days().max(0)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32, hour: u32) -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_default_policy_is_valid() {
        let policy = RetentionPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.retention_days, 30);
        assert_eq!(policy.warning_days_before, 7);
        assert_eq!(policy.final_warning_days_before, 1);
        assert!(policy.auto_delete_enabled);
    }

    #[test]
    fn test_zero_retention_rejected() {
        let policy = RetentionPolicy {
            retention_days: 0,
            ..Default::default()
        };
        assert!(policy.validate().unwrap_err().contains("retention_days"));
    }

    #[test]
    fn test_warning_not_below_retention_rejected() {
        let policy = RetentionPolicy {
            retention_days: 7,
            ..Default::default()
        };
        assert!(policy.validate().unwrap_err().contains("warning_days_before"));
    }

    #[test]
    fn test_final_warning_not_below_warning_rejected() {
        let policy = RetentionPolicy {
            final_warning_days_before: 7,
            ..Default::default()
        };
        assert!(policy
            .validate()
            .unwrap_err()
            .contains("final_warning_days_before"));
    }

    #[test]
    fn test_zero_final_warning_rejected() {
        let policy = RetentionPolicy {
            final_warning_days_before: 0,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_auto_delete_at_adds_retention_days() {
        let policy = RetentionPolicy {
            retention_days: 10,
            warning_days_before: 5,
            final_warning_days_before: 2,
            auto_delete_enabled: true,
        };
        assert_eq!(policy.auto_delete_at(at(1, 9)), at(11, 9));
    }

    #[test]
    fn test_warning_window_includes_exactly_seven_days_out() {
        let policy = RetentionPolicy::default();
        let now = at(1, 0);
        let (lower, upper) = policy.warning_window(WarningKind::Warning, now);
        assert_eq!(lower, at(2, 0));
        assert_eq!(upper, at(8, 0));
        let deadline = at(8, 0);
        assert!(deadline > lower && deadline <= upper);
    }

    #[test]
    fn test_final_window_starts_now() {
        let policy = RetentionPolicy::default();
        let now = at(1, 0);
        let (lower, upper) = policy.warning_window(WarningKind::FinalWarning, now);
        assert_eq!(lower, now);
        assert_eq!(upper, at(2, 0));
    }

    #[test]
    fn test_windows_do_not_overlap() {
        let policy = RetentionPolicy::default();
        let now = at(1, 0);
        let (_, final_upper) = policy.warning_window(WarningKind::FinalWarning, now);
        let (warning_lower, _) = policy.warning_window(WarningKind::Warning, now);
        assert_eq!(final_upper, warning_lower);
    }

    #[test]
    fn test_dedup_windows() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.dedup_window(WarningKind::Warning), Duration::days(6));
        assert_eq!(
            policy.dedup_window(WarningKind::FinalWarning),
            Duration::hours(12)
        );
    }

    #[test]
    fn test_hours_remaining_floors_and_clamps() {
        assert_eq!(hours_remaining(at(2, 5), at(1, 0)), 29);
        assert_eq!(hours_remaining(at(1, 0), at(2, 0)), 0);
    }

    #[test]
    fn test_is_expired_at_deadline() {
        assert!(is_expired(at(3, 0), at(3, 0)));
        assert!(!is_expired(at(3, 1), at(3, 0)));
    }

    #[test]
    fn test_days_remaining() {
        assert_eq!(days_remaining(at(8, 0), at(1, 0)), 7);
        assert_eq!(days_remaining(at(1, 0), at(8, 0)), 0);
    }
}
