//! The security code that authorises permanent deletes.
//!
//! The code comes from deployment configuration. Every check is recorded as
//! an attempt, and a user with too many recent failures is locked out.

use std::fmt;

use chrono::Duration;

use crate::types::Timestamp;

/// Failed attempts within [`LOCKOUT_WINDOW_MINUTES`] that lock a user out.
pub const MAX_FAILED_ATTEMPTS: i64 = 5;
/// How far back failed attempts count towards a lockout.
pub const LOCKOUT_WINDOW_MINUTES: i64 = 30;

pub const ATTEMPT_PERMANENT_DELETE: &str = "permanent_delete";
pub const ATTEMPT_BULK_PERMANENT_DELETE: &str = "bulk_permanent_delete";

/// The configured code. Never printed.
#[derive(Clone, Default)]
pub struct SecurityCode(Option<String>);

impl SecurityCode {
    /// Blank values count as not configured.
    pub fn new(configured: Option<String>) -> Self {
        Self(
            configured
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty()),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    /// Compare a supplied code with the configured one. Always `false` when
    /// nothing is configured.
    pub fn matches(&self, supplied: &str) -> bool {
        let Some(expected) = &self.0 else {
            return false;
        };
        constant_time_eq(expected.as_bytes(), supplied.trim().as_bytes())
    }
}

impl fmt::Debug for SecurityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = if self.is_configured() { "<redacted>" } else { "<unset>" };
        f.debug_tuple("SecurityCode").field(&shown).finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Start of the window in which failed attempts count.
pub fn lockout_window_start(now: Timestamp) -> Timestamp {
    now - Duration::minutes(LOCKOUT_WINDOW_MINUTES)
}

pub fn is_locked_out(recent_failures: i64) -> bool {
    recent_failures >= MAX_FAILED_ATTEMPTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_trims_the_supplied_code() {
        let code = SecurityCode::new(Some("PURGE-2026".to_string()));
        assert!(code.matches("PURGE-2026"));
        assert!(code.matches("  PURGE-2026 "));
        assert!(!code.matches("purge-2026"));
        assert!(!code.matches("PURGE-202"));
        assert!(!code.matches(""));
    }

    #[test]
    fn test_blank_code_is_unset() {
        let code = SecurityCode::new(Some("   ".to_string()));
        assert!(!code.is_configured());
        assert!(!code.matches(""));
        assert!(!SecurityCode::default().matches("anything"));
    }

    #[test]
    fn test_debug_never_shows_the_code() {
        let code = SecurityCode::new(Some("PURGE-2026".to_string()));
        let shown = format!("{code:?}");
        assert!(!shown.contains("PURGE"));
        assert!(shown.contains("redacted"));
    }

    #[test]
    fn test_lockout_threshold() {
        assert!(!is_locked_out(MAX_FAILED_ATTEMPTS - 1));
        assert!(is_locked_out(MAX_FAILED_ATTEMPTS));
    }
}
