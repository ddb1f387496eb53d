use std::time::SystemTime;

/// A snapshot of whether a token is usable.
///
/// Three outcomes, decided at the instant the snapshot was taken:
///
/// ```text
///   absent value ─────────────────────────→ expired
///   present, no expiry tracked ───────────→ unknown (not expired)
///   present, now <  expires_at ───────────→ valid
///   present, now >= expires_at ───────────→ expired
/// ```
///
/// An absent value is always expired. That keeps "no token" and "dead
/// token" on the same code path in the scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenStatus {
    present: bool,
    expires_at: Option<SystemTime>,
    now: SystemTime,
}

impl TokenStatus {
    pub fn new(present: bool, expires_at: Option<SystemTime>, now: SystemTime) -> Self {
        Self {
            present,
            expires_at,
            now,
        }
    }

    /// `true` if there is no value, or its expiry has passed.
    pub fn expired(&self) -> bool {
        if !self.present {
            return true;
        }
        self.expires_at.is_some_and(|at| self.now >= at)
    }

    /// `true` if the value is present and known to be within its lifetime.
    pub fn valid(&self) -> bool {
        self.present && self.expires_at.is_some_and(|at| self.now < at)
    }

    /// `true` if the value is present but nothing tracks its expiry.
    pub fn unknown(&self) -> bool {
        self.present && self.expires_at.is_none()
    }

    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_status_absent_is_expired_regardless_of_expiry() {
        let s = TokenStatus::new(false, Some(at(100)), at(10));
        assert!(s.expired());
        assert!(!s.valid());
        assert!(!s.unknown());
    }

    #[test]
    fn test_status_before_expiry_is_valid() {
        let s = TokenStatus::new(true, Some(at(100)), at(99));
        assert!(s.valid());
        assert!(!s.expired());
    }

    #[test]
    fn test_status_at_expiry_instant_is_expired() {
        let s = TokenStatus::new(true, Some(at(100)), at(100));
        assert!(s.expired());
        assert!(!s.valid());
    }

    #[test]
    fn test_status_untracked_is_unknown_not_expired() {
        let s = TokenStatus::new(true, None, at(5));
        assert!(s.unknown());
        assert!(!s.expired());
        assert!(!s.valid());
    }
}
