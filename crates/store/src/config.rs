use std::time::Duration;

/// Shortest lock wait a session will use. PostgreSQL treats `0` as "wait
/// forever", so shorter waits are rounded up to this.
pub const MIN_LOCK_TIMEOUT: Duration = Duration::from_millis(1);

/// Storage-layer settings shared by both store implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Longest a session waits for a product row lock before giving up.
    pub lock_timeout: Duration,
}

impl StoreConfig {
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self { lock_timeout }
    }

    /// The lock wait actually applied, never below [`MIN_LOCK_TIMEOUT`].
    pub fn effective_lock_timeout(&self) -> Duration {
        self.lock_timeout.max(MIN_LOCK_TIMEOUT)
    }

    /// The lock wait as a PostgreSQL `lock_timeout` setting.
    pub(crate) fn lock_timeout_setting(&self) -> String {
        format!("{}ms", self.effective_lock_timeout().as_millis())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_is_rounded_up() {
        let config = StoreConfig::with_lock_timeout(Duration::ZERO);
        assert_eq!(config.effective_lock_timeout(), MIN_LOCK_TIMEOUT);
        assert_eq!(config.lock_timeout_setting(), "1ms");
    }

    #[test]
    fn test_sub_millisecond_timeout_never_disables_the_wait() {
        let config = StoreConfig::with_lock_timeout(Duration::from_micros(400));
        assert_eq!(config.lock_timeout_setting(), "1ms");
    }

    #[test]
    fn test_default_setting() {
        assert_eq!(StoreConfig::default().lock_timeout_setting(), "5000ms");
    }
}
