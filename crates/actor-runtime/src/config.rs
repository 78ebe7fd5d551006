//! # Runtime Configuration
//!
//! [`RuntimeConfig`] collects the knobs an application may want to tune without
//! recompiling: the mailbox flavour for new Contexts and the default deadline a
//! caller applies to requests.
//!
//! ```rust
//! use actor_runtime::config::{MailboxConfig, RuntimeConfig};
//! use std::time::Duration;
//!
//! let mut cfg = RuntimeConfig::default();
//! cfg.mailbox = MailboxConfig::bounded(64);
//! cfg.send_timeout = Some(Duration::from_millis(250));
//!
//! assert_eq!(cfg.mailbox.capacity, Some(64));
//! ```

use std::time::Duration;
use tracing::warn;

/// Environment variable holding the mailbox capacity (`0` or unset = unbounded).
pub const ENV_MAILBOX_CAPACITY: &str = "ACTOR_MAILBOX_CAPACITY";

/// Environment variable holding the default request deadline in milliseconds.
pub const ENV_SEND_TIMEOUT_MS: &str = "ACTOR_SEND_TIMEOUT_MS";

/// Mailbox flavour of a Context.
///
/// Messages are control-plane traffic, so mailboxes are unbounded unless a
/// capacity is given. A bounded mailbox suspends senders while it is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MailboxConfig {
    pub capacity: Option<usize>,
}

impl MailboxConfig {
    pub fn unbounded() -> Self {
        Self { capacity: None }
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
        }
    }
}

/// Application-wide runtime settings.
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// Mailbox used by Contexts the application creates.
    pub mailbox: MailboxConfig,
    /// Deadline callers apply to `send` (`None` = wait for the reply).
    pub send_timeout: Option<Duration>,
}

impl RuntimeConfig {
    /// Reads [`ENV_MAILBOX_CAPACITY`] and [`ENV_SEND_TIMEOUT_MS`], falling back
    /// to the defaults for missing or malformed values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(ENV_MAILBOX_CAPACITY) {
            match raw.trim().parse::<usize>() {
                Ok(0) => cfg.mailbox = MailboxConfig::unbounded(),
                Ok(capacity) => cfg.mailbox = MailboxConfig::bounded(capacity),
                Err(e) => warn!(key = ENV_MAILBOX_CAPACITY, %raw, error = %e, "Ignoring setting"),
            }
        }

        if let Some(raw) = lookup(ENV_SEND_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => cfg.send_timeout = None,
                Ok(ms) => cfg.send_timeout = Some(Duration::from_millis(ms)),
                Err(e) => warn!(key = ENV_SEND_TIMEOUT_MS, %raw, error = %e, "Ignoring setting"),
            }
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_unbounded_without_deadline() {
        let cfg = RuntimeConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.mailbox, MailboxConfig::unbounded());
        assert_eq!(cfg.send_timeout, None);
    }

    #[test]
    fn reads_capacity_and_timeout() {
        let cfg = RuntimeConfig::from_lookup(lookup(&[
            (ENV_MAILBOX_CAPACITY, "16"),
            (ENV_SEND_TIMEOUT_MS, "500"),
        ]));
        assert_eq!(cfg.mailbox.capacity, Some(16));
        assert_eq!(cfg.send_timeout, Some(Duration::from_millis(500)));
    }

    #[test]
    fn malformed_values_fall_back() {
        let cfg = RuntimeConfig::from_lookup(lookup(&[
            (ENV_MAILBOX_CAPACITY, "lots"),
            (ENV_SEND_TIMEOUT_MS, "0"),
        ]));
        assert_eq!(cfg.mailbox.capacity, None);
        assert_eq!(cfg.send_timeout, None);
    }

    #[test]
    fn bounded_capacity_is_at_least_one() {
        assert_eq!(MailboxConfig::bounded(0).capacity, Some(1));
    }
}
