use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// In-memory rate limiter keyed by (bucket, ip_hash).
/// Each bucket ("chat", "subscribe") has its own max attempts and window.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, Vec<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt and return true if it is under the limit.
    /// `key` looks like "chat:<ip_hash>".
    pub fn check_and_record(&self, key: &str, max_attempts: u64, window: Duration) -> bool {
        self.check_and_record_at(key, max_attempts, window, Instant::now())
    }

    pub fn check_and_record_at(
        &self,
        key: &str,
        max_attempts: u64,
        window: Duration,
        now: Instant,
    ) -> bool {
        let mut map = match self.entries.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        let attempts = map.entry(key.to_string()).or_default();

        // Prune old entries outside the window
        attempts.retain(|t| now.saturating_duration_since(*t) < window);

        if (attempts.len() as u64) < max_attempts {
            attempts.push(now);
            true
        } else {
            false
        }
    }

    /// Drop keys whose attempts are all older than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let mut map = match self.entries.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        map.retain(|_, attempts| {
            attempts.retain(|t| now.saturating_duration_since(*t) < max_age);
            !attempts.is_empty()
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_applies_per_key_within_window() {
        let rl = RateLimiter::new();
        let t0 = Instant::now();
        let w = Duration::from_secs(60);
        assert!(rl.check_and_record_at("chat:a", 2, w, t0));
        assert!(rl.check_and_record_at("chat:a", 2, w, t0));
        assert!(!rl.check_and_record_at("chat:a", 2, w, t0));
        assert!(rl.check_and_record_at("chat:b", 2, w, t0));
        assert!(rl.check_and_record_at("chat:a", 2, w, t0 + Duration::from_secs(61)));
    }

    #[test]
    fn cleanup_drops_idle_keys() {
        let rl = RateLimiter::new();
        rl.check_and_record("subscribe:x", 5, Duration::from_secs(60));
        assert_eq!(rl.tracked_keys(), 1);
        rl.cleanup(Duration::from_secs(0));
        assert_eq!(rl.tracked_keys(), 0);
    }
}
