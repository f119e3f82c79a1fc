use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Consumed authorization codes are remembered for this long (10 minutes),
/// matching the lifetime of the code itself.
pub const USED_CODE_TTL_SECONDS: i64 = 600;

/// In-memory, time-bounded set of consumed authorization codes. A code is
/// recorded before the token exchange goes out, which closes the window where
/// a double-submitted callback could exchange the same code twice.
///
/// Process-local only: replay protection does not survive a restart and does
/// not extend across instances.
pub struct ReplayGuard {
    used: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self {
            used: Mutex::new(HashMap::new()),
        }
    }

    /// Record the code as consumed. Returns false when the code was already
    /// consumed within the TTL window. Expired entries are evicted first.
    pub async fn try_consume(&self, code: &str) -> bool {
        self.try_consume_at(code, Utc::now()).await
    }

    pub async fn try_consume_at(&self, code: &str, now: DateTime<Utc>) -> bool {
        let mut used = self.used.lock().await;
        used.retain(|_, consumed_at| now - *consumed_at <= Duration::seconds(USED_CODE_TTL_SECONDS));

        if used.contains_key(code) {
            return false;
        }
        used.insert(code.to_string(), now);
        true
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.used.lock().await.len()
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new()
    }
}
