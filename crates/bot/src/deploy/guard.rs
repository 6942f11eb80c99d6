//! Opt-in at-most-once guard for prompt resolutions.
//!
//! Slack does not stop two people from clicking the same prompt, and the
//! prompt itself keeps no state. When enabled, the interaction route claims
//! `(channel, ts)` before resolving; a second click inside the TTL finds the
//! claim and is dropped. Claims live in process memory only.

use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

/// How long a resolved prompt stays claimed.
pub const DEFAULT_CLAIM_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on remembered claims.
const MAX_CLAIMS: u64 = 10_000;

/// Remembers which prompts have already been resolved.
#[derive(Clone)]
pub struct ResolutionGuard {
    claims: Cache<(String, String), ()>,
}

impl std::fmt::Debug for ResolutionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionGuard")
            .field("claims", &self.claims.entry_count())
            .finish()
    }
}

impl Default for ResolutionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_CLAIM_TTL)
    }
}

impl ResolutionGuard {
    /// Create a guard whose claims expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let claims = Cache::builder()
            .max_capacity(MAX_CLAIMS)
            .time_to_live(ttl)
            .build();

        Self { claims }
    }

    /// Claim the prompt at `channel`/`ts`. Returns `false` if already claimed.
    pub async fn claim(&self, channel: &str, ts: &str) -> bool {
        let entry = self
            .claims
            .entry((channel.to_string(), ts.to_string()))
            .or_insert(())
            .await;

        if !entry.is_fresh() {
            debug!(channel, ts, "Prompt already resolved");
        }

        entry.is_fresh()
    }

    /// Drop a claim so the prompt can be resolved again.
    pub async fn release(&self, channel: &str, ts: &str) {
        self.claims
            .invalidate(&(channel.to_string(), ts.to_string()))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_claim_is_rejected() {
        let guard = ResolutionGuard::default();
        assert!(guard.claim("C1", "1.1").await);
        assert!(!guard.claim("C1", "1.1").await);
    }

    #[tokio::test]
    async fn test_claims_are_per_message() {
        let guard = ResolutionGuard::default();
        assert!(guard.claim("C1", "1.1").await);
        assert!(guard.claim("C1", "2.2").await);
        assert!(guard.claim("C2", "1.1").await);
    }

    #[tokio::test]
    async fn test_release_allows_reclaim() {
        let guard = ResolutionGuard::default();
        assert!(guard.claim("C1", "1.1").await);
        guard.release("C1", "1.1").await;
        assert!(guard.claim("C1", "1.1").await);
    }
}
