//! Access-token caching.
//!
//! The completion endpoint wants a short-lived bearer credential obtained from the identity
//! endpoint.  [`TokenCache`] remembers the last credential together with the instant it stops
//! being trusted.  Fetching lives in [`Ernie::access_token`](crate::Ernie::access_token); the
//! cache only stores, answers and forgets.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};

use time::{Duration, OffsetDateTime};

/// Tokens are discarded this long before the server says they expire, so a request that
/// starts just before expiry still carries a valid credential.
pub const EXPIRY_MARGIN: Duration = Duration::minutes(5);

/// Source of the current time.
pub trait Clock: Debug + Send + Sync {
    /// The current instant.
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Jump the clock to `to`.
    pub fn set(&self, to: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A bearer credential and the instant it stops being used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
    /// The credential.
    pub token: String,
    /// First instant at which the credential is considered stale.
    pub expires_at: OffsetDateTime,
}

impl AccessToken {
    /// Build a token fetched at `fetched_at` that the server says lives `expires_in` seconds.
    ///
    /// Lifetimes shorter than [`EXPIRY_MARGIN`] produce a token that is already stale.  Returns
    /// `None` when the expiry instant is not representable.
    pub fn from_grant(
        token: impl Into<String>,
        expires_in: i64,
        fetched_at: OffsetDateTime,
    ) -> Option<Self> {
        let lifetime = Duration::seconds(expires_in).checked_sub(EXPIRY_MARGIN)?;
        Some(Self {
            token: token.into(),
            expires_at: fetched_at.checked_add(lifetime)?,
        })
    }

    /// Returns true while `now` is strictly before the expiry instant.
    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// Holds at most one [`AccessToken`].
///
/// The lock is only held to read or replace the slot, never across a network exchange, so
/// concurrent misses each perform their own exchange and the last one to finish wins.
#[derive(Debug)]
pub struct TokenCache {
    slot: Mutex<Option<AccessToken>>,
    clock: Arc<dyn Clock>,
}

impl TokenCache {
    /// An empty cache on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// An empty cache on the provided clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Mutex::new(None),
            clock,
        }
    }

    /// The current time according to this cache's clock.
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// The cached credential, if one is present and still fresh.
    pub fn get(&self) -> Option<String> {
        let now = self.now();
        self.lock()
            .as_ref()
            .filter(|token| token.is_fresh(now))
            .map(|token| token.token.clone())
    }

    /// Cache a freshly granted credential and return it.
    ///
    /// A lifetime whose expiry instant is out of range leaves the cache untouched and returns
    /// `None`.
    pub fn store(&self, token: impl Into<String>, expires_in: i64) -> Option<String> {
        let token = AccessToken::from_grant(token, expires_in, self.now())?;
        let value = token.token.clone();
        *self.lock() = Some(token);
        Some(value)
    }

    /// The raw cached entry, fresh or not.
    pub fn peek(&self) -> Option<AccessToken> {
        self.lock().clone()
    }

    /// Forget the cached credential.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<AccessToken>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn cache_at(start: OffsetDateTime) -> (Arc<ManualClock>, TokenCache) {
        let clock = Arc::new(ManualClock::new(start));
        let cache = TokenCache::with_clock(clock.clone());
        (clock, cache)
    }

    #[test]
    fn empty_cache_misses() {
        let (_, cache) = cache_at(datetime!(2024-01-01 0:00 UTC));
        assert!(cache.get().is_none());
        assert!(cache.peek().is_none());
    }

    #[test]
    fn expiry_subtracts_margin() {
        let token = AccessToken::from_grant("t", 3600, datetime!(2024-01-01 0:00 UTC)).unwrap();
        assert_eq!(token.expires_at, datetime!(2024-01-01 0:55 UTC));
    }

    #[test]
    fn out_of_range_lifetime_is_rejected() {
        let now = datetime!(2024-01-01 0:00 UTC);
        assert!(AccessToken::from_grant("t", i64::MAX, now).is_none());
        assert!(AccessToken::from_grant("t", i64::MIN, now).is_none());

        let (_, cache) = cache_at(now);
        cache.store("old", 3600);
        assert!(cache.store("t", i64::MAX).is_none());
        assert_eq!(cache.get().as_deref(), Some("old"));
    }

    #[test]
    fn fresh_until_margin() {
        let (clock, cache) = cache_at(datetime!(2024-01-01 0:00 UTC));
        assert_eq!(cache.store("t", 3600).as_deref(), Some("t"));

        clock.advance(Duration::seconds(3299));
        assert_eq!(cache.get().as_deref(), Some("t"));

        clock.advance(Duration::seconds(1));
        assert!(cache.get().is_none());
        assert!(cache.peek().is_some());
    }

    #[test]
    fn short_lifetime_is_never_fresh() {
        let (_, cache) = cache_at(datetime!(2024-01-01 0:00 UTC));
        cache.store("t", 120);
        assert!(cache.get().is_none());
    }

    #[test]
    fn invalidate_forgets() {
        let (_, cache) = cache_at(datetime!(2024-01-01 0:00 UTC));
        cache.store("t", 3600);
        cache.invalidate();
        assert!(cache.get().is_none());
        assert!(cache.peek().is_none());
    }

    #[test]
    fn store_replaces() {
        let (clock, cache) = cache_at(datetime!(2024-01-01 0:00 UTC));
        cache.store("old", 3600);
        clock.set(datetime!(2024-01-01 2:00 UTC));
        cache.store("new", 3600);
        assert_eq!(cache.get().as_deref(), Some("new"));
    }
}
