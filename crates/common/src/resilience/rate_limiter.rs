//! Sliding-window rate limiting keyed by endpoint
//!
//! Each key gets its own window: a queue of admission instants plus an
//! adaptive backoff delay. A caller is admitted only when fewer than
//! `max_requests` admissions fall inside the trailing window. When a remote
//! service signals throttling, [`RateLimiter::handle_rate_limit_error`]
//! doubles the key's backoff (bounded by `max_backoff`), and
//! [`RateLimiter::record_success`] clears it again.
//!
//! Callers for the same key are serialized through a per-key async mutex, so
//! two concurrent callers can never both observe a free slot and double-count
//! it. Different keys never contend with each other.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Smallest wait handed to the timer while the window is full.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Errors raised while validating limiter configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitConfigError {
    #[error("max_requests must be greater than 0")]
    ZeroRequests,

    #[error("window must be greater than zero")]
    ZeroWindow,

    #[error("backoff_seed must be greater than zero")]
    ZeroBackoffSeed,

    #[error("max_backoff ({max_backoff:?}) must be at least backoff_seed ({backoff_seed:?})")]
    BackoffCapTooSmall { backoff_seed: Duration, max_backoff: Duration },
}

/// Request budget for a single key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimit {
    /// Maximum admissions inside any trailing `window`
    pub max_requests: u32,
    /// Length of the sliding window
    pub window: Duration,
    /// Burst ceiling advertised by the remote service. Informational only.
    pub burst_limit: Option<u32>,
}

impl WindowLimit {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window, burst_limit: None }
    }

    #[must_use]
    pub const fn with_burst(mut self, burst_limit: u32) -> Self {
        self.burst_limit = Some(burst_limit);
        self
    }

    pub fn validate(&self) -> Result<(), RateLimitConfigError> {
        if self.max_requests == 0 {
            return Err(RateLimitConfigError::ZeroRequests);
        }
        if self.window.is_zero() {
            return Err(RateLimitConfigError::ZeroWindow);
        }
        Ok(())
    }
}

impl Default for WindowLimit {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

/// Configuration for [`RateLimiter`]
#[derive(Debug, Clone)]
pub struct RateLimiterConfig<K> {
    /// Budget applied to keys without an explicit entry
    pub default_limit: WindowLimit,
    /// Per-key budgets
    pub limits: HashMap<K, WindowLimit>,
    /// Extra wait added on top of the computed time until a slot frees up
    pub safety_margin: Duration,
    /// First backoff step; each throttling signal doubles the current value
    pub backoff_seed: Duration,
    /// Upper bound for the adaptive backoff
    pub max_backoff: Duration,
}

impl<K> Default for RateLimiterConfig<K> {
    fn default() -> Self {
        Self {
            default_limit: WindowLimit::default(),
            limits: HashMap::new(),
            safety_margin: Duration::from_millis(100),
            backoff_seed: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
        }
    }
}

impl<K: Eq + Hash> RateLimiterConfig<K> {
    pub fn builder() -> RateLimiterConfigBuilder<K> {
        RateLimiterConfigBuilder::new()
    }

    /// Validate every window plus the backoff bounds
    pub fn validate(&self) -> Result<(), RateLimitConfigError> {
        self.default_limit.validate()?;
        for limit in self.limits.values() {
            limit.validate()?;
        }
        if self.backoff_seed.is_zero() {
            return Err(RateLimitConfigError::ZeroBackoffSeed);
        }
        if self.max_backoff < self.backoff_seed {
            return Err(RateLimitConfigError::BackoffCapTooSmall {
                backoff_seed: self.backoff_seed,
                max_backoff: self.max_backoff,
            });
        }
        Ok(())
    }

    /// Budget for `key`, falling back to the default window.
    pub fn limit_for(&self, key: &K) -> WindowLimit {
        self.limits.get(key).copied().unwrap_or(self.default_limit)
    }
}

/// Builder for `RateLimiterConfig`
#[derive(Debug)]
pub struct RateLimiterConfigBuilder<K> {
    config: RateLimiterConfig<K>,
}

impl<K: Eq + Hash> Default for RateLimiterConfigBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> RateLimiterConfigBuilder<K> {
    pub fn new() -> Self {
        Self { config: RateLimiterConfig::default() }
    }

    pub fn default_limit(mut self, limit: WindowLimit) -> Self {
        self.config.default_limit = limit;
        self
    }

    pub fn limit(mut self, key: K, limit: WindowLimit) -> Self {
        self.config.limits.insert(key, limit);
        self
    }

    pub fn limits(mut self, limits: impl IntoIterator<Item = (K, WindowLimit)>) -> Self {
        self.config.limits.extend(limits);
        self
    }

    pub fn safety_margin(mut self, margin: Duration) -> Self {
        self.config.safety_margin = margin;
        self
    }

    pub fn backoff_seed(mut self, seed: Duration) -> Self {
        self.config.backoff_seed = seed;
        self
    }

    pub fn max_backoff(mut self, cap: Duration) -> Self {
        self.config.max_backoff = cap;
        self
    }

    pub fn build(self) -> Result<RateLimiterConfig<K>, RateLimitConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Point-in-time view of one key's window
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitUsage {
    pub current_requests: usize,
    pub max_requests: u32,
    pub window: Duration,
    pub burst_limit: Option<u32>,
    pub usage_percentage: f64,
    pub backoff: Duration,
}

#[derive(Debug)]
struct EndpointWindow {
    limit: WindowLimit,
    history: VecDeque<Instant>,
    backoff: Duration,
}

impl EndpointWindow {
    fn new(limit: WindowLimit) -> Self {
        Self {
            limit,
            history: VecDeque::with_capacity(limit.max_requests as usize),
            backoff: Duration::ZERO,
        }
    }

    /// Drop admissions older than the window.
    fn evict_expired(&mut self, now: Instant) {
        while let Some(oldest) = self.history.front() {
            if now.saturating_duration_since(*oldest) > self.limit.window {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    fn in_window(&self, now: Instant) -> usize {
        self.history
            .iter()
            .filter(|admitted| now.saturating_duration_since(**admitted) <= self.limit.window)
            .count()
    }

    fn is_full(&self) -> bool {
        self.history.len() >= self.limit.max_requests as usize
    }

    /// Time until the oldest admission leaves the window, plus the margin.
    fn wait_for_slot(&self, now: Instant, margin: Duration) -> Duration {
        let until_free = self.history.front().map_or(Duration::ZERO, |oldest| {
            (*oldest + self.limit.window).saturating_duration_since(now)
        });
        (until_free + margin).max(MIN_WAIT)
    }
}

/// Sliding-window rate limiter with adaptive backoff
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use orderflow_common::resilience::{RateLimiter, RateLimiterConfig, WindowLimit};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RateLimiterConfig::builder()
///     .limit("orders", WindowLimit::new(6, Duration::from_secs(60)))
///     .build()?;
/// let limiter = RateLimiter::new(config)?;
///
/// limiter.acquire(&"orders").await;
/// // ... perform the call ...
/// limiter.record_success(&"orders").await;
/// # Ok(())
/// # }
/// ```
pub struct RateLimiter<K> {
    config: RateLimiterConfig<K>,
    windows: DashMap<K, Arc<Mutex<EndpointWindow>>>,
}

impl<K> fmt::Debug for RateLimiter<K>
where
    K: Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("tracked_keys", &self.windows.len())
            .finish()
    }
}

impl<K> RateLimiter<K>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync,
{
    /// Create a limiter after validating `config`.
    pub fn new(config: RateLimiterConfig<K>) -> Result<Self, RateLimitConfigError> {
        config.validate()?;
        Ok(Self { config, windows: DashMap::new() })
    }

    pub fn config(&self) -> &RateLimiterConfig<K> {
        &self.config
    }

    fn window(&self, key: &K) -> Arc<Mutex<EndpointWindow>> {
        let entry = self.windows.entry(key.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(EndpointWindow::new(self.config.limit_for(key))))
        });
        Arc::clone(entry.value())
    }

    /// Wait until a request to `key` is allowed, then record the admission.
    ///
    /// Any elevated backoff for the key is slept first. Same-key callers
    /// queue behind each other; the admission is recorded before the lock
    /// is released.
    pub async fn acquire(&self, key: &K) {
        let window = self.window(key);
        let mut window = window.lock().await;

        if !window.backoff.is_zero() {
            debug!(
                endpoint = ?key,
                backoff_ms = window.backoff.as_millis() as u64,
                "Applying elevated backoff before admission"
            );
            sleep(window.backoff).await;
        }

        window.evict_expired(Instant::now());
        while window.is_full() {
            let wait = window.wait_for_slot(Instant::now(), self.config.safety_margin);
            info!(
                endpoint = ?key,
                in_window = window.history.len(),
                max_requests = window.limit.max_requests,
                wait_ms = wait.as_millis() as u64,
                "Rate limit window full, waiting"
            );
            sleep(wait).await;
            window.evict_expired(Instant::now());
        }

        window.history.push_back(Instant::now());
    }

    /// React to a throttling response from the remote service.
    ///
    /// With a `retry_after` hint the limiter sleeps exactly that long and
    /// leaves the stored backoff alone. Without one, the stored backoff is
    /// doubled (seeded from `backoff_seed`, capped at `max_backoff`) and
    /// slept. Returns the delay that was applied.
    pub async fn handle_rate_limit_error(
        &self,
        key: &K,
        retry_after: Option<Duration>,
    ) -> Duration {
        let delay = match retry_after {
            Some(hint) => hint,
            None => {
                let window = self.window(key);
                let mut window = window.lock().await;
                let current =
                    if window.backoff.is_zero() { self.config.backoff_seed } else { window.backoff };
                window.backoff = current.saturating_mul(2).min(self.config.max_backoff);
                window.backoff
            }
        };

        warn!(
            endpoint = ?key,
            delay_ms = delay.as_millis() as u64,
            server_hint = retry_after.is_some(),
            "Throttled by remote service, backing off"
        );
        sleep(delay).await;
        delay
    }

    /// Reset the key's adaptive backoff after a successful call.
    pub async fn record_success(&self, key: &K) {
        let window = self.window(key);
        let mut window = window.lock().await;
        if !window.backoff.is_zero() {
            debug!(endpoint = ?key, "Clearing backoff after successful call");
            window.backoff = Duration::ZERO;
        }
    }

    /// Current adaptive backoff for `key` (zero when not elevated).
    pub async fn current_backoff(&self, key: &K) -> Duration {
        let window = self.window(key);
        let window = window.lock().await;
        window.backoff
    }

    /// Read-only usage report. Admissions outside the window are not
    /// counted, but nothing is evicted.
    pub async fn get_current_usage(&self, key: &K) -> RateLimitUsage {
        let window = self.window(key);
        let window = window.lock().await;
        let current_requests = window.in_window(Instant::now());
        let max_requests = window.limit.max_requests;

        RateLimitUsage {
            current_requests,
            max_requests,
            window: window.limit.window,
            burst_limit: window.limit.burst_limit,
            usage_percentage: current_requests as f64 / f64::from(max_requests) * 100.0,
            backoff: window.backoff,
        }
    }

    /// Sleep for one full window (plus a second), then forget all admissions
    /// and any backoff for `key`.
    pub async fn wait_for_quota_reset(&self, key: &K) {
        let window = self.window(key);
        let mut window = window.lock().await;
        let wait = window.limit.window + Duration::from_secs(1);
        info!(endpoint = ?key, wait_secs = wait.as_secs(), "Waiting for full quota reset");
        sleep(wait).await;
        window.history.clear();
        window.backoff = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the sliding-window limiter
    //!
    //! All tests run on a paused tokio clock, so waits are observed as exact
    //! virtual-time deltas.

    use std::sync::Arc;

    use super::*;

    fn limiter(limit: WindowLimit) -> RateLimiter<&'static str> {
        let config = RateLimiterConfig::builder()
            .limit("orders", limit)
            .build()
            .expect("valid limiter config");
        RateLimiter::new(config).expect("limiter")
    }

    /// Validates `RateLimiter::acquire` behavior for the empty history
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms no virtual time passes before admission.
    /// - Confirms the admission is counted in the usage report.
    #[tokio::test(start_paused = true)]
    async fn test_acquire_with_empty_history_is_immediate() {
        let limiter = limiter(WindowLimit::new(6, Duration::from_secs(60)));
        let start = Instant::now();

        limiter.acquire(&"orders").await;

        assert_eq!(Instant::now(), start);
        assert_eq!(limiter.get_current_usage(&"orders").await.current_requests, 1);
    }

    /// Validates `RateLimiter::acquire` behavior for the full window
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the first `max_requests` calls pass without waiting.
    /// - Confirms the next call waits for the oldest admission to expire plus
    ///   the safety margin.
    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_oldest_admission_to_expire() {
        let limiter = limiter(WindowLimit::new(3, Duration::from_secs(10)));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire(&"orders").await;
        }
        assert_eq!(Instant::now(), start);

        limiter.acquire(&"orders").await;
        let waited = Instant::now() - start;

        assert!(waited >= Duration::from_millis(10_100), "waited {waited:?}");
        assert!(waited < Duration::from_secs(11), "waited {waited:?}");
    }

    /// Validates the sliding-window ceiling across many admissions.
    ///
    /// Assertions:
    /// - Ensures any `max_requests + 1` consecutive admissions span more
    ///   than one window.
    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_ceiling_within_any_window() {
        let window = Duration::from_secs(1);
        let limiter = limiter(WindowLimit::new(3, window));
        let mut admitted = Vec::new();

        for _ in 0..12 {
            limiter.acquire(&"orders").await;
            admitted.push(Instant::now());
        }

        for pair in admitted.windows(4) {
            assert!(pair[3] - pair[0] > window, "4 admissions inside {window:?}");
        }
    }

    /// Validates `RateLimiter::handle_rate_limit_error` behavior for the
    /// repeated throttling scenario.
    ///
    /// Assertions:
    /// - Confirms the backoff after `n` signals equals `min(seed * 2^n, cap)`.
    /// - Confirms each call sleeps for the returned delay.
    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_and_caps() {
        let config = RateLimiterConfig::builder()
            .backoff_seed(Duration::from_secs(1))
            .max_backoff(Duration::from_secs(10))
            .build()
            .expect("valid config");
        let limiter = RateLimiter::new(config).expect("limiter");

        let expected = [2, 4, 8, 10, 10];
        for secs in expected {
            let before = Instant::now();
            let delay = limiter.handle_rate_limit_error(&"orders", None).await;
            assert_eq!(delay, Duration::from_secs(secs));
            assert_eq!(Instant::now() - before, delay);
            assert_eq!(limiter.current_backoff(&"orders").await, delay);
        }
    }

    /// Validates `RateLimiter::handle_rate_limit_error` behavior when the
    /// server supplies a retry-after hint.
    ///
    /// Assertions:
    /// - Confirms the hint is slept verbatim.
    /// - Confirms the stored backoff is not modified.
    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_overrides_backoff() {
        let limiter = limiter(WindowLimit::default());

        let delay =
            limiter.handle_rate_limit_error(&"orders", Some(Duration::from_secs(7))).await;

        assert_eq!(delay, Duration::from_secs(7));
        assert_eq!(limiter.current_backoff(&"orders").await, Duration::ZERO);
    }

    /// Validates `RateLimiter::record_success` behavior after throttling.
    ///
    /// Assertions:
    /// - Confirms an elevated backoff delays the next admission.
    /// - Confirms success resets the backoff so later admissions are
    ///   immediate.
    #[tokio::test(start_paused = true)]
    async fn test_success_resets_backoff() {
        let limiter = limiter(WindowLimit::new(100, Duration::from_secs(60)));
        limiter.handle_rate_limit_error(&"orders", None).await;

        let before = Instant::now();
        limiter.acquire(&"orders").await;
        assert_eq!(Instant::now() - before, Duration::from_secs(2));

        limiter.record_success(&"orders").await;
        assert_eq!(limiter.current_backoff(&"orders").await, Duration::ZERO);

        let before = Instant::now();
        limiter.acquire(&"orders").await;
        assert_eq!(Instant::now(), before);
    }

    /// Validates that distinct keys never block each other.
    ///
    /// Assertions:
    /// - Confirms a second key is admitted immediately while the first key
    ///   is waiting on a full window.
    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let config = RateLimiterConfig::builder()
            .limit("orders", WindowLimit::new(1, Duration::from_secs(60)))
            .limit("items", WindowLimit::new(1, Duration::from_secs(60)))
            .build()
            .expect("valid config");
        let limiter = Arc::new(RateLimiter::new(config).expect("limiter"));
        limiter.acquire(&"orders").await;

        let blocked = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire(&"orders").await })
        };
        tokio::task::yield_now().await;

        let before = Instant::now();
        limiter.acquire(&"items").await;
        assert_eq!(Instant::now(), before);

        blocked.await.expect("blocked acquire completes");
        assert!(Instant::now() - before >= Duration::from_secs(60));
    }

    /// Validates concurrent admission on a single key.
    ///
    /// Assertions:
    /// - Confirms concurrent callers consume distinct slots.
    /// - Confirms the extra caller is held back until the window rolls.
    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_do_not_double_count() {
        let limiter = Arc::new(limiter(WindowLimit::new(5, Duration::from_secs(30))));
        let start = Instant::now();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire(&"orders").await;
                    Instant::now()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.expect("acquire task"));
        }
        finished.sort();

        assert!(finished[..5].iter().all(|at| *at == start));
        assert!(finished[5] - start >= Duration::from_secs(30));
    }

    /// Validates `RateLimiter::get_current_usage` for unknown keys and stale
    /// admissions.
    ///
    /// Assertions:
    /// - Confirms unknown keys report the default window.
    /// - Confirms admissions older than the window are not counted.
    #[tokio::test(start_paused = true)]
    async fn test_usage_reports_default_window_and_ignores_stale_entries() {
        let limiter = limiter(WindowLimit::new(6, Duration::from_secs(60)));

        let usage = limiter.get_current_usage(&"unknown").await;
        assert_eq!(usage.max_requests, 100);
        assert_eq!(usage.window, Duration::from_secs(60));

        limiter.acquire(&"orders").await;
        limiter.acquire(&"orders").await;
        let usage = limiter.get_current_usage(&"orders").await;
        assert_eq!(usage.current_requests, 2);
        assert!((usage.usage_percentage - 100.0 / 3.0).abs() < 1e-9);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(limiter.get_current_usage(&"orders").await.current_requests, 0);
    }

    /// Validates `RateLimiter::wait_for_quota_reset` behavior.
    ///
    /// Assertions:
    /// - Confirms the wait lasts one window plus a second.
    /// - Confirms the history is cleared afterwards.
    #[tokio::test(start_paused = true)]
    async fn test_wait_for_quota_reset_clears_history() {
        let limiter = limiter(WindowLimit::new(2, Duration::from_secs(10)));
        limiter.acquire(&"orders").await;
        limiter.acquire(&"orders").await;

        let before = Instant::now();
        limiter.wait_for_quota_reset(&"orders").await;

        assert_eq!(Instant::now() - before, Duration::from_secs(11));
        assert_eq!(limiter.get_current_usage(&"orders").await.current_requests, 0);
    }

    /// Validates `RateLimiterConfig::validate` rejects unusable settings.
    ///
    /// Assertions:
    /// - Confirms zero request budgets are rejected.
    /// - Confirms a backoff cap below the seed is rejected.
    #[test]
    fn test_config_validation() {
        let zero = RateLimiterConfig::builder()
            .limit("orders", WindowLimit::new(0, Duration::from_secs(1)))
            .build();
        assert_eq!(zero.unwrap_err(), RateLimitConfigError::ZeroRequests);

        let cap = RateLimiterConfig::<&str>::builder()
            .backoff_seed(Duration::from_secs(5))
            .max_backoff(Duration::from_secs(1))
            .build();
        assert!(matches!(cap, Err(RateLimitConfigError::BackoffCapTooSmall { .. })));
    }
}
