//! Sliding-window request budget for upstream provider calls.
//!
//! A [`SlidingWindow`] admits at most `max_requests` events in any trailing
//! interval of `window` length. [`UpstreamBudget`] applies one window
//! either to the whole process or to each user.
//!
//! Time comes from [`tokio::time::Instant`], so tests can pause and advance
//! the clock.

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{trace, warn};

use crate::defaults;
use crate::error::{Error, Result};

pub const MSG_BUDGET_EXHAUSTED: &str = "Rate limit exceeded. Please try again later.";

/// Whether state is shared by every caller or kept per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// One instance for the whole process. A single caller can exhaust
    /// it for everyone.
    #[default]
    Shared,
    /// One instance per user id.
    PerUser,
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" | "global" | "process" => Ok(Scope::Shared),
            "per_user" | "per-user" | "user" => Ok(Scope::PerUser),
            other => Err(Error::InvalidInput(format!("Unknown scope: {}", other))),
        }
    }
}

/// Timestamps of recent admissions, oldest first.
#[derive(Debug)]
pub struct SlidingWindow {
    max_requests: usize,
    window: Duration,
    timestamps: VecDeque<Instant>,
}

impl SlidingWindow {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            timestamps: VecDeque::with_capacity(max_requests),
        }
    }

    /// Admit one event now, or fail with `RateLimited`.
    pub fn admit(&mut self) -> Result<()> {
        self.admit_at(Instant::now())
    }

    pub fn remaining(&mut self) -> usize {
        self.remaining_at(Instant::now())
    }

    /// Admit one event at `now`, or fail with `RateLimited`.
    pub fn admit_at(&mut self, now: Instant) -> Result<()> {
        self.prune(now);

        if self.timestamps.len() >= self.max_requests {
            return Err(Error::RateLimited(MSG_BUDGET_EXHAUSTED.to_string()));
        }

        self.timestamps.push_back(now);
        Ok(())
    }

    /// Admissions still available at `now`.
    pub fn remaining_at(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.max_requests.saturating_sub(self.timestamps.len())
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Drop every timestamp strictly older than `now - window`. Timestamps
    /// are appended in order, so only a prefix is ever removed.
    fn prune(&mut self, now: Instant) {
        let Some(window_start) = now.checked_sub(self.window) else {
            return;
        };
        let before = self.timestamps.len();
        while self
            .timestamps
            .front()
            .is_some_and(|&oldest| oldest < window_start)
        {
            self.timestamps.pop_front();
        }
        if before != self.timestamps.len() {
            trace!(
                component = "rate_limiter",
                op = "prune",
                dropped = before - self.timestamps.len(),
                "Pruned expired admissions"
            );
        }
    }
}

/// Configuration for [`UpstreamBudget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetConfig {
    pub max_requests: usize,
    pub window: Duration,
    pub scope: Scope,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_requests: defaults::UPSTREAM_RATE_LIMIT,
            window: Duration::from_secs(defaults::UPSTREAM_RATE_WINDOW_SECS),
            scope: Scope::Shared,
        }
    }
}

impl BudgetConfig {
    /// Read `UPSTREAM_RATE_LIMIT`, `UPSTREAM_RATE_WINDOW_SECS` and
    /// `UPSTREAM_RATE_SCOPE`, falling back to defaults.
    pub fn from_env() -> Self {
        let max_requests = std::env::var(defaults::ENV_UPSTREAM_RATE_LIMIT)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::UPSTREAM_RATE_LIMIT);
        let window_secs = std::env::var(defaults::ENV_UPSTREAM_RATE_WINDOW_SECS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::UPSTREAM_RATE_WINDOW_SECS);
        let scope = match std::env::var(defaults::ENV_UPSTREAM_RATE_SCOPE) {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring {}", defaults::ENV_UPSTREAM_RATE_SCOPE);
                Scope::Shared
            }),
            Err(_) => Scope::Shared,
        };

        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            scope,
        }
    }
}

/// Request budget consumed by every upstream provider call.
#[derive(Debug)]
pub struct UpstreamBudget {
    config: BudgetConfig,
    shared: Mutex<SlidingWindow>,
    per_user: Mutex<HashMap<String, SlidingWindow>>,
}

impl UpstreamBudget {
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            shared: Mutex::new(SlidingWindow::new(config.max_requests, config.window)),
            per_user: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Consume one unit of budget for `user_id`.
    pub fn admit(&self, user_id: &str) -> Result<()> {
        self.admit_at(user_id, Instant::now())
    }

    pub fn admit_at(&self, user_id: &str, now: Instant) -> Result<()> {
        let result = match self.config.scope {
            Scope::Shared => lock(&self.shared).admit_at(now),
            Scope::PerUser => {
                let mut windows = lock(&self.per_user);
                // Windows that emptied out are dropped so idle users do not
                // accumulate.
                windows.retain(|_, w| w.remaining_at(now) < self.config.max_requests);
                windows
                    .entry(user_id.to_string())
                    .or_insert_with(|| {
                        SlidingWindow::new(self.config.max_requests, self.config.window)
                    })
                    .admit_at(now)
            }
        };

        if result.is_err() {
            warn!(
                component = "rate_limiter",
                op = "admit",
                user_id = %user_id,
                max_requests = self.config.max_requests,
                window_secs = self.config.window.as_secs(),
                "Upstream budget exhausted"
            );
        }
        result
    }

    /// Units left for `user_id` right now.
    pub fn remaining(&self, user_id: &str) -> usize {
        let now = Instant::now();
        match self.config.scope {
            Scope::Shared => lock(&self.shared).remaining_at(now),
            Scope::PerUser => lock(&self.per_user)
                .get_mut(user_id)
                .map(|w| w.remaining_at(now))
                .unwrap_or(self.config.max_requests),
        }
    }
}

/// A poisoned lock only means another thread panicked mid-admission; the
/// timestamp queue is still well-formed, so keep using it.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn window() -> SlidingWindow {
        SlidingWindow::new(60, Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_sixty_rejects_sixty_first() {
        let mut w = window();
        let now = Instant::now();
        for _ in 0..60 {
            w.admit_at(now).unwrap();
        }
        let err = w.admit_at(now).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_restored_after_window() {
        let mut w = window();
        let start = Instant::now();
        for _ in 0..60 {
            w.admit_at(start).unwrap();
        }
        assert!(w.admit_at(start + Duration::from_secs(30)).is_err());

        // Exactly one window later the old entries are not yet strictly older.
        assert!(w.admit_at(start + Duration::from_secs(60)).is_err());

        let later = start + Duration::from_secs(60) + Duration::from_millis(1);
        w.admit_at(later).unwrap();
        assert_eq!(w.remaining_at(later), 59);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spread_admissions_roll_off_individually() {
        let mut w = SlidingWindow::new(2, Duration::from_secs(10));
        let t0 = Instant::now();
        w.admit_at(t0).unwrap();
        w.admit_at(t0 + Duration::from_secs(5)).unwrap();
        assert!(w.admit_at(t0 + Duration::from_secs(9)).is_err());
        // t0 falls out, the t0+5 entry stays.
        w.admit_at(t0 + Duration::from_secs(11)).unwrap();
        assert!(w.admit_at(t0 + Duration::from_secs(12)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_does_not_consume_budget() {
        let mut w = SlidingWindow::new(1, Duration::from_secs(10));
        let t0 = Instant::now();
        w.admit_at(t0).unwrap();
        for _ in 0..5 {
            assert!(w.admit_at(t0 + Duration::from_secs(1)).is_err());
        }
        w.admit_at(t0 + Duration::from_secs(11)).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_admit_uses_tokio_clock() {
        let mut w = SlidingWindow::new(1, Duration::from_secs(5));
        w.admit().unwrap();
        assert_eq!(w.remaining(), 0);
        assert!(w.admit().is_err());
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(w.remaining(), 1);
        w.admit().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_budget_is_process_wide() {
        let budget = UpstreamBudget::new(BudgetConfig {
            max_requests: 2,
            window: Duration::from_secs(60),
            scope: Scope::Shared,
        });
        budget.admit("alice").unwrap();
        budget.admit("alice").unwrap();
        assert!(budget.admit("bob").is_err());
        assert_eq!(budget.remaining("bob"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_user_budget_isolates_users() {
        let budget = UpstreamBudget::new(BudgetConfig {
            max_requests: 2,
            window: Duration::from_secs(60),
            scope: Scope::PerUser,
        });
        budget.admit("alice").unwrap();
        budget.admit("alice").unwrap();
        assert!(budget.admit("alice").is_err());
        budget.admit("bob").unwrap();
        assert_eq!(budget.remaining("bob"), 1);
        assert_eq!(budget.remaining("carol"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_recovers_with_real_clock_advance() {
        let budget = UpstreamBudget::new(BudgetConfig {
            max_requests: 1,
            window: Duration::from_secs(60),
            scope: Scope::Shared,
        });
        budget.admit("u").unwrap();
        assert!(budget.admit("u").is_err());
        tokio::time::advance(Duration::from_secs(61)).await;
        budget.admit("u").unwrap();
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("shared".parse::<Scope>().unwrap(), Scope::Shared);
        assert_eq!("PER_USER".parse::<Scope>().unwrap(), Scope::PerUser);
        assert!("sometimes".parse::<Scope>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = BudgetConfig::default();
        assert_eq!(config.max_requests, 60);
        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.scope, Scope::Shared);
    }
}
