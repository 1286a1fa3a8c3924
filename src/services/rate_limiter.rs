use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::models::ProviderKind;
use crate::services::clock::{to_std, Clock};

const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Per-provider request budgets
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Length of each fixed counting window
    pub window: Duration,
    /// Requests allowed per window; providers missing here are only bound by cooldowns
    pub limits: HashMap<ProviderKind, u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            limits: HashMap::from([
                (ProviderKind::Tmdb, 40),
                (ProviderKind::StreamingAvailability, 8),
                (ProviderKind::Watchmode, 10),
                (ProviderKind::Utelly, 5),
            ]),
        }
    }
}

/// Request budget for one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderBudget {
    pub window_start: DateTime<Utc>,
    pub count: u32,
    pub limit: Option<u32>,
    /// Set after the provider answered 429; overrides the window counter
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl ProviderBudget {
    fn new(now: DateTime<Utc>, limit: Option<u32>) -> Self {
        Self {
            window_start: now,
            count: 0,
            limit,
            cooldown_until: None,
        }
    }

    fn roll_window(&mut self, now: DateTime<Utc>, window: chrono::Duration) {
        if now - self.window_start >= window {
            self.window_start = now;
            self.count = 0;
        }
    }

    fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.cooldown_until
            .map(|until| until - now)
            .filter(|remaining| *remaining > chrono::Duration::zero())
    }

    fn is_exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.count >= limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderBudgetSnapshot {
    pub provider: ProviderKind,
    #[serde(flatten)]
    pub budget: ProviderBudget,
}

/// Fixed-window rate limiter with explicit cooldowns, shared by all resolves
///
/// The limiter never blocks; callers decide whether to skip a provider or wait
/// for `wait_time`.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    window: chrono::Duration,
    limits: HashMap<ProviderKind, u32>,
    budgets: Mutex<HashMap<ProviderKind, ProviderBudget>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let window =
            chrono::Duration::from_std(config.window).unwrap_or(chrono::Duration::seconds(1));

        Self {
            clock,
            window,
            limits: config.limits,
            budgets: Mutex::new(HashMap::new()),
        }
    }

    /// Takes one request from the provider's budget, if any is left
    pub async fn try_acquire(&self, provider: ProviderKind) -> bool {
        let now = self.clock.now();
        let mut budgets = self.budgets.lock().await;
        let budget = budgets
            .entry(provider)
            .or_insert_with(|| ProviderBudget::new(now, self.limits.get(&provider).copied()));

        if let Some(remaining) = budget.cooldown_remaining(now) {
            tracing::debug!(
                provider = %provider,
                remaining_ms = remaining.num_milliseconds(),
                "Provider in cooldown"
            );
            return false;
        }
        budget.cooldown_until = None;

        budget.roll_window(now, self.window);
        if budget.is_exhausted() {
            tracing::debug!(
                provider = %provider,
                count = budget.count,
                "Provider budget exhausted for current window"
            );
            return false;
        }

        budget.count += 1;
        true
    }

    /// Puts the provider in cooldown after it answered with a rate-limit response
    pub async fn record_rate_limited(&self, provider: ProviderKind, retry_after_seconds: u64) {
        let now = self.clock.now();
        let seconds = i64::try_from(retry_after_seconds).unwrap_or(i64::MAX);
        let until = now
            .checked_add_signed(chrono::Duration::seconds(seconds.min(i64::MAX / 1000)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut budgets = self.budgets.lock().await;
        let budget = budgets
            .entry(provider)
            .or_insert_with(|| ProviderBudget::new(now, self.limits.get(&provider).copied()));

        // A shorter hint never shortens an existing cooldown
        let until = budget.cooldown_until.map_or(until, |existing| existing.max(until));
        budget.cooldown_until = Some(until);

        tracing::warn!(
            provider = %provider,
            retry_after_seconds,
            cooldown_until = %until,
            "Provider rate limited, entering cooldown"
        );
    }

    /// Clears the window counter and any cooldown
    pub async fn reset(&self, provider: ProviderKind) {
        let now = self.clock.now();
        let mut budgets = self.budgets.lock().await;
        budgets.insert(
            provider,
            ProviderBudget::new(now, self.limits.get(&provider).copied()),
        );
    }

    /// How long until `try_acquire` could succeed; `None` if it would succeed now
    pub async fn wait_time(&self, provider: ProviderKind) -> Option<Duration> {
        let now = self.clock.now();
        let budgets = self.budgets.lock().await;
        let budget = budgets.get(&provider)?;

        let cooldown = budget.cooldown_remaining(now).map(to_std);

        let window_expired = now - budget.window_start >= self.window;
        let window = (!window_expired && budget.is_exhausted())
            .then(|| to_std(budget.window_start + self.window - now));

        match (cooldown, window) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    pub async fn cooldown_remaining(&self, provider: ProviderKind) -> Option<Duration> {
        let now = self.clock.now();
        let budgets = self.budgets.lock().await;
        budgets
            .get(&provider)
            .and_then(|b| b.cooldown_remaining(now))
            .map(to_std)
    }

    /// Current budgets, in provider priority order
    pub async fn snapshot(&self) -> Vec<ProviderBudgetSnapshot> {
        let budgets = self.budgets.lock().await;
        ProviderKind::ALL
            .iter()
            .filter_map(|provider| {
                budgets.get(provider).map(|budget| ProviderBudgetSnapshot {
                    provider: *provider,
                    budget: budget.clone(),
                })
            })
            .collect()
    }
}
