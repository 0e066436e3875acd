//! Per-tool admission control: a rolling burst window plus a calendar-day ceiling.
//!
//! `check` only reads; `record_request` is called after a successful upstream call. The two are
//! not atomic with respect to each other, so concurrent callers can overshoot the burst ceiling
//! by at most the number of in-flight calls.

use chrono::{DateTime, Days, Local, NaiveDate, TimeDelta, TimeZone as _};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BURST_LIMIT: u32 = 100;
pub const DEFAULT_BURST_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_DAILY_LIMIT: u64 = 200_000;
/// Longest accepted burst window. Longer settings are clamped.
pub const MAX_BURST_WINDOW: Duration = Duration::from_secs(86_400);

/// Source of "now". Production uses the system clock; tests drive a [`ManualClock`].
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::days(1));
        let mut now = self.now.lock();
        *now = *now + delta;
    }

    pub fn set(&self, to: DateTime<Local>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock()
    }
}

/// Admission ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    pub burst_limit: u32,
    pub burst_window: Duration,
    pub daily_limit: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            burst_limit: DEFAULT_BURST_LIMIT,
            burst_window: DEFAULT_BURST_WINDOW,
            daily_limit: DEFAULT_DAILY_LIMIT,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Denied(DenyReason),
}

impl Admission {
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The rolling window is full; capacity frees up at `retry_at`.
    Burst { retry_at: DateTime<Local> },
    /// Today's budget is spent; it resets at the next local midnight.
    Daily { resets_at: DateTime<Local> },
}

impl DenyReason {
    /// When the caller may try again.
    #[must_use]
    pub fn retry_at(&self) -> DateTime<Local> {
        match self {
            Self::Burst { retry_at } => *retry_at,
            Self::Daily { resets_at } => *resets_at,
        }
    }

    /// Whole seconds from `now` until [`DenyReason::retry_at`], rounded up, at least 1.
    #[must_use]
    pub fn retry_after_secs(&self, now: DateTime<Local>) -> u64 {
        let millis = u64::try_from((self.retry_at() - now).num_milliseconds()).unwrap_or(0);
        millis.div_ceil(1000).max(1)
    }

    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Burst { .. } => "burst",
            Self::Daily { .. } => "daily",
        }
    }
}

/// Remaining budget for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingBudget {
    pub burst: u32,
    pub daily: u64,
    pub next_burst_reset: DateTime<Local>,
    pub next_daily_reset: DateTime<Local>,
}

#[derive(Default)]
struct LimiterState {
    windows: HashMap<String, VecDeque<DateTime<Local>>>,
    daily: HashMap<(String, NaiveDate), u64>,
}

/// Shared admission limiter. One instance per process; clone the `Arc`, not the limiter.
pub struct RateLimiter {
    config: LimiterConfig,
    window: TimeDelta,
    clock: Arc<dyn Clock>,
    state: Mutex<LimiterState>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: LimiterConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(config: LimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            window: TimeDelta::from_std(config.burst_window.min(MAX_BURST_WINDOW))
                .unwrap_or(TimeDelta::days(1)),
            clock,
            state: Mutex::new(LimiterState::default()),
        }
    }

    #[must_use]
    pub fn config(&self) -> LimiterConfig {
        self.config
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    /// Would a call for `resource` be admitted right now? Never mutates state.
    #[must_use]
    pub fn can_make_request(&self, resource: &str) -> bool {
        self.check(resource).is_admitted()
    }

    /// Admission decision for `resource`, with the reason when denied. Never mutates state.
    #[must_use]
    pub fn check(&self, resource: &str) -> Admission {
        let now = self.clock.now();
        let state = self.state.lock();

        let in_window = state
            .windows
            .get(resource)
            .map(|w| self.in_window(w, now))
            .unwrap_or_default();
        if in_window.count >= u64::from(self.config.burst_limit) {
            let retry_at = in_window.oldest.map_or(now, |t| self.window_end(t));
            return Admission::Denied(DenyReason::Burst { retry_at });
        }

        let today = now.date_naive();
        let used_today = state
            .daily
            .get(&(resource.to_string(), today))
            .copied()
            .unwrap_or(0);
        if used_today >= self.config.daily_limit {
            return Admission::Denied(DenyReason::Daily {
                resets_at: next_local_midnight(now),
            });
        }

        Admission::Admitted
    }

    /// Account one completed call for `resource`.
    pub fn record_request(&self, resource: &str) {
        let now = self.clock.now();
        let cutoff = self.cutoff(now);
        let today = now.date_naive();
        let mut state = self.state.lock();

        let window = state.windows.entry(resource.to_string()).or_default();
        window.push_back(now);
        if let Some(cutoff) = cutoff {
            while window.front().is_some_and(|t| *t <= cutoff) {
                window.pop_front();
            }
        }

        *state.daily.entry((resource.to_string(), today)).or_insert(0) += 1;
        state.daily.retain(|(_, day), _| *day >= today);
    }

    /// Snapshot of what is left for `resource` in both budgets.
    #[must_use]
    pub fn remaining_requests(&self, resource: &str) -> RemainingBudget {
        let now = self.clock.now();
        let state = self.state.lock();

        let in_window = state
            .windows
            .get(resource)
            .map(|w| self.in_window(w, now))
            .unwrap_or_default();
        let used_today = state
            .daily
            .get(&(resource.to_string(), now.date_naive()))
            .copied()
            .unwrap_or(0);

        let burst_left = u64::from(self.config.burst_limit).saturating_sub(in_window.count);
        RemainingBudget {
            burst: u32::try_from(burst_left).unwrap_or(u32::MAX),
            daily: self.config.daily_limit.saturating_sub(used_today),
            next_burst_reset: in_window.oldest.map_or(now, |t| self.window_end(t)),
            next_daily_reset: next_local_midnight(now),
        }
    }

    fn in_window(&self, window: &VecDeque<DateTime<Local>>, now: DateTime<Local>) -> InWindow {
        let cutoff = self.cutoff(now);
        let mut out = InWindow::default();
        for t in window.iter().filter(|t| cutoff.is_none_or(|c| **t > c)) {
            out.count += 1;
            out.oldest = Some(out.oldest.map_or(*t, |o: DateTime<Local>| o.min(*t)));
        }
        out
    }

    /// Timestamps at or before this have left the window. `None` when it predates the calendar.
    fn cutoff(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        now.checked_sub_signed(self.window)
    }

    fn window_end(&self, t: DateTime<Local>) -> DateTime<Local> {
        t.checked_add_signed(self.window).unwrap_or(t)
    }
}

#[derive(Debug, Default)]
struct InWindow {
    count: u64,
    oldest: Option<DateTime<Local>>,
}

/// Start of the next local calendar day.
///
/// Where local midnight does not exist (DST gap) this falls back to 24 hours from `now`.
#[must_use]
pub fn next_local_midnight(now: DateTime<Local>) -> DateTime<Local> {
    now.date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        .unwrap_or_else(|| now + TimeDelta::days(1))
}
