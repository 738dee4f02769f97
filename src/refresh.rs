use std::time::Duration;

use rand::Rng;

use crate::dashboard_fetch::submit_crawl;
use crate::http_client::Transport;
use crate::pagination::fetch_page;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Submitting,
    Polling { attempt: u32, max_attempts: u32 },
    Done { period: String },
    TimedOut { period: Option<String> },
    Failed(String),
}

impl RefreshState {
    pub fn is_active(&self) -> bool {
        matches!(self, RefreshState::Submitting | RefreshState::Polling { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The latest period moved past the one seen before submitting.
    Done { from: Option<String>, to: String },
    /// Polling ran out before a new period showed up.
    TimedOut { period: Option<String> },
    Failed(String),
}

impl RefreshOutcome {
    pub fn should_reload(&self) -> bool {
        !matches!(self, RefreshOutcome::Failed(_))
    }

    pub fn final_state(&self) -> RefreshState {
        match self {
            RefreshOutcome::Done { to, .. } => RefreshState::Done { period: to.clone() },
            RefreshOutcome::TimedOut { period } => RefreshState::TimedOut {
                period: period.clone(),
            },
            RefreshOutcome::Failed(err) => RefreshState::Failed(err.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub max_attempts: u32,
    /// Fraction of each delay randomised in either direction. 0 disables.
    pub jitter: f64,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
            factor: 2.0,
            max_attempts: 6,
            jitter: 0.1,
        }
    }
}

impl RefreshPolicy {
    /// Un-jittered wait before poll `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64();
        let scaled = base * self.factor.max(1.0).powi(attempt.min(63) as i32);
        let capped = scaled.min(self.max_delay.as_secs_f64().max(base));
        Duration::from_secs_f64(capped)
    }

    /// Longest the poll loop can sleep in total, ignoring jitter.
    pub fn total_budget(&self) -> Duration {
        (0..self.max_attempts).map(|a| self.delay_for(a)).sum()
    }

    fn jittered(&self, delay: Duration, rng: &mut impl Rng) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let spread = delay.as_secs_f64() * self.jitter;
        let secs = delay.as_secs_f64() + rng.gen_range(-spread..=spread);
        Duration::from_secs_f64(secs.max(0.0))
    }
}

pub fn fetch_latest_period(api: &dyn Transport, variant: &str) -> anyhow::Result<Option<String>> {
    let page = fetch_page(api, variant, 1, 1)?;
    Ok(page
        .latest
        .or_else(|| page.records.into_iter().next())
        .map(|draw| draw.period))
}

/// Submits a re-crawl and polls the latest draw period until it changes or
/// the policy's attempts run out. `sleep` and `on_state` are injected so the
/// loop can run without a clock or a UI.
pub fn run_refresh(
    api: &dyn Transport,
    variant: &str,
    policy: &RefreshPolicy,
    mut sleep: impl FnMut(Duration),
    mut on_state: impl FnMut(RefreshState),
) -> RefreshOutcome {
    on_state(RefreshState::Submitting);

    let baseline = match fetch_latest_period(api, variant) {
        Ok(period) => period,
        Err(err) => return RefreshOutcome::Failed(format!("could not read latest period: {err:#}")),
    };

    if let Err(err) = submit_crawl(api, variant) {
        return RefreshOutcome::Failed(format!("{err:#}"));
    }

    let mut rng = rand::thread_rng();
    let mut last_seen = baseline.clone();
    for attempt in 0..policy.max_attempts {
        on_state(RefreshState::Polling {
            attempt: attempt + 1,
            max_attempts: policy.max_attempts,
        });
        sleep(policy.jittered(policy.delay_for(attempt), &mut rng));

        // A failed poll is not fatal; the next attempt may succeed.
        let Ok(observed) = fetch_latest_period(api, variant) else {
            continue;
        };
        if let Some(period) = observed.as_ref()
            && observed != baseline
        {
            return RefreshOutcome::Done {
                from: baseline,
                to: period.clone(),
            };
        }
        last_seen = observed;
    }

    RefreshOutcome::TimedOut { period: last_seen }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_then_cap() {
        let policy = RefreshPolicy {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(3000),
            factor: 2.0,
            max_attempts: 5,
            jitter: 0.0,
        };
        let delays: Vec<u128> = (0..5).map(|a| policy.delay_for(a).as_millis()).collect();
        assert_eq!(delays, vec![500, 1000, 2000, 3000, 3000]);
        assert_eq!(policy.total_budget(), Duration::from_millis(9500));
    }

    #[test]
    fn jitter_stays_within_spread() {
        let policy = RefreshPolicy {
            jitter: 0.2,
            ..RefreshPolicy::default()
        };
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let d = policy.jittered(Duration::from_millis(1000), &mut rng);
            assert!(d >= Duration::from_millis(799) && d <= Duration::from_millis(1201));
        }
    }
}
