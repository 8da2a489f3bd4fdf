use std::time::Duration;

use tokio::time::Instant;

/// Wait budget left after `waited` of a `timeout` has been spent.
///
/// The budget is derived from the total time waited since the send, so
/// successive calls never increase it and it reaches zero once `waited`
/// passes `timeout`, however many wake-ups happen in between.
pub fn remaining_budget(timeout: Duration, waited: Duration) -> Duration {
    timeout.saturating_sub(waited)
}

/// Sleep needed to keep one probe per `interval` after a probe that took
/// `rtt` (`None` for a lost probe).
pub fn pacing_delay(interval: Duration, rtt: Option<Duration>) -> Duration {
    interval.saturating_sub(rtt.unwrap_or_default())
}

/// Decides when a session stops and how long to pause between probes, on the
/// monotonic clock.
#[derive(Debug, Clone)]
pub struct Scheduler {
    started: Instant,
    interval: Duration,
    count: Option<u64>,
    deadline: Option<Duration>,
}

impl Scheduler {
    pub fn new(
        interval: Duration,
        count: Option<u64>,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            started: Instant::now(),
            interval,
            count,
            deadline,
        }
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Seconds from the session start to `at`.
    pub fn offset_secs(&self, at: Instant) -> f64 {
        at.saturating_duration_since(self.started).as_secs_f64()
    }

    /// True once `sequence` probes have been made or the deadline has passed.
    pub fn is_done(&self, sequence: u64) -> bool {
        let count_reached = self.count.is_some_and(|count| sequence >= count);
        let deadline_passed =
            self.deadline.is_some_and(|deadline| self.elapsed() >= deadline);
        count_reached || deadline_passed
    }

    /// Sleeps for the rest of the pacing interval.
    pub async fn tick(&self, rtt: Option<Duration>) {
        let delay = pacing_delay(self.interval, rtt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn budget_shrinks_monotonically_to_zero() {
        let timeout = Duration::from_millis(3000);
        let mut last = timeout;
        let mut waited = Duration::ZERO;
        // A steady stream of foreign packets waking the wait every 7 ms.
        while !remaining_budget(timeout, waited).is_zero() {
            waited += Duration::from_millis(7);
            let budget = remaining_budget(timeout, waited);
            assert!(budget <= last);
            last = budget;
        }
        assert!(waited >= timeout);
        assert_eq!(remaining_budget(timeout, waited * 2), Duration::ZERO);
    }

    #[test]
    fn pacing_subtracts_rtt() {
        let interval = Duration::from_millis(1000);
        assert_eq!(
            pacing_delay(interval, Some(Duration::from_millis(120))),
            Duration::from_millis(880)
        );
        assert_eq!(pacing_delay(interval, None), interval);
        assert_eq!(
            pacing_delay(interval, Some(Duration::from_secs(2))),
            Duration::ZERO
        );
    }

    #[tokio::test(start_paused = true)]
    async fn count_and_deadline() {
        let by_count = Scheduler::new(Duration::from_secs(1), Some(3), None);
        assert!(!by_count.is_done(2));
        assert!(by_count.is_done(3));

        let forever = Scheduler::new(Duration::from_secs(1), None, None);
        assert!(!forever.is_done(u64::MAX));

        let by_deadline =
            Scheduler::new(Duration::from_secs(1), None, Some(Duration::from_secs(5)));
        assert!(!by_deadline.is_done(1));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(by_deadline.is_done(1));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_sleeps_for_remainder() {
        let scheduler = Scheduler::new(Duration::from_millis(1000), None, None);
        let before = Instant::now();
        scheduler.tick(Some(Duration::from_millis(250))).await;
        let slept = before.elapsed();
        assert!(slept >= Duration::from_millis(750));
        assert!(slept < Duration::from_millis(760));
    }
}
