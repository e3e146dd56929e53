use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use exam_core::model::ExamSettings;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Result of advancing the countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Untimed exam, or the timer was already stopped or fired.
    Idle,
    Running { remaining_seconds: u64 },
    /// Time ran out on this tick. Reported once.
    Expired,
}

/// Countdown state for a timed exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimer {
    remaining_seconds: Option<u64>,
    stopped: bool,
}

impl SessionTimer {
    /// A duration of zero minutes means no time limit.
    #[must_use]
    pub fn new(duration_minutes: Option<u32>) -> Self {
        Self {
            remaining_seconds: duration_minutes
                .filter(|minutes| *minutes > 0)
                .map(|minutes| u64::from(minutes) * 60),
            stopped: false,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &ExamSettings) -> Self {
        Self::new(settings.duration_minutes())
    }

    /// `None` for an untimed exam.
    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u64> {
        self.remaining_seconds
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.remaining_seconds.is_some()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.stopped && self.remaining_seconds.is_some_and(|s| s > 0)
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.stopped {
            return TickOutcome::Idle;
        }
        let Some(remaining) = self.remaining_seconds.as_mut() else {
            return TickOutcome::Idle;
        };
        if *remaining == 0 {
            return TickOutcome::Idle;
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.stopped = true;
            return TickOutcome::Expired;
        }
        TickOutcome::Running {
            remaining_seconds: *remaining,
        }
    }

    /// Stop counting. Later ticks are ignored.
    pub fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Background task emitting one message per second until dropped.
#[derive(Debug)]
pub struct Countdown {
    handle: JoinHandle<()>,
}

impl Countdown {
    /// Spawn the ticking task on the current tokio runtime.
    ///
    /// The first tick arrives one `period` after the call.
    #[must_use]
    pub fn start(period: Duration) -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        (Self { handle }, rx)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_minute_expires_once_after_sixty_ticks() {
        let mut timer = SessionTimer::new(Some(1));
        let mut expirations = 0;
        for _ in 0..59 {
            assert!(matches!(timer.tick(), TickOutcome::Running { .. }));
        }
        for _ in 0..10 {
            if timer.tick() == TickOutcome::Expired {
                expirations += 1;
            }
        }
        assert_eq!(expirations, 1);
        assert_eq!(timer.remaining_seconds(), Some(0));
    }

    #[test]
    fn untimed_ticks_are_noops() {
        let mut timer = SessionTimer::new(None);
        assert_eq!(timer.tick(), TickOutcome::Idle);
        assert_eq!(timer.remaining_seconds(), None);
        assert!(!timer.is_running());
    }

    #[test]
    fn zero_minutes_is_untimed() {
        let mut timer = SessionTimer::new(Some(0));
        assert!(!timer.is_timed());
        assert_eq!(timer.tick(), TickOutcome::Idle);
    }

    #[test]
    fn stopped_timer_ignores_ticks() {
        let mut timer = SessionTimer::new(Some(2));
        timer.tick();
        timer.stop();
        assert_eq!(timer.tick(), TickOutcome::Idle);
        assert_eq!(timer.remaining_seconds(), Some(119));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_every_period() {
        let (countdown, mut ticks) = Countdown::start(TICK_PERIOD);
        for _ in 0..3 {
            assert_eq!(ticks.recv().await, Some(()));
        }
        drop(countdown);
        assert_eq!(ticks.recv().await, None);
    }
}
