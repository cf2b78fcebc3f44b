use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TimerEvent {
    Tick,
    Jitter,
}

struct SessionTimers {
    tick: Interval,
    jitter: Interval,
}

/// Owns the navigation tick and the jitter timer of one session.
///
/// Timers only exist between `start()` and `stop()`. A stopped scheduler
/// never yields, so no timer of a finished session can fire afterwards.
pub struct TickScheduler {
    tick_period: Duration,
    jitter_period: Duration,
    timers: Option<SessionTimers>,
}

impl TickScheduler {
    pub fn new(tick_period: Duration, jitter_period: Duration) -> Self {
        Self { tick_period, jitter_period, timers: None }
    }

    pub fn is_running(&self) -> bool { self.timers.is_some() }

    /// Replaces any running timers with fresh ones. The first event of each
    /// timer fires one full period after this call.
    pub fn start(&mut self) {
        let now = Instant::now();
        let mut tick = interval_at(now + self.tick_period, self.tick_period);
        let mut jitter = interval_at(now + self.jitter_period, self.jitter_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        jitter.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timers = Some(SessionTimers { tick, jitter });
    }

    pub fn stop(&mut self) { self.timers = None; }

    /// Waits for the next timer event. Pends forever while stopped.
    pub async fn next_event(&mut self) -> TimerEvent {
        let Some(timers) = self.timers.as_mut() else {
            return std::future::pending().await;
        };
        tokio::select! {
            biased;
            _ = timers.tick.tick() => TimerEvent::Tick,
            _ = timers.jitter.tick() => TimerEvent::Jitter,
        }
    }
}
