#![forbid(unsafe_code)]

//! One-shot escalation timer.
//!
//! Until it fires, evaluation failures are "not ready yet". Afterwards they
//! are fatal to the watcher reading it.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::scheduler::TimerQueue;

/// Default escalation window.
pub const DEFAULT_ESCALATION_DELAY: Duration = Duration::from_millis(2000);

/// Shared flag flipped once by a deferred callback.
#[derive(Clone, Debug)]
pub struct EscalationTimer {
    fired: Rc<Cell<bool>>,
    delay: Duration,
}

impl EscalationTimer {
    /// Schedule the flip on `timers`. Cannot be cancelled or restarted.
    pub fn start(timers: &TimerQueue, delay: Duration) -> Self {
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        timers.schedule(delay, move || {
            debug!(delay_ms = delay.as_millis() as u64, "escalation window closed");
            flag.set(true);
        });
        Self { fired, delay }
    }

    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired.get()
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualClock;

    #[test]
    fn fires_once_after_delay() {
        let clock = ManualClock::new();
        let timers = TimerQueue::new(Rc::new(clock.clone()));
        let timer = EscalationTimer::start(&timers, DEFAULT_ESCALATION_DELAY);
        let reader = timer.clone();

        timers.run_due();
        assert!(!timer.has_fired());
        clock.advance(Duration::from_millis(1999));
        timers.run_due();
        assert!(!reader.has_fired());
        clock.advance(Duration::from_millis(1));
        assert_eq!(timers.run_due(), 1);
        assert!(timer.has_fired());
        assert!(reader.has_fired(), "clones share the flag");
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn zero_delay_fires_on_first_run() {
        let timers = TimerQueue::new(Rc::new(ManualClock::new()));
        let timer = EscalationTimer::start(&timers, Duration::ZERO);
        assert_eq!(timer.delay(), Duration::ZERO);
        timers.run_due();
        assert!(timer.has_fired());
    }
}
