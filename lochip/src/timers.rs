use std::time::{Duration, Instant};

use crate::TIMER_HZ;

const TICK: Duration = Duration::from_nanos(1_000_000_000 / TIMER_HZ);

/// Delay and sound timers counting down at 60 Hz of wall-clock time
#[derive(Clone, Debug, Default)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
    last_tick: Option<Instant>,
}

impl Timers {
    /// Decrement both timers once for every whole tick elapsed since the
    /// previous call. The first call only starts the clock.
    pub fn tick(&mut self, now: Instant) {
        let Some(last) = self.last_tick else {
            self.last_tick = Some(now);
            return;
        };
        let ticks = now.saturating_duration_since(last).as_nanos() / TICK.as_nanos();
        if ticks == 0 {
            return;
        }
        let steps = ticks.min(u8::MAX as u128) as u8;
        self.delay = self.delay.saturating_sub(steps);
        self.sound = self.sound.saturating_sub(steps);
        // keep the fractional remainder for the next call
        self.last_tick = Some(last + TICK * ticks.min(u32::MAX as u128) as u32);
    }
}
