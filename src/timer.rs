use crate::interpreter::Machine;
use std::time::{Duration, Instant};

pub const DEFAULT_TIMER_HZ: u32 = 60;

/// Counts DT and ST down at a fixed wallclock rate, floor 0. The machine never
/// does this itself.
#[derive(Debug)]
pub struct Timers {
    period: Duration,
    last_tick: Instant,
}

impl Timers {
    pub fn new(hz: u32, now: Instant) -> Self {
        Timers {
            period: Duration::from_secs(1) / hz.max(1),
            last_tick: now,
        }
    }

    /// decrement once per whole period elapsed since the last tick; returns
    /// how many periods were consumed
    pub fn tick(&mut self, machine: &mut Machine, now: Instant) -> u32 {
        let mut ticks = 0;
        while now.saturating_duration_since(self.last_tick) >= self.period {
            self.last_tick += self.period;
            ticks += 1;
        }
        if ticks > 0 {
            let n = ticks.min(u8::MAX as u32) as u8;
            machine.dt = machine.dt.saturating_sub(n);
            machine.st = machine.st.saturating_sub(n);
        }
        ticks
    }
}
