//! Deterministic time system
//!
//! Fixed tick rate with a drift-free ticker for blocking loops.

use std::time::{Duration, Instant};

/// Default simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;

/// Simulation time tracker
pub struct SimulationTime {
    tick_count: u64,
    tick_duration: Duration,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new(rate_hz: u32) -> Self {
        Self {
            tick_count: 0,
            tick_duration: Duration::from_secs_f64(1.0 / rate_hz.max(1) as f64),
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn delta_seconds(&self) -> f32 {
        self.tick_duration.as_secs_f32()
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        self.accumulated_time += self.tick_duration;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new(TICK_RATE_HZ)
    }
}

/// Blocks a loop at a fixed period without accumulating drift.
///
/// Each `wait` sleeps until the next deadline; if the loop body overran the
/// period the deadline is re-anchored instead of trying to catch up.
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    pub fn from_hz(rate_hz: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / rate_hz.max(1) as f64))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn wait(&mut self) {
        let now = Instant::now();
        if let Some(remaining) = self.next.checked_duration_since(now) {
            std::thread::sleep(remaining);
        }
        let now = Instant::now();
        self.next += self.period;
        if self.next < now {
            // Overran by more than a period; re-anchor.
            self.next = now + self.period;
        }
    }
}
