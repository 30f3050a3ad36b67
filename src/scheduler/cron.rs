use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, TimeZone, Timelike};

/// First instant strictly after `after` that falls on a whole minute divisible by `step_minutes`,
/// i.e. the next firing of `*/step * * * *`.
pub fn next_boundary<Tz: TimeZone>(after: &DateTime<Tz>, step_minutes: u32) -> DateTime<Tz> {
    let step = step_minutes.max(1);
    let minute_start = after.clone()
        - TimeDelta::seconds(i64::from(after.second()))
        - TimeDelta::nanoseconds(i64::from(after.nanosecond()));
    let ahead = step - (minute_start.minute() % step);
    minute_start + TimeDelta::minutes(i64::from(ahead))
}

/// Wall-clock aligned trigger, firing every `step_minutes` on the minute.
#[derive(Debug, Clone)]
pub struct CronTrigger {
    step_minutes: u32,
    next: DateTime<Local>,
}

impl CronTrigger {
    pub fn new(step_minutes: u32) -> Self {
        Self {
            step_minutes,
            next: next_boundary(&Local::now(), step_minutes),
        }
    }

    pub fn next_fire(&self) -> DateTime<Local> {
        self.next
    }

    /// Time left until the next firing; zero when it is already due.
    pub fn remaining(&self) -> Duration {
        (self.next - Local::now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// Move on to the boundary after the one that just fired.
    /// Boundaries missed while the process was stalled are not replayed.
    pub fn advance(&mut self) {
        let from = self.next.max(Local::now());
        self.next = next_boundary(&from, self.step_minutes);
    }
}
