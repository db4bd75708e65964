use chrono::{NaiveDateTime, TimeDelta};

/// An hourly simulation clock over a fixed number of steps.
///
/// The `Clock` provides methods to advance time hour-by-hour or run
/// a function at each hour until completion.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use merit_sim::sim::clock::Clock;
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1)
///     .and_then(|d| d.and_hms_opt(0, 0, 0))
///     .unwrap();
/// let mut clock = Clock::new(start, 3);
/// let mut hours = Vec::new();
///
/// clock.run(|step, _ts| hours.push(step));
/// assert_eq!(hours, vec![0, 1, 2]);
/// ```
pub struct Clock {
    /// Timestamp of step 0
    start: NaiveDateTime,
    /// Current step of the simulation
    current: usize,
    /// Total steps to run in the simulation
    total: usize,
}

impl Clock {
    /// Creates a new clock starting at `start` and running for `total` hours.
    pub fn new(start: NaiveDateTime, total: usize) -> Self {
        Self {
            start,
            current: 0,
            total,
        }
    }

    /// Advances the clock by one hour.
    ///
    /// # Returns
    ///
    /// * `Some((step, ts))` - The step number (starting from 0) and its timestamp
    /// * `None` - If the clock has reached its total steps
    pub fn tick(&mut self) -> Option<(usize, NaiveDateTime)> {
        if self.current < self.total {
            let step = self.current;
            self.current += 1;
            Some((step, self.start + TimeDelta::hours(step as i64)))
        } else {
            None
        }
    }

    /// Runs a function for each remaining hour in the clock.
    pub fn run(&mut self, mut f: impl FnMut(usize, NaiveDateTime)) {
        while let Some((step, ts)) = self.tick() {
            f(step, ts);
        }
    }
}

impl Iterator for Clock {
    type Item = (usize, NaiveDateTime);

    fn next(&mut self) -> Option<Self::Item> {
        self.tick()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_new_clock() {
        let clock = Clock::new(start(), 5);
        assert_eq!(clock.current, 0);
        assert_eq!(clock.total, 5);
    }

    #[test]
    fn test_tick() {
        let mut clock = Clock::new(start(), 2);
        assert_eq!(clock.tick(), Some((0, start())));
        assert_eq!(clock.tick(), Some((1, start() + TimeDelta::hours(1))));
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn test_run_crosses_midnight() {
        let mut clock = Clock::new(start(), 25);
        let mut last = None;
        clock.run(|_, ts| last = Some(ts));
        assert_eq!(last, Some(start() + TimeDelta::hours(24)));
    }

    #[test]
    fn test_empty_clock() {
        let mut clock = Clock::new(start(), 0);
        assert_eq!(clock.tick(), None);

        let mut was_called = false;
        clock.run(|_, _| was_called = true);
        assert!(!was_called);
    }
}
