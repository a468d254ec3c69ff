//! Per-query execution context.

use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};

use crate::error::{Error, Result};

/// Clock and deadline for one store call.
///
/// `now` is what the `Today` and `Now` criteria tokens resolve against, so a
/// query sees a single instant however long it runs.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext {
    now: NaiveDateTime,
    deadline: Option<Instant>,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryContext {
    /// Context using the local clock and no deadline.
    pub fn new() -> Self {
        Self {
            now: Local::now().naive_local(),
            deadline: None,
        }
    }

    /// Pin the clock.
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Fail store calls that run past `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Fail store calls that run past `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Return `DeadlineExceeded` if the deadline has passed.
    pub fn check_deadline(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_no_deadline() {
        assert!(QueryContext::new().check_deadline().is_ok());
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = QueryContext::new().with_deadline(Instant::now());
        assert!(matches!(ctx.check_deadline(), Err(Error::DeadlineExceeded)));
    }

    #[test]
    fn test_pinned_clock() {
        let now = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(QueryContext::new().with_now(now).now(), now);
    }
}
