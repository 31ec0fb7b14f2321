//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::{cell::RefCell, ops::Add, time::Duration};

use crate::util::time_measure::TimeMeasure;

/// A clock that only moves when a test sleeps on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant {
    t0: Duration,
}

thread_local! {
    static TIME: RefCell<Duration>  = RefCell::new(Duration::from_secs(0));
}

impl TestInstant {
    pub fn now() -> Self {
        TestInstant {
            t0: TIME.with(|t| *t.borrow()),
        }
    }

    pub fn from(d: Duration) -> Self {
        TestInstant { t0: d }
    }

    pub fn sleep(d: Duration) {
        TIME.with(|t| {
            let new_time = t.borrow().saturating_add(d);
            *t.borrow_mut() = new_time;
        })
    }
}

impl TimeMeasure for TestInstant {
    fn now() -> Self {
        Self::now()
    }

    fn elapsed(&self) -> Duration {
        Self::now().t0.saturating_sub(self.t0)
    }
}

impl Add<Duration> for TestInstant {
    type Output = TestInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        TestInstant { t0: self.t0 + rhs }
    }
}
