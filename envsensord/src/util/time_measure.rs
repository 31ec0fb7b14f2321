//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::time::{Duration, Instant};

/// Source of monotonic time, replaced by a simulated clock in tests.
pub trait TimeMeasure {
    fn now() -> Self;
    fn elapsed(&self) -> Duration;
}

impl TimeMeasure for Instant {
    fn now() -> Self {
        Instant::now()
    }

    fn elapsed(&self) -> Duration {
        Instant::elapsed(self)
    }
}
