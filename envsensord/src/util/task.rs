//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::time::{Duration, Instant};

use eyre::Result;
use log::trace;

use super::time_measure::TimeMeasure;

/// Specify how to continue execution
#[derive(Debug, PartialEq, Eq)]
pub enum LoopContinuation {
    /// Continue running the loop normally
    KeepRunning,
    /// Stop running the loop
    Stop,
}

/// Run `work` every `period` while `condition` returns `KeepRunning`.
///
/// Runs start `period` apart regardless of how long `work` takes, unless it
/// takes longer than `period` in which case the next run starts immediately.
/// The first error returned by `work` ends the loop.
///
/// A signal interrupts the sleep between runs so that the condition is
/// checked right away. (The signal needs a handler, otherwise the process is
/// terminated.)
pub fn loop_with_period<W, T>(work: W, condition: T, period: Duration) -> Result<()>
where
    W: FnMut() -> Result<()>,
    T: FnMut() -> LoopContinuation,
{
    loop_with_period_internal::<_, _, Instant>(work, condition, period, interruptible_sleep)
}

// std::thread::sleep resumes after a signal, shuteye::sleep returns early.
fn interruptible_sleep(d: Duration) {
    shuteye::sleep(d);
}

fn loop_with_period_internal<W, T, Time>(
    mut work: W,
    mut condition: T,
    period: Duration,
    sleep: fn(Duration),
) -> Result<()>
where
    W: FnMut() -> Result<()>,
    T: FnMut() -> LoopContinuation,
    Time: TimeMeasure,
{
    while condition() == LoopContinuation::KeepRunning {
        let start_work = Time::now();
        work()?;

        if condition() == LoopContinuation::KeepRunning {
            if let Some(howlong) = period.checked_sub(start_work.elapsed()) {
                trace!("Sleep for {:?}", howlong);
                sleep(howlong);
            }
        }
    }
    Ok(())
}
