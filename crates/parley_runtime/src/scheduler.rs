//! Per-tick driver for in-flight runners.

use std::fmt;

use crate::runner::CommandRunner;

/// Identifies one dispatched invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Runners that suspended, visited in submission order each tick.
#[derive(Debug, Default)]
pub struct Scheduler {
    in_flight: Vec<(RunId, CommandRunner)>,
    ticks: u64,
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a runner that is still in progress.
    pub fn submit(&mut self, id: RunId, runner: CommandRunner) {
        self.in_flight.push((id, runner));
    }

    /// Polls every runner once, oldest first, and returns those that finished.
    pub fn tick(&mut self) -> Vec<(RunId, CommandRunner)> {
        self.ticks += 1;
        for (_, runner) in &mut self.in_flight {
            runner.poll();
        }

        let (finished, pending) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|(_, runner)| runner.is_finished());
        self.in_flight = pending;
        finished
    }

    /// Number of runners still in progress.
    #[must_use]
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns true when nothing is in progress.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Ticks driven so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ids of the runners in progress, in submission order.
    pub fn pending(&self) -> impl Iterator<Item = RunId> + '_ {
        self.in_flight.iter().map(|(id, _)| *id)
    }
}
