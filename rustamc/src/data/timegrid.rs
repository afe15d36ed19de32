use crate::utils::errors::{AmcError, Result};
use crate::utils::num::{Time, TIME_TOLERANCE};

/// # TimeGrid
/// Deduplicated, strictly increasing set of all simulation times an
/// instrument needs: cashflow observation and pay times plus exercise and
/// exposure times. Built once, immutable afterwards; duplicate insertion at
/// construction is idempotent (times closer than the tolerance collapse).
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<Time>,
}

impl TimeGrid {
    pub fn new<I>(times: I) -> TimeGrid
    where
        I: IntoIterator<Item = Time>,
    {
        let mut times: Vec<Time> = times.into_iter().collect();
        times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        times.dedup_by(|a, b| (*a - *b).abs() < TIME_TOLERANCE);
        TimeGrid { times }
    }

    pub fn times(&self) -> &[Time] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Position of `t` in the grid, if present within the time tolerance.
    pub fn position(&self, t: Time) -> Option<usize> {
        let idx = self
            .times
            .partition_point(|&x| x < t - TIME_TOLERANCE);
        match self.times.get(idx) {
            Some(&x) if (x - t).abs() < TIME_TOLERANCE => Some(idx),
            _ => None,
        }
    }

    pub fn index_of(&self, t: Time) -> Result<usize> {
        self.position(t).ok_or(AmcError::MissingSimulationTime(format!(
            "time {} is not on the simulation grid",
            t
        )))
    }
}
