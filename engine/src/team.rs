use std::time::Instant;

use log::debug;
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use crate::{
    Result,
    float::{BigFloat, Precision},
    partition::WorkRange,
    series::Kernel,
};

/// The sum of a process, merged into by every worker of its team.
#[derive(Debug)]
pub struct ProcessSum {
    sum: Mutex<BigFloat>,
}

impl ProcessSum {
    /// Creates a new zero valued `ProcessSum`.
    pub fn new(precision: Precision) -> Self {
        Self {
            sum: Mutex::new(BigFloat::zero(precision)),
        }
    }

    /// Merges a worker's finished partial sum, consuming it.
    ///
    /// # Arguments
    /// * `partial` - The partial sum to accumulate.
    pub fn accumulate(&self, partial: BigFloat) {
        let mut sum = self.sum.lock();
        *sum += partial;
    }

    /// Returns the accumulated sum.
    pub fn into_inner(self) -> BigFloat {
        self.sum.into_inner()
    }
}

/// Sums the terms of `range` on a private accumulator.
///
/// # Arguments
/// * `kernel` - The series kernel.
/// * `range` - The indices to visit.
///
/// # Returns
/// The partial sum of the range, zero if it's empty.
pub fn sum_range<K: Kernel>(kernel: &K, range: WorkRange) -> BigFloat {
    let mut sum = BigFloat::zero(kernel.precision());
    if range.is_empty() {
        return sum;
    }

    let mut state = kernel.seek(range.start, range.stride);
    for n in range.indices() {
        kernel.compute(&mut sum, n, &mut state);
    }

    sum
}

/// A fixed size team of threads that sums the ranges of one process.
pub struct ThreadTeam {
    pool: ThreadPool,
}

impl ThreadTeam {
    /// Creates a new `ThreadTeam`.
    ///
    /// # Arguments
    /// * `threads` - The amount of threads of the team.
    ///
    /// # Returns
    /// The team or an `EngineErr` if the thread pool can't be built.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("series-worker-{i}"))
            .build()?;

        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs every range on the team and merges the partial sums.
    ///
    /// Each worker sums its range without synchronization and then merges
    /// once into the process sum, the merge order is unspecified.
    ///
    /// # Arguments
    /// * `kernel` - The series kernel.
    /// * `ranges` - One range per worker.
    ///
    /// # Returns
    /// The sum of every range.
    pub fn run<K: Kernel>(&self, kernel: &K, ranges: &[WorkRange]) -> BigFloat {
        let total = ProcessSum::new(kernel.precision());

        self.pool.install(|| {
            ranges
                .par_iter()
                .enumerate()
                .for_each(|(worker, &range)| {
                    let started = Instant::now();
                    let partial = sum_range(kernel, range);

                    debug!(
                        worker = worker,
                        start = range.start,
                        end = range.end,
                        stride = range.stride,
                        elapsed_ms = started.elapsed().as_millis() as u64;
                        "worker finished its range"
                    );

                    total.accumulate(partial);
                });
        });

        total.into_inner()
    }
}
