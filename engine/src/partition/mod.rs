//! Splits the iteration space `[0, N)` among processes and their threads.

mod rates;

use std::{num::NonZeroUsize, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

pub use rates::WorkRateTable;

use crate::{EngineErr, Result, series::ParseKindErr};

/// The indices a single worker visits: `start, start + stride, ...` while `< end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkRange {
    pub start: u64,
    pub end: u64,
    pub stride: u64,
}

impl WorkRange {
    /// Creates a contiguous range.
    pub fn block(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            stride: 1,
        }
    }

    /// Returns the amount of indices visited.
    pub fn len(&self) -> u64 {
        if self.end <= self.start {
            return 0;
        }

        (self.end - self.start).div_ceil(self.stride)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over the visited indices.
    pub fn indices(&self) -> impl Iterator<Item = u64> + use<> {
        (self.start..self.end).step_by(self.stride as usize)
    }
}

fn check_worker(worker_count: usize, worker_id: usize, total: u64) -> Result<()> {
    if worker_count == 0 {
        return Err(EngineErr::NoWorkers);
    }

    if worker_id >= worker_count {
        return Err(EngineErr::WorkerOutOfRange {
            worker: worker_id,
            workers: worker_count,
        });
    }

    if total < worker_count as u64 {
        return Err(EngineErr::TooFewIterations {
            iterations: total,
            workers: worker_count,
        });
    }

    Ok(())
}

/// Returns the contiguous block of `worker_id` when `total` iterations are
/// split evenly among `worker_count` workers.
///
/// The first `total % worker_count` workers get one extra iteration, so block
/// sizes differ by at most one.
///
/// # Arguments
/// * `worker_count` - The amount of workers.
/// * `worker_id` - The ordinal of the worker.
/// * `total` - The amount of iterations, at least `worker_count`.
///
/// # Returns
/// The worker's block or an `EngineErr` if the arguments are invalid.
pub fn partition(worker_count: usize, worker_id: usize, total: u64) -> Result<WorkRange> {
    check_worker(worker_count, worker_id, total)?;

    let (count, id) = (worker_count as u64, worker_id as u64);
    let (base, extra) = (total / count, total % count);

    let start = id * base + id.min(extra);
    let len = base + u64::from(id < extra);

    Ok(WorkRange::block(start, start + len))
}

/// Returns the interleaved indices of `worker_id`: `worker_id`,
/// `worker_id + worker_count`, ...
pub fn cyclic(worker_count: usize, worker_id: usize, total: u64) -> Result<WorkRange> {
    check_worker(worker_count, worker_id, total)?;

    Ok(WorkRange {
        start: worker_id as u64,
        end: total,
        stride: worker_count as u64,
    })
}

/// The amount of processes and threads per process of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamLayout {
    processes: NonZeroUsize,
    threads: NonZeroUsize,
}

impl TeamLayout {
    /// Creates a new `TeamLayout`.
    ///
    /// # Returns
    /// The layout or `EngineErr::NoWorkers` if any of the counts is zero.
    pub fn new(processes: usize, threads: usize) -> Result<Self> {
        match (NonZeroUsize::new(processes), NonZeroUsize::new(threads)) {
            (Some(processes), Some(threads)) => Ok(Self { processes, threads }),
            _ => Err(EngineErr::NoWorkers),
        }
    }

    pub fn processes(&self) -> usize {
        self.processes.get()
    }

    pub fn threads(&self) -> usize {
        self.threads.get()
    }

    /// Returns the amount of workers across every process.
    pub fn workers(&self) -> usize {
        self.processes() * self.threads()
    }
}

/// The name of a distribution, as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    Block,
    Cyclic,
    Skewed,
}

impl FromStr for DistributionKind {
    type Err = ParseKindErr;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "block" => Ok(DistributionKind::Block),
            "cyclic" => Ok(DistributionKind::Cyclic),
            "skewed" => Ok(DistributionKind::Skewed),
            _ => Err(ParseKindErr::new("distribution", s)),
        }
    }
}

/// How the iteration space is split across processes and threads.
#[derive(Debug, Clone)]
pub enum Distribution {
    /// Even blocks across processes, then even blocks across each process's threads.
    Block,
    /// Even blocks across processes, then interleaved indices across each process's threads.
    Cyclic,
    /// Table driven blocks keyed by the global worker ordinal.
    Skewed(Arc<WorkRateTable>),
}

impl Distribution {
    /// Resolves a `DistributionKind`.
    ///
    /// # Returns
    /// The distribution or `EngineErr::MissingRateTable` if a skewed one is
    /// requested without a table.
    pub fn resolve(kind: DistributionKind, rates: Option<Arc<WorkRateTable>>) -> Result<Self> {
        match (kind, rates) {
            (DistributionKind::Block, _) => Ok(Distribution::Block),
            (DistributionKind::Cyclic, _) => Ok(Distribution::Cyclic),
            (DistributionKind::Skewed, Some(rates)) => Ok(Distribution::Skewed(rates)),
            (DistributionKind::Skewed, None) => Err(EngineErr::MissingRateTable),
        }
    }

    pub fn kind(&self) -> DistributionKind {
        match self {
            Distribution::Block => DistributionKind::Block,
            Distribution::Cyclic => DistributionKind::Cyclic,
            Distribution::Skewed(_) => DistributionKind::Skewed,
        }
    }

    /// Checks that `layout` can split `total` iterations with this distribution.
    pub fn validate(&self, layout: TeamLayout, total: u64) -> Result<()> {
        check_worker(layout.workers(), 0, total)?;

        if let Distribution::Skewed(rates) = self {
            rates.supports(layout.workers())?;
        }

        Ok(())
    }

    /// Returns the span of iterations owned by process `proc_id`.
    ///
    /// For the skewed distribution it's the union of the process's thread
    /// blocks, which are contiguous in the global ordering.
    pub fn process_range(
        &self,
        layout: TeamLayout,
        proc_id: usize,
        total: u64,
    ) -> Result<WorkRange> {
        match self {
            Distribution::Block | Distribution::Cyclic => {
                partition(layout.processes(), proc_id, total)
            }
            Distribution::Skewed(rates) => {
                let workers = layout.workers();
                let first = layout.threads() * proc_id;
                let last = first + layout.threads() - 1;

                let start = rates.skewed(workers, first, total)?.start;
                let end = rates.skewed(workers, last, total)?.end;
                Ok(WorkRange::block(start, end))
            }
        }
    }

    /// Returns the range of every thread of process `proc_id`.
    ///
    /// # Arguments
    /// * `layout` - The processes and threads of the run.
    /// * `proc_id` - The rank of the process.
    /// * `total` - The amount of iterations of the whole run.
    ///
    /// # Returns
    /// One range per thread, in thread order, or an `EngineErr` if the layout
    /// can't split `total` with this distribution.
    pub fn thread_ranges(
        &self,
        layout: TeamLayout,
        proc_id: usize,
        total: u64,
    ) -> Result<Vec<WorkRange>> {
        self.validate(layout, total)?;
        let threads = layout.threads();

        match self {
            Distribution::Block => {
                let span = partition(layout.processes(), proc_id, total)?;
                (0..threads)
                    .map(|thread| -> Result<WorkRange> {
                        let local = partition(threads, thread, span.len())?;
                        Ok(WorkRange::block(
                            span.start + local.start,
                            span.start + local.end,
                        ))
                    })
                    .collect()
            }
            Distribution::Cyclic => {
                let span = partition(layout.processes(), proc_id, total)?;
                Ok((0..threads)
                    .map(|thread| WorkRange {
                        start: span.start + thread as u64,
                        end: span.end,
                        stride: threads as u64,
                    })
                    .collect())
            }
            Distribution::Skewed(rates) => (0..threads)
                .map(|thread| rates.skewed(layout.workers(), threads * proc_id + thread, total))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visited(ranges: &[WorkRange]) -> Vec<u64> {
        let mut indices: Vec<u64> = ranges.iter().flat_map(WorkRange::indices).collect();
        indices.sort_unstable();
        indices
    }

    fn rates() -> Arc<WorkRateTable> {
        Arc::new(
            include_str!("../../../resources/work_rates.txt")
                .parse()
                .unwrap(),
        )
    }

    #[test]
    fn test_even_partition_of_97_over_7() {
        let ranges: Vec<_> = (0..7).map(|w| partition(7, w, 97).unwrap()).collect();
        assert_eq!(ranges.len(), 7);

        let sizes: Vec<_> = ranges.iter().map(WorkRange::len).collect();
        assert_eq!(sizes, vec![14, 14, 14, 14, 14, 14, 13]);

        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges[6].end, 97);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_cyclic_interleaves() {
        let range = cyclic(4, 1, 10).unwrap();
        assert_eq!(range.indices().collect::<Vec<_>>(), vec![1, 5, 9]);
        assert_eq!(range.len(), 3);

        let ranges: Vec<_> = (0..4).map(|w| cyclic(4, w, 10).unwrap()).collect();
        assert_eq!(visited(&ranges), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_workers() {
        assert!(matches!(partition(0, 0, 10), Err(EngineErr::NoWorkers)));
        assert!(matches!(
            partition(3, 3, 10),
            Err(EngineErr::WorkerOutOfRange { worker: 3, workers: 3 })
        ));
        assert!(matches!(
            cyclic(8, 0, 5),
            Err(EngineErr::TooFewIterations { iterations: 5, workers: 8 })
        ));
        assert!(TeamLayout::new(0, 4).is_err());
    }

    #[test]
    fn test_hybrid_distributions_cover_range() {
        let distributions = [
            Distribution::Block,
            Distribution::Cyclic,
            Distribution::Skewed(rates()),
        ];

        for distribution in &distributions {
            for (processes, threads) in [(1, 1), (1, 4), (2, 2), (2, 4), (4, 4)] {
                let layout = TeamLayout::new(processes, threads).unwrap();

                for total in [16, 61, 250] {
                    let ranges: Vec<_> = (0..processes)
                        .flat_map(|p| distribution.thread_ranges(layout, p, total).unwrap())
                        .collect();

                    assert_eq!(
                        visited(&ranges),
                        (0..total).collect::<Vec<_>>(),
                        "{:?} over {processes}x{threads} with {total}",
                        distribution.kind()
                    );
                }
            }
        }
    }

    #[test]
    fn test_process_range_spans_its_threads() {
        let layout = TeamLayout::new(2, 4).unwrap();

        let distributions = [
            Distribution::Block,
            Distribution::Cyclic,
            Distribution::Skewed(rates()),
        ];

        for distribution in distributions {
            let mut next = 0;
            for proc_id in 0..2 {
                let span = distribution.process_range(layout, proc_id, 100).unwrap();
                assert_eq!(span.start, next);

                let threads = distribution.thread_ranges(layout, proc_id, 100).unwrap();
                assert!(
                    threads
                        .iter()
                        .flat_map(WorkRange::indices)
                        .all(|i| span.start <= i && i < span.end)
                );
                next = span.end;
            }
            assert_eq!(next, 100);
        }
    }

    #[test]
    fn test_cyclic_threads_inside_process_block() {
        let layout = TeamLayout::new(2, 3).unwrap();
        let ranges = Distribution::Cyclic.thread_ranges(layout, 1, 20).unwrap();

        assert_eq!(
            ranges[0],
            WorkRange {
                start: 10,
                end: 20,
                stride: 3
            }
        );
        assert_eq!(ranges[2].indices().collect::<Vec<_>>(), vec![12, 15, 18]);
    }

    #[test]
    fn test_skewed_needs_table_and_supported_count() {
        assert!(matches!(
            Distribution::resolve(DistributionKind::Skewed, None),
            Err(EngineErr::MissingRateTable)
        ));

        let layout = TeamLayout::new(1, 3).unwrap();
        assert!(matches!(
            Distribution::Skewed(rates()).thread_ranges(layout, 0, 100),
            Err(EngineErr::UnsupportedWorkerCount { workers: 3, .. })
        ));
    }
}
