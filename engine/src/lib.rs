//! Parallel engine for the decimal digits of π.
//!
//! A run sums one of several series with fixed precision floating values. The
//! iteration space is split across processes and the threads of each process,
//! every worker derives its terms incrementally from a sought recurrence state
//! and the partial sums are reduced up to the root, which assembles π.

mod assemble;
mod config;
mod error;
pub mod float;
pub mod partition;
pub mod report;
pub mod series;
mod team;

use std::time::Instant;

use log::info;

pub use assemble::assemble;
pub use config::RunConfig;
pub use error::{EngineErr, Result};
pub use team::{ProcessSum, ThreadTeam, sum_range};

use crate::{float::BigFloat, partition::Distribution, series::with_kernel};

/// Computes the partial sums of the processes of a run.
pub struct Engine {
    config: RunConfig,
    distribution: Distribution,
    team: ThreadTeam,
}

impl Engine {
    /// Creates a new `Engine`.
    ///
    /// # Arguments
    /// * `config` - The configuration of the run.
    ///
    /// # Returns
    /// The engine or an `EngineErr` if the configuration is invalid or the
    /// thread team can't be created.
    pub fn new(config: RunConfig) -> Result<Self> {
        let distribution = config.validate()?;
        let team = ThreadTeam::new(config.layout.threads())?;

        Ok(Self {
            config,
            distribution,
            team,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Computes the partial sum of process `rank` on its thread team.
    ///
    /// # Arguments
    /// * `rank` - The rank of the process, must be within the run's processes.
    ///
    /// # Returns
    /// The sum of every term assigned to the process.
    pub fn partial_sum(&self, rank: usize) -> Result<BigFloat> {
        let RunConfig {
            layout, iterations, ..
        } = self.config;

        if rank >= layout.processes() {
            return Err(EngineErr::WorkerOutOfRange {
                worker: rank,
                workers: layout.processes(),
            });
        }

        let ranges = self.distribution.thread_ranges(layout, rank, iterations)?;
        let span = self.distribution.process_range(layout, rank, iterations)?;

        let started = Instant::now();
        let sum = with_kernel!(self.config.series(), |kernel| {
            self.team.run(&kernel, &ranges)
        });

        info!(
            rank = rank,
            start = span.start,
            end = span.end,
            elapsed_ms = started.elapsed().as_millis() as u64;
            "partial sum computed"
        );

        Ok(sum)
    }

    /// Turns the reduced sum of every process into π.
    pub fn assemble(&self, total: &BigFloat) -> BigFloat {
        assemble(self.config.formula, total)
    }

    /// Computes every process's partial sum in this process and assembles π.
    ///
    /// It's what a run of a single process does, and what a distributed run
    /// must agree with.
    pub fn compute(&self) -> Result<BigFloat> {
        let mut total = BigFloat::zero(self.config.precision);
        for rank in 0..self.config.layout.processes() {
            total += self.partial_sum(rank)?;
        }

        Ok(self.assemble(&total))
    }
}
