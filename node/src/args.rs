use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use engine::{
    partition::DistributionKind,
    series::{FormulaKind, RecurrenceStrategy},
};

use crate::{Result, spec::RunSpec};

/// Command line of a rank. Flags override the fields of `--spec`.
#[derive(Debug, Parser)]
#[command(name = "pi-node")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Computes decimal digits of pi across processes and threads", long_about = None)]
pub struct Args {
    /// JSON run spec to start from
    #[arg(long, value_name = "PATH")]
    pub spec: Option<PathBuf>,

    /// Series to sum: bbp, bellard or chudnovsky
    #[arg(long)]
    pub formula: Option<FormulaKind>,

    /// Recurrence strategy: direct, incremental or tabulated
    #[arg(long)]
    pub strategy: Option<RecurrenceStrategy>,

    /// Work distribution: block, cyclic or skewed
    #[arg(long)]
    pub distribution: Option<DistributionKind>,

    /// Decimal digits to compute
    #[arg(long)]
    pub digits: Option<u32>,

    /// Threads of this rank
    #[arg(long)]
    pub threads: Option<usize>,

    /// Rank of this process, 0 is the root
    #[arg(long)]
    pub rank: Option<usize>,

    /// Amount of processes of the run
    #[arg(long)]
    pub world: Option<usize>,

    /// Address the root listens at
    #[arg(long, value_name = "ADDR")]
    pub root: Option<SocketAddr>,

    /// Work-rate table for the skewed distribution
    #[arg(long = "work-rates", value_name = "PATH")]
    pub work_rates: Option<PathBuf>,

    /// File with known digits to check the result against
    #[arg(long, value_name = "PATH")]
    pub reference: Option<PathBuf>,
}

impl Args {
    /// Resolves the run spec, loading `--spec` first if given.
    pub fn into_spec(self) -> Result<RunSpec> {
        let mut spec = match &self.spec {
            Some(path) => RunSpec::load(path)?,
            None => RunSpec::default(),
        };

        if let Some(formula) = self.formula {
            spec.formula = formula;
        }
        if let Some(strategy) = self.strategy {
            spec.strategy = strategy;
        }
        if let Some(distribution) = self.distribution {
            spec.distribution = Some(distribution);
        }
        if let Some(digits) = self.digits {
            spec.digits = digits;
        }
        if let Some(threads) = self.threads {
            spec.threads = threads;
        }
        if let Some(rank) = self.rank {
            spec.rank = rank;
        }
        if let Some(world) = self.world {
            spec.world = world;
        }
        if let Some(root) = self.root {
            spec.root = root;
        }
        if let Some(work_rates) = self.work_rates {
            spec.work_rates = work_rates;
        }
        if self.reference.is_some() {
            spec.reference = self.reference;
        }

        Ok(spec)
    }
}
