use std::{
    fs,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    sync::Arc,
};

use engine::{
    RunConfig,
    partition::{DistributionKind, TeamLayout, WorkRateTable},
    series::{FormulaKind, RecurrenceStrategy},
};
use serde::{Deserialize, Serialize};

use crate::{NodeErr, Result};

const DEFAULT_PORT: u16 = 7878;
const DEFAULT_WORK_RATES: &str = "resources/work_rates.txt";

/// Everything a rank needs to take part in a run.
///
/// Every rank of a run must agree on all fields but `rank`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSpec {
    pub formula: FormulaKind,
    pub strategy: RecurrenceStrategy,
    /// Defaults to the formula's own distribution.
    pub distribution: Option<DistributionKind>,
    pub digits: u32,
    pub threads: usize,
    pub rank: usize,
    pub world: usize,
    pub root: SocketAddr,
    pub work_rates: PathBuf,
    /// A file with known digits to compare the result against.
    pub reference: Option<PathBuf>,
}

impl Default for RunSpec {
    fn default() -> Self {
        Self {
            formula: FormulaKind::Chudnovsky,
            strategy: RecurrenceStrategy::default(),
            distribution: None,
            digits: 1000,
            threads: 1,
            rank: 0,
            world: 1,
            root: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            work_rates: PathBuf::from(DEFAULT_WORK_RATES),
            reference: None,
        }
    }
}

impl RunSpec {
    /// Loads a `RunSpec` from a JSON file, missing fields take their default.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;

        serde_json::from_str(&text).map_err(|source| NodeErr::Spec {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn distribution(&self) -> DistributionKind {
        self.distribution
            .unwrap_or_else(|| self.formula.default_distribution())
    }

    /// Builds the engine configuration of this run.
    ///
    /// The work-rate table is only read when the skewed distribution is used.
    ///
    /// # Returns
    /// The configuration or an error if the rank isn't part of the world or
    /// the table can't be loaded.
    pub fn run_config(&self) -> Result<RunConfig> {
        if self.rank >= self.world {
            return Err(NodeErr::RankOutOfWorld {
                rank: self.rank,
                world: self.world,
            });
        }

        let mut config = RunConfig::for_digits(self.formula, self.digits)?
            .with_strategy(self.strategy)
            .with_distribution(self.distribution())
            .with_layout(TeamLayout::new(self.world, self.threads)?);

        if self.distribution() == DistributionKind::Skewed {
            let rates = WorkRateTable::load(&self.work_rates)?;
            config = config.with_rates(Arc::new(rates));
        }

        Ok(config)
    }
}
