use std::sync::Arc;

use crate::{
    EngineErr, Result,
    float::Precision,
    partition::{Distribution, DistributionKind, TeamLayout, WorkRateTable},
    series::{FormulaKind, RecurrenceStrategy, SeriesSpec},
};

/// The configuration of a whole run, identical on every process.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub formula: FormulaKind,
    pub strategy: RecurrenceStrategy,
    pub distribution: DistributionKind,
    pub precision: Precision,
    pub iterations: u64,
    pub layout: TeamLayout,
    pub rates: Option<Arc<WorkRateTable>>,
}

impl RunConfig {
    /// Creates the configuration of a single threaded run for `digits` decimal
    /// digits with the formula's default distribution.
    ///
    /// # Arguments
    /// * `formula` - The series to sum.
    /// * `digits` - The amount of decimal digits wanted.
    ///
    /// # Returns
    /// The configuration or `EngineErr::InvalidPrecision` if `digits` is zero
    /// or too large.
    pub fn for_digits(formula: FormulaKind, digits: u32) -> Result<Self> {
        let precision = Precision::for_digits(digits).ok_or(EngineErr::InvalidPrecision)?;

        Ok(Self {
            formula,
            strategy: RecurrenceStrategy::default(),
            distribution: formula.default_distribution(),
            precision,
            iterations: formula.iterations_for(digits),
            layout: TeamLayout::new(1, 1)?,
            rates: None,
        })
    }

    pub fn with_strategy(mut self, strategy: RecurrenceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_distribution(mut self, distribution: DistributionKind) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_layout(mut self, layout: TeamLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_rates(mut self, rates: Arc<WorkRateTable>) -> Self {
        self.rates = Some(rates);
        self
    }

    /// Returns what's needed to resolve this run's kernel.
    pub fn series(&self) -> SeriesSpec {
        SeriesSpec {
            formula: self.formula,
            strategy: self.strategy,
            precision: self.precision,
            iterations: self.iterations,
        }
    }

    /// Describes everything that shapes a process's partial sum.
    ///
    /// Two processes may only combine their partial sums if their
    /// fingerprints are equal.
    pub fn fingerprint(&self) -> String {
        let mut fingerprint = format!(
            "{:?}/{:?}/{:?} iterations={} bits={} layout={}x{}",
            self.formula,
            self.strategy,
            self.distribution,
            self.iterations,
            self.precision.bits(),
            self.layout.processes(),
            self.layout.threads(),
        );

        if let Some(rates) = &self.rates {
            fingerprint.push_str(&format!(" rates={}x{}", rates.rows(), rates.columns()));
        }

        fingerprint
    }

    /// Performs every check that must pass before any term is computed.
    ///
    /// # Returns
    /// The resolved distribution or the first configuration error found.
    pub fn validate(&self) -> Result<Distribution> {
        let distribution = Distribution::resolve(self.distribution, self.rates.clone())?;
        distribution.validate(self.layout, self.iterations)?;
        Ok(distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> Arc<WorkRateTable> {
        Arc::new(
            include_str!("../../resources/work_rates.txt")
                .parse()
                .unwrap(),
        )
    }

    #[test]
    fn test_for_digits_defaults() {
        let config = RunConfig::for_digits(FormulaKind::Chudnovsky, 1000).unwrap();

        assert_eq!(config.precision.bits(), 8000);
        assert_eq!(config.iterations, 72);
        assert_eq!(config.distribution, DistributionKind::Skewed);
        assert_eq!(config.strategy, RecurrenceStrategy::Incremental);

        assert!(RunConfig::for_digits(FormulaKind::Bbp, 0).is_err());
    }

    #[test]
    fn test_fingerprint_tells_runs_apart() {
        let bbp = RunConfig::for_digits(FormulaKind::Bbp, 150)
            .unwrap()
            .with_layout(TeamLayout::new(2, 2).unwrap());
        assert_eq!(
            bbp.fingerprint(),
            "Bbp/Incremental/Cyclic iterations=126 bits=1200 layout=2x2"
        );
        assert_eq!(bbp.fingerprint(), bbp.clone().fingerprint());

        let others = [
            bbp.clone().with_strategy(RecurrenceStrategy::Direct),
            bbp.clone().with_distribution(DistributionKind::Block),
            bbp.clone().with_iterations(127),
            bbp.clone().with_layout(TeamLayout::new(2, 4).unwrap()),
            RunConfig::for_digits(FormulaKind::Bellard, 150)
                .unwrap()
                .with_layout(TeamLayout::new(2, 2).unwrap()),
        ];
        for other in others {
            assert_ne!(bbp.fingerprint(), other.fingerprint());
        }
    }

    #[test]
    fn test_validate_catches_configuration_errors() {
        let config = RunConfig::for_digits(FormulaKind::Chudnovsky, 100).unwrap();
        assert!(matches!(config.validate(), Err(EngineErr::MissingRateTable)));

        let config = config
            .with_rates(rates())
            .with_layout(TeamLayout::new(1, 4).unwrap());
        assert!(config.validate().is_ok());

        let config = config.with_layout(TeamLayout::new(2, 3).unwrap());
        assert!(matches!(
            config.validate(),
            Err(EngineErr::UnsupportedWorkerCount { workers: 6, .. })
        ));

        let config = config
            .with_distribution(DistributionKind::Block)
            .with_iterations(5);
        assert!(matches!(
            config.validate(),
            Err(EngineErr::TooFewIterations { iterations: 5, workers: 6 })
        ));
    }
}
