use std::{fs, path::Path, str::FromStr};

use super::WorkRange;
use crate::{EngineErr, Result};

/// Empirical share of the iteration space, in percent, each worker gets under
/// the skewed distribution.
///
/// Rows are worker ordinals and columns are worker-count buckets, the bucket
/// of a team of `w` workers is `w / 4`.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkRateTable {
    rows: usize,
    columns: usize,
    rates: Vec<f64>,
}

impl WorkRateTable {
    /// Loads a table from a whitespace separated text file.
    ///
    /// # Arguments
    /// * `path` - The path of the file.
    ///
    /// # Returns
    /// The parsed table or an `EngineErr` if the file can't be read or is malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| EngineErr::RateTableIo {
            path: path.to_path_buf(),
            source,
        })?;

        text.parse()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Returns the rate of `worker` in `column`, if both are in the table.
    pub fn rate(&self, worker: usize, column: usize) -> Option<f64> {
        if worker >= self.rows || column >= self.columns {
            return None;
        }

        Some(self.rates[worker * self.columns + column])
    }

    /// Checks that a team of `workers` can be split with this table.
    pub fn supports(&self, workers: usize) -> Result<()> {
        let unsupported = |reason| Err(EngineErr::UnsupportedWorkerCount { workers, reason });

        match workers {
            0 => Err(EngineErr::NoWorkers),
            1 => Ok(()),
            w if w != 2 && w % 4 != 0 => unsupported("it needs 1, 2 or a multiple of 4 workers"),
            w if w / 4 >= self.columns => unsupported("there is no column for that many workers"),
            w if w > self.rows => unsupported("there are fewer rows than workers"),
            _ => Ok(()),
        }
    }

    /// Returns the contiguous block of `worker` in a team of `workers`.
    ///
    /// Block sizes are the worker's rate of `total` rounded to the nearest
    /// integer, block starts are the prefix sums of the sizes clamped to
    /// `total`, and the last block always ends at `total`.
    ///
    /// # Arguments
    /// * `workers` - The amount of workers in the team.
    /// * `worker` - The ordinal of the worker inside the team.
    /// * `total` - The amount of iterations to split.
    ///
    /// # Returns
    /// The worker's range or an `EngineErr` if the team can't be split with this table.
    pub fn skewed(&self, workers: usize, worker: usize, total: u64) -> Result<WorkRange> {
        self.supports(workers)?;
        if worker >= workers {
            return Err(EngineErr::WorkerOutOfRange { worker, workers });
        }

        if workers == 1 {
            return Ok(WorkRange::block(0, total));
        }

        let column = workers / 4;
        let block_size = |w: usize| {
            let rate = self.rates[w * self.columns + column];
            (rate / 100.0 * total as f64).round() as u64
        };

        let start = (0..worker).map(block_size).sum::<u64>().min(total);
        let end = if worker == workers - 1 {
            total
        } else {
            (start + block_size(worker)).min(total)
        };

        Ok(WorkRange::block(start, end))
    }
}

impl FromStr for WorkRateTable {
    type Err = EngineErr;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = |line: usize, detail: String| EngineErr::RateTableMalformed { line, detail };

        let mut rates = Vec::new();
        let mut columns = None;
        let mut rows = 0;

        for (i, line) in s.lines().enumerate() {
            let line_no = i + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let row = line
                .split_whitespace()
                .map(|field| match field.parse::<f64>() {
                    Ok(rate) if rate.is_finite() && rate >= 0.0 => Ok(rate),
                    _ => Err(malformed(line_no, format!("'{field}' is not a valid rate"))),
                })
                .collect::<Result<Vec<_>>>()?;

            match columns {
                None => columns = Some(row.len()),
                Some(expected) if expected != row.len() => {
                    return Err(malformed(
                        line_no,
                        format!("expected {expected} columns, found {}", row.len()),
                    ));
                }
                Some(_) => {}
            }

            rates.extend(row);
            rows += 1;
        }

        let Some(columns) = columns else {
            return Err(malformed(0, "the table has no rows".to_string()));
        };

        Ok(Self {
            rows,
            columns,
            rates,
        })
    }
}
