use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use rayon::ThreadPoolBuildError;

/// The result type used in the entire engine.
pub type Result<T> = std::result::Result<T, EngineErr>;

/// The engine's error type.
///
/// Every variant is fatal, they are detected before or during setup and there
/// is no partial result to fall back to.
#[derive(Debug)]
pub enum EngineErr {
    InvalidPrecision,
    NoWorkers,
    TooFewIterations {
        iterations: u64,
        workers: usize,
    },
    WorkerOutOfRange {
        worker: usize,
        workers: usize,
    },
    UnsupportedWorkerCount {
        workers: usize,
        reason: &'static str,
    },
    MissingRateTable,
    RateTableIo {
        path: PathBuf,
        source: io::Error,
    },
    RateTableMalformed {
        line: usize,
        detail: String,
    },
    PacketSizeMismatch {
        got: usize,
        expected: usize,
    },
    PacketPrecisionMismatch {
        got: usize,
        expected: usize,
    },
    PacketCorrupted {
        used: usize,
        capacity: usize,
    },
    ThreadPool(ThreadPoolBuildError),
}

impl Display for EngineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineErr::InvalidPrecision => f.write_str("precision must be greater than zero"),
            EngineErr::NoWorkers => f.write_str("at least one process and one thread are needed"),
            EngineErr::TooFewIterations {
                iterations,
                workers,
            } => write!(
                f,
                "{iterations} iterations are too few to give each of the {workers} workers at least one term, try a greater precision or fewer workers"
            ),
            EngineErr::WorkerOutOfRange { worker, workers } => {
                write!(f, "worker {worker} is out of range for a team of {workers}")
            }
            EngineErr::UnsupportedWorkerCount { workers, reason } => {
                write!(f, "the work-rate table can't split {workers} workers: {reason}")
            }
            EngineErr::MissingRateTable => {
                f.write_str("the skewed distribution needs a work-rate table")
            }
            EngineErr::RateTableIo { path, source } => {
                write!(f, "failed to read work-rate table {}: {source}", path.display())
            }
            EngineErr::RateTableMalformed { line, detail } => {
                write!(f, "malformed work-rate table at line {line}: {detail}")
            }
            EngineErr::PacketSizeMismatch { got, expected } => {
                write!(f, "packet is {got} bytes long, expected {expected}")
            }
            EngineErr::PacketPrecisionMismatch { got, expected } => write!(
                f,
                "packet was packed with {got} precision limbs, this run uses {expected}"
            ),
            EngineErr::PacketCorrupted { used, capacity } => {
                write!(f, "packet claims {used} limbs but only has room for {capacity}")
            }
            EngineErr::ThreadPool(e) => write!(f, "failed to build the thread team: {e}"),
        }
    }
}

impl Error for EngineErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EngineErr::RateTableIo { source, .. } => Some(source),
            EngineErr::ThreadPool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ThreadPoolBuildError> for EngineErr {
    fn from(value: ThreadPoolBuildError) -> Self {
        Self::ThreadPool(value)
    }
}
