use std::{error::Error, fmt, io, path::PathBuf};

use engine::EngineErr;

/// The node's result type.
pub type Result<T> = std::result::Result<T, NodeErr>;

/// Failures of a rank, all of them abort the run.
#[derive(Debug)]
pub enum NodeErr {
    Io(io::Error),
    Engine(EngineErr),
    Spec {
        path: PathBuf,
        source: serde_json::Error,
    },
    RankOutOfWorld {
        rank: usize,
        world: usize,
    },
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },
    WorldMismatch {
        rank: usize,
        got: usize,
        expected: usize,
    },
    PacketSizeMismatch {
        rank: usize,
        got: usize,
        expected: usize,
    },
    RunMismatch {
        rank: usize,
        got: String,
        expected: String,
    },
    DuplicateRank(usize),
    Rejected(String),
    ComputeTask(String),
}

impl fmt::Display for NodeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeErr::Io(e) => write!(f, "io error: {e}"),
            NodeErr::Engine(e) => write!(f, "engine error: {e}"),
            NodeErr::Spec { path, source } => {
                write!(f, "invalid run spec {}: {source}", path.display())
            }
            NodeErr::RankOutOfWorld { rank, world } => {
                write!(f, "rank {rank} is out of a world of {world}")
            }
            NodeErr::UnexpectedMessage { expected, got } => {
                write!(f, "unexpected message: expected {expected}, got {got}")
            }
            NodeErr::WorldMismatch {
                rank,
                got,
                expected,
            } => write!(
                f,
                "rank {rank} was started with a world of {got}, expected {expected}"
            ),
            NodeErr::PacketSizeMismatch {
                rank,
                got,
                expected,
            } => write!(
                f,
                "rank {rank} sends packets of {got} bytes, expected {expected}"
            ),
            NodeErr::RunMismatch {
                rank,
                got,
                expected,
            } => write!(f, "rank {rank} computed `{got}`, expected `{expected}`"),
            NodeErr::DuplicateRank(rank) => write!(f, "rank {rank} connected twice"),
            NodeErr::Rejected(reason) => write!(f, "the root rejected this rank: {reason}"),
            NodeErr::ComputeTask(reason) => write!(f, "the compute task failed: {reason}"),
        }
    }
}

impl Error for NodeErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NodeErr::Io(e) => Some(e),
            NodeErr::Engine(e) => Some(e),
            NodeErr::Spec { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for NodeErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<EngineErr> for NodeErr {
    fn from(value: EngineErr) -> Self {
        Self::Engine(value)
    }
}
