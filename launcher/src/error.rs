use std::{fmt, io};

/// The launcher module's result type.
pub type Result<T> = std::result::Result<T, LauncherErr>;

/// All errors that can end a run.
#[derive(Debug)]
pub enum LauncherErr {
    /// Invalid configuration, caught before invoking any worker.
    InvalidConfig(String),
    /// A worker invocation answered `Errored`, fatal to the whole run.
    WorkerFailed {
        slot: usize,
        generation: usize,
        message: String,
    },
    /// A worker checkpointed without advancing its epoch.
    StalledCheckpoint {
        slot: usize,
        generation: usize,
        resume_epoch: usize,
    },
    /// Failed to deliver an invocation or to read its response.
    Invoke { slot: usize, source: io::Error },
    /// A slot task failed to complete.
    Join(String),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl fmt::Display for LauncherErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::WorkerFailed {
                slot,
                generation,
                message,
            } => write!(f, "worker slot {slot} failed in generation {generation}: {message}"),
            Self::StalledCheckpoint {
                slot,
                generation,
                resume_epoch,
            } => write!(
                f,
                "worker slot {slot} checkpointed at epoch {resume_epoch} in generation {generation} without progress"
            ),
            Self::Invoke { slot, source } => write!(f, "invoking worker slot {slot} failed: {source}"),
            Self::Join(msg) => write!(f, "slot task failed: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for LauncherErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invoke { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LauncherErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
