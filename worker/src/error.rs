use std::{error::Error, fmt, io};

use machine_learning::MlErr;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker runtime failures, every one of them ends the invocation as `Errored`.
#[derive(Debug)]
pub enum WorkerErr {
    /// A required runtime parameter is missing or invalid.
    Config(String),
    /// The request to the rendezvous service failed.
    Http(reqwest::Error),
    /// The rendezvous service answered with a non success status.
    SyncStatus { status: u16, body: String },
    /// A gradient set or snapshot could not be decoded.
    Codec(io::Error),
    /// The local training collaborator failed.
    Training(MlErr),
    /// The training task panicked.
    Panicked(String),
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Config(e) => write!(f, "configuration error: {e}"),
            WorkerErr::Http(e) => write!(f, "sync request failed: {e}"),
            WorkerErr::SyncStatus { status, body } => {
                write!(f, "sync rejected with status {status}: {body}")
            }
            WorkerErr::Codec(e) => write!(f, "codec error: {e}"),
            WorkerErr::Training(e) => write!(f, "training error: {e}"),
            WorkerErr::Panicked(e) => write!(f, "training panicked: {e}"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Http(e) => Some(e),
            WorkerErr::Codec(e) => Some(e),
            WorkerErr::Training(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Codec(value)
    }
}

impl From<reqwest::Error> for WorkerErr {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

impl From<MlErr> for WorkerErr {
    fn from(value: MlErr) -> Self {
        Self::Training(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Codec(e) => e,
            other => io::Error::other(other),
        }
    }
}
