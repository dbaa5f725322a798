use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used across the rendezvous service.
pub type Result<T> = std::result::Result<T, RendezvousErr>;

/// The rendezvous service's error type.
#[derive(Debug)]
pub enum RendezvousErr {
    /// The request body could not be decoded into a gradient set.
    Codec(io::Error),
    /// The submitted gradient set differs in layout from the round's accumulator.
    LayoutMismatch { round: u64 },
    /// The round did not gather every contribution before the deadline and was aborted.
    RoundTimedOut {
        round: u64,
        received: usize,
        workers: usize,
    },
    /// Another participant aborted the round this caller was waiting on.
    RoundAborted { round: u64 },
    /// The blocking task running the barrier failed.
    Join(String),
}

impl Display for RendezvousErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RendezvousErr::Codec(e) => write!(f, "Invalid gradient set: {e}"),
            RendezvousErr::LayoutMismatch { round } => write!(
                f,
                "The gradient set does not match the layout of round {round}"
            ),
            RendezvousErr::RoundTimedOut {
                round,
                received,
                workers,
            } => write!(
                f,
                "Round {round} timed out with {received} of {workers} contributions"
            ),
            RendezvousErr::RoundAborted { round } => write!(f, "Round {round} was aborted"),
            RendezvousErr::Join(e) => write!(f, "The barrier task failed: {e}"),
        }
    }
}

impl Error for RendezvousErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RendezvousErr::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RendezvousErr {
    fn from(value: io::Error) -> Self {
        Self::Codec(value)
    }
}
