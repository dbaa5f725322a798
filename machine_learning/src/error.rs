use std::{
    error::Error,
    fmt::{self, Display},
    io,
    ops::Range,
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidShard {
        shard: Range<usize>,
        len: usize,
    },
    InvalidSnapshot(String),
    EmptyDataset,
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::InvalidShard { shard, len } => write!(
                f,
                "The shard {}..{} is empty or out of a dataset of {len} samples",
                shard.start, shard.end
            ),
            MlErr::InvalidSnapshot(reason) => write!(f, "Invalid snapshot: {reason}"),
            MlErr::EmptyDataset => write!(f, "Cannot train or evaluate on an empty dataset"),
        }
    }
}

impl Error for MlErr {}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::InvalidSnapshot(value.to_string())
    }
}
