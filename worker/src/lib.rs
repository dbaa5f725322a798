pub mod clock;
pub mod config;
mod error;
pub mod node;
pub mod predictor;
pub mod sync;
mod worker;

pub use error::{Result, WorkerErr};
pub use worker::{TrainOutcome, TrainerFactory, Worker};
