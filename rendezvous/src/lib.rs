mod error;
pub mod service;
pub mod synchronization;

pub use error::{RendezvousErr, Result};
pub use synchronization::RoundBarrier;
