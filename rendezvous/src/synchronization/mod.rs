mod accumulate;
mod barrier;

pub use barrier::RoundBarrier;
