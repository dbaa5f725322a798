pub mod config;
mod error;
pub mod host;
pub mod invoker;
mod launcher;
mod report;

pub use error::{LauncherErr, Result};
pub use launcher::Launcher;
pub use report::{RunReport, SlotReport};
