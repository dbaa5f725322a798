use std::{fs, path::Path};

use crate::Result;

/// How a single slot ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotReport {
    pub slot: usize,
    pub test_accuracy: f32,
    /// Elapsed time summed over every generation of the slot, in seconds.
    pub elapsed_secs: f64,
    /// The number of generations the slot took.
    pub invocations: usize,
}

/// The outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub mean_accuracy: f32,
    pub elapsed_secs: f64,
    pub invocations: usize,
    pub slots: Vec<SlotReport>,
}

impl RunReport {
    /// Aggregates the reports of every slot of a run.
    pub fn new(slots: Vec<SlotReport>) -> Self {
        let mean_accuracy = if slots.is_empty() {
            0.0
        } else {
            slots.iter().map(|slot| slot.test_accuracy).sum::<f32>() / slots.len() as f32
        };

        Self {
            mean_accuracy,
            elapsed_secs: slots.iter().map(|slot| slot.elapsed_secs).sum(),
            invocations: slots.iter().map(|slot| slot.invocations).sum(),
            slots,
        }
    }

    /// The results line of this run, `"<mean_accuracy> <elapsed_secs>\n"`.
    pub fn to_line(&self) -> String {
        format!("{:.4} {:.2}\n", self.mean_accuracy, self.elapsed_secs)
    }

    /// Writes the results line to `path`, creating its parent directories.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_line())?;
        Ok(())
    }
}
