use std::ops::Range;

use comms::specs::machine_learning::DatasetSpec;
use ndarray::{Array2, ArrayView2, s};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;

use crate::{MlErr, Result};

/// Distance scale between class centers, noise has unit variance.
const CENTER_SPREAD: f32 = 2.0;

/// An in memory labelled dataset, one sample per row with one hot targets.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array2<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The samples, one per row.
    /// * `y` - The one hot targets, one per row.
    ///
    /// # Returns
    /// The dataset or a `SizeMismatch` if `x` and `y` disagree in rows.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dataset rows",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        Ok(Self { x, y })
    }

    /// Generates the synthetic train and test sets described by `spec`.
    ///
    /// Every class gets a random center and each sample is its class center plus unit normal
    /// noise. Sample `i` belongs to class `i % classes`, so any contiguous shard holds every
    /// class evenly. The same spec always yields the same data.
    ///
    /// # Returns
    /// The train set of `spec.size` samples and the test set of `spec.test_size` samples.
    pub fn synthetic(spec: &DatasetSpec) -> Result<(Self, Self)> {
        let features = spec.features.get();
        let classes = spec.classes.get();
        let mut rng = StdRng::seed_from_u64(spec.seed);

        let centers = Array2::from_shape_simple_fn((classes, features), || {
            CENTER_SPREAD * rng.sample::<f32, _>(StandardNormal)
        });

        let mut sample = |len: usize| {
            let mut x = Array2::zeros((len, features));
            let mut y = Array2::zeros((len, classes));

            for (i, mut row) in x.rows_mut().into_iter().enumerate() {
                let class = i % classes;
                row.zip_mut_with(&centers.row(class), |v, &c| {
                    *v = c + rng.sample::<f32, _>(StandardNormal)
                });
                y[(i, class)] = 1.0;
            }

            Self::new(x, y)
        };

        let train = sample(spec.size)?;
        let test = sample(spec.test_size.get())?;
        Ok((train, test))
    }

    /// The amount of samples.
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn features(&self) -> usize {
        self.x.ncols()
    }

    pub fn classes(&self) -> usize {
        self.y.ncols()
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView2<'_, f32> {
        self.y.view()
    }

    /// Copies out the samples in `range`.
    ///
    /// # Returns
    /// The shard or `InvalidShard` if the range is empty or out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.start >= range.end || range.end > self.len() {
            return Err(MlErr::InvalidShard {
                shard: range,
                len: self.len(),
            });
        }

        let Range { start, end } = range;
        Self::new(
            self.x.slice(s![start..end, ..]).to_owned(),
            self.y.slice(s![start..end, ..]).to_owned(),
        )
    }

    /// Iterates the dataset in order, in batches of at most `batch_size` rows.
    pub fn batches(
        &self,
        batch_size: usize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        let len = self.len();

        (0..len).step_by(batch_size.max(1)).map(move |start| {
            let end = (start + batch_size).min(len);
            (self.x.slice(s![start..end, ..]), self.y.slice(s![start..end, ..]))
        })
    }
}
