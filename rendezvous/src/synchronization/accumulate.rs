use comms::TensorSet;
use rayon::prelude::*;

/// Adds `other` elementwise into `acc`, both sets must share the same layout.
pub(super) fn add_assign(acc: &mut TensorSet, other: &TensorSet) {
    acc.entries_mut()
        .par_iter_mut()
        .zip(other.entries().par_iter())
        .for_each(|pair| {
            if let (Some(a), Some(b)) = pair {
                a.data_mut()
                    .iter_mut()
                    .zip(b.data())
                    .for_each(|(x, y)| *x += y);
            }
        });
}

/// Multiplies every present value of `set` by `factor`.
pub(super) fn scale(set: &mut TensorSet, factor: f32) {
    set.entries_mut()
        .par_iter_mut()
        .flatten()
        .for_each(|tensor| tensor.data_mut().iter_mut().for_each(|x| *x *= factor));
}

#[cfg(test)]
mod tests {
    use comms::Tensor;

    use super::*;

    #[test]
    fn add_then_scale_is_the_mean() {
        let set = |v: f32| {
            TensorSet::new(vec![
                Some(Tensor::new(vec![2], vec![v, 2.0 * v]).unwrap()),
                None,
            ])
        };

        let mut acc = set(1.0);
        add_assign(&mut acc, &set(3.0));
        scale(&mut acc, 0.5);

        assert_eq!(acc, set(2.0));
    }
}
