use ndarray::{s, Array2, Axis};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

/// Returns a copy of `data` with its rows in a random order.
pub fn shuffle_rows<R: Rng>(data: &Array2<f32>, rng: &mut R) -> Array2<f32> {
    let mut order: Vec<usize> = (0..data.nrows()).collect();
    order.shuffle(rng);
    data.select(Axis(0), &order)
}

/// Splits `data` into `(testing, training)` partitions.
///
/// The shuffle permutation is drawn from a dedicated RNG seeded with `seed`,
/// so the partition is reproducible for a fixed dataset and seed. The first
/// `round(test_proportion * nrows)` shuffled rows become the testing
/// partition; the remainder become the training partition. Callers that need
/// further randomness (per-epoch shuffles, latent sampling) must use their
/// own RNG handle, created independently of `seed`.
pub fn split_rows(
    data: &Array2<f32>,
    test_proportion: f32,
    seed: u64,
) -> (Array2<f32>, Array2<f32>) {
    let num_testing = (test_proportion * data.nrows() as f32).round() as usize;

    let mut rng = StdRng::seed_from_u64(seed);
    let shuffled = shuffle_rows(data, &mut rng);

    let testing = shuffled.slice(s![..num_testing, ..]).to_owned();
    let training = shuffled.slice(s![num_testing.., ..]).to_owned();
    (testing, training)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn numbered_rows(n: usize) -> Array2<f32> {
        Array2::from_shape_fn((n, 2), |(r, c)| (r * 2 + c) as f32)
    }

    #[test]
    fn split_sizes_follow_rounded_proportion() {
        let data = numbered_rows(10);
        let (testing, training) = split_rows(&data, 0.2, 1);
        assert_eq!(testing.nrows(), 2);
        assert_eq!(training.nrows(), 8);
    }

    #[test]
    fn split_is_reproducible_for_a_fixed_seed() {
        let data = numbered_rows(16);
        let (test_a, train_a) = split_rows(&data, 0.25, 7);
        let (test_b, train_b) = split_rows(&data, 0.25, 7);
        assert_eq!(test_a, test_b);
        assert_eq!(train_a, train_b);
    }

    #[test]
    fn split_partitions_cover_all_rows() {
        let data = numbered_rows(9);
        let (testing, training) = split_rows(&data, 0.3, 3);

        let mut seen: Vec<f32> = testing
            .column(0)
            .iter()
            .chain(training.column(0).iter())
            .copied()
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let expected: Vec<f32> = (0..9).map(|r| (r * 2) as f32).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn shuffle_preserves_rows() {
        let data = numbered_rows(5);
        let mut rng = StdRng::seed_from_u64(11);
        let shuffled = shuffle_rows(&data, &mut rng);

        let mut original: Vec<f32> = data.column(1).to_vec();
        let mut moved: Vec<f32> = shuffled.column(1).to_vec();
        original.sort_by(|a, b| a.partial_cmp(b).unwrap());
        moved.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(original, moved);
    }
}
