use std::ops::Range;

/// Batch arithmetic for one dataset partition.
///
/// A requested batch size of zero, or one larger than the partition, clamps
/// to the partition size (a single batch). The final batch covers whatever
/// remainder is left, so the batch index ranges always tile the partition
/// exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    num_samples: usize,
    batch_size: usize,
    num_batches: usize,
    final_batch_size: usize,
}

impl BatchPlan {
    /// Plans batches for a partition of `num_samples` rows.
    pub fn new(num_samples: usize, requested: usize) -> Self {
        if num_samples == 0 {
            return Self {
                num_samples: 0,
                batch_size: 0,
                num_batches: 0,
                final_batch_size: 0,
            };
        }

        let batch_size = if requested == 0 || requested > num_samples {
            num_samples
        } else {
            requested
        };

        let num_batches = num_samples.div_ceil(batch_size);
        let remainder = num_samples % batch_size;
        let final_batch_size = if remainder == 0 { batch_size } else { remainder };

        Self {
            num_samples,
            batch_size,
            num_batches,
            final_batch_size,
        }
    }

    #[inline]
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[inline]
    pub fn num_batches(&self) -> usize {
        self.num_batches
    }

    #[inline]
    pub fn final_batch_size(&self) -> usize {
        self.final_batch_size
    }

    /// The row range covered by batch `batch`, clipped to the partition.
    #[inline]
    pub fn range(&self, batch: usize) -> Range<usize> {
        let start = batch * self.batch_size;
        start..(start + self.batch_size).min(self.num_samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_tile_the_partition_exactly() {
        for num_samples in 1..40 {
            for requested in 0..45 {
                let plan = BatchPlan::new(num_samples, requested);

                assert_eq!(
                    plan.num_batches(),
                    num_samples.div_ceil(plan.batch_size()),
                    "n={num_samples} req={requested}"
                );

                let mut covered = 0;
                for b in 0..plan.num_batches() {
                    let range = plan.range(b);
                    assert_eq!(range.start, covered);
                    let len = range.len();
                    if b + 1 == plan.num_batches() {
                        assert_eq!(len, plan.final_batch_size());
                    } else {
                        assert_eq!(len, plan.batch_size());
                    }
                    covered = range.end;
                }
                assert_eq!(covered, num_samples);
            }
        }
    }

    #[test]
    fn even_division_keeps_full_final_batch() {
        let plan = BatchPlan::new(8, 4);
        assert_eq!(plan.num_batches(), 2);
        assert_eq!(plan.final_batch_size(), 4);
    }

    #[test]
    fn uneven_division_shrinks_final_batch() {
        let plan = BatchPlan::new(10, 4);
        assert_eq!(plan.num_batches(), 3);
        assert_eq!(plan.final_batch_size(), 2);
        assert_eq!(plan.range(2), 8..10);
    }

    #[test]
    fn zero_and_oversized_requests_clamp_to_a_single_batch() {
        for requested in [0, 11, 100] {
            let plan = BatchPlan::new(10, requested);
            assert_eq!(plan.batch_size(), 10);
            assert_eq!(plan.num_batches(), 1);
            assert_eq!(plan.final_batch_size(), 10);
        }
    }

    #[test]
    fn empty_partition_yields_no_batches() {
        let plan = BatchPlan::new(0, 4);
        assert_eq!(plan.num_batches(), 0);
        assert_eq!(plan.num_samples(), 0);
    }
}
