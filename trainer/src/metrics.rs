use ndarray::{s, Array2, ArrayView1, Axis};

use sim_data::Table;

use crate::Result;

/// Per-epoch mean-squared-error tables for regression training, one row per
/// epoch and one column per label. Rows are written once per epoch and never
/// mutated afterward.
#[derive(Debug)]
pub struct MseMetrics {
    training: Array2<f32>,
    testing: Array2<f32>,
}

impl MseMetrics {
    pub fn new(num_epochs: usize, num_labels: usize) -> Self {
        Self {
            training: Array2::zeros((num_epochs, num_labels)),
            testing: Array2::zeros((num_epochs, num_labels)),
        }
    }

    /// Stores one epoch's per-column MSE for both phases.
    pub fn record(&mut self, epoch: usize, training: ArrayView1<f32>, testing: ArrayView1<f32>) {
        self.training.row_mut(epoch).assign(&training);
        self.testing.row_mut(epoch).assign(&testing);
    }

    #[inline]
    pub fn last_training(&self) -> ArrayView1<'_, f32> {
        self.training.row(self.training.nrows() - 1)
    }

    #[inline]
    pub fn last_testing(&self) -> ArrayView1<'_, f32> {
        self.testing.row(self.testing.nrows() - 1)
    }

    /// Exports both phases as one table: a leading integer `is_training`
    /// column, the testing block (0) first, then the training block (1).
    pub fn into_table(self, label_names: &[String]) -> Result<Table> {
        let num_epochs = self.training.nrows();
        let num_labels = self.training.ncols();

        let mut names = Vec::with_capacity(1 + num_labels);
        names.push("is_training".to_string());
        names.extend(label_names.iter().map(|n| format!("mse_{n}")));

        let mut rows = Array2::zeros((2 * num_epochs, 1 + num_labels));
        rows.slice_mut(s![..num_epochs, 1..]).assign(&self.testing);
        rows.slice_mut(s![num_epochs.., 0]).fill(1.0);
        rows.slice_mut(s![num_epochs.., 1..]).assign(&self.training);

        Ok(Table::new(names, rows)?.with_int_columns(["is_training"]))
    }
}

/// Column names of the adversarial per-epoch export, in order.
pub const BCE_COLUMNS: [&str; 9] = [
    "training_mean_discriminator_real_bce_loss",
    "training_mean_discriminator_generated_bce_loss",
    "training_mean_generator_bce_loss",
    "testing_mean_discriminator_real_bce_loss",
    "testing_mean_discriminator_generated_bce_loss",
    "testing_mean_generator_bce_loss",
    "num_training_samples",
    "num_discriminator_training_paused",
    "num_generator_training_paused",
];

/// One epoch's aggregate adversarial losses and pause counts. The loss
/// triples are ordered discriminator-real, discriminator-generated,
/// generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLossRow {
    pub training: [f32; 3],
    pub testing: [f32; 3],
    pub num_training_samples: usize,
    pub num_discriminator_paused: usize,
    pub num_generator_paused: usize,
}

/// Per-epoch binary-cross-entropy table for adversarial training.
#[derive(Debug)]
pub struct BceMetrics {
    rows: Array2<f32>,
}

impl BceMetrics {
    pub fn new(num_epochs: usize) -> Self {
        Self {
            rows: Array2::zeros((num_epochs, BCE_COLUMNS.len())),
        }
    }

    pub fn record(&mut self, epoch: usize, row: EpochLossRow) {
        let mut out = self.rows.row_mut(epoch);
        out[0] = row.training[0];
        out[1] = row.training[1];
        out[2] = row.training[2];
        out[3] = row.testing[0];
        out[4] = row.testing[1];
        out[5] = row.testing[2];
        out[6] = row.num_training_samples as f32;
        out[7] = row.num_discriminator_paused as f32;
        out[8] = row.num_generator_paused as f32;
    }

    #[inline]
    pub fn row(&self, epoch: usize) -> ArrayView1<'_, f32> {
        self.rows.row(epoch)
    }

    #[inline]
    pub fn num_epochs(&self) -> usize {
        self.rows.nrows()
    }

    /// Mean of one named column over all epochs.
    pub fn column_mean(&self, column: usize) -> f32 {
        self.rows
            .index_axis(Axis(1), column)
            .mean()
            .unwrap_or_default()
    }

    /// Exports the table with the three count columns integer-typed.
    pub fn into_table(self) -> Result<Table> {
        let names: Vec<String> = BCE_COLUMNS.iter().map(|n| n.to_string()).collect();
        Ok(Table::new(names, self.rows)?.with_int_columns([
            "num_training_samples",
            "num_discriminator_training_paused",
            "num_generator_training_paused",
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn mse_export_puts_the_testing_block_first() {
        let mut metrics = MseMetrics::new(2, 2);
        metrics.record(0, array![1.0, 2.0].view(), array![3.0, 4.0].view());
        metrics.record(1, array![5.0, 6.0].view(), array![7.0, 8.0].view());

        let table = metrics
            .into_table(&["a".to_string(), "b".to_string()])
            .unwrap();

        assert_eq!(
            table.names(),
            &["is_training".to_string(), "mse_a".to_string(), "mse_b".to_string()]
        );
        assert!(table.is_int_column("is_training"));
        assert_eq!(
            table.rows(),
            &array![
                [0.0, 3.0, 4.0],
                [0.0, 7.0, 8.0],
                [1.0, 1.0, 2.0],
                [1.0, 5.0, 6.0],
            ]
        );
    }

    #[test]
    fn bce_rows_follow_the_column_order() {
        let mut metrics = BceMetrics::new(1);
        metrics.record(
            0,
            EpochLossRow {
                training: [0.1, 0.2, 0.3],
                testing: [0.4, 0.5, 0.6],
                num_training_samples: 80,
                num_discriminator_paused: 8,
                num_generator_paused: 16,
            },
        );

        assert_eq!(
            metrics.row(0).to_vec(),
            vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 80.0, 8.0, 16.0]
        );

        let table = metrics.into_table().unwrap();
        assert_eq!(table.names().len(), 9);
        assert!(table.is_int_column("num_training_samples"));
        assert!(table.is_int_column("num_generator_training_paused"));
        assert!(!table.is_int_column("training_mean_generator_bce_loss"));
    }
}
