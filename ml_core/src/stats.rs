use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::{MlErr, Result};

/// Per-column standardization statistics.
///
/// All four vectors have one entry per column. `std` is the *population*
/// standard deviation (no Bessel correction); columns with zero variance
/// standardize with a unit scale instead of dividing by zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub mean: Array1<f32>,
    pub std: Array1<f32>,
    pub min: Array1<f32>,
    pub max: Array1<f32>,
}

impl ColumnStats {
    /// Computes the statistics of every column of `data`.
    ///
    /// # Errors
    /// Returns `MlErr::EmptyData` when `data` has no rows.
    pub fn fit(data: ArrayView2<f32>) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(MlErr::EmptyData {
                what: "column statistics",
            });
        }

        let mean = data.mean_axis(Axis(0)).expect("nrows checked above");
        let std = data.std_axis(Axis(0), 0.0);
        let min = data.fold_axis(Axis(0), f32::INFINITY, |acc, &x| acc.min(x));
        let max = data.fold_axis(Axis(0), f32::NEG_INFINITY, |acc, &x| acc.max(x));

        Ok(Self {
            mean,
            std,
            min,
            max,
        })
    }

    /// Number of columns these statistics describe.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.mean.len()
    }

    /// The divisor used for standardization: `std`, with zero-variance
    /// columns mapped to 1 so they pass through unscaled.
    pub fn scale(&self) -> Array1<f32> {
        self.std.mapv(|s| if s > 0.0 { s } else { 1.0 })
    }

    /// Maps raw values to standardized values, `(x - mean) / scale`.
    pub fn standardize(&self, x: ArrayView2<f32>) -> Array2<f32> {
        (&x - &self.mean) / &self.scale()
    }

    /// Inverse of [`standardize`](Self::standardize): `x * scale + mean`.
    pub fn destandardize(&self, x: ArrayView2<f32>) -> Array2<f32> {
        &x * &self.scale() + &self.mean
    }
}

/// Per-column variance with `ddof` delta degrees of freedom
/// (0 for population variance, 1 for sample variance).
pub fn column_var(data: ArrayView2<f32>, ddof: f32) -> Array1<f32> {
    data.var_axis(Axis(0), ddof)
}

/// Per-column standard deviation, see [`column_var`].
pub fn column_std(data: ArrayView2<f32>, ddof: f32) -> Array1<f32> {
    data.std_axis(Axis(0), ddof)
}

/// The `q`-quantile of each column, with linear interpolation between
/// adjacent order statistics (`q` in `[0, 1]`).
///
/// # Panics
/// Panics when `data` has no rows.
pub fn column_quantiles(data: ArrayView2<f32>, q: f32) -> Array1<f32> {
    assert!(data.nrows() > 0, "quantiles need at least one row");
    assert!((0.0..=1.0).contains(&q), "quantile out of range: {q}");

    let mut out = Array1::zeros(data.ncols());
    for (c, column) in data.columns().into_iter().enumerate() {
        let mut values: Vec<f32> = column.to_vec();
        values.sort_by(|a, b| a.partial_cmp(b).expect("non-finite value in quantile input"));
        out[c] = interpolate(&values, q);
    }

    out
}

fn interpolate(sorted: &[f32], q: f32) -> f32 {
    let pos = f64::from(q) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = (pos - lo as f64) as f32;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}
