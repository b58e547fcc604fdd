use ndarray::{Array2, ArrayView2};

/// Mean squared error, reduced to a mean over every element.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mse;

impl Mse {
    pub fn loss(&self, pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        (&pred - &y).mapv(|e| e * e).mean().unwrap_or_default()
    }

    /// dLoss/dPred for the mean-reduced loss.
    pub fn grad(&self, pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        (&pred - &y) * (2.0 / pred.len() as f32)
    }
}

/// Element-wise binary cross-entropy.
///
/// Predictions are clamped away from 0 and 1 so the logarithms stay finite;
/// targets are expected in `[0, 1]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bce;

const BCE_EPS: f32 = 1e-7;

impl Bce {
    /// The per-element loss, same shape as `pred`.
    pub fn unreduced(&self, pred: ArrayView2<f32>, target: ArrayView2<f32>) -> Array2<f32> {
        let mut out = pred.to_owned();
        out.zip_mut_with(&target, |p, &t| {
            let pc = p.clamp(BCE_EPS, 1.0 - BCE_EPS);
            *p = -(t * pc.ln() + (1.0 - t) * (1.0 - pc).ln());
        });
        out
    }

    pub fn mean(&self, pred: ArrayView2<f32>, target: ArrayView2<f32>) -> f32 {
        self.unreduced(pred, target).mean().unwrap_or_default()
    }

    /// dLoss/dPred for the mean-reduced loss.
    pub fn grad(&self, pred: ArrayView2<f32>, target: ArrayView2<f32>) -> Array2<f32> {
        let n = pred.len() as f32;
        let mut out = pred.to_owned();
        out.zip_mut_with(&target, |p, &t| {
            let pc = p.clamp(BCE_EPS, 1.0 - BCE_EPS);
            *p = (pc - t) / (pc * (1.0 - pc)) / n;
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn mse_of_unit_errors_is_one() {
        let pred = array![[1.0, 2.0], [3.0, 4.0]];
        let y = array![[0.0, 1.0], [2.0, 3.0]];
        assert_eq!(Mse.loss(pred.view(), y.view()), 1.0);
    }

    #[test]
    fn mse_grad_scales_residuals() {
        let pred = array![[2.0]];
        let y = array![[0.0]];
        assert_eq!(Mse.grad(pred.view(), y.view())[[0, 0]], 4.0);
    }

    #[test]
    fn bce_is_small_for_confident_correct_predictions() {
        let pred = array![[0.999], [0.001]];
        let target = array![[1.0], [0.0]];
        assert!(Bce.mean(pred.view(), target.view()) < 0.01);
    }

    #[test]
    fn bce_is_large_for_confident_wrong_predictions() {
        let pred = array![[0.001]];
        let target = array![[1.0]];
        assert!(Bce.mean(pred.view(), target.view()) > 5.0);
    }

    #[test]
    fn bce_survives_saturated_predictions() {
        let pred = array![[0.0], [1.0]];
        let target = array![[1.0], [0.0]];
        let loss = Bce.unreduced(pred.view(), target.view());
        assert!(loss.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn bce_grad_points_toward_the_target() {
        let pred = array![[0.3]];
        let target = array![[1.0]];
        // Loss decreases as the prediction moves toward 1.
        assert!(Bce.grad(pred.view(), target.view())[[0, 0]] < 0.0);
    }
}
