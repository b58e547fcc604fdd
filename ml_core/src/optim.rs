use ndarray::{Array1, Array2, Zip};

use crate::net::{Gradients, Mlp};

/// Stochastic gradient descent with momentum, weight decay, dampening and
/// optional Nesterov acceleration.
///
/// The velocity buffers are created lazily on the first step so one `Sgd`
/// value can be constructed before the network it will drive.
#[derive(Debug)]
pub struct Sgd {
    learning_rate: f32,
    momentum: f32,
    weight_decay: f32,
    dampening: f32,
    nesterov: bool,
    velocity: Option<(Vec<Array2<f32>>, Vec<Array1<f32>>)>,
}

impl Sgd {
    /// Creates a new `Sgd` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The length of the step taken against the gradient.
    /// * `momentum` - Velocity retention factor; 0 disables momentum.
    /// * `weight_decay` - L2 penalty added to the gradient.
    /// * `dampening` - Fraction of the new gradient withheld from the velocity.
    /// * `nesterov` - Evaluate the step at the look-ahead position.
    pub fn new(
        learning_rate: f32,
        momentum: f32,
        weight_decay: f32,
        dampening: f32,
        nesterov: bool,
    ) -> Self {
        Self {
            learning_rate,
            momentum,
            weight_decay,
            dampening,
            nesterov,
            velocity: None,
        }
    }

    /// Applies one update to every parameter of `net` from `grads`.
    ///
    /// # Panics
    /// Panics when `grads` was not built for `net`'s layer shapes.
    pub fn step(&mut self, net: &mut Mlp, grads: &Gradients) {
        let first = self.velocity.is_none();
        if first {
            let vw = grads.w.iter().map(|g| Array2::zeros(g.dim())).collect();
            let vb = grads.b.iter().map(|g| Array1::zeros(g.dim())).collect();
            self.velocity = Some((vw, vb));
        }

        let (vw, vb) = self.velocity.as_mut().expect("initialized above");
        let lr = self.learning_rate;
        let mu = self.momentum;
        let wd = self.weight_decay;
        let tau = self.dampening;
        let nesterov = self.nesterov;

        let update = move |p: &mut f32, g: &f32, v: &mut f32| {
            let mut d = g + wd * *p;
            if mu != 0.0 {
                *v = if first { d } else { mu * *v + (1.0 - tau) * d };
                d = if nesterov { d + mu * *v } else { *v };
            }
            *p -= lr * d;
        };

        for (l, layer) in net.layers.iter_mut().enumerate() {
            Zip::from(&mut layer.w)
                .and(&grads.w[l])
                .and(&mut vw[l])
                .for_each(update);
            Zip::from(&mut layer.b)
                .and(&grads.b[l])
                .and(&mut vb[l])
                .for_each(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::act::ActFn;
    use crate::loss::Mse;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    fn single_weight_net(w: f32) -> Mlp {
        Mlp::from_layers(
            vec![(array![[w]], array![0.0])],
            ActFn::Identity,
            ActFn::Identity,
        )
        .unwrap()
    }

    fn grads_of(g: f32, net: &Mlp) -> Gradients {
        let mut grads = Gradients::zeros_like(net);
        grads.w[0][[0, 0]] = g;
        grads
    }

    #[test]
    fn plain_sgd_moves_against_the_gradient() {
        let mut net = single_weight_net(1.0);
        let mut sgd = Sgd::new(0.1, 0.0, 0.0, 0.0, false);
        let grads = grads_of(2.0, &net);
        sgd.step(&mut net, &grads);
        assert!((net.layers()[0].weights()[[0, 0]] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn momentum_accumulates_velocity() {
        let mut net = single_weight_net(0.0);
        let mut sgd = Sgd::new(1.0, 0.5, 0.0, 0.0, false);

        // First step: v = 1, w = -1. Second: v = 0.5 + 1 = 1.5, w = -2.5.
        let grads = grads_of(1.0, &net);
        sgd.step(&mut net, &grads);
        assert!((net.layers()[0].weights()[[0, 0]] + 1.0).abs() < 1e-6);
        let grads = grads_of(1.0, &net);
        sgd.step(&mut net, &grads);
        assert!((net.layers()[0].weights()[[0, 0]] + 2.5).abs() < 1e-6);
    }

    #[test]
    fn nesterov_takes_the_lookahead_step() {
        let mut net = single_weight_net(0.0);
        let mut sgd = Sgd::new(1.0, 0.5, 0.0, 0.0, true);

        // First step: v = 1, d = 1 + 0.5 = 1.5, w = -1.5.
        let grads = grads_of(1.0, &net);
        sgd.step(&mut net, &grads);
        assert!((net.layers()[0].weights()[[0, 0]] + 1.5).abs() < 1e-6);
    }

    #[test]
    fn weight_decay_pulls_parameters_toward_zero() {
        let mut net = single_weight_net(10.0);
        let mut sgd = Sgd::new(0.1, 0.0, 0.1, 0.0, false);
        let grads = grads_of(0.0, &net);
        sgd.step(&mut net, &grads);
        assert!((net.layers()[0].weights()[[0, 0]] - 9.9).abs() < 1e-5);
    }

    #[test]
    fn repeated_steps_descend_a_quadratic() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut net = Mlp::new(&[1, 1], ActFn::Identity, ActFn::Identity, &mut rng);
        let mut sgd = Sgd::new(0.2, 0.9, 0.0, 0.0, false);

        let x = array![[1.0], [2.0], [3.0]];
        let y = array![[2.0], [4.0], [6.0]];

        let mut last = f32::INFINITY;
        for _ in 0..100 {
            let (pred, trace) = net.forward(x.view());
            let mut grads = Gradients::zeros_like(&net);
            net.backward(&trace, Mse.grad(pred.view(), y.view()), &mut grads);
            sgd.step(&mut net, &grads);
            last = Mse.loss(net.infer(x.view()).view(), y.view());
        }

        assert!(last < 0.05, "loss did not descend: {last}");
    }
}
