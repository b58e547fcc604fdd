use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;

use crate::act::ActFn;
use crate::{MlErr, Result};

/// One fully connected layer: `out = act(x . w + b)`.
#[derive(Debug, Clone)]
pub struct Dense {
    pub(crate) w: Array2<f32>,
    pub(crate) b: Array1<f32>,
    act: ActFn,
}

impl Dense {
    fn init<R: Rng>(input: usize, output: usize, act: ActFn, rng: &mut R) -> Self {
        let limit = 1.0 / (input as f32).sqrt();

        Self {
            w: Array2::from_shape_fn((input, output), |_| rng.random_range(-limit..limit)),
            b: Array1::from_shape_fn(output, |_| rng.random_range(-limit..limit)),
            act,
        }
    }

    #[inline]
    pub fn act(&self) -> ActFn {
        self.act
    }

    #[inline]
    pub fn weights(&self) -> &Array2<f32> {
        &self.w
    }

    #[inline]
    pub fn biases(&self) -> &Array1<f32> {
        &self.b
    }
}

/// Activations recorded during one forward pass, consumed by [`Mlp::backward`].
///
/// A trace is tied to the pass that produced it; running several forward
/// passes yields independent traces, each of which can be backpropagated
/// through later (and more than once) without interfering with the others.
pub struct Trace {
    x: Array2<f32>,
    zs: Vec<Array2<f32>>,
    outs: Vec<Array2<f32>>,
}

/// Per-layer gradient buffers matching an [`Mlp`]'s parameters.
///
/// Backward passes *accumulate* into these buffers; callers decide when to
/// clear them (typically once per epoch).
#[derive(Debug, Clone)]
pub struct Gradients {
    pub(crate) w: Vec<Array2<f32>>,
    pub(crate) b: Vec<Array1<f32>>,
}

impl Gradients {
    pub fn zeros_like(net: &Mlp) -> Self {
        Self {
            w: net.layers.iter().map(|l| Array2::zeros(l.w.dim())).collect(),
            b: net.layers.iter().map(|l| Array1::zeros(l.b.dim())).collect(),
        }
    }

    pub fn zero(&mut self) {
        self.w.iter_mut().for_each(|g| g.fill(0.0));
        self.b.iter_mut().for_each(|g| g.fill(0.0));
    }
}

/// A feed-forward network of [`Dense`] layers operating on row-major
/// batches (one sample per row).
#[derive(Debug, Clone)]
pub struct Mlp {
    pub(crate) layers: Vec<Dense>,
}

impl Mlp {
    /// Builds a network with the given layer widths. `sizes` lists the input
    /// width followed by every layer's output width; hidden layers use
    /// `hidden`, the last layer uses `output`.
    ///
    /// # Panics
    /// Panics when `sizes` has fewer than two entries.
    pub fn new<R: Rng>(sizes: &[usize], hidden: ActFn, output: ActFn, rng: &mut R) -> Self {
        assert!(sizes.len() >= 2, "a network needs at least one layer");

        let last = sizes.len() - 2;
        let layers = sizes
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let act = if i == last { output } else { hidden };
                Dense::init(pair[0], pair[1], act, rng)
            })
            .collect();

        Self { layers }
    }

    /// Reassembles a network from persisted layer parameters.
    ///
    /// # Errors
    /// Returns `MlErr::ShapeMismatch` when consecutive layers do not chain.
    pub fn from_layers(
        params: Vec<(Array2<f32>, Array1<f32>)>,
        hidden: ActFn,
        output: ActFn,
    ) -> Result<Self> {
        if params.is_empty() {
            return Err(MlErr::EmptyData { what: "layer list" });
        }

        let last = params.len() - 1;
        let mut layers = Vec::with_capacity(params.len());
        let mut expected_input: Option<usize> = None;

        for (i, (w, b)) in params.into_iter().enumerate() {
            if let Some(expected) = expected_input {
                if w.nrows() != expected {
                    return Err(MlErr::ShapeMismatch {
                        what: "layer input width",
                        got: w.nrows(),
                        expected,
                    });
                }
            }
            if b.len() != w.ncols() {
                return Err(MlErr::ShapeMismatch {
                    what: "bias width",
                    got: b.len(),
                    expected: w.ncols(),
                });
            }

            expected_input = Some(w.ncols());
            let act = if i == last { output } else { hidden };
            layers.push(Dense { w, b, act });
        }

        Ok(Self { layers })
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layers[0].w.nrows()
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].w.ncols()
    }

    #[inline]
    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Forward pass that records the trace needed for a backward pass.
    pub fn forward(&self, x: ArrayView2<f32>) -> (Array2<f32>, Trace) {
        let mut zs = Vec::with_capacity(self.layers.len());
        let mut outs = Vec::with_capacity(self.layers.len());

        let mut a = x.to_owned();
        for layer in &self.layers {
            let z = a.dot(&layer.w) + &layer.b;
            a = z.mapv(|v| layer.act.f(v));
            zs.push(z);
            outs.push(a.clone());
        }

        let trace = Trace {
            x: x.to_owned(),
            zs,
            outs,
        };
        (a, trace)
    }

    /// Forward pass without trace recording, for evaluation and inference.
    pub fn infer(&self, x: ArrayView2<f32>) -> Array2<f32> {
        let mut a = x.to_owned();
        for layer in &self.layers {
            let z = a.dot(&layer.w) + &layer.b;
            a = z.mapv(|v| layer.act.f(v));
        }
        a
    }

    /// Backpropagates `d_out` (dLoss/dOutput) through `trace`, accumulating
    /// parameter gradients into `grads` and returning dLoss/dInput.
    pub fn backward(&self, trace: &Trace, d_out: Array2<f32>, grads: &mut Gradients) -> Array2<f32> {
        let mut d = d_out;
        for (l, layer) in self.layers.iter().enumerate().rev() {
            let mut dz = d;
            dz.zip_mut_with(&trace.zs[l], |d, &z| *d *= layer.act.df(z));

            let a_prev = if l == 0 {
                trace.x.view()
            } else {
                trace.outs[l - 1].view()
            };

            grads.w[l] += &a_prev.t().dot(&dz);
            grads.b[l] += &dz.sum_axis(Axis(0));

            d = dz.dot(&layer.w.t());
        }
        d
    }

    /// Like [`backward`](Self::backward) but only propagates the error signal
    /// to the input, leaving all parameter gradients untouched. Used when the
    /// network acts as a frozen transform for an upstream network.
    pub fn input_delta(&self, trace: &Trace, d_out: Array2<f32>) -> Array2<f32> {
        let mut d = d_out;
        for (l, layer) in self.layers.iter().enumerate().rev() {
            let mut dz = d;
            dz.zip_mut_with(&trace.zs[l], |d, &z| *d *= layer.act.df(z));
            d = dz.dot(&layer.w.t());
        }
        d
    }
}
