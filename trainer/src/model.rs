use std::collections::HashMap;
use std::path::Path;

use ndarray::{concatenate, s, Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use safetensors::tensor::{Dtype, SafeTensors, TensorView};

use ml_core::{ActFn, ColumnStats, Gradients, Mlp, Trace};
use sim_data::Layout;

use crate::config::DEFAULT_HIDDEN;
use crate::{Result, TrainerErr};

/// Standardization statistics injected into a model: one group for the
/// network-input side (simulation outputs) and one for the label side
/// (simulation inputs). Both groups are persisted with the parameters.
#[derive(Debug, Clone)]
pub struct Normalizer {
    pub input: ColumnStats,
    pub label: ColumnStats,
}

/// Plain regression network: standardized inputs in, destandardized label
/// predictions out.
#[derive(Debug)]
pub struct RegressionModel {
    net: Mlp,
    norm: Normalizer,
}

impl RegressionModel {
    fn build<R: Rng>(layout: Layout, norm: Normalizer, rng: &mut R) -> Self {
        let mut sizes = vec![layout.num_inputs];
        sizes.extend_from_slice(&DEFAULT_HIDDEN);
        sizes.push(layout.num_labels);

        Self {
            net: Mlp::new(&sizes, ActFn::Sigmoid, ActFn::Identity, rng),
            norm,
        }
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.net.input_dim()
    }

    #[inline]
    pub fn num_labels(&self) -> usize {
        self.net.output_dim()
    }

    #[inline]
    pub(crate) fn net(&self) -> &Mlp {
        &self.net
    }

    #[inline]
    pub(crate) fn net_mut(&mut self) -> &mut Mlp {
        &mut self.net
    }

    /// Raw-space predictions for raw-space inputs, no trace recorded.
    pub fn predict(&self, x_raw: ArrayView2<f32>) -> Array2<f32> {
        let x = self.norm.input.standardize(x_raw);
        let out = self.net.infer(x.view());
        self.norm.label.destandardize(out.view())
    }

    /// Training forward pass; the returned predictions are raw-space.
    pub(crate) fn forward(&self, x_raw: ArrayView2<f32>) -> (Array2<f32>, Trace) {
        let x = self.norm.input.standardize(x_raw);
        let (out, trace) = self.net.forward(x.view());
        (self.norm.label.destandardize(out.view()), trace)
    }

    /// Backpropagates a raw-space output delta through the destandardization
    /// into the network, accumulating into `grads`.
    pub(crate) fn backward(&self, trace: &Trace, d_raw: Array2<f32>, grads: &mut Gradients) {
        let d_net = d_raw * &self.norm.label.scale();
        self.net.backward(trace, d_net, grads);
    }
}

/// Generator/discriminator pair. The generator maps standardized inputs
/// plus raw latents to label predictions; the discriminator maps a
/// standardized (input, label) pair to a probability that the pair is real.
#[derive(Debug)]
pub struct AdversarialModel {
    generator: Mlp,
    discriminator: Mlp,
    gan_n: usize,
    norm: Normalizer,
}

impl AdversarialModel {
    fn build<R: Rng>(layout: Layout, gan_n: usize, norm: Normalizer, rng: &mut R) -> Self {
        let mut gen_sizes = vec![layout.num_inputs + gan_n];
        gen_sizes.extend_from_slice(&DEFAULT_HIDDEN);
        gen_sizes.push(layout.num_labels);

        let mut disc_sizes = vec![layout.num_inputs + layout.num_labels];
        disc_sizes.extend_from_slice(&DEFAULT_HIDDEN);
        disc_sizes.push(1);

        Self {
            generator: Mlp::new(&gen_sizes, ActFn::Sigmoid, ActFn::Identity, rng),
            discriminator: Mlp::new(&disc_sizes, ActFn::Sigmoid, ActFn::Sigmoid, rng),
            gan_n,
            norm,
        }
    }

    #[inline]
    pub fn gan_n(&self) -> usize {
        self.gan_n
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.generator.input_dim() - self.gan_n
    }

    #[inline]
    pub fn num_labels(&self) -> usize {
        self.generator.output_dim()
    }

    #[inline]
    pub(crate) fn generator_mut(&mut self) -> &mut Mlp {
        &mut self.generator
    }

    #[inline]
    pub(crate) fn discriminator_mut(&mut self) -> &mut Mlp {
        &mut self.discriminator
    }

    #[inline]
    pub(crate) fn generator(&self) -> &Mlp {
        &self.generator
    }

    #[inline]
    pub(crate) fn discriminator(&self) -> &Mlp {
        &self.discriminator
    }

    fn generator_input(&self, x_raw: ArrayView2<f32>, latents: ArrayView2<f32>) -> Array2<f32> {
        let x = self.norm.input.standardize(x_raw);
        concatenate![Axis(1), x.view(), latents]
    }

    fn discriminator_input(
        &self,
        x_raw: ArrayView2<f32>,
        labels_raw: ArrayView2<f32>,
    ) -> Array2<f32> {
        let x = self.norm.input.standardize(x_raw);
        let y = self.norm.label.standardize(labels_raw);
        concatenate![Axis(1), x.view(), y.view()]
    }

    /// Raw-space synthetic labels for raw-space inputs and latents.
    pub fn generate(&self, x_raw: ArrayView2<f32>, latents: ArrayView2<f32>) -> Array2<f32> {
        let input = self.generator_input(x_raw, latents);
        let out = self.generator.infer(input.view());
        self.norm.label.destandardize(out.view())
    }

    pub(crate) fn generator_forward(
        &self,
        x_raw: ArrayView2<f32>,
        latents: ArrayView2<f32>,
    ) -> (Array2<f32>, Trace) {
        let input = self.generator_input(x_raw, latents);
        let (out, trace) = self.generator.forward(input.view());
        (self.norm.label.destandardize(out.view()), trace)
    }

    /// Probability that each (input, candidate-label) pair is real.
    pub fn discriminate(&self, x_raw: ArrayView2<f32>, labels_raw: ArrayView2<f32>) -> Array2<f32> {
        let input = self.discriminator_input(x_raw, labels_raw);
        self.discriminator.infer(input.view())
    }

    pub(crate) fn discriminator_forward(
        &self,
        x_raw: ArrayView2<f32>,
        labels_raw: ArrayView2<f32>,
    ) -> (Array2<f32>, Trace) {
        let input = self.discriminator_input(x_raw, labels_raw);
        self.discriminator.forward(input.view())
    }

    pub(crate) fn discriminator_backward(
        &self,
        trace: &Trace,
        d_out: Array2<f32>,
        grads: &mut Gradients,
    ) {
        self.discriminator.backward(trace, d_out, grads);
    }

    /// Backpropagates a discriminator-output delta through the frozen
    /// discriminator and on into the generator, accumulating only the
    /// generator's gradients.
    pub(crate) fn generator_backward(
        &self,
        gen_trace: &Trace,
        disc_trace: &Trace,
        d_disc_out: Array2<f32>,
        grads: &mut Gradients,
    ) {
        let d_disc_in = self.discriminator.input_delta(disc_trace, d_disc_out);
        // The generator's destandardization and the discriminator's
        // standardization of the candidate labels cancel, so the label part
        // of the input delta applies to the generator output directly.
        let d_gen_out = d_disc_in.slice(s![.., self.num_inputs()..]).to_owned();
        self.generator.backward(gen_trace, d_gen_out, grads);
    }
}

/// A trainable model, tagged by family.
#[derive(Debug)]
pub enum Model {
    Regression(RegressionModel),
    Adversarial(AdversarialModel),
}

const KIND_REGRESSION: &str = "regression";
const KIND_ADVERSARIAL: &str = "adversarial";

impl Model {
    /// Builds a freshly initialized model of the requested family.
    pub fn build<R: Rng>(
        use_gan: bool,
        gan_n: usize,
        layout: Layout,
        norm: Normalizer,
        rng: &mut R,
    ) -> Self {
        if use_gan {
            Model::Adversarial(AdversarialModel::build(layout, gan_n, norm, rng))
        } else {
            Model::Regression(RegressionModel::build(layout, norm, rng))
        }
    }

    #[inline]
    pub fn is_adversarial(&self) -> bool {
        matches!(self, Model::Adversarial(_))
    }

    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            Model::Regression(_) => KIND_REGRESSION,
            Model::Adversarial(_) => KIND_ADVERSARIAL,
        }
    }

    /// Network-input width (simulation output columns).
    pub fn num_inputs(&self) -> usize {
        match self {
            Model::Regression(m) => m.num_inputs(),
            Model::Adversarial(m) => m.num_inputs(),
        }
    }

    /// Predicted-label width (simulation input columns).
    pub fn num_labels(&self) -> usize {
        match self {
            Model::Regression(m) => m.num_labels(),
            Model::Adversarial(m) => m.num_labels(),
        }
    }

    /// Persists parameters and normalization statistics as a safetensors
    /// blob with the model family recorded in the metadata.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut tensors: Vec<(String, Vec<usize>, Vec<u8>)> = Vec::new();
        let mut metadata = HashMap::new();

        let norm = match self {
            Model::Regression(m) => {
                metadata.insert("kind".to_string(), KIND_REGRESSION.to_string());
                push_net(&mut tensors, "net", &m.net);
                &m.norm
            }
            Model::Adversarial(m) => {
                metadata.insert("kind".to_string(), KIND_ADVERSARIAL.to_string());
                metadata.insert("gan_n".to_string(), m.gan_n.to_string());
                push_net(&mut tensors, "generator", &m.generator);
                push_net(&mut tensors, "discriminator", &m.discriminator);
                &m.norm
            }
        };
        push_stats(&mut tensors, "norm.input", &norm.input);
        push_stats(&mut tensors, "norm.label", &norm.label);

        let views = tensors
            .iter()
            .map(|(name, shape, bytes)| {
                TensorView::new(Dtype::F32, shape.clone(), bytes).map(|v| (name.clone(), v))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TrainerErr::ModelFormat(e.to_string()))?;

        safetensors::tensor::serialize_to_file(views, &Some(metadata), path)
            .map_err(|e| TrainerErr::ModelFormat(e.to_string()))?;

        log::debug!("saved {} model to {}", self.kind(), path.display());
        Ok(())
    }

    /// Loads a model persisted by [`save`](Self::save).
    ///
    /// # Errors
    /// Returns `TrainerErr::ModelFormat` when the blob is unreadable, of an
    /// unknown family, or carries tensors whose shapes do not chain.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;

        let (_, header) = SafeTensors::read_metadata(&bytes)
            .map_err(|e| TrainerErr::ModelFormat(e.to_string()))?;
        let metadata = header.metadata().clone().unwrap_or_default();
        let kind = metadata
            .get("kind")
            .ok_or_else(|| TrainerErr::ModelFormat("missing model kind".into()))?
            .clone();

        let st = SafeTensors::deserialize(&bytes)
            .map_err(|e| TrainerErr::ModelFormat(e.to_string()))?;

        let norm = Normalizer {
            input: read_stats(&st, "norm.input")?,
            label: read_stats(&st, "norm.label")?,
        };

        let model = match kind.as_str() {
            KIND_REGRESSION => Model::Regression(RegressionModel {
                net: read_net(&st, "net", ActFn::Identity)?,
                norm,
            }),
            KIND_ADVERSARIAL => {
                let gan_n: usize = metadata
                    .get("gan_n")
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| TrainerErr::ModelFormat("missing gan_n".into()))?;
                Model::Adversarial(AdversarialModel {
                    generator: read_net(&st, "generator", ActFn::Identity)?,
                    discriminator: read_net(&st, "discriminator", ActFn::Sigmoid)?,
                    gan_n,
                    norm,
                })
            }
            other => {
                return Err(TrainerErr::ModelFormat(format!(
                    "unknown model kind `{other}'"
                )));
            }
        };

        log::debug!("loaded {} model from {}", model.kind(), path.display());
        Ok(model)
    }
}

fn push_array(tensors: &mut Vec<(String, Vec<usize>, Vec<u8>)>, name: String, shape: Vec<usize>, data: &[f32]) {
    tensors.push((name, shape, bytemuck::cast_slice(data).to_vec()));
}

fn push_net(tensors: &mut Vec<(String, Vec<usize>, Vec<u8>)>, prefix: &str, net: &Mlp) {
    for (i, layer) in net.layers().iter().enumerate() {
        let w = layer.weights();
        push_array(
            tensors,
            format!("{prefix}.{i}.weight"),
            vec![w.nrows(), w.ncols()],
            w.as_slice().expect("owned weights are contiguous"),
        );
        let b = layer.biases();
        push_array(
            tensors,
            format!("{prefix}.{i}.bias"),
            vec![b.len()],
            b.as_slice().expect("owned biases are contiguous"),
        );
    }
}

fn push_stats(tensors: &mut Vec<(String, Vec<usize>, Vec<u8>)>, prefix: &str, stats: &ColumnStats) {
    for (field, values) in [
        ("mean", &stats.mean),
        ("std", &stats.std),
        ("min", &stats.min),
        ("max", &stats.max),
    ] {
        push_array(
            tensors,
            format!("{prefix}.{field}"),
            vec![values.len()],
            values.as_slice().expect("owned stats are contiguous"),
        );
    }
}

fn tensor_values(st: &SafeTensors, name: &str) -> Result<(Vec<usize>, Vec<f32>)> {
    let view = st
        .tensor(name)
        .map_err(|_| TrainerErr::ModelFormat(format!("missing tensor `{name}'")))?;
    if view.dtype() != Dtype::F32 {
        return Err(TrainerErr::ModelFormat(format!(
            "tensor `{name}' is not f32"
        )));
    }

    // safetensors data is little-endian and possibly unaligned.
    let values = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok((view.shape().to_vec(), values))
}

fn read_array1(st: &SafeTensors, name: &str) -> Result<Array1<f32>> {
    let (shape, values) = tensor_values(st, name)?;
    if shape.len() != 1 {
        return Err(TrainerErr::ModelFormat(format!(
            "tensor `{name}' is not one-dimensional"
        )));
    }
    Ok(Array1::from_vec(values))
}

fn read_array2(st: &SafeTensors, name: &str) -> Result<Array2<f32>> {
    let (shape, values) = tensor_values(st, name)?;
    if shape.len() != 2 {
        return Err(TrainerErr::ModelFormat(format!(
            "tensor `{name}' is not two-dimensional"
        )));
    }
    Array2::from_shape_vec((shape[0], shape[1]), values)
        .map_err(|e| TrainerErr::ModelFormat(e.to_string()))
}

fn read_stats(st: &SafeTensors, prefix: &str) -> Result<ColumnStats> {
    Ok(ColumnStats {
        mean: read_array1(st, &format!("{prefix}.mean"))?,
        std: read_array1(st, &format!("{prefix}.std"))?,
        min: read_array1(st, &format!("{prefix}.min"))?,
        max: read_array1(st, &format!("{prefix}.max"))?,
    })
}

fn read_net(st: &SafeTensors, prefix: &str, output: ActFn) -> Result<Mlp> {
    let mut params = Vec::new();
    loop {
        let weight_name = format!("{prefix}.{}.weight", params.len());
        if st.tensor(&weight_name).is_err() {
            break;
        }
        let w = read_array2(st, &weight_name)?;
        let b = read_array1(st, &format!("{prefix}.{}.bias", params.len()))?;
        params.push((w, b));
    }

    Ok(Mlp::from_layers(params, ActFn::Sigmoid, output)?)
}
