//! Linear model.
use anyhow::{bail, Result};
use gymrun_core::error::GymRunError;
use log::trace;
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Affine map `y = W x + b` trained with plain gradient descent.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    /// `out_dim x in_dim`.
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl LinearModel {
    /// Constructs a model with weights drawn uniformly from `[-init_scale, init_scale]`.
    pub fn new(in_dim: usize, out_dim: usize, init_scale: f32, seed: u64) -> Self {
        let rng = fastrand::Rng::with_seed(seed);
        let weights =
            Array2::from_shape_fn((out_dim, in_dim), |_| (rng.f32() * 2.0 - 1.0) * init_scale);
        Self {
            weights,
            bias: Array1::zeros(out_dim),
        }
    }

    /// Constructs a model mapping the first to the last entry of a fitted layer list.
    ///
    /// Hidden layer sizes are not used by linear models.
    pub fn from_layers(layers: &[i64], init_scale: f32, seed: u64) -> Result<Self> {
        match (layers.first(), layers.last()) {
            (Some(&i), Some(&o)) if i > 0 && o > 0 && layers.len() >= 2 => {
                Ok(Self::new(i as usize, o as usize, init_scale, seed))
            }
            _ => Err(GymRunError::InvalidConfig(format!(
                "layers must start and end with positive sizes, got {:?}",
                layers
            ))
            .into()),
        }
    }

    /// Input dimension.
    pub fn in_dim(&self) -> usize {
        self.weights.ncols()
    }

    /// Output dimension.
    pub fn out_dim(&self) -> usize {
        self.weights.nrows()
    }

    /// Weights, `out_dim x in_dim`.
    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    /// Output for a single input.
    pub fn forward(&self, x: &[f32]) -> Result<Vec<f32>> {
        if x.len() != self.in_dim() {
            bail!("Expected an input of dimension {}, got {}", self.in_dim(), x.len());
        }
        let y = self.weights.dot(&ArrayView1::from(x)) + &self.bias;
        Ok(y.to_vec())
    }

    /// Outputs for a batch with one input per row.
    pub fn forward_batch(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.weights.t()) + &self.bias
    }

    /// Gradient step on the mean of a batch.
    ///
    /// `grad_out` is the gradient of the loss of each row with respect to the outputs.
    pub fn sgd_step(&mut self, x: &Array2<f32>, grad_out: &Array2<f32>, lr: f32, l2_decay: f32) {
        let n = x.nrows().max(1) as f32;
        let grad_w = grad_out.t().dot(x) / n + &self.weights * l2_decay;
        let grad_b = grad_out.sum_axis(Axis(0)) / n;
        self.weights.scaled_add(-lr, &grad_w);
        self.bias.scaled_add(-lr, &grad_b);
    }
}

/// Applies soft update on the parameters.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &mut LinearModel, src: &LinearModel, tau: f32) {
    dest.weights.zip_mut_with(&src.weights, |d, s| *d = tau * s + (1.0 - tau) * *d);
    dest.bias.zip_mut_with(&src.bias, |d, s| *d = tau * s + (1.0 - tau) * *d);
    trace!("soft update");
}

/// Stacks rows of equal length into a matrix.
pub fn stack_rows<'a>(rows: impl Iterator<Item = &'a [f32]>) -> Result<Array2<f32>> {
    let rows: Vec<&[f32]> = rows.collect();
    let d = rows.first().map_or(0, |r| r.len());
    if rows.iter().any(|r| r.len() != d) {
        bail!("Rows must have the same length");
    }
    Ok(Array2::from_shape_vec((rows.len(), d), rows.concat())?)
}
