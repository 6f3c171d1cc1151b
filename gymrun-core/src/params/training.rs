use serde::{Deserialize, Serialize};

/// Parameters of the optimizer of Q-learning trainers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingParameters {
    /// Number of transitions per optimization step.
    pub minibatch_size: usize,

    /// Base learning rate.
    pub learning_rate: f64,

    /// Name of the optimizer.
    pub optimizer: String,

    /// Sizes of the layers; the first and the last entries are set by the trainer.
    pub layers: Vec<i64>,

    /// Activations between layers.
    pub activations: Vec<String>,

    /// Learning rate schedule, `fixed`, `step` or `exp`.
    pub lr_policy: String,

    /// Decay of the learning rate.
    ///
    /// Parameter files name this field `learning_rate_decay`; it is renamed while
    /// dispatching.
    pub gamma: f64,

    /// Dropout ratio.
    pub dropout_ratio: f64,

    /// Path of a model to start from.
    pub warm_start_model_path: Option<String>,

    /// L2 regularization of the weights.
    pub l2_decay: Option<f64>,
}

impl Default for TrainingParameters {
    fn default() -> Self {
        Self {
            minibatch_size: 16384,
            learning_rate: 0.01,
            optimizer: "ADAM".to_string(),
            layers: vec![-1, 512, 256, 128, 1],
            activations: ["relu", "relu", "relu", "linear"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            lr_policy: "fixed".to_string(),
            gamma: 0.999,
            dropout_ratio: 0.0,
            warm_start_model_path: None,
            l2_decay: None,
        }
    }
}

impl TrainingParameters {
    /// Sets the minibatch size.
    pub fn minibatch_size(mut self, v: usize) -> Self {
        self.minibatch_size = v;
        self
    }

    /// Sets the learning rate.
    pub fn learning_rate(mut self, v: f64) -> Self {
        self.learning_rate = v;
        self
    }

    /// Sets the layers.
    pub fn layers(mut self, v: Vec<i64>) -> Self {
        self.layers = v;
        self
    }
}
