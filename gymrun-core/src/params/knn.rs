use serde::{Deserialize, Serialize};

/// Nearest-neighbor lookup of parametric actions.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct KnnParameters {
    /// Kind of the model producing action embeddings.
    pub model_type: String,

    /// Interval of rebuilding the index.
    pub knn_frequency: Option<usize>,

    /// The number of neighbors looked up.
    pub knn_k: Option<usize>,

    /// Rebuild the index when embeddings drift.
    pub knn_dynreindex: Option<bool>,

    /// Drift triggering a rebuild.
    pub knn_dynreindex_threshold: Option<f64>,

    /// The number of random other actions added on rebuild.
    pub knn_dynreindex_rand_other: Option<usize>,
}

impl Default for KnnParameters {
    fn default() -> Self {
        Self {
            model_type: "DQN".to_string(),
            knn_frequency: None,
            knn_k: None,
            knn_dynreindex: None,
            knn_dynreindex_threshold: None,
            knn_dynreindex_rand_other: None,
        }
    }
}

impl KnnParameters {
    /// Marker of a Q-network over state-action features.
    pub fn dqn() -> Self {
        Self::default()
    }
}
