use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters of the reinforcement learning objective.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RlParameters {
    /// Discount factor of future rewards.
    ///
    /// Parameter files name this field `reward_discount_factor`; it is renamed while
    /// dispatching.
    pub gamma: f64,

    /// Exploration rate.
    pub epsilon: f64,

    /// Coefficient of soft updates of target networks.
    pub target_update_rate: f64,

    /// Number of optimization steps trained on rewards only before bootstrapping.
    pub reward_burnin: usize,

    /// Use the maximum action value over possible next actions in targets.
    pub maxq_learning: bool,

    /// Bonus added to the reward of the named actions.
    pub reward_boost: Option<BTreeMap<String, f64>>,

    /// Temperature of softmax action selection.
    pub temperature: f64,

    /// Select actions with softmax instead of argmax.
    pub softmax_policy: bool,
}

impl Default for RlParameters {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            epsilon: 0.1,
            target_update_rate: 0.001,
            reward_burnin: 1,
            maxq_learning: true,
            reward_boost: None,
            temperature: 0.01,
            softmax_policy: false,
        }
    }
}

impl RlParameters {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the exploration rate.
    pub fn epsilon(mut self, v: f64) -> Self {
        self.epsilon = v;
        self
    }

    /// Sets max-Q learning.
    pub fn maxq_learning(mut self, v: bool) -> Self {
        self.maxq_learning = v;
        self
    }

    /// Sets the coefficient of soft updates.
    pub fn target_update_rate(mut self, v: f64) -> Self {
        self.target_update_rate = v;
        self
    }
}
