use super::{fit_layers, RlParameters};
use crate::EnvDetails;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Parameters shared by the actor and the critic.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DdpgTrainingParameters {
    /// Number of transitions per optimization step.
    pub minibatch_size: usize,

    /// Scale of the uniform initialization of the final layers.
    pub final_layer_init: f64,

    /// Name of the optimizer.
    ///
    /// The linear DDPG trainer always uses plain SGD and ignores it.
    pub optimizer: String,

    /// Decay of the learning rates, renamed from `learning_rate_decay`.
    ///
    /// The linear DDPG trainer keeps the learning rates of the actor and the critic
    /// fixed and ignores it.
    pub gamma: f64,

    /// Path of a model to start from. Not read by the linear DDPG trainer.
    pub warm_start_model_path: Option<String>,
}

impl Default for DdpgTrainingParameters {
    fn default() -> Self {
        Self {
            minibatch_size: 128,
            final_layer_init: 0.003,
            optimizer: "ADAM".to_string(),
            gamma: 0.999,
            warm_start_model_path: None,
        }
    }
}

/// Parameters of the actor or the critic network.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DdpgNetworkParameters {
    /// Sizes of the layers; the first and the last entries are set by the trainer.
    pub layers: Vec<i64>,

    /// Activations between layers.
    pub activations: Vec<String>,

    /// L2 regularization of the weights.
    pub l2_decay: f64,

    /// Learning rate.
    pub learning_rate: f64,
}

impl Default for DdpgNetworkParameters {
    fn default() -> Self {
        Self {
            layers: vec![-1, 400, 300, -1],
            activations: ["relu", "relu", "tanh"].iter().map(|s| s.to_string()).collect(),
            l2_decay: 0.01,
            learning_rate: 0.001,
        }
    }
}

/// Parameters of actor-critic (DDPG) trainers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct DdpgModelParameters {
    /// RL parameters.
    pub rl: RlParameters,

    /// Parameters shared by both networks.
    pub shared_training: DdpgTrainingParameters,

    /// Parameters of the actor.
    pub actor_training: DdpgNetworkParameters,

    /// Parameters of the critic.
    pub critic_training: DdpgNetworkParameters,
}

impl DdpgModelParameters {
    /// Fits the layers of the actor and the critic to the environment.
    ///
    /// The actor maps states to actions; the critic maps state-action pairs to a
    /// single value.
    pub fn fit_to_env(&mut self, env_details: &EnvDetails) -> Result<()> {
        fit_layers(
            &mut self.actor_training.layers,
            env_details.state_dim,
            env_details.action_dim,
        )?;
        fit_layers(
            &mut self.critic_training.layers,
            env_details.state_dim + env_details.action_dim,
            1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_to_env() -> Result<()> {
        let mut params = DdpgModelParameters::default();
        let details = EnvDetails {
            state_dim: 3,
            action_dim: 1,
            action_range: (vec![-2.0], vec![2.0]),
        };
        params.fit_to_env(&details)?;
        assert_eq!(params.actor_training.layers, vec![3, 400, 300, 1]);
        assert_eq!(params.critic_training.layers, vec![4, 400, 300, 1]);
        Ok(())
    }

    #[test]
    fn test_network_rejects_unknown_fields() {
        let v = serde_json::json!({"layers": [-1, 8, -1], "momentum": 0.9});
        assert!(serde_json::from_value::<DdpgNetworkParameters>(v).is_err());
    }
}
