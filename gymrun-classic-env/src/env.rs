//! Classic control environment.
use crate::{
    dynamics::{self, Action, Dynamics},
    ClassicEnvConfig, Predictor, ReplayMemory, TrainingBatch, TrainingDataSlot, Transition,
};
use anyhow::{bail, Result};
use gymrun_core::{
    error::GymRunError,
    normalization::{num_output_features, preprocess, NormalizationTable},
    ActionSpace, Env, EnvGeometry, ModelType,
};
use log::{debug, info};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::f32::consts::PI;

fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(ix, _)| ix)
}

fn standard_normal(rng: &mut SmallRng) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

struct Step {
    obs: Vec<f32>,
    action: Vec<f32>,
    reward: f32,
    next_obs: Vec<f32>,
    done: bool,
}

/// Classic control task with a replay memory.
///
/// Rollout episodes explore and store their transitions; test episodes act greedily
/// and store nothing. Discrete and parametric model types explore epsilon-greedily,
/// the continuous model type adds Gaussian noise scaled by epsilon and the action range.
pub struct ClassicEnv {
    config: ClassicEnvConfig,
    dynamics: Box<dyn Dynamics>,
    rng: SmallRng,
    memory: ReplayMemory<Transition>,
    slot: TrainingDataSlot,
    actions: Vec<String>,
    action_space: ActionSpace,
    normalization: NormalizationTable,
    normalization_action: NormalizationTable,
}

impl ClassicEnv {
    /// Builds the environment given by the configuration.
    pub fn build(config: &ClassicEnvConfig) -> Result<Self> {
        let dynamics = dynamics::make(&config.name)?;
        Ok(Self {
            rng: SmallRng::seed_from_u64(config.seed),
            memory: ReplayMemory::new(config.max_replay_memory_size, config.seed.wrapping_add(1)),
            slot: TrainingDataSlot::default(),
            actions: dynamics.actions(),
            action_space: dynamics.action_space(),
            normalization: dynamics.state_normalization(),
            normalization_action: dynamics.action_normalization(),
            config: config.clone(),
            dynamics,
        })
    }

    /// Id of the environment.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Slot in which [`Env::sample_and_load_training_data`] stages minibatches.
    pub fn training_data_slot(&self) -> TrainingDataSlot {
        self.slot.clone()
    }

    /// The number of transitions in the replay memory.
    pub fn replay_memory_len(&self) -> usize {
        self.memory.len()
    }

    fn check_model_type(&self, model_type: ModelType) -> Result<()> {
        let supported = match model_type {
            ModelType::DiscreteAction | ModelType::ParametricAction => !self.actions.is_empty(),
            ModelType::ContinuousAction => !self.action_space.low.is_empty(),
        };
        if !supported {
            return Err(GymRunError::Unsupported(format!(
                "{} with model type {}",
                self.config.name, model_type
            ))
            .into());
        }
        Ok(())
    }

    fn one_hot(&self, ix: usize) -> Vec<f32> {
        let mut v = vec![0.0; self.actions.len()];
        v[ix] = 1.0;
        v
    }

    /// Action features of a one-hot action; zeros for the zero vector.
    fn action_features(&self, one_hot: &[f32]) -> Vec<f32> {
        match one_hot.iter().position(|v| *v > 0.5) {
            Some(ix) => preprocess(&self.normalization_action, &[ix as f32]),
            None => vec![0.0; num_output_features(&self.normalization_action)],
        }
    }

    fn select_action(
        &mut self,
        model_type: ModelType,
        predictor: &Predictor,
        obs: &[f32],
        test: bool,
    ) -> Result<Action> {
        let n_actions = self.actions.len();
        let explore = !test && self.rng.gen::<f64>() < self.config.epsilon;

        match model_type {
            ModelType::DiscreteAction | ModelType::ParametricAction if explore => {
                Ok(Action::Discrete(self.rng.gen_range(0..n_actions)))
            }
            ModelType::DiscreteAction => {
                let q = predictor.q_values(&preprocess(&self.normalization, obs))?;
                if q.len() != n_actions {
                    bail!("Expected {} action values, got {}", n_actions, q.len());
                }
                Ok(Action::Discrete(argmax(&q).unwrap_or(0)))
            }
            ModelType::ParametricAction => {
                let state = preprocess(&self.normalization, obs);
                let q = (0..n_actions)
                    .map(|ix| predictor.q_value(&state, &self.action_features(&self.one_hot(ix))))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Action::Discrete(argmax(&q).unwrap_or(0)))
            }
            ModelType::ContinuousAction => {
                let mut a = predictor.action(obs)?;
                let ActionSpace { low, high } = &self.action_space;
                if a.len() != low.len() {
                    bail!("Expected an action of dimension {}, got {}", low.len(), a.len());
                }
                for (i, v) in a.iter_mut().enumerate() {
                    if !test {
                        let scale = self.config.epsilon as f32 * (high[i] - low[i]) / 2.0;
                        *v += scale * standard_normal(&mut self.rng);
                    }
                    *v = v.clamp(low[i], high[i]);
                }
                Ok(Action::Continuous(a))
            }
        }
    }

    fn remember(&mut self, steps: Vec<Step>) {
        let n_actions = self.actions.len();
        let next_actions: Vec<Vec<f32>> = steps
            .iter()
            .skip(1)
            .map(|s| s.action.clone())
            .chain(steps.last().map(|s| vec![0.0; s.action.len()]))
            .collect();

        for (step, next_action) in steps.into_iter().zip(next_actions) {
            let possible = if step.done { 0.0 } else { 1.0 };
            self.memory.push(Transition {
                state: step.obs,
                action: step.action,
                reward: step.reward,
                next_state: step.next_obs,
                next_action,
                possible_next_actions: vec![possible; n_actions],
                terminal: step.done,
            });
        }
    }
}

impl Env for ClassicEnv {
    type Predictor = Predictor;
    type Memories = Vec<Transition>;

    fn run_episode(
        &mut self,
        model_type: ModelType,
        predictor: &Self::Predictor,
        max_steps: Option<usize>,
        test: bool,
        render: bool,
    ) -> Result<f32> {
        self.check_model_type(model_type)?;
        let time_limit = self.dynamics.time_limit();
        let limit = max_steps.map_or(time_limit, |m| m.min(time_limit));

        let mut obs = self.dynamics.reset(&mut self.rng);
        let mut steps = vec![];
        let mut total_reward = 0f32;

        for ix in 0..limit {
            if render {
                info!("{}: {}", self.config.name, self.dynamics.render());
            }
            let action = self.select_action(model_type, predictor, &obs, test)?;
            let outcome = self.dynamics.step(&action)?;
            total_reward += outcome.reward;
            let done = outcome.terminal || ix + 1 == limit;

            if !test {
                let action = match action {
                    Action::Discrete(a) => self.one_hot(a),
                    Action::Continuous(a) => a,
                };
                steps.push(Step {
                    obs: obs.clone(),
                    action,
                    reward: outcome.reward,
                    next_obs: outcome.obs.clone(),
                    done,
                });
            }
            obs = outcome.obs;
            if outcome.terminal {
                break;
            }
        }

        if !test {
            debug!("Store {} transitions", steps.len());
            self.remember(steps);
        }
        Ok(total_reward)
    }

    fn sample_memories(&mut self, batch_size: usize) -> Result<Self::Memories> {
        self.memory.sample(batch_size)
    }

    fn sample_and_load_training_data(
        &mut self,
        batch_size: usize,
        model_type: ModelType,
        maxq_learning: bool,
    ) -> Result<()> {
        if model_type == ModelType::ContinuousAction {
            return Err(GymRunError::Unsupported(
                "staged training data for continuous actions".to_string(),
            )
            .into());
        }
        let transitions = self.memory.sample(batch_size)?;
        let state_features = |s: &[f32]| preprocess(&self.normalization, s);
        let batch = match model_type {
            ModelType::ParametricAction => TrainingBatch::from_transitions(
                &transitions,
                model_type,
                maxq_learning,
                state_features,
                |a| self.action_features(a),
            )?,
            _ => TrainingBatch::from_transitions(
                &transitions,
                model_type,
                maxq_learning,
                state_features,
                |a| a.to_vec(),
            )?,
        };
        self.slot.stage(batch);
        Ok(())
    }
}

impl EnvGeometry for ClassicEnv {
    fn actions(&self) -> Vec<String> {
        self.actions.clone()
    }

    fn normalization(&self) -> &NormalizationTable {
        &self.normalization
    }

    fn normalization_action(&self) -> &NormalizationTable {
        &self.normalization_action
    }

    fn img(&self) -> bool {
        false
    }

    fn num_input_channels(&self) -> usize {
        0
    }

    fn height(&self) -> usize {
        0
    }

    fn width(&self) -> usize {
        0
    }

    fn state_dim(&self) -> usize {
        self.dynamics.state_dim()
    }

    fn action_dim(&self) -> usize {
        self.action_space.low.len()
    }

    fn action_space(&self) -> ActionSpace {
        self.action_space.clone()
    }
}
