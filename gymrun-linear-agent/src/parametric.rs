//! Q-learning trainer for actions described by features.
use crate::{
    check_device,
    discrete::masked_max,
    model::{track, LinearModel},
    LrSchedule, Q_INIT_SCALE, SEED,
};
use anyhow::{anyhow, bail, Result};
use gymrun_classic_env::{ClassicEnv, Predict, Predictor, TrainingBatch, TrainingDataSlot};
use gymrun_core::{
    normalization::{preprocess, NormalizationTable},
    params::{ContinuousActionModelParameters, RlParameters},
    DevicePlacement, ModelType, Trainer,
};
use log::{info, trace};
use ndarray::{concatenate, Array1, Array2, Axis};
use std::{cell::RefCell, rc::Rc};

struct StateActionValue(Rc<RefCell<LinearModel>>);

impl Predict for StateActionValue {
    fn q_value(&self, state: &[f32], action: &[f32]) -> Result<f32> {
        let x = [state, action].concat();
        Ok(self.0.borrow().forward(&x)?[0])
    }
}

fn q_batch(model: &LinearModel, states: &Array2<f32>, actions: &Array2<f32>) -> Result<Array1<f32>> {
    let x = concatenate(Axis(1), &[states.view(), actions.view()])?;
    Ok(model.forward_batch(&x).column(0).to_owned())
}

/// Trainer of a Q-function taking the concatenation of state and action features.
///
/// The value of the best next action is the maximum over the possible next actions,
/// each given to the model as the features of its index.
pub struct ParametricActionTrainer {
    qnet: Rc<RefCell<LinearModel>>,
    qnet_tgt: LinearModel,
    rl: RlParameters,
    lr: LrSchedule,
    l2_decay: f32,
    minibatch_size: usize,
    action_normalization: NormalizationTable,
    slot: TrainingDataSlot,
    n_opts: usize,
}

impl ParametricActionTrainer {
    /// Constructs the trainer.
    ///
    /// The layers of `params` are fitted to the state and action features, which
    /// must not share feature ids.
    pub fn build(
        mut params: ContinuousActionModelParameters,
        state_normalization: &NormalizationTable,
        action_normalization: &NormalizationTable,
        slot: TrainingDataSlot,
        device: DevicePlacement,
    ) -> Result<Self> {
        check_device(device);
        params.fit_to_features(state_normalization, action_normalization)?;
        info!("Nearest-neighbor parameters: {:?}", params.knn);
        let training = &params.training;
        let qnet = LinearModel::from_layers(&training.layers, Q_INIT_SCALE, SEED)?;

        Ok(Self {
            qnet_tgt: qnet.clone(),
            qnet: Rc::new(RefCell::new(qnet)),
            lr: LrSchedule::new(training.learning_rate, &training.lr_policy, training.gamma)?,
            l2_decay: training.l2_decay.unwrap_or(0.0) as f32,
            minibatch_size: training.minibatch_size,
            rl: params.rl,
            action_normalization: action_normalization.clone(),
            slot,
            n_opts: 0,
        })
    }

    /// The number of optimization steps done so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Values of every discrete action in the next states, one column per action.
    fn next_q_values(&self, batch: &TrainingBatch) -> Result<Array2<f32>> {
        let n = batch.len();
        let n_actions = batch.possible_next_actions.ncols();
        let mut q = Array2::<f32>::zeros((n, n_actions));
        for ix in 0..n_actions {
            let features = preprocess(&self.action_normalization, &[ix as f32]);
            let actions = Array2::from_shape_fn((n, features.len()), |(_, j)| features[j]);
            q.column_mut(ix)
                .assign(&q_batch(&self.qnet_tgt, &batch.next_states, &actions)?);
        }
        Ok(q)
    }

    fn update_critic(&mut self, batch: TrainingBatch) -> Result<f32> {
        if batch.model_type != ModelType::ParametricAction {
            bail!("Expected a batch for parametric actions, got {}", batch.model_type);
        }

        let tgt = if self.n_opts < self.rl.reward_burnin {
            batch.rewards.clone()
        } else {
            let next_value = if batch.maxq_learning {
                masked_max(&self.next_q_values(&batch)?, &batch.possible_next_actions)
            } else {
                q_batch(&self.qnet_tgt, &batch.next_states, &batch.next_actions)?
            };
            &batch.rewards + &(next_value * &batch.not_terminals * self.rl.gamma as f32)
        };

        let x = concatenate(Axis(1), &[batch.states.view(), batch.actions.view()])?;
        let pred = self.qnet.borrow().forward_batch(&x).column(0).to_owned();
        let td_errs = pred - tgt;
        let grad = td_errs.clone().insert_axis(Axis(1));

        let lr = self.lr.rate(self.n_opts) as f32;
        self.qnet.borrow_mut().sgd_step(&x, &grad, lr, self.l2_decay);
        track(
            &mut self.qnet_tgt,
            &self.qnet.borrow(),
            self.rl.target_update_rate as f32,
        );
        self.n_opts += 1;

        Ok(td_errs.mapv(|v| v * v).mean().unwrap_or(0.0))
    }
}

impl Trainer<ClassicEnv> for ParametricActionTrainer {
    fn name(&self) -> &str {
        "ParametricActionTrainer"
    }

    fn predictor(&self) -> Predictor {
        Rc::new(StateActionValue(self.qnet.clone()))
    }

    fn train(&mut self) -> Result<()> {
        let batch = self
            .slot
            .take()
            .ok_or_else(|| anyhow!("No training data staged for {}", self.name()))?;
        let loss = self.update_critic(batch)?;
        trace!("n_opts = {}, loss = {}", self.n_opts, loss);
        Ok(())
    }

    fn minibatch_size(&self) -> usize {
        self.minibatch_size
    }

    fn maxq_learning(&self) -> bool {
        self.rl.maxq_learning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymrun_classic_env::ClassicEnvConfig;
    use gymrun_core::{error::GymRunError, params::TrainingParameters, Env, EnvGeometry};

    fn params() -> ContinuousActionModelParameters {
        ContinuousActionModelParameters {
            training: TrainingParameters::default()
                .minibatch_size(16)
                .learning_rate(0.05)
                .layers(vec![-1, 16, 8, -1]),
            ..Default::default()
        }
    }

    #[test]
    fn test_layers_take_state_and_action_features() -> Result<()> {
        let env = ClassicEnv::build(&ClassicEnvConfig::default())?;
        let trainer = ParametricActionTrainer::build(
            params(),
            env.normalization(),
            env.normalization_action(),
            env.training_data_slot(),
            DevicePlacement::Cpu,
        )?;
        assert_eq!(trainer.qnet.borrow().in_dim(), 6);
        assert_eq!(trainer.qnet.borrow().out_dim(), 1);
        Ok(())
    }

    #[test]
    fn test_overlapping_features_are_rejected() -> Result<()> {
        let env = ClassicEnv::build(&ClassicEnvConfig::default())?;
        let err = ParametricActionTrainer::build(
            params(),
            env.normalization(),
            env.normalization(),
            env.training_data_slot(),
            DevicePlacement::Cpu,
        )
        .err();
        assert_eq!(
            err.as_ref().and_then(|e| e.downcast_ref::<GymRunError>()),
            Some(&GymRunError::OverlappingFeatures(vec![0, 1, 2, 3]))
        );
        Ok(())
    }

    #[test]
    fn test_train_on_staged_data() -> Result<()> {
        let mut env = ClassicEnv::build(&ClassicEnvConfig::default().epsilon(0.5))?;
        let mut trainer = ParametricActionTrainer::build(
            params(),
            env.normalization(),
            env.normalization_action(),
            env.training_data_slot(),
            DevicePlacement::Cpu,
        )?;
        let predictor = trainer.predictor();
        env.run_episode(ModelType::ParametricAction, &predictor, None, false, false)?;
        env.run_episode(ModelType::ParametricAction, &predictor, None, false, false)?;

        let state = vec![0.0; 4];
        let before = predictor.q_value(&state, &[1.0, 0.0])?;
        for maxq in [true, false, true] {
            env.sample_and_load_training_data(16, ModelType::ParametricAction, maxq)?;
            trainer.train()?;
        }
        assert_eq!(trainer.n_opts(), 3);
        assert_ne!(predictor.q_value(&state, &[1.0, 0.0])?, before);

        env.sample_and_load_training_data(16, ModelType::DiscreteAction, true)?;
        assert!(trainer.train().is_err());
        Ok(())
    }
}
