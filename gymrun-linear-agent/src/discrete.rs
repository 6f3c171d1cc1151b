//! Q-learning trainer for discrete actions.
use crate::{
    check_device,
    model::{track, LinearModel},
    LrSchedule, Q_INIT_SCALE, SEED,
};
use anyhow::{anyhow, bail, Result};
use gymrun_classic_env::{ClassicEnv, Predict, Predictor, TrainingBatch, TrainingDataSlot};
use gymrun_core::{
    error::GymRunError, normalization::NormalizationTable, params::DiscreteActionModelParameters,
    params::RlParameters, DevicePlacement, ModelType, Trainer,
};
use log::trace;
use ndarray::{Array1, Array2, Axis, Zip};
use std::{cell::RefCell, rc::Rc};

struct QValues(Rc<RefCell<LinearModel>>);

impl Predict for QValues {
    fn q_values(&self, state: &[f32]) -> Result<Vec<f32>> {
        self.0.borrow().forward(state)
    }
}

/// Rewards plus bonuses of the actions taken.
pub(crate) fn boosted_rewards(batch: &TrainingBatch, boost: &Array1<f32>) -> Array1<f32> {
    if boost.is_empty() {
        batch.rewards.clone()
    } else {
        &batch.rewards + &batch.actions.dot(boost)
    }
}

/// Maximum of each row over the entries with a positive mask, `0` if there is none.
pub(crate) fn masked_max(values: &Array2<f32>, mask: &Array2<f32>) -> Array1<f32> {
    Zip::from(values.rows())
        .and(mask.rows())
        .map_collect(|v, m| {
            v.iter()
                .zip(m.iter())
                .filter(|(_, m)| **m > 0.0)
                .map(|(v, _)| *v)
                .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |a| a.max(v))))
                .unwrap_or(0.0)
        })
}

/// Bonus of each action, in the order of the actions.
pub(crate) fn reward_boost(rl: &RlParameters, actions: &[String]) -> Result<Array1<f32>> {
    let boost = match &rl.reward_boost {
        None => return Ok(Array1::zeros(0)),
        Some(boost) => boost,
    };
    if let Some(name) = boost.keys().find(|k| !actions.contains(*k)) {
        return Err(GymRunError::InvalidConfig(format!("reward_boost of unknown action {}", name)).into());
    }
    Ok(actions
        .iter()
        .map(|a| boost.get(a).copied().unwrap_or(0.0) as f32)
        .collect())
}

/// Trainer of a Q-function with one output per discrete action.
///
/// Targets are computed with a target model soft-updated after every optimization
/// step. Training data is read from the slot the environment stages minibatches in.
pub struct DiscreteActionTrainer {
    qnet: Rc<RefCell<LinearModel>>,
    qnet_tgt: LinearModel,
    rl: RlParameters,
    lr: LrSchedule,
    l2_decay: f32,
    minibatch_size: usize,
    reward_boost: Array1<f32>,
    slot: TrainingDataSlot,
    n_opts: usize,
}

impl DiscreteActionTrainer {
    /// Constructs the trainer.
    ///
    /// The layers of `params` are fitted to the state features and the actions.
    pub fn build(
        mut params: DiscreteActionModelParameters,
        state_normalization: &NormalizationTable,
        slot: TrainingDataSlot,
        device: DevicePlacement,
    ) -> Result<Self> {
        check_device(device);
        params.fit_to_features(state_normalization)?;
        let training = &params.training;
        let qnet = LinearModel::from_layers(&training.layers, Q_INIT_SCALE, SEED)?;

        Ok(Self {
            qnet_tgt: qnet.clone(),
            qnet: Rc::new(RefCell::new(qnet)),
            lr: LrSchedule::new(training.learning_rate, &training.lr_policy, training.gamma)?,
            l2_decay: training.l2_decay.unwrap_or(0.0) as f32,
            minibatch_size: training.minibatch_size,
            reward_boost: reward_boost(&params.rl, &params.actions)?,
            rl: params.rl,
            slot,
            n_opts: 0,
        })
    }

    /// The number of optimization steps done so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    fn update_critic(&mut self, batch: TrainingBatch) -> Result<f32> {
        if batch.model_type != ModelType::DiscreteAction {
            bail!("Expected a batch for discrete actions, got {}", batch.model_type);
        }
        let n_actions = self.qnet.borrow().out_dim();
        if batch.actions.ncols() != n_actions {
            bail!("Expected {} actions, got {}", n_actions, batch.actions.ncols());
        }

        let tgt = {
            let reward = boosted_rewards(&batch, &self.reward_boost);
            if self.n_opts < self.rl.reward_burnin {
                reward
            } else {
                let q = self.qnet_tgt.forward_batch(&batch.next_states);
                let next_value = if batch.maxq_learning {
                    masked_max(&q, &batch.possible_next_actions)
                } else {
                    (q * &batch.next_actions).sum_axis(Axis(1))
                };
                reward + next_value * &batch.not_terminals * self.rl.gamma as f32
            }
        };

        let pred = (self.qnet.borrow().forward_batch(&batch.states) * &batch.actions).sum_axis(Axis(1));
        let td_errs = pred - tgt;
        let grad = &batch.actions * &td_errs.view().insert_axis(Axis(1));

        let lr = self.lr.rate(self.n_opts) as f32;
        self.qnet
            .borrow_mut()
            .sgd_step(&batch.states, &grad, lr, self.l2_decay);
        track(
            &mut self.qnet_tgt,
            &self.qnet.borrow(),
            self.rl.target_update_rate as f32,
        );
        self.n_opts += 1;

        Ok(td_errs.mapv(|v| v * v).mean().unwrap_or(0.0))
    }
}

impl Trainer<ClassicEnv> for DiscreteActionTrainer {
    fn name(&self) -> &str {
        "DiscreteActionTrainer"
    }

    fn predictor(&self) -> Predictor {
        Rc::new(QValues(self.qnet.clone()))
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
