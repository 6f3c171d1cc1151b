//! Actor-critic trainer for continuous actions.
use crate::{
    model::{stack_rows, track, LinearModel},
    SEED,
};
use anyhow::{bail, Result};
use gymrun_classic_env::{ClassicEnv, Predict, Predictor, Transition};
use gymrun_core::{error::GymRunError, params::DdpgModelParameters, EnvDetails, Trainer};
use log::trace;
use ndarray::{concatenate, s, Array1, Array2, Axis};
use std::{cell::RefCell, rc::Rc};

/// Maps a pre-activation to `[low, high]`.
fn squash(z: f32, low: f32, high: f32) -> f32 {
    low + (z.tanh() + 1.0) / 2.0 * (high - low)
}

struct Actor {
    model: Rc<RefCell<LinearModel>>,
    low: Vec<f32>,
    high: Vec<f32>,
}

impl Predict for Actor {
    fn action(&self, obs: &[f32]) -> Result<Vec<f32>> {
        let z = self.model.borrow().forward(obs)?;
        Ok(z.iter()
            .zip(self.low.iter().zip(self.high.iter()))
            .map(|(z, (low, high))| squash(*z, *low, *high))
            .collect())
    }
}

struct Minibatch {
    obs: Array2<f32>,
    act: Array2<f32>,
    reward: Array1<f32>,
    next_obs: Array2<f32>,
    not_done: Array1<f32>,
}

impl Minibatch {
    fn from_memories(memories: &[Transition]) -> Result<Self> {
        Ok(Self {
            obs: stack_rows(memories.iter().map(|t| t.state.as_slice()))?,
            act: stack_rows(memories.iter().map(|t| t.action.as_slice()))?,
            reward: memories.iter().map(|t| t.reward).collect(),
            next_obs: stack_rows(memories.iter().map(|t| t.next_state.as_slice()))?,
            not_done: memories
                .iter()
                .map(|t| if t.terminal { 0.0 } else { 1.0 })
                .collect(),
        })
    }
}

/// Deep deterministic policy gradient with a linear actor and a linear critic.
///
/// The actor squashes its output with `tanh` into the action range. The critic
/// takes the concatenation of the observation and the action. Both have target
/// models soft-updated after every optimization step.
pub struct DdpgTrainer {
    env_details: EnvDetails,
    params: DdpgModelParameters,
    actor: Rc<RefCell<LinearModel>>,
    actor_tgt: LinearModel,
    critic: LinearModel,
    critic_tgt: LinearModel,
    n_opts: usize,
}

impl DdpgTrainer {
    /// Constructs the trainer.
    ///
    /// The layers of the actor and the critic are fitted to the environment.
    pub fn build(mut params: DdpgModelParameters, env_details: EnvDetails) -> Result<Self> {
        params.fit_to_env(&env_details)?;
        if env_details.action_low().len() != env_details.action_dim
            || env_details.action_high().len() != env_details.action_dim
        {
            return Err(GymRunError::InvalidConfig(format!(
                "action range {:?} does not match action_dim {}",
                env_details.action_range, env_details.action_dim
            ))
            .into());
        }

        let init_scale = params.shared_training.final_layer_init as f32;
        let actor = LinearModel::from_layers(&params.actor_training.layers, init_scale, SEED)?;
        let critic =
            LinearModel::from_layers(&params.critic_training.layers, init_scale, SEED + 1)?;

        Ok(Self {
            env_details,
            params,
            actor_tgt: actor.clone(),
            actor: Rc::new(RefCell::new(actor)),
            critic_tgt: critic.clone(),
            critic,
            n_opts: 0,
        })
    }

    /// The number of optimization steps done so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    fn policy(&self, actor: &LinearModel, obs: &Array2<f32>) -> Array2<f32> {
        let z = actor.forward_batch(obs);
        let (low, high) = (self.env_details.action_low(), self.env_details.action_high());
        Array2::from_shape_fn(z.dim(), |(i, j)| squash(z[[i, j]], low[j], high[j]))
    }

    fn update_critic(&mut self, batch: &Minibatch) -> Result<f32> {
        let tgt = {
            let next_act = self.policy(&self.actor_tgt, &batch.next_obs);
            let x = concatenate(Axis(1), &[batch.next_obs.view(), next_act.view()])?;
            let q = self.critic_tgt.forward_batch(&x).column(0).to_owned();
            &batch.reward + &(q * &batch.not_done * self.params.rl.gamma as f32)
        };

        let x = concatenate(Axis(1), &[batch.obs.view(), batch.act.view()])?;
        let pred = self.critic.forward_batch(&x).column(0).to_owned();
        let td_errs = pred - tgt;

        let training = &self.params.critic_training;
        self.critic.sgd_step(
            &x,
            &td_errs.clone().insert_axis(Axis(1)),
            training.learning_rate as f32,
            training.l2_decay as f32,
        );
        Ok(td_errs.mapv(|v| v * v).mean().unwrap_or(0.0))
    }

    fn update_actor(&mut self, batch: &Minibatch) -> f32 {
        let state_dim = self.env_details.state_dim;
        let (low, high) = (self.env_details.action_low(), self.env_details.action_high());
        // The critic is linear, so its gradient in the action is constant.
        let dq_da = self.critic.weights().row(0).slice(s![state_dim..]).to_owned();

        let z = self.actor.borrow().forward_batch(&batch.obs);
        let grad = Array2::from_shape_fn(z.dim(), |(i, j)| {
            let t = z[[i, j]].tanh();
            -dq_da[j] * (1.0 - t * t) * (high[j] - low[j]) / 2.0
        });

        let training = &self.params.actor_training;
        self.actor.borrow_mut().sgd_step(
            &batch.obs,
            &grad,
            training.learning_rate as f32,
            training.l2_decay as f32,
        );

        let act = self.policy(&self.actor.borrow(), &batch.obs);
        -act.dot(&dq_da).mean().unwrap_or(0.0)
    }

    fn opt_(&mut self, batch: &Minibatch) -> Result<(f32, f32)> {
        let loss_critic = self.update_critic(batch)?;
        let loss_actor = self.update_actor(batch);

        let tau = self.params.rl.target_update_rate as f32;
        track(&mut self.critic_tgt, &self.critic, tau);
        track(&mut self.actor_tgt, &self.actor.borrow(), tau);
        self.n_opts += 1;

        Ok((loss_critic, loss_actor))
    }
}

impl Trainer<ClassicEnv> for DdpgTrainer {
    fn name(&self) -> &str {
        "DdpgTrainer"
    }

    fn predictor(&self) -> Predictor {
        Rc::new(Actor {
            model: self.actor.clone(),
            low: self.env_details.action_low().to_vec(),
            high: self.env_details.action_high().to_vec(),
        })
    }

    fn train_on_memories(&mut self, _predictor: &Predictor, memories: Vec<Transition>) -> Result<()> {
        if memories.is_empty() {
            bail!("{} got no memories", self.name());
        }
        let batch = Minibatch::from_memories(&memories)?;
        let (state_dim, action_dim) = (self.env_details.state_dim, self.env_details.action_dim);
        if batch.obs.ncols() != state_dim || batch.act.ncols() != action_dim {
            bail!(
                "Expected memories with state_dim {} and action_dim {}, got {} and {}",
                state_dim,
                action_dim,
                batch.obs.ncols(),
                batch.act.ncols()
            );
        }

        let (loss_critic, loss_actor) = self.opt_(&batch)?;
        trace!(
            "n_opts = {}, loss_critic = {}, loss_actor = {}",
            self.n_opts,
            loss_critic,
            loss_actor
        );
        Ok(())
    }

    fn minibatch_size(&self) -> usize {
        self.params.shared_training.minibatch_size
    }

    fn maxq_learning(&self) -> bool {
        self.params.rl.maxq_learning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymrun_classic_env::ClassicEnvConfig;
    use gymrun_core::{Env, ModelType};

    fn build(env: &ClassicEnv) -> Result<DdpgTrainer> {
        let mut params = DdpgModelParameters::default();
        params.rl.target_update_rate = 0.1;
        params.actor_training.learning_rate = 0.01;
        params.critic_training.learning_rate = 0.01;
        DdpgTrainer::build(params, EnvDetails::from_env(env))
    }

    #[test]
    fn test_squash() {
        assert_eq!(squash(0.0, -2.0, 2.0), 0.0);
        assert!(squash(100.0, -2.0, 2.0) <= 2.0);
        assert!(squash(-100.0, -2.0, 2.0) >= -2.0);
    }

    #[test]
    fn test_build_fits_layers() -> Result<()> {
        let env = ClassicEnv::build(&ClassicEnvConfig::default().name("Pendulum-v0"))?;
        let trainer = build(&env)?;
        assert_eq!(trainer.params.actor_training.layers, vec![3, 400, 300, 1]);
        assert_eq!(trainer.params.critic_training.layers, vec![4, 400, 300, 1]);
        assert_eq!(trainer.critic.in_dim(), 4);

        let action = trainer.predictor().action(&[1.0, 0.0, 0.5])?;
        assert_eq!(action.len(), 1);
        assert!(action[0].abs() <= 2.0);
        Ok(())
    }

    #[test]
    fn test_train_on_memories() -> Result<()> {
        let mut env = ClassicEnv::build(&ClassicEnvConfig::default().name("Pendulum-v0"))?;
        let mut trainer = build(&env)?;
        let predictor = trainer.predictor();
        env.run_episode(ModelType::ContinuousAction, &predictor, Some(50), false, false)?;

        let critic = trainer.critic.clone();
        for _ in 0..3 {
            let memories = env.sample_memories(trainer.minibatch_size())?;
            assert_eq!(memories.len(), 50);
            trainer.train_on_memories(&predictor, memories)?;
        }
        assert_eq!(trainer.n_opts(), 3);
        assert_ne!(trainer.critic, critic);
        assert!(trainer.train_on_memories(&predictor, vec![]).is_err());
        Ok(())
    }

    #[test]
    fn test_learning_rate_decay_and_optimizer_are_ignored() -> Result<()> {
        let mut env = ClassicEnv::build(&ClassicEnvConfig::default().name("Pendulum-v0"))?;
        let mut trainer = build(&env)?;
        let mut other = {
            let mut params = trainer.params.clone();
            params.shared_training.gamma = 0.1;
            params.shared_training.optimizer = "SGD".to_string();
            DdpgTrainer::build(params, EnvDetails::from_env(&env))?
        };
        let predictor = trainer.predictor();
        let other_predictor = other.predictor();
        env.run_episode(ModelType::ContinuousAction, &predictor, Some(20), false, false)?;

        for _ in 0..5 {
            let memories = env.sample_memories(trainer.minibatch_size())?;
            trainer.train_on_memories(&predictor, memories.clone())?;
            other.train_on_memories(&other_predictor, memories)?;
        }
        assert_eq!(trainer.critic, other.critic);
        assert_eq!(*trainer.actor.borrow(), *other.actor.borrow());
        Ok(())
    }

    #[test]
    fn test_staged_data_is_rejected() -> Result<()> {
        let env = ClassicEnv::build(&ClassicEnvConfig::default().name("Pendulum-v0"))?;
        let mut trainer = build(&env)?;
        let err = trainer.train().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GymRunError>(),
            Some(GymRunError::TrainInputMismatch { .. })
        ));
        Ok(())
    }
}
