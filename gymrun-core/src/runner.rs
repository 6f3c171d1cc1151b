//! Drive a [`Trainer`] on an [`Env`] through rollouts, training and evaluation.
mod config;
use crate::{Env, Evaluator, ModelType, RewardHistory, Trainer};
use anyhow::Result;
pub use config::RunSchedule;
use log::{debug, info};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the episodic training loop.
///
/// # Training loop
///
/// Given an environment, a model type and a trainer, [`Runner::run`] does:
///
/// 0. Take the predictor from the trainer with [`Trainer::predictor`]. The same
///    predictor is used in every episode of the run; it sees the updates the trainer
///    makes in place.
/// 1. For each episode index `i` in `0..num_episodes`:
///     1. Run a rollout episode (exploration enabled). Its return is discarded.
///        Rendering is enabled if `render && i % render_every == 0`.
///     2. If `i % train_every == 0 && i > train_after`, do `num_train_batches`
///        optimization steps:
///         * [`ModelType::ContinuousAction`]: sample memories with
///           [`Env::sample_memories`] and pass them with the predictor to
///           [`Trainer::train_on_memories`].
///         * Other model types: let the environment stage a minibatch with
///           [`Env::sample_and_load_training_data`], then call [`Trainer::train`].
///     3. If `i == num_episodes - 1 || (i % test_every == 0 && i > test_after)`,
///        evaluate the predictor over `avg_over_num_episodes` test episodes and push
///        the average, rounded to two decimals, to the reward history.
///     4. If a score bar is given and the average exceeds it, stop.
/// 2. Log and return the reward history.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     T[Trainer]-->|Predictor|R[Runner]
///     R -->|Predictor|E[Env]
///     E -->|Memories|R
///     R -->|Memories|T
///     E -.->|staged data|T
/// ```
///
/// Errors of the environment or the trainer abort the run and are returned as is.
pub struct Runner {
    schedule: RunSchedule,
    evaluator: Evaluator,
}

impl Runner {
    /// Constructs a runner.
    ///
    /// Fails with [`InvalidSchedule`](crate::error::GymRunError::InvalidSchedule) if a cadence of the schedule is zero.
    pub fn build(schedule: RunSchedule) -> Result<Self> {
        schedule.validate()?;
        let evaluator = Evaluator::new(schedule.avg_over_num_episodes)
            .render(schedule.render, schedule.render_every);
        Ok(Self {
            schedule,
            evaluator,
        })
    }

    /// Returns `true` if training is done after the rollout of episode `i`.
    pub fn is_train_episode(&self, i: usize) -> bool {
        i % self.schedule.train_every == 0 && i > self.schedule.train_after
    }

    /// Returns `true` if evaluation is done after episode `i`.
    pub fn is_test_episode(&self, i: usize) -> bool {
        i + 1 == self.schedule.num_episodes
            || (i % self.schedule.test_every == 0 && i > self.schedule.test_after)
    }

    fn is_render_episode(&self, i: usize) -> bool {
        self.schedule.render && i % self.schedule.render_every == 0
    }

    /// Performs a training step of `num_train_batches` optimization steps.
    pub fn train_step<E, T>(
        &self,
        env: &mut E,
        model_type: ModelType,
        trainer: &mut T,
        predictor: &E::Predictor,
    ) -> Result<()>
    where
        E: Env,
        T: Trainer<E> + ?Sized,
    {
        for _ in 0..self.schedule.num_train_batches {
            match model_type {
                ModelType::ContinuousAction => {
                    let memories = env.sample_memories(trainer.minibatch_size())?;
                    trainer.train_on_memories(predictor, memories)?;
                }
                ModelType::DiscreteAction | ModelType::ParametricAction => {
                    env.sample_and_load_training_data(
                        trainer.minibatch_size(),
                        model_type,
                        trainer.maxq_learning(),
                    )?;
                    trainer.train()?;
                }
            }
        }
        Ok(())
    }

    /// Runs the loop and returns the reward history.
    ///
    /// `run_name` is only used in logs.
    pub fn run<E, T>(
        &self,
        env: &mut E,
        model_type: ModelType,
        trainer: &mut T,
        run_name: &str,
        score_bar: Option<f64>,
    ) -> Result<RewardHistory>
    where
        E: Env,
        T: Trainer<E> + ?Sized,
    {
        let mut avg_reward_history = RewardHistory::new();
        let predictor = trainer.predictor();
        let max_steps = self.schedule.max_steps;

        for i in 0..self.schedule.num_episodes {
            let r = env.run_episode(
                model_type,
                &predictor,
                max_steps,
                false,
                self.is_render_episode(i),
            )?;
            debug!("Episode {}: return = {}", i, r);

            if self.is_train_episode(i) {
                debug!("Train {} batches after episode {}", self.schedule.num_train_batches, i);
                self.train_step(env, model_type, trainer, &predictor)?;
            }

            if self.is_test_episode(i) {
                let avg_rewards = self.evaluator.evaluate(env, model_type, &predictor, max_steps)?;
                info!(
                    "Achieved an average reward score of {} over {} iterations",
                    avg_rewards,
                    self.evaluator.n_episodes()
                );
                avg_reward_history.push(avg_rewards);

                if let Some(score_bar) = score_bar {
                    if avg_rewards > score_bar {
                        info!("Average reward {} exceeds the score bar {}", avg_rewards, score_bar);
                        break;
                    }
                }
            }
        }

        info!(
            "Averaged reward history for {}: {:?}",
            run_name, avg_reward_history
        );
        Ok(avg_reward_history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::{Call, MemoryTrainer, ScriptedEnv, StagedTrainer};
    use crate::error::GymRunError;

    fn rollout_indices(env: &ScriptedEnv) -> usize {
        env.episodes().iter().filter(|e| !e.test).count()
    }

    /// Indices of rollout episodes after which a training step ran.
    fn train_indices(calls: &[Call]) -> Vec<usize> {
        let mut i = 0;
        let mut out = vec![];
        for c in calls {
            match c {
                Call::Episode(e) if !e.test => i += 1,
                Call::TrainStaged | Call::TrainOnMemories(_) => {
                    if out.last() != Some(&(i - 1)) {
                        out.push(i - 1);
                    }
                }
                _ => {}
            }
        }
        out
    }

    #[test]
    fn test_example_schedule() -> Result<()> {
        let schedule = RunSchedule::default()
            .num_episodes(5)
            .train_every(2)
            .train_after(1)
            .test_every(2)
            .test_after(1)
            .avg_over_num_episodes(1)
            .num_train_batches(1);
        let mut env = ScriptedEnv::new(vec![1.0, 2.0]);
        let mut trainer = StagedTrainer::new(8, true).log_into(env.log());

        let history = Runner::build(schedule)?.run(
            &mut env,
            ModelType::DiscreteAction,
            &mut trainer,
            "example",
            None,
        )?;

        assert_eq!(history, vec![1.0, 2.0]);
        assert_eq!(train_indices(&env.calls()), vec![2, 4]);
        assert_eq!(rollout_indices(&env), 5);
        Ok(())
    }

    #[test]
    fn test_gates() -> Result<()> {
        let runner = Runner::build(
            RunSchedule::default()
                .num_episodes(30)
                .train_every(3)
                .train_after(4)
                .test_every(7)
                .test_after(7),
        )?;
        for i in 0..30 {
            assert_eq!(runner.is_train_episode(i), i % 3 == 0 && i > 4);
            assert_eq!(runner.is_test_episode(i), i == 29 || i == 14 || i == 21 || i == 28);
        }
        Ok(())
    }

    #[test]
    fn test_zero_cadences_are_rejected() {
        let base = RunSchedule::default().num_episodes(3);
        for schedule in [
            base.clone().train_every(0),
            base.clone().test_every(0),
            base.clone().avg_over_num_episodes(0),
            base.clone().render(true, 0),
        ] {
            let err = Runner::build(schedule).err().unwrap();
            assert!(matches!(
                err.downcast_ref::<GymRunError>(),
                Some(GymRunError::InvalidSchedule(_))
            ));
        }
        assert!(Runner::build(base.render(false, 0)).is_ok());
    }

    #[test]
    fn test_final_episode_is_always_evaluated() -> Result<()> {
        let schedule = RunSchedule::default()
            .num_episodes(3)
            .test_every(100)
            .test_after(100)
            .avg_over_num_episodes(2);
        let mut env = ScriptedEnv::new(vec![3.0, 4.0]);
        let mut trainer = StagedTrainer::new(8, true);

        let history =
            Runner::build(schedule)?.run(&mut env, ModelType::DiscreteAction, &mut trainer, "t", None)?;
        assert_eq!(history, vec![3.5]);
        Ok(())
    }

    #[test]
    fn test_no_episodes() -> Result<()> {
        let mut env = ScriptedEnv::new(vec![1.0]);
        let mut trainer = StagedTrainer::new(8, true);
        let history = Runner::build(RunSchedule::default().num_episodes(0))?.run(
            &mut env,
            ModelType::DiscreteAction,
            &mut trainer,
            "t",
            None,
        )?;
        assert!(history.is_empty());
        assert!(env.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_score_bar_stops_the_loop() -> Result<()> {
        let schedule = RunSchedule::default()
            .num_episodes(20)
            .train_every(1)
            .train_after(0)
            .test_every(1)
            .test_after(0)
            .avg_over_num_episodes(1)
            .num_train_batches(1);
        let mut env = ScriptedEnv::new(vec![1.0, 5.0, 10.0, 20.0]);
        let mut trainer = StagedTrainer::new(8, true).log_into(env.log());

        // Equal to the bar does not stop.
        let history = Runner::build(schedule)?.run(
            &mut env,
            ModelType::DiscreteAction,
            &mut trainer,
            "t",
            Some(5.0),
        )?;
        assert_eq!(history, vec![1.0, 5.0, 10.0]);

        // Rollouts of episodes 0 to 3; the last call is the evaluation after episode 3.
        assert_eq!(rollout_indices(&env), 4);
        assert!(matches!(env.calls().last(), Some(Call::Episode(e)) if e.test));
        Ok(())
    }

    #[test]
    fn test_without_score_bar_runs_all_episodes() -> Result<()> {
        let schedule = RunSchedule::default()
            .num_episodes(12)
            .test_every(1)
            .test_after(0)
            .avg_over_num_episodes(1);
        let mut env = ScriptedEnv::new(vec![1000.0]);
        let mut trainer = StagedTrainer::new(8, true);
        let history =
            Runner::build(schedule)?.run(&mut env, ModelType::DiscreteAction, &mut trainer, "t", None)?;
        assert_eq!(rollout_indices(&env), 12);
        assert_eq!(history.len(), 11);
        Ok(())
    }

    #[test]
    fn test_staged_training_calls() -> Result<()> {
        let schedule = RunSchedule::default()
            .num_episodes(3)
            .train_every(1)
            .train_after(1)
            .num_train_batches(2)
            .avg_over_num_episodes(1);
        let mut env = ScriptedEnv::new(vec![0.0]);
        let mut trainer = StagedTrainer::new(32, false).log_into(env.log());
        Runner::build(schedule)?.run(&mut env, ModelType::ParametricAction, &mut trainer, "t", None)?;

        let calls: Vec<Call> = env
            .calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Episode(_)))
            .collect();
        let load = Call::LoadTrainingData {
            batch_size: 32,
            model_type: ModelType::ParametricAction,
            maxq_learning: false,
        };
        assert_eq!(calls, vec![load.clone(), Call::TrainStaged, load, Call::TrainStaged]);
        Ok(())
    }

    #[test]
    fn test_continuous_action_trains_on_memories() -> Result<()> {
        let schedule = RunSchedule::default()
            .num_episodes(4)
            .train_every(1)
            .train_after(0)
            .num_train_batches(3)
            .avg_over_num_episodes(1);
        let mut env = ScriptedEnv::new(vec![0.0]);
        let mut trainer = MemoryTrainer::new(16).log_into(env.log());
        Runner::build(schedule)?.run(&mut env, ModelType::ContinuousAction, &mut trainer, "t", None)?;

        let calls = env.calls();
        assert!(!calls.iter().any(|c| matches!(c, Call::LoadTrainingData { .. })));
        let n_sampled = calls.iter().filter(|c| **c == Call::SampleMemories(16)).count();
        let n_trained = calls.iter().filter(|c| **c == Call::TrainOnMemories(16)).count();
        assert_eq!((n_sampled, n_trained), (9, 9));
        Ok(())
    }

    #[test]
    fn test_predictor_is_taken_once_and_sees_updates() -> Result<()> {
        let schedule = RunSchedule::default()
            .num_episodes(4)
            .train_every(1)
            .train_after(0)
            .num_train_batches(1)
            .test_every(1)
            .test_after(0)
            .avg_over_num_episodes(1);
        let mut env = ScriptedEnv::new(vec![0.0]);
        let mut trainer = StagedTrainer::new(8, true);
        let n_predictor_calls = trainer.n_predictor_calls();
        Runner::build(schedule)?.run(&mut env, ModelType::DiscreteAction, &mut trainer, "t", None)?;

        assert_eq!(n_predictor_calls.get(), 1);
        let versions: Vec<(bool, usize)> = env
            .episodes()
            .iter()
            .map(|e| (e.test, e.predictor_version))
            .collect();
        assert_eq!(
            versions,
            vec![
                (false, 0),
                (false, 0),
                (true, 1),
                (false, 1),
                (true, 2),
                (false, 2),
                (true, 3),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_render_cadence_of_rollouts() -> Result<()> {
        let schedule = RunSchedule::default()
            .num_episodes(6)
            .render(true, 3)
            .avg_over_num_episodes(1);
        let mut env = ScriptedEnv::new(vec![0.0]);
        let mut trainer = StagedTrainer::new(8, true);
        Runner::build(schedule)?.run(&mut env, ModelType::DiscreteAction, &mut trainer, "t", None)?;

        let rendered: Vec<bool> = env
            .episodes()
            .iter()
            .filter(|e| !e.test)
            .map(|e| e.render)
            .collect();
        assert_eq!(rendered, vec![true, false, false, true, false, false]);
        Ok(())
    }

    #[test]
    fn test_collaborator_errors_propagate() {
        let schedule = RunSchedule::default().num_episodes(10).avg_over_num_episodes(1);
        let mut env = ScriptedEnv::new(vec![0.0]).fail_at_episode(3);
        let mut trainer = StagedTrainer::new(8, true);
        let err = Runner::build(schedule)
            .unwrap()
            .run(&mut env, ModelType::DiscreteAction, &mut trainer, "t", None)
            .unwrap_err();
        assert!(err.to_string().contains("scripted failure"));
        assert_eq!(env.episodes().len(), 3);
    }

    #[test]
    fn test_train_input_mismatch_is_an_error() {
        let schedule = RunSchedule::default()
            .num_episodes(3)
            .train_every(1)
            .train_after(0)
            .num_train_batches(1);
        let mut env = ScriptedEnv::new(vec![0.0]);
        let mut trainer = MemoryTrainer::new(8);
        let err = Runner::build(schedule)
            .unwrap()
            .run(&mut env, ModelType::DiscreteAction, &mut trainer, "t", None)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GymRunError>(),
            Some(GymRunError::TrainInputMismatch { .. })
        ));
    }
}
