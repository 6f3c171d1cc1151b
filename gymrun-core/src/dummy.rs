//! Scripted environment and trainers used in tests.
//!
//! Every call made on these objects is appended to a shared [`CallLog`], so tests can
//! check the order in which the loop driver talks to its collaborators.
use crate::{
    error::GymRunError,
    normalization::{NormalizationParameters, NormalizationTable},
    ActionSpace, Env, EnvGeometry, ModelType, Trainer,
};
use anyhow::Result;
use std::{cell::Cell, cell::RefCell, rc::Rc};

/// A call made on a scripted collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// [`Env::run_episode`].
    Episode(EpisodeCall),

    /// [`Env::sample_memories`].
    SampleMemories(usize),

    /// [`Env::sample_and_load_training_data`].
    LoadTrainingData {
        /// Batch size.
        batch_size: usize,
        /// Model type.
        model_type: ModelType,
        /// Max-Q flag.
        maxq_learning: bool,
    },

    /// [`Trainer::train`].
    TrainStaged,

    /// [`Trainer::train_on_memories`] with the size of the batch.
    TrainOnMemories(usize),
}

/// Arguments of an episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeCall {
    /// Model type.
    pub model_type: ModelType,
    /// Maximum number of steps.
    pub max_steps: Option<usize>,
    /// Test mode.
    pub test: bool,
    /// Rendering.
    pub render: bool,
    /// Number of training steps the predictor had seen.
    pub predictor_version: usize,
}

/// Calls shared between a scripted environment and scripted trainers.
pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Predictor of scripted trainers.
///
/// It exposes the number of training steps of the trainer it was taken from.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPredictor(Rc<Cell<usize>>);

impl ScriptedPredictor {
    /// Number of training steps made so far.
    pub fn version(&self) -> usize {
        self.0.get()
    }
}

/// Environment returning scripted rewards for test episodes.
///
/// Rollouts return `0`. Test episodes return the scripted rewards in order,
/// cycling when exhausted.
pub struct ScriptedEnv {
    test_rewards: Vec<f32>,
    n_test_episodes: usize,
    fail_at_episode: Option<usize>,
    log: CallLog,
    img: bool,
    normalization: NormalizationTable,
    normalization_action: NormalizationTable,
}

impl ScriptedEnv {
    /// Constructs an environment with the rewards of test episodes.
    pub fn new(test_rewards: Vec<f32>) -> Self {
        let normalization = (0..4)
            .map(|i| (i, NormalizationParameters::continuous(0.0, 1.0)))
            .collect();
        let normalization_action = [(4, NormalizationParameters::enumeration(vec![0, 1]))]
            .into_iter()
            .collect();
        Self {
            test_rewards,
            n_test_episodes: 0,
            fail_at_episode: None,
            log: CallLog::default(),
            img: false,
            normalization,
            normalization_action,
        }
    }

    /// Makes the `n`-th call of [`Env::run_episode`] (0-based) fail.
    pub fn fail_at_episode(mut self, n: usize) -> Self {
        self.fail_at_episode = Some(n);
        self
    }

    /// Sets if observations are images.
    pub fn img(mut self, img: bool) -> Self {
        self.img = img;
        self
    }

    /// Shared log of calls.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Calls made so far.
    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    /// Episodes run so far.
    pub fn episodes(&self) -> Vec<EpisodeCall> {
        self.log
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Episode(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Env for ScriptedEnv {
    type Predictor = ScriptedPredictor;
    type Memories = Vec<f32>;

    fn run_episode(
        &mut self,
        model_type: ModelType,
        predictor: &Self::Predictor,
        max_steps: Option<usize>,
        test: bool,
        render: bool,
    ) -> Result<f32> {
        let n_calls = self.episodes().len();
        if self.fail_at_episode == Some(n_calls) {
            anyhow::bail!("scripted failure at episode call {}", n_calls);
        }
        self.log.borrow_mut().push(Call::Episode(EpisodeCall {
            model_type,
            max_steps,
            test,
            render,
            predictor_version: predictor.version(),
        }));

        if test && !self.test_rewards.is_empty() {
            let r = self.test_rewards[self.n_test_episodes % self.test_rewards.len()];
            self.n_test_episodes += 1;
            Ok(r)
        } else {
            Ok(0.0)
        }
    }

    fn sample_memories(&mut self, batch_size: usize) -> Result<Self::Memories> {
        self.log.borrow_mut().push(Call::SampleMemories(batch_size));
        Ok(vec![0.0; batch_size])
    }

    fn sample_and_load_training_data(
        &mut self,
        batch_size: usize,
        model_type: ModelType,
        maxq_learning: bool,
    ) -> Result<()> {
        self.log.borrow_mut().push(Call::LoadTrainingData {
            batch_size,
            model_type,
            maxq_learning,
        });
        Ok(())
    }
}

impl EnvGeometry for ScriptedEnv {
    fn actions(&self) -> Vec<String> {
        vec!["0".to_string(), "1".to_string()]
    }

    fn normalization(&self) -> &NormalizationTable {
        &self.normalization
    }

    fn normalization_action(&self) -> &NormalizationTable {
        &self.normalization_action
    }

    fn img(&self) -> bool {
        self.img
    }

    fn num_input_channels(&self) -> usize {
        if self.img {
            3
        } else {
            0
        }
    }

    fn height(&self) -> usize {
        if self.img {
            84
        } else {
            0
        }
    }

    fn width(&self) -> usize {
        if self.img {
            84
        } else {
            0
        }
    }

    fn state_dim(&self) -> usize {
        4
    }

    fn action_dim(&self) -> usize {
        1
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace {
            low: vec![-2.0],
            high: vec![2.0],
        }
    }
}

struct Probe {
    minibatch_size: usize,
    maxq_learning: bool,
    version: Rc<Cell<usize>>,
    n_predictor_calls: Rc<Cell<usize>>,
    log: CallLog,
}

impl Probe {
    fn new(minibatch_size: usize, maxq_learning: bool) -> Self {
        Self {
            minibatch_size,
            maxq_learning,
            version: Default::default(),
            n_predictor_calls: Default::default(),
            log: CallLog::default(),
        }
    }

    fn predictor(&self) -> ScriptedPredictor {
        self.n_predictor_calls.set(self.n_predictor_calls.get() + 1);
        ScriptedPredictor(self.version.clone())
    }

    fn step(&self, call: Call) {
        self.version.set(self.version.get() + 1);
        self.log.borrow_mut().push(call);
    }
}

/// Trainer reading staged training data, like Q-learning trainers.
pub struct StagedTrainer(Probe);

impl StagedTrainer {
    /// Constructs the trainer.
    pub fn new(minibatch_size: usize, maxq_learning: bool) -> Self {
        Self(Probe::new(minibatch_size, maxq_learning))
    }

    /// Records calls into the given log.
    pub fn log_into(mut self, log: CallLog) -> Self {
        self.0.log = log;
        self
    }

    /// Number of times the predictor was taken.
    pub fn n_predictor_calls(&self) -> Rc<Cell<usize>> {
        self.0.n_predictor_calls.clone()
    }
}

impl Trainer<ScriptedEnv> for StagedTrainer {
    fn name(&self) -> &str {
        "staged"
    }

    fn predictor(&self) -> ScriptedPredictor {
        self.0.predictor()
    }

    fn train(&mut self) -> Result<()> {
        self.0.step(Call::TrainStaged);
        Ok(())
    }

    fn minibatch_size(&self) -> usize {
        self.0.minibatch_size
    }

    fn maxq_learning(&self) -> bool {
        self.0.maxq_learning
    }
}

/// Trainer consuming sampled memories, like actor-critic trainers.
pub struct MemoryTrainer(Probe);

impl MemoryTrainer {
    /// Constructs the trainer.
    pub fn new(minibatch_size: usize) -> Self {
        Self(Probe::new(minibatch_size, false))
    }

    /// Records calls into the given log.
    pub fn log_into(mut self, log: CallLog) -> Self {
        self.0.log = log;
        self
    }

    /// Number of times the predictor was taken.
    pub fn n_predictor_calls(&self) -> Rc<Cell<usize>> {
        self.0.n_predictor_calls.clone()
    }
}

impl Trainer<ScriptedEnv> for MemoryTrainer {
    fn name(&self) -> &str {
        "memory"
    }

    fn predictor(&self) -> ScriptedPredictor {
        self.0.predictor()
    }

    fn train_on_memories(&mut self, predictor: &ScriptedPredictor, memories: Vec<f32>) -> Result<()> {
        if !Rc::ptr_eq(&predictor.0, &self.0.version) {
            return Err(GymRunError::InvalidConfig("foreign predictor".to_string()).into());
        }
        self.0.step(Call::TrainOnMemories(memories.len()));
        Ok(())
    }

    fn minibatch_size(&self) -> usize {
        self.0.minibatch_size
    }

    fn maxq_learning(&self) -> bool {
        self.0.maxq_learning
    }
}
