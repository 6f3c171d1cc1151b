//! Configuration of [`ClassicEnv`](super::ClassicEnv).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ClassicEnv`](super::ClassicEnv).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassicEnvConfig {
    /// Id of the environment, `CartPole-v0` or `Pendulum-v0`.
    pub name: String,

    /// Exploration rate of rollout episodes.
    pub epsilon: f64,

    /// Seed of the random number generators of the environment and its replay memory.
    pub seed: u64,

    /// Capacity of the replay memory.
    pub max_replay_memory_size: usize,
}

impl Default for ClassicEnvConfig {
    fn default() -> Self {
        Self {
            name: "CartPole-v0".to_string(),
            epsilon: 0.1,
            seed: 42,
            max_replay_memory_size: 10000,
        }
    }
}

impl ClassicEnvConfig {
    /// Sets the id of the environment.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the exploration rate.
    pub fn epsilon(mut self, v: f64) -> Self {
        self.epsilon = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the capacity of the replay memory.
    pub fn max_replay_memory_size(mut self, v: usize) -> Self {
        self.max_replay_memory_size = v;
        self
    }

    /// Constructs [`ClassicEnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Ok(config)
    }

    /// Saves [`ClassicEnvConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
