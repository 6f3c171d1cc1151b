//! Learning rate schedules.
use anyhow::Result;
use gymrun_core::error::GymRunError;
use std::str::FromStr;

/// Shape of a learning rate schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LrPolicy {
    /// Constant rate.
    Fixed,

    /// Rate multiplied by `gamma` every [`LrSchedule::STEP_SIZE`] optimization steps.
    Step,

    /// Rate multiplied by `gamma` at every optimization step.
    Exp,
}

impl FromStr for LrPolicy {
    type Err = GymRunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "step" => Ok(Self::Step),
            "exp" => Ok(Self::Exp),
            _ => Err(GymRunError::InvalidConfig(format!("unknown lr_policy: {}", s))),
        }
    }
}

/// Learning rate as a function of the number of optimization steps.
#[derive(Debug, Clone, PartialEq)]
pub struct LrSchedule {
    base: f64,
    policy: LrPolicy,
    gamma: f64,
}

impl LrSchedule {
    /// Interval of decay of [`LrPolicy::Step`].
    pub const STEP_SIZE: usize = 1000;

    /// Constructs a schedule from the name of its policy.
    pub fn new(base: f64, policy: &str, gamma: f64) -> Result<Self> {
        Ok(Self {
            base,
            policy: policy.parse()?,
            gamma,
        })
    }

    /// Learning rate at the given optimization step.
    pub fn rate(&self, n_opts: usize) -> f64 {
        match self.policy {
            LrPolicy::Fixed => self.base,
            LrPolicy::Step => self.base * self.gamma.powi((n_opts / Self::STEP_SIZE) as i32),
            LrPolicy::Exp => self.base * self.gamma.powi(n_opts as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate() -> Result<()> {
        let fixed = LrSchedule::new(0.1, "fixed", 0.5)?;
        assert_eq!(fixed.rate(10_000), 0.1);

        let step = LrSchedule::new(0.1, "step", 0.5)?;
        assert_eq!(step.rate(999), 0.1);
        assert_eq!(step.rate(2000), 0.025);

        let exp = LrSchedule::new(1.0, "exp", 0.5)?;
        assert_eq!(exp.rate(3), 0.125);

        assert!(LrSchedule::new(0.1, "cosine", 0.5).is_err());
        Ok(())
    }
}
