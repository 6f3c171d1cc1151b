use super::{Action, Dynamics, StepOutcome};
use anyhow::{bail, Result};
use gymrun_core::{
    normalization::{NormalizationParameters, NormalizationTable},
    ActionSpace,
};
use rand::{rngs::SmallRng, Rng};
use std::f32::consts::PI;

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const G: f32 = 10.0;
const M: f32 = 1.0;
const L: f32 = 1.0;

/// Inverted pendulum swung up with a bounded torque.
///
/// The observation is `(cos(theta), sin(theta), theta_dot)` and the action is a
/// torque in `[-2, 2]`. The reward is the negative of a quadratic cost in angle,
/// velocity and torque. Episodes never terminate before the time limit.
#[derive(Debug, Default)]
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
}

fn angle_normalize(x: f32) -> f32 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

impl Pendulum {
    fn obs(&self) -> Vec<f32> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }
}

impl Dynamics for Pendulum {
    fn name(&self) -> &'static str {
        "Pendulum-v0"
    }

    fn actions(&self) -> Vec<String> {
        vec![]
    }

    fn state_normalization(&self) -> NormalizationTable {
        [(0, 1.0), (1, 1.0), (2, MAX_SPEED)]
            .into_iter()
            .map(|(id, stddev)| (id, NormalizationParameters::continuous(0.0, stddev)))
            .collect()
    }

    fn action_normalization(&self) -> NormalizationTable {
        let mut table = NormalizationTable::new();
        table.insert(3, NormalizationParameters::continuous(0.0, MAX_TORQUE));
        table
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace {
            low: vec![-MAX_TORQUE],
            high: vec![MAX_TORQUE],
        }
    }

    fn state_dim(&self) -> usize {
        3
    }

    fn reset(&mut self, rng: &mut SmallRng) -> Vec<f32> {
        self.theta = rng.gen_range(-PI..PI);
        self.theta_dot = rng.gen_range(-1.0..1.0);
        self.obs()
    }

    fn step(&mut self, action: &Action) -> Result<StepOutcome> {
        let u = match action {
            Action::Continuous(a) if a.len() == 1 => a[0].clamp(-MAX_TORQUE, MAX_TORQUE),
            _ => bail!("Invalid action for {}: {:?}", self.name(), action),
        };
        let (th, thdot) = (self.theta, self.theta_dot);
        let cost = angle_normalize(th).powi(2) + 0.1 * thdot.powi(2) + 0.001 * u.powi(2);

        let new_thdot = thdot + (-3.0 * G / (2.0 * L) * (th + PI).sin() + 3.0 / (M * L * L) * u) * DT;
        self.theta = th + new_thdot * DT;
        self.theta_dot = new_thdot.clamp(-MAX_SPEED, MAX_SPEED);

        Ok(StepOutcome {
            obs: self.obs(),
            reward: -cost,
            terminal: false,
        })
    }

    fn render(&self) -> String {
        format!(
            "theta = {:+.3}, theta_dot = {:+.3}",
            angle_normalize(self.theta),
            self.theta_dot
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_angle_normalize() {
        assert!((angle_normalize(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((angle_normalize(0.25) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_step() -> Result<()> {
        let mut task = Pendulum::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let obs = task.reset(&mut rng);
        assert_eq!(obs.len(), 3);
        assert!((obs[0].powi(2) + obs[1].powi(2) - 1.0).abs() < 1e-5);

        let outcome = task.step(&Action::Continuous(vec![10.0]))?;
        assert!(outcome.reward <= 0.0);
        assert!(!outcome.terminal);
        assert!(outcome.obs[2].abs() <= MAX_SPEED);
        assert!(task.step(&Action::Discrete(0)).is_err());
        Ok(())
    }
}
