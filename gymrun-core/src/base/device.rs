//! Compute device placement.
use serde::{Deserialize, Serialize};

/// Where trainers allocate their models.
///
/// The placement is passed explicitly to the trainer constructors that need it;
/// everything a trainer builds inside its constructor uses this placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum DevicePlacement {
    /// Host memory.
    #[default]
    Cpu,

    /// Accelerator with the given id.
    Gpu(usize),
}

impl DevicePlacement {
    /// Value of the command line option meaning CPU.
    pub const USE_CPU: i64 = -1;

    /// Builds a placement from a signed accelerator id; negative ids mean CPU.
    pub fn from_gpu_id(gpu_id: i64) -> Self {
        if gpu_id < 0 {
            Self::Cpu
        } else {
            Self::Gpu(gpu_id as usize)
        }
    }

    /// Returns `true` if the placement is the host.
    pub fn is_cpu(&self) -> bool {
        matches!(self, Self::Cpu)
    }
}
