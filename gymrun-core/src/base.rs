//! Core functionalities.
mod device;
mod env;
mod env_details;
mod model_type;
mod trainer;
pub use device::DevicePlacement;
pub use env::{ActionSpace, Env, EnvGeometry};
pub use env_details::EnvDetails;
pub use model_type::ModelType;
pub use trainer::Trainer;

/// Averaged evaluation rewards, one per evaluation cycle in chronological order.
pub type RewardHistory = Vec<f64>;
