pub mod backend;
pub mod stage;

pub use backend::ComputeBackend;
pub use stage::{Stage, StageFactory};
