pub mod estimator;
pub mod tables;

pub use estimator::{estimate, RoiBand, RoiResult, RoiScenario};
