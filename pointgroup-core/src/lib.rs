pub mod error;
pub mod config;
pub mod labels;
pub mod mask;
pub mod instance;

pub use error::{Error, Result};
pub use config::{ConfigError, DataConfig, EvalConfig, PointGroupConfig, TestConfig};
pub use mask::PointMask;
pub use instance::{GtInstance, InstancePrediction, Proposal};
