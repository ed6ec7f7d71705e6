pub mod cloud;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod logging;
pub mod motion;
pub mod scorers;

pub use cloud::*;
pub use error::ScoringError;
pub use evaluator::*;
pub use motion::*;
pub use scorers::*;

pub type Result<T> = anyhow::Result<T>;
