pub use engine::{Engine, Global};
pub use scoring::Scoring;

pub mod alignment;
mod engine;
pub mod scoring;
