pub mod classifier;
pub mod engine;
pub mod indicators;

#[cfg(test)]
mod indicators_tests;

pub use classifier::*;
pub use engine::*;
pub use indicators::*;
