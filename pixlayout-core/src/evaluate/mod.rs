pub mod config;
pub mod evaluator;
