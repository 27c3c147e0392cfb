pub mod compress;
pub mod confusion;
pub mod grid;
pub mod matrix;
pub mod metrics;
pub mod relation;
pub mod stats;
