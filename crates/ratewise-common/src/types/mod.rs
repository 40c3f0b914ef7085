//! Core data types for the Ratewise engine

pub mod loan;
pub mod pool;
pub mod position;
pub mod rate;
pub mod signal;
