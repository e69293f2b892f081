#![forbid(unsafe_code)]

pub mod dense;
pub mod reduced;

pub use dense::{DenseKktMatrix, DenseKktSolver, DensePattern};
pub use reduced::ReducedKkt;
