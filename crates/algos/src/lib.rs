#![forbid(unsafe_code)]

pub mod admm;
pub mod termination;

pub use admm::{AdmmHandle, AdmmKernel};
