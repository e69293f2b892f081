#![forbid(unsafe_code)]

pub mod csc;
pub mod data;
pub mod error;
pub mod math;
pub mod problem;
pub mod settings;
pub mod solution;
pub mod traits;

pub use csc::*;
pub use data::*;
pub use error::*;
pub use math::*;
pub use problem::*;
pub use settings::*;
pub use solution::*;
pub use traits::*;
