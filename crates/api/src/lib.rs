#![forbid(unsafe_code)]

pub mod builder;
pub mod view;
pub mod workspace;

pub use builder::ProblemBuilder;
pub use view::SolutionView;
pub use workspace::{Workspace, WorkspaceState};

pub use qpbridge_algos::{AdmmHandle, AdmmKernel};
pub use qpbridge_core::csc::{encode, CscHandle, KernelFloat, KernelInt};
pub use qpbridge_core::data::KernelData;
pub use qpbridge_core::error::{BridgeError, BridgeResult};
pub use qpbridge_core::math::Scalar;
pub use qpbridge_core::problem::{CscMatrix, ProblemData};
pub use qpbridge_core::settings::Settings;
pub use qpbridge_core::solution::{KernelInfo, KernelSolution, Status, StatusField};
pub use qpbridge_core::traits::SolverKernel;
