use crate::csc::KernelFloat;
use crate::data::KernelData;
use crate::error::BridgeResult;
use crate::math::RealNumber;
use crate::settings::Settings;
use crate::solution::KernelSolution;
use anyhow::Result;

/// Factorisation backend used by the kernel for its linear systems.
pub trait KktSolver<T: RealNumber> {
    type Pattern;
    type Matrix;

    fn analyze_pattern(&mut self, pattern: &Self::Pattern) -> Result<()>;

    fn factor(&mut self, matrix: &Self::Matrix) -> Result<()>;

    fn solve(&self, rhs: &mut [T]) -> Result<()>;
}

/// The QP kernel boundary.
///
/// A kernel turns problem data and settings into an opaque solver handle and
/// drives it through solve and in-place updates. Callers guarantee that every
/// slice handed to an update already has the length recorded in the handle and
/// that bounds satisfy `l <= u`; kernels may assume this.
pub trait SolverKernel {
    type Handle;

    fn default_settings(&self) -> Settings {
        Settings::default()
    }

    fn setup(&mut self, data: &KernelData, settings: &Settings) -> BridgeResult<Self::Handle>;

    /// Runs the algorithm to completion, starting from the handle's current
    /// iterates when warm starting is enabled.
    fn solve(&mut self, handle: &mut Self::Handle);

    fn update_linear_cost(&mut self, handle: &mut Self::Handle, q: &[KernelFloat]);

    fn update_bounds(&mut self, handle: &mut Self::Handle, l: &[KernelFloat], u: &[KernelFloat]);

    /// Overwrites values of `P`; `positions` selects entries of the nonzero
    /// array, `None` means all of them in order.
    fn update_cost_matrix(
        &mut self,
        handle: &mut Self::Handle,
        values: &[KernelFloat],
        positions: Option<&[usize]>,
    ) -> BridgeResult<()>;

    fn update_constraint_matrix(
        &mut self,
        handle: &mut Self::Handle,
        values: &[KernelFloat],
        positions: Option<&[usize]>,
    ) -> BridgeResult<()>;

    fn update_settings(&mut self, handle: &mut Self::Handle, settings: &Settings)
        -> BridgeResult<()>;

    fn warm_start(
        &mut self,
        handle: &mut Self::Handle,
        x: Option<&[KernelFloat]>,
        y: Option<&[KernelFloat]>,
    );

    fn solution<'h>(&self, handle: &'h Self::Handle) -> KernelSolution<'h>;

    /// Releases the solver state. The handle is consumed, so it cannot be
    /// released twice.
    fn cleanup(&mut self, handle: Self::Handle);
}
