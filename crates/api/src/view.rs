use qpbridge_core::csc::copy_buffer;
use qpbridge_core::error::{BridgeError, BridgeResult};
use qpbridge_core::math::Scalar;
use qpbridge_core::solution::{KernelInfo, KernelSolution, StatusField};

/// Read-only view over the kernel's result buffers from the most recent solve.
///
/// The view borrows its workspace, so it cannot outlive the next solve,
/// update or cleanup.
#[derive(Debug, Clone, Copy)]
pub struct SolutionView<'w> {
    x: &'w [Scalar],
    y: &'w [Scalar],
    info: &'w KernelInfo,
}

impl<'w> SolutionView<'w> {
    /// Bounds the kernel buffers by the dimensions recorded at setup.
    pub(crate) fn new(solution: KernelSolution<'w>, n: usize, m: usize) -> BridgeResult<Self> {
        let x = solution
            .x
            .get(..n)
            .ok_or_else(|| BridgeError::shape("primal solution", n, solution.x.len()))?;
        let y = solution
            .y
            .get(..m)
            .ok_or_else(|| BridgeError::shape("dual solution", m, solution.y.len()))?;
        Ok(Self {
            x,
            y,
            info: solution.info,
        })
    }

    /// Owned copy of the primal vector, length `n`.
    pub fn primal(&self) -> BridgeResult<Vec<Scalar>> {
        copy_buffer(self.x, "primal solution")
    }

    /// Owned copy of the dual vector, length `m`.
    pub fn dual(&self) -> BridgeResult<Vec<Scalar>> {
        copy_buffer(self.y, "dual solution")
    }

    pub fn primal_slice(&self) -> &'w [Scalar] {
        self.x
    }

    pub fn objective_value(&self) -> Scalar {
        self.info.obj_val
    }

    /// The kernel's status token, passed through verbatim.
    pub fn status(&self) -> String {
        self.info.status.decode()
    }

    pub fn status_field(&self) -> StatusField {
        self.info.status
    }

    pub fn iterations(&self) -> usize {
        self.info.iterations
    }

    pub fn info(&self) -> &'w KernelInfo {
        self.info
    }
}
