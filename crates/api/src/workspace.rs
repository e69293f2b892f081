use crate::view::SolutionView;
use qpbridge_algos::AdmmKernel;
use qpbridge_core::csc::check_entry_positions;
use qpbridge_core::data::KernelData;
use qpbridge_core::error::{BridgeError, BridgeResult};
use qpbridge_core::math::Scalar;
use qpbridge_core::problem::ProblemData;
use qpbridge_core::settings::Settings;
use qpbridge_core::solution::KernelInfo;
use qpbridge_core::traits::SolverKernel;
use tracing::debug;

/// Lifecycle state of a [`Workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    Created,
    Configured,
    Solved,
    Cleaned,
}

/// Owner of one QP's settings, kernel-side data and solver state.
///
/// The workspace is single-owner and not synchronised; use one workspace per
/// problem. Everything it acquires is released exactly once, in reverse
/// order of acquisition, by [`Workspace::cleanup`] or on drop.
pub struct Workspace<K: SolverKernel = AdmmKernel> {
    kernel: K,
    settings: Option<Settings>,
    data: Option<KernelData>,
    solver: Option<K::Handle>,
    state: WorkspaceState,
    /// Set by the first solve; results stay readable through later updates.
    has_solution: bool,
}

impl Workspace<AdmmKernel> {
    pub fn new() -> Self {
        Self::with_kernel(AdmmKernel::new())
    }

    /// Creates a workspace and binds `problem` in one step.
    pub fn from_problem(problem: &ProblemData, settings: Settings) -> BridgeResult<Self> {
        let mut workspace = Self::new();
        workspace.update_settings(settings)?;
        workspace.setup(problem)?;
        Ok(workspace)
    }
}

impl Default for Workspace<AdmmKernel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: SolverKernel> Workspace<K> {
    pub fn with_kernel(kernel: K) -> Self {
        let settings = kernel.default_settings();
        debug!("workspace created");
        Self {
            kernel,
            settings: Some(settings),
            data: None,
            solver: None,
            state: WorkspaceState::Created,
            has_solution: false,
        }
    }

    pub fn state(&self) -> WorkspaceState {
        self.state
    }

    /// Current settings; `None` once the workspace has been cleaned.
    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    /// The kernel-side copy of the bound problem data.
    pub fn data(&self) -> Option<&KernelData> {
        self.data.as_ref()
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Replaces the settings. Once a solver exists the kernel is updated too.
    pub fn update_settings(&mut self, settings: Settings) -> BridgeResult<()> {
        if self.state == WorkspaceState::Cleaned {
            return Err(BridgeError::NotConfigured);
        }
        settings.validate()?;
        if let Some(handle) = self.solver.as_mut() {
            self.kernel.update_settings(handle, &settings)?;
        }
        self.settings = Some(settings);
        Ok(())
    }

    /// Encodes `problem` and hands it to the kernel. Allowed once per workspace.
    ///
    /// On failure nothing is retained and the workspace stays `Created`.
    pub fn setup(&mut self, problem: &ProblemData) -> BridgeResult<()> {
        if self.state != WorkspaceState::Created {
            return Err(BridgeError::AlreadyConfigured);
        }
        let settings = self.settings.as_ref().ok_or(BridgeError::NotConfigured)?;
        settings.validate()?;
        let data = KernelData::from_problem(problem)?;
        let handle = match self.kernel.setup(&data, settings) {
            Ok(handle) => handle,
            Err(err) => {
                debug!(%err, "kernel setup rejected; releasing data");
                data.release();
                return Err(err);
            }
        };
        debug!(n = data.n(), m = data.m(), "workspace configured");
        self.data = Some(data);
        self.solver = Some(handle);
        self.state = WorkspaceState::Configured;
        self.has_solution = false;
        Ok(())
    }

    pub fn solve(&mut self) -> BridgeResult<()> {
        let (kernel, handle, _) = self.live()?;
        kernel.solve(handle);
        self.state = WorkspaceState::Solved;
        self.has_solution = true;
        debug!("workspace solved");
        Ok(())
    }

    pub fn update_linear_cost(&mut self, q: &[Scalar]) -> BridgeResult<()> {
        let (kernel, handle, data) = self.live()?;
        data.set_linear_cost(q)?;
        kernel.update_linear_cost(handle, q);
        self.mark_updated("linear cost");
        Ok(())
    }

    pub fn update_bounds(&mut self, l: &[Scalar], u: &[Scalar]) -> BridgeResult<()> {
        let (kernel, handle, data) = self.live()?;
        data.set_bounds(l, u)?;
        kernel.update_bounds(handle, l, u);
        self.mark_updated("bounds");
        Ok(())
    }

    /// Overwrites all nonzero values of `P`, in the order they were supplied.
    pub fn update_cost_matrix_values(&mut self, values: &[Scalar]) -> BridgeResult<()> {
        let (kernel, handle, data) = self.live()?;
        let nnz = data.p().nnz();
        if values.len() != nnz {
            return Err(BridgeError::shape("cost matrix values", nnz, values.len()));
        }
        kernel.update_cost_matrix(handle, values, None)?;
        data.p_mut().overwrite_values(values)?;
        self.mark_updated("cost matrix");
        Ok(())
    }

    /// Overwrites selected nonzero values of `P` by position.
    pub fn update_cost_matrix_entries(
        &mut self,
        values: &[Scalar],
        positions: &[usize],
    ) -> BridgeResult<()> {
        let (kernel, handle, data) = self.live()?;
        check_entry_positions(data.p().nnz(), values.len(), positions)?;
        kernel.update_cost_matrix(handle, values, Some(positions))?;
        data.p_mut().overwrite_entries(values, positions)?;
        self.mark_updated("cost matrix entries");
        Ok(())
    }

    /// Overwrites all nonzero values of `A`, in the order they were supplied.
    pub fn update_constraint_matrix_values(&mut self, values: &[Scalar]) -> BridgeResult<()> {
        let (kernel, handle, data) = self.live()?;
        let nnz = data.a().nnz();
        if values.len() != nnz {
            return Err(BridgeError::shape("constraint matrix values", nnz, values.len()));
        }
        kernel.update_constraint_matrix(handle, values, None)?;
        data.a_mut().overwrite_values(values)?;
        self.mark_updated("constraint matrix");
        Ok(())
    }

    /// Overwrites selected nonzero values of `A` by position.
    pub fn update_constraint_matrix_entries(
        &mut self,
        values: &[Scalar],
        positions: &[usize],
    ) -> BridgeResult<()> {
        let (kernel, handle, data) = self.live()?;
        check_entry_positions(data.a().nnz(), values.len(), positions)?;
        kernel.update_constraint_matrix(handle, values, Some(positions))?;
        data.a_mut().overwrite_entries(values, positions)?;
        self.mark_updated("constraint matrix entries");
        Ok(())
    }

    /// Seeds the kernel iterates for the next solve.
    pub fn warm_start(&mut self, x: Option<&[Scalar]>, y: Option<&[Scalar]>) -> BridgeResult<()> {
        let (kernel, handle, data) = self.live()?;
        if let Some(x) = x {
            if x.len() != data.n() {
                return Err(BridgeError::shape("primal warm start", data.n(), x.len()));
            }
        }
        if let Some(y) = y {
            if y.len() != data.m() {
                return Err(BridgeError::shape("dual warm start", data.m(), y.len()));
            }
        }
        kernel.warm_start(handle, x, y);
        Ok(())
    }

    /// View over the results of the last solve.
    ///
    /// Updates made since that solve are not reflected until the next
    /// [`Workspace::solve`].
    pub fn solution(&self) -> BridgeResult<SolutionView<'_>> {
        match self.state {
            WorkspaceState::Created | WorkspaceState::Cleaned => Err(BridgeError::NotConfigured),
            WorkspaceState::Configured if !self.has_solution => {
                Err(BridgeError::NoSolutionAvailable)
            }
            WorkspaceState::Configured | WorkspaceState::Solved => {
                match (self.solver.as_ref(), self.data.as_ref()) {
                    (Some(handle), Some(data)) => {
                        SolutionView::new(self.kernel.solution(handle), data.n(), data.m())
                    }
                    _ => Err(BridgeError::NotConfigured),
                }
            }
        }
    }

    pub fn primal_solution(&self) -> BridgeResult<Vec<Scalar>> {
        self.solution()?.primal()
    }

    pub fn dual_solution(&self) -> BridgeResult<Vec<Scalar>> {
        self.solution()?.dual()
    }

    pub fn objective_value(&self) -> BridgeResult<Scalar> {
        Ok(self.solution()?.objective_value())
    }

    pub fn status(&self) -> BridgeResult<String> {
        Ok(self.solution()?.status())
    }

    pub fn info(&self) -> BridgeResult<&KernelInfo> {
        Ok(self.solution()?.info())
    }

    /// Releases the solver state, then the data handle's buffers, then the
    /// settings. Calling it again is a no-op.
    pub fn cleanup(&mut self) {
        if self.state == WorkspaceState::Cleaned {
            debug!("workspace already cleaned");
            return;
        }
        if let Some(handle) = self.solver.take() {
            self.kernel.cleanup(handle);
            debug!("released solver state");
        }
        if let Some(data) = self.data.take() {
            data.release();
            debug!("released problem data");
        }
        if self.settings.take().is_some() {
            debug!("released settings");
        }
        self.state = WorkspaceState::Cleaned;
        self.has_solution = false;
    }

    fn live(&mut self) -> BridgeResult<(&mut K, &mut K::Handle, &mut KernelData)> {
        if !matches!(
            self.state,
            WorkspaceState::Configured | WorkspaceState::Solved
        ) {
            return Err(BridgeError::NotConfigured);
        }
        match (self.solver.as_mut(), self.data.as_mut()) {
            (Some(handle), Some(data)) => Ok((&mut self.kernel, handle, data)),
            _ => Err(BridgeError::NotConfigured),
        }
    }

    fn mark_updated(&mut self, what: &str) {
        debug!(what, "workspace data updated");
        self.state = WorkspaceState::Configured;
    }
}

impl<K: SolverKernel> Drop for Workspace<K> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
