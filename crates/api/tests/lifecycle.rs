use qpbridge_api::{
    BridgeError, BridgeResult, CscMatrix, KernelData, KernelFloat, KernelInfo, KernelSolution,
    ProblemBuilder, ProblemData, Settings, SolverKernel, Status, StatusField, Workspace,
    WorkspaceState,
};
use std::cell::RefCell;
use std::rc::Rc;

type CallLog = Rc<RefCell<Vec<&'static str>>>;

/// In-memory kernel that records every boundary call and "solves" by
/// returning `x = -q`.
struct RecordingKernel {
    log: CallLog,
    fail_setup: bool,
    status_token: Option<&'static str>,
}

struct FakeHandle {
    q: Vec<KernelFloat>,
    x: Vec<KernelFloat>,
    y: Vec<KernelFloat>,
    info: KernelInfo,
}

impl RecordingKernel {
    fn new(log: &CallLog) -> Self {
        Self {
            log: Rc::clone(log),
            fail_setup: false,
            status_token: None,
        }
    }

    fn record(&self, call: &'static str) {
        self.log.borrow_mut().push(call);
    }
}

impl SolverKernel for RecordingKernel {
    type Handle = FakeHandle;

    fn setup(&mut self, data: &KernelData, _settings: &Settings) -> BridgeResult<FakeHandle> {
        self.record("setup");
        if self.fail_setup {
            return Err(BridgeError::Kernel("factorisation failed".into()));
        }
        Ok(FakeHandle {
            q: data.q().to_vec(),
            x: vec![0.0; data.n()],
            y: vec![0.0; data.m()],
            info: KernelInfo::default(),
        })
    }

    fn solve(&mut self, handle: &mut FakeHandle) {
        self.record("solve");
        handle.x = handle.q.iter().map(|v| -v).collect();
        handle.info.obj_val = -handle.q.iter().map(|v| v * v).sum::<f64>();
        handle.info.status = match self.status_token {
            Some(token) => StatusField::new(token),
            None => Status::Solved.into(),
        };
    }

    fn update_linear_cost(&mut self, handle: &mut FakeHandle, q: &[KernelFloat]) {
        self.record("update_linear_cost");
        handle.q = q.to_vec();
    }

    fn update_bounds(&mut self, _handle: &mut FakeHandle, _l: &[KernelFloat], _u: &[KernelFloat]) {
        self.record("update_bounds");
    }

    fn update_cost_matrix(
        &mut self,
        _handle: &mut FakeHandle,
        _values: &[KernelFloat],
        _positions: Option<&[usize]>,
    ) -> BridgeResult<()> {
        self.record("update_cost_matrix");
        Ok(())
    }

    fn update_constraint_matrix(
        &mut self,
        _handle: &mut FakeHandle,
        _values: &[KernelFloat],
        _positions: Option<&[usize]>,
    ) -> BridgeResult<()> {
        self.record("update_constraint_matrix");
        Ok(())
    }

    fn update_settings(&mut self, _handle: &mut FakeHandle, _settings: &Settings) -> BridgeResult<()> {
        self.record("update_settings");
        Ok(())
    }

    fn warm_start(
        &mut self,
        _handle: &mut FakeHandle,
        _x: Option<&[KernelFloat]>,
        _y: Option<&[KernelFloat]>,
    ) {
        self.record("warm_start");
    }

    fn solution<'h>(&self, handle: &'h FakeHandle) -> KernelSolution<'h> {
        KernelSolution {
            x: &handle.x,
            y: &handle.y,
            info: &handle.info,
        }
    }

    fn cleanup(&mut self, _handle: FakeHandle) {
        self.record("cleanup");
    }
}

fn problem() -> ProblemData {
    ProblemBuilder::new()
        .p(CscMatrix::diagonal(&[1.0, 1.0]))
        .q(vec![1.0, -2.0])
        .a(
            CscMatrix::from_triplets(1, 2, &[(0, 0, 1.0), (0, 1, 1.0)]).unwrap(),
            vec![0.0],
            vec![4.0],
        )
        .build()
        .unwrap()
}

fn fresh() -> (Workspace<RecordingKernel>, CallLog) {
    let log = CallLog::default();
    (Workspace::with_kernel(RecordingKernel::new(&log)), log)
}

fn calls(log: &CallLog, name: &str) -> usize {
    log.borrow().iter().filter(|c| **c == name).count()
}

#[test]
fn created_workspace_rejects_everything_but_setup() {
    let (mut ws, log) = fresh();
    assert_eq!(ws.state(), WorkspaceState::Created);
    assert_eq!(ws.solve(), Err(BridgeError::NotConfigured));
    assert_eq!(ws.update_linear_cost(&[0.0, 0.0]), Err(BridgeError::NotConfigured));
    assert_eq!(ws.update_bounds(&[0.0], &[1.0]), Err(BridgeError::NotConfigured));
    assert_eq!(ws.update_cost_matrix_values(&[1.0, 1.0]), Err(BridgeError::NotConfigured));
    assert_eq!(
        ws.update_constraint_matrix_values(&[1.0, 1.0]),
        Err(BridgeError::NotConfigured)
    );
    assert_eq!(ws.warm_start(None, None), Err(BridgeError::NotConfigured));
    assert_eq!(ws.primal_solution(), Err(BridgeError::NotConfigured));
    assert_eq!(ws.status(), Err(BridgeError::NotConfigured));
    assert!(ws.solution().is_err());
    assert!(log.borrow().is_empty());
}

#[test]
fn setup_twice_is_rejected() {
    let (mut ws, log) = fresh();
    ws.setup(&problem()).unwrap();
    assert_eq!(ws.state(), WorkspaceState::Configured);
    let err = ws.setup(&problem()).unwrap_err();
    assert_eq!(err, BridgeError::AlreadyConfigured);
    assert!(err.is_lifecycle());
    assert_eq!(calls(&log, "setup"), 1);
}

#[test]
fn reads_before_solve_have_no_solution() {
    let (mut ws, _log) = fresh();
    ws.setup(&problem()).unwrap();
    assert_eq!(ws.primal_solution(), Err(BridgeError::NoSolutionAvailable));
    assert_eq!(ws.dual_solution(), Err(BridgeError::NoSolutionAvailable));
    assert_eq!(ws.objective_value(), Err(BridgeError::NoSolutionAvailable));
    assert_eq!(ws.status(), Err(BridgeError::NoSolutionAvailable));
    assert!(ws.info().is_err());
}

#[test]
fn solve_exposes_owned_results() {
    let (mut ws, _log) = fresh();
    ws.setup(&problem()).unwrap();
    ws.solve().unwrap();
    assert_eq!(ws.state(), WorkspaceState::Solved);
    let primal = ws.primal_solution().unwrap();
    assert_eq!(primal, vec![-1.0, 2.0]);
    assert_eq!(ws.dual_solution().unwrap().len(), 1);
    assert_eq!(ws.objective_value().unwrap(), -5.0);
    assert_eq!(ws.status().unwrap(), "solved");

    ws.solve().unwrap();
    assert_eq!(ws.state(), WorkspaceState::Solved);
    // the earlier copy is unaffected by later solves
    assert_eq!(primal, vec![-1.0, 2.0]);
}

#[test]
fn status_token_passes_through_verbatim() {
    let log = CallLog::default();
    let mut kernel = RecordingKernel::new(&log);
    kernel.status_token = Some("max_iter_reached");
    let mut ws = Workspace::with_kernel(kernel);
    ws.setup(&problem()).unwrap();
    ws.solve().unwrap();
    assert_eq!(ws.status().unwrap(), "max_iter_reached");
    let view = ws.solution().unwrap();
    assert_eq!(view.status_field().decode(), "max_iter_reached");
}

#[test]
fn updates_return_to_configured_and_reach_kernel() {
    let (mut ws, log) = fresh();
    ws.setup(&problem()).unwrap();
    ws.solve().unwrap();

    ws.update_linear_cost(&[3.0, 4.0]).unwrap();
    assert_eq!(ws.state(), WorkspaceState::Configured);
    // the previous solve's results stay readable until the next solve
    assert_eq!(ws.primal_solution().unwrap(), vec![-1.0, 2.0]);
    assert_eq!(ws.status().unwrap(), "solved");
    assert_eq!(ws.objective_value().unwrap(), -5.0);
    ws.solve().unwrap();
    assert_eq!(ws.primal_solution().unwrap(), vec![-3.0, -4.0]);

    ws.update_bounds(&[-1.0], &[1.0]).unwrap();
    ws.update_cost_matrix_values(&[2.0, 2.0]).unwrap();
    ws.update_constraint_matrix_values(&[1.0, 3.0]).unwrap();
    ws.update_cost_matrix_entries(&[5.0], &[1]).unwrap();
    ws.update_constraint_matrix_entries(&[7.0], &[0]).unwrap();
    ws.warm_start(Some(&[0.0, 0.0]), Some(&[0.0])).unwrap();
    ws.update_settings(Settings::default().with_max_iter(10)).unwrap();

    let data = ws.data().unwrap();
    assert_eq!(data.q(), &[3.0, 4.0]);
    assert_eq!(data.l(), &[-1.0]);
    assert_eq!(data.p().values(), &[2.0, 5.0]);
    assert_eq!(data.a().values(), &[7.0, 3.0]);
    assert_eq!(ws.settings().unwrap().max_iter, 10);
    for call in [
        "update_linear_cost",
        "update_bounds",
        "update_settings",
        "warm_start",
    ] {
        assert_eq!(calls(&log, call), 1, "{call}");
    }
    assert_eq!(calls(&log, "update_cost_matrix"), 2);
    assert_eq!(calls(&log, "update_constraint_matrix"), 2);
}

#[test]
fn invalid_updates_never_reach_kernel() {
    let (mut ws, log) = fresh();
    ws.setup(&problem()).unwrap();
    ws.solve().unwrap();
    let before = log.borrow().len();

    assert_eq!(
        ws.update_linear_cost(&[1.0]),
        Err(BridgeError::shape("linear cost", 2, 1))
    );
    assert_eq!(
        ws.update_bounds(&[0.0, 0.0], &[1.0, 1.0]),
        Err(BridgeError::shape("lower bounds", 1, 2))
    );
    assert_eq!(
        ws.update_bounds(&[2.0], &[1.0]),
        Err(BridgeError::InvalidBounds { index: 0 })
    );
    assert!(matches!(
        ws.update_cost_matrix_values(&[1.0]),
        Err(BridgeError::ShapeMismatch { expected: 2, found: 1, .. })
    ));
    assert!(matches!(
        ws.update_constraint_matrix_values(&[1.0, 2.0, 3.0]),
        Err(BridgeError::ShapeMismatch { .. })
    ));
    assert!(ws.update_cost_matrix_entries(&[1.0], &[2]).is_err());
    assert!(ws.update_constraint_matrix_entries(&[1.0, 2.0], &[0]).is_err());
    assert!(ws.warm_start(Some(&[1.0]), None).is_err());
    assert!(ws
        .update_settings(Settings::default().with_rho(-1.0))
        .is_err());

    assert_eq!(log.borrow().len(), before);
    // a rejected update leaves the previous solution readable
    assert_eq!(ws.state(), WorkspaceState::Solved);
    assert_eq!(ws.data().unwrap().q(), &[1.0, -2.0]);
}

#[test]
fn invalid_problem_is_rejected_before_kernel() {
    let (mut ws, log) = fresh();
    let mut bad = problem();
    bad.l = vec![5.0];
    assert_eq!(ws.setup(&bad), Err(BridgeError::InvalidBounds { index: 0 }));
    bad = problem();
    bad.a.indptr = vec![0, 1];
    assert!(matches!(ws.setup(&bad), Err(BridgeError::InvalidMatrixShape(_))));
    assert!(log.borrow().is_empty());
    assert_eq!(ws.state(), WorkspaceState::Created);
    ws.setup(&problem()).unwrap();
}

#[test]
fn failed_kernel_setup_leaves_workspace_created() {
    let log = CallLog::default();
    let mut kernel = RecordingKernel::new(&log);
    kernel.fail_setup = true;
    let mut ws = Workspace::with_kernel(kernel);
    assert!(matches!(ws.setup(&problem()), Err(BridgeError::Kernel(_))));
    assert_eq!(ws.state(), WorkspaceState::Created);
    assert!(ws.data().is_none());
    assert_eq!(ws.solve(), Err(BridgeError::NotConfigured));
    ws.cleanup();
    assert_eq!(calls(&log, "cleanup"), 0);
}

#[test]
fn cleanup_releases_once_from_every_state() {
    for steps in 0..3 {
        let (mut ws, log) = fresh();
        if steps >= 1 {
            ws.setup(&problem()).unwrap();
        }
        if steps >= 2 {
            ws.solve().unwrap();
        }
        ws.cleanup();
        assert_eq!(ws.state(), WorkspaceState::Cleaned);
        assert!(ws.settings().is_none());
        assert!(ws.data().is_none());
        ws.cleanup();
        drop(ws);
        let expected = usize::from(steps >= 1);
        assert_eq!(calls(&log, "cleanup"), expected, "steps {steps}");
    }
}

#[test]
fn cleaned_workspace_rejects_further_use() {
    let (mut ws, log) = fresh();
    ws.setup(&problem()).unwrap();
    ws.solve().unwrap();
    ws.cleanup();
    assert_eq!(ws.solve(), Err(BridgeError::NotConfigured));
    assert_eq!(ws.primal_solution(), Err(BridgeError::NotConfigured));
    assert_eq!(ws.update_linear_cost(&[0.0, 0.0]), Err(BridgeError::NotConfigured));
    assert_eq!(
        ws.update_settings(Settings::default()),
        Err(BridgeError::NotConfigured)
    );
    assert_eq!(ws.setup(&problem()), Err(BridgeError::AlreadyConfigured));
    assert_eq!(*log.borrow(), vec!["setup", "solve", "cleanup"]);
}

#[test]
fn dropping_an_uncleaned_workspace_releases_the_solver() {
    let (mut ws, log) = fresh();
    ws.setup(&problem()).unwrap();
    drop(ws);
    assert_eq!(calls(&log, "cleanup"), 1);
}

#[test]
fn settings_can_change_before_setup() {
    let (mut ws, log) = fresh();
    ws.update_settings(Settings::default().with_max_iter(7)).unwrap();
    assert_eq!(ws.settings().unwrap().max_iter, 7);
    assert!(log.borrow().is_empty());
}
