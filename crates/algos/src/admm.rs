use crate::termination::{
    is_dual_infeasible, is_primal_infeasible, mat_t_vec, mat_vec, objective, Residuals,
};
use qpbridge_core::csc::{CscHandle, KernelFloat};
use qpbridge_core::data::KernelData;
use qpbridge_core::error::{BridgeError, BridgeResult};
use qpbridge_core::math::{axpy, project_box, Timer, INFTY};
use qpbridge_core::settings::Settings;
use qpbridge_core::solution::{KernelInfo, KernelSolution, Status, StatusField};
use qpbridge_core::traits::SolverKernel;
use qpbridge_linsys::ReducedKkt;
use tracing::{debug, info, trace, warn};

const RHO_MIN: KernelFloat = 1e-6;
const RHO_MAX: KernelFloat = 1e6;
const RHO_EQ_FACTOR: KernelFloat = 1e3;
/// Rows with `u - l` below this are treated as equalities.
const RHO_EQ_TOL: KernelFloat = 1e-4;
/// Relaxation of the tolerances accepted as `solved_inaccurate` at the iteration limit.
const INACCURATE_FACTOR: KernelFloat = 10.0;

/// Operator-splitting QP kernel.
///
/// Solves `min ½xᵀPx + qᵀx  s.t.  l ≤ Ax ≤ u` by alternating a reduced KKT
/// solve with a projection onto the bound box.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdmmKernel;

impl AdmmKernel {
    pub fn new() -> Self {
        Self
    }
}

/// Solver state produced by [`AdmmKernel::setup`]. Owns its own copy of the
/// problem data, independent of the caller's data handle.
pub struct AdmmHandle {
    p: CscHandle,
    a: CscHandle,
    q: Vec<KernelFloat>,
    l: Vec<KernelFloat>,
    u: Vec<KernelFloat>,
    settings: Settings,
    rho: KernelFloat,
    rho_vec: Vec<KernelFloat>,
    kkt: ReducedKkt,
    x: Vec<KernelFloat>,
    z: Vec<KernelFloat>,
    y: Vec<KernelFloat>,
    pending_warm_start: bool,
    solution_x: Vec<KernelFloat>,
    solution_y: Vec<KernelFloat>,
    info: KernelInfo,
}

impl AdmmHandle {
    pub fn n(&self) -> usize {
        self.q.len()
    }

    pub fn m(&self) -> usize {
        self.l.len()
    }

    pub fn rho(&self) -> KernelFloat {
        self.rho
    }

    pub fn factorizations(&self) -> usize {
        self.kkt.factorizations()
    }

    fn refactor(&mut self) -> BridgeResult<()> {
        self.kkt
            .refactor(&self.p, &self.a, self.settings.sigma, &self.rho_vec)
            .map_err(|err| BridgeError::Kernel(err.to_string()))
    }

    fn reset_iterates(&mut self) {
        self.x.iter_mut().for_each(|v| *v = 0.0);
        self.z.iter_mut().for_each(|v| *v = 0.0);
        self.y.iter_mut().for_each(|v| *v = 0.0);
    }

    fn residuals(&self) -> Residuals {
        Residuals::compute(&self.p, &self.a, &self.q, &self.x, &self.z, &self.y)
    }

    fn store_solution(&mut self, status: Status) {
        match status {
            Status::PrimalInfeasible | Status::DualInfeasible => {
                self.solution_x.iter_mut().for_each(|v| *v = KernelFloat::NAN);
                self.solution_y.iter_mut().for_each(|v| *v = KernelFloat::NAN);
                self.info.obj_val = if status == Status::PrimalInfeasible {
                    KernelFloat::INFINITY
                } else {
                    KernelFloat::NEG_INFINITY
                };
                self.reset_iterates();
            }
            _ => {
                self.solution_x.copy_from_slice(&self.x);
                self.solution_y.copy_from_slice(&self.y);
                self.info.obj_val = objective(&self.p, &self.q, &self.x);
            }
        }
        self.info.status = StatusField::from(status);
    }
}

fn clamp_bounds(src: &[KernelFloat], dst: &mut [KernelFloat]) {
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d = s.clamp(-INFTY, INFTY);
    }
}

fn rho_vector(rho: KernelFloat, l: &[KernelFloat], u: &[KernelFloat]) -> Vec<KernelFloat> {
    l.iter()
        .zip(u.iter())
        .map(|(&lo, &hi)| {
            if lo <= -INFTY && hi >= INFTY {
                RHO_MIN
            } else if hi - lo < RHO_EQ_TOL {
                RHO_EQ_FACTOR * rho
            } else {
                rho
            }
        })
        .collect()
}

impl SolverKernel for AdmmKernel {
    type Handle = AdmmHandle;

    fn setup(&mut self, data: &KernelData, settings: &Settings) -> BridgeResult<AdmmHandle> {
        settings.validate()?;
        let timer = Timer::start();
        let (n, m) = (data.n(), data.m());
        let mut l = vec![0.0; m];
        let mut u = vec![0.0; m];
        clamp_bounds(data.l(), &mut l);
        clamp_bounds(data.u(), &mut u);
        let rho = settings.rho.clamp(RHO_MIN, RHO_MAX);
        let rho_vec = rho_vector(rho, &l, &u);
        let kkt = ReducedKkt::new(data.p(), data.a(), settings.sigma, &rho_vec)
            .map_err(|err| BridgeError::Kernel(err.to_string()))?;

        let mut info = KernelInfo::default();
        info.rho_estimate = rho;
        info.setup_time = timer.elapsed();
        debug!(n, m, nnz_p = data.p().nnz(), nnz_a = data.a().nnz(), "kernel setup complete");
        Ok(AdmmHandle {
            p: data.p().clone(),
            a: data.a().clone(),
            q: data.q().to_vec(),
            l,
            u,
            settings: settings.clone(),
            rho,
            rho_vec,
            kkt,
            x: vec![0.0; n],
            z: vec![0.0; m],
            y: vec![0.0; m],
            pending_warm_start: false,
            solution_x: vec![KernelFloat::NAN; n],
            solution_y: vec![KernelFloat::NAN; m],
            info,
        })
    }

    fn solve(&mut self, h: &mut AdmmHandle) {
        let timer = Timer::start();
        if !h.settings.warm_starting && !h.pending_warm_start {
            h.reset_iterates();
        }
        h.pending_warm_start = false;
        h.info.rho_updates = 0;

        let (n, m) = (h.n(), h.m());
        let alpha = h.settings.alpha;
        let sigma = h.settings.sigma;
        let check_every = h.settings.check_termination.max(1);
        let mut x_prev = vec![0.0; n];
        let mut z_prev = vec![0.0; m];
        let mut y_prev = vec![0.0; m];
        let mut work_m = vec![0.0; m];
        let mut rhs = vec![0.0; n];
        let mut z_tilde = vec![0.0; m];
        let mut status = Status::MaxIterReached;
        let mut iterations = 0;
        let mut last = None;
        // direction of the last ρ change; once it flips, ρ is kept for the rest of the solve
        let mut last_rho_step: Option<bool> = None;
        let mut rho_settled = false;

        for iter in 1..=h.settings.max_iter {
            iterations = iter;
            x_prev.copy_from_slice(&h.x);
            z_prev.copy_from_slice(&h.z);
            y_prev.copy_from_slice(&h.y);

            // (P + σI + AᵀρA) x̃ = σx - q + Aᵀ(ρz - y)
            for i in 0..m {
                work_m[i] = h.rho_vec[i] * z_prev[i] - y_prev[i];
            }
            mat_t_vec(&h.a, &work_m, &mut rhs);
            axpy(sigma, &x_prev, &mut rhs);
            axpy(-1.0, &h.q, &mut rhs);
            if let Err(err) = h.kkt.solve(&mut rhs) {
                warn!(%err, "linear system solve failed");
                status = Status::Unsolved;
                break;
            }
            mat_vec(&h.a, &rhs, &mut z_tilde);

            for j in 0..n {
                h.x[j] = alpha * rhs[j] + (1.0 - alpha) * x_prev[j];
            }
            for i in 0..m {
                let relaxed = alpha * z_tilde[i] + (1.0 - alpha) * z_prev[i];
                work_m[i] = relaxed;
                h.z[i] = relaxed + y_prev[i] / h.rho_vec[i];
            }
            project_box(&mut h.z, &h.l, &h.u);
            for i in 0..m {
                h.y[i] = y_prev[i] + h.rho_vec[i] * (work_m[i] - h.z[i]);
            }

            let check = iter % check_every == 0 || iter == h.settings.max_iter;
            let adapt = h.settings.adaptive_rho
                && h.settings.adaptive_rho_interval > 0
                && iter % h.settings.adaptive_rho_interval == 0;
            if check || adapt {
                let res = h.residuals();
                last = Some(res);
                trace!(iter, prim = res.prim, dual = res.dual, rho = h.rho, "termination check");
                if check {
                    if res.converged(h.settings.eps_abs, h.settings.eps_rel) {
                        status = Status::Solved;
                        break;
                    }
                    let dy: Vec<KernelFloat> =
                        h.y.iter().zip(y_prev.iter()).map(|(a, b)| a - b).collect();
                    if is_primal_infeasible(&h.a, &h.l, &h.u, &dy, h.settings.eps_prim_inf) {
                        status = Status::PrimalInfeasible;
                        break;
                    }
                    let dx: Vec<KernelFloat> =
                        h.x.iter().zip(x_prev.iter()).map(|(a, b)| a - b).collect();
                    if is_dual_infeasible(
                        &h.p,
                        &h.a,
                        &h.q,
                        &h.l,
                        &h.u,
                        &dx,
                        h.settings.eps_dual_inf,
                    ) {
                        status = Status::DualInfeasible;
                        break;
                    }
                }
                if adapt && m > 0 && !rho_settled {
                    let estimate = res.rho_estimate(h.rho).clamp(RHO_MIN, RHO_MAX);
                    h.info.rho_estimate = estimate;
                    let tol = h.settings.adaptive_rho_tolerance;
                    if estimate > h.rho * tol || estimate < h.rho / tol {
                        let increase = estimate > h.rho;
                        if last_rho_step.is_some_and(|prev| prev != increase) {
                            debug!(iter, rho = h.rho, estimate, "rho estimate reversed; settling");
                            rho_settled = true;
                        }
                        let previous = (h.rho, h.rho_vec.clone());
                        h.rho = estimate;
                        h.rho_vec = rho_vector(estimate, &h.l, &h.u);
                        // y is kept; only the step changes
                        if let Err(err) = h.refactor() {
                            warn!(%err, "refactorisation after rho update failed; keeping rho");
                            (h.rho, h.rho_vec) = previous;
                        } else {
                            h.info.rho_updates += 1;
                            last_rho_step = Some(increase);
                        }
                    }
                }
            }

            if let Some(limit) = h.settings.time_limit {
                if timer.elapsed() > limit {
                    status = Status::TimeLimitReached;
                    break;
                }
            }
        }

        if status == Status::MaxIterReached {
            let res = last.unwrap_or_else(|| h.residuals());
            if res.converged(
                INACCURATE_FACTOR * h.settings.eps_abs,
                INACCURATE_FACTOR * h.settings.eps_rel,
            ) {
                status = Status::SolvedInaccurate;
            }
        }
        let res = h.residuals();
        h.info.pri_res = res.prim;
        h.info.dua_res = res.dual;
        h.info.iterations = iterations;
        h.store_solution(status);
        h.info.solve_time = timer.elapsed();

        if status == Status::Solved {
            info!(
                status = %status,
                iterations,
                objective = h.info.obj_val,
                "kernel solve finished"
            );
        } else {
            warn!(status = %status, iterations, pri_res = res.prim, dua_res = res.dual, "kernel solve did not converge");
        }
    }

    fn update_linear_cost(&mut self, h: &mut AdmmHandle, q: &[KernelFloat]) {
        h.q.copy_from_slice(q);
    }

    fn update_bounds(&mut self, h: &mut AdmmHandle, l: &[KernelFloat], u: &[KernelFloat]) {
        clamp_bounds(l, &mut h.l);
        clamp_bounds(u, &mut h.u);
        let rho_vec = rho_vector(h.rho, &h.l, &h.u);
        if rho_vec != h.rho_vec {
            let previous = std::mem::replace(&mut h.rho_vec, rho_vec);
            if let Err(err) = h.refactor() {
                // the old factorisation stays valid for the old step sizes
                warn!(%err, "refactorisation after bound update failed");
                h.rho_vec = previous;
            }
        }
    }

    fn update_cost_matrix(
        &mut self,
        h: &mut AdmmHandle,
        values: &[KernelFloat],
        positions: Option<&[usize]>,
    ) -> BridgeResult<()> {
        let previous = h.p.clone();
        match positions {
            Some(positions) => h.p.overwrite_entries(values, positions)?,
            None => h.p.overwrite_values(values)?,
        }
        if let Err(err) = h.refactor() {
            h.p = previous;
            return Err(err);
        }
        Ok(())
    }

    fn update_constraint_matrix(
        &mut self,
        h: &mut AdmmHandle,
        values: &[KernelFloat],
        positions: Option<&[usize]>,
    ) -> BridgeResult<()> {
        let previous = h.a.clone();
        match positions {
            Some(positions) => h.a.overwrite_entries(values, positions)?,
            None => h.a.overwrite_values(values)?,
        }
        if let Err(err) = h.refactor() {
            h.a = previous;
            return Err(err);
        }
        Ok(())
    }

    fn update_settings(&mut self, h: &mut AdmmHandle, settings: &Settings) -> BridgeResult<()> {
        settings.validate()?;
        let step_changed = settings.rho != h.settings.rho || settings.sigma != h.settings.sigma;
        let previous = std::mem::replace(&mut h.settings, settings.clone());
        if step_changed {
            let previous_rho = (h.rho, h.rho_vec.clone());
            h.rho = settings.rho.clamp(RHO_MIN, RHO_MAX);
            h.rho_vec = rho_vector(h.rho, &h.l, &h.u);
            if let Err(err) = h.refactor() {
                h.settings = previous;
                (h.rho, h.rho_vec) = previous_rho;
                return Err(err);
            }
        }
        Ok(())
    }

    fn warm_start(
        &mut self,
        h: &mut AdmmHandle,
        x: Option<&[KernelFloat]>,
        y: Option<&[KernelFloat]>,
    ) {
        if let Some(x) = x {
            h.x.copy_from_slice(x);
            mat_vec(&h.a, &h.x, &mut h.z);
        }
        if let Some(y) = y {
            h.y.copy_from_slice(y);
        }
        h.pending_warm_start = true;
    }

    fn solution<'h>(&self, h: &'h AdmmHandle) -> KernelSolution<'h> {
        KernelSolution {
            x: &h.solution_x,
            y: &h.solution_y,
            info: &h.info,
        }
    }

    fn cleanup(&mut self, h: AdmmHandle) {
        debug!(n = h.n(), m = h.m(), "kernel state released");
        drop(h);
    }
}
