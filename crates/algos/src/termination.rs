//! Residuals, convergence tests and infeasibility certificates.

use qpbridge_core::csc::{CscHandle, KernelFloat};
use qpbridge_core::math::{dot, is_finite_bound, norm_inf};

const DIVISION_TOL: KernelFloat = 1e-20;

/// `out = M x` for a matrix stored in full.
pub fn mat_vec(matrix: &CscHandle, x: &[KernelFloat], out: &mut [KernelFloat]) {
    out.iter_mut().for_each(|v| *v = 0.0);
    for (col, &xj) in x.iter().enumerate().take(matrix.ncols()) {
        for (row, value) in matrix.column(col) {
            out[row] += value * xj;
        }
    }
}

/// `out = Mᵀ y`.
pub fn mat_t_vec(matrix: &CscHandle, y: &[KernelFloat], out: &mut [KernelFloat]) {
    for (col, slot) in out.iter_mut().enumerate().take(matrix.ncols()) {
        *slot = matrix.column(col).map(|(row, value)| value * y[row]).sum();
    }
}

/// `out = P x` where only the upper triangle of `P` is read.
pub fn sym_mat_vec(p: &CscHandle, x: &[KernelFloat], out: &mut [KernelFloat]) {
    out.iter_mut().for_each(|v| *v = 0.0);
    for col in 0..p.ncols() {
        for (row, value) in p.column(col) {
            if row == col {
                out[row] += value * x[col];
            } else if row < col {
                out[row] += value * x[col];
                out[col] += value * x[row];
            }
        }
    }
}

/// `½ xᵀ P x + qᵀ x`.
pub fn objective(p: &CscHandle, q: &[KernelFloat], x: &[KernelFloat]) -> KernelFloat {
    let mut px = vec![0.0; x.len()];
    sym_mat_vec(p, x, &mut px);
    0.5 * dot(x, &px) + dot(q, x)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residuals {
    pub prim: KernelFloat,
    pub dual: KernelFloat,
    /// `max(‖Ax‖∞, ‖z‖∞)`
    pub prim_scale: KernelFloat,
    /// `max(‖Px‖∞, ‖Aᵀy‖∞, ‖q‖∞)`
    pub dual_scale: KernelFloat,
}

impl Residuals {
    pub fn compute(
        p: &CscHandle,
        a: &CscHandle,
        q: &[KernelFloat],
        x: &[KernelFloat],
        z: &[KernelFloat],
        y: &[KernelFloat],
    ) -> Self {
        let mut ax = vec![0.0; z.len()];
        mat_vec(a, x, &mut ax);
        let prim_vec: Vec<KernelFloat> = ax.iter().zip(z.iter()).map(|(l, r)| l - r).collect();

        let mut px = vec![0.0; x.len()];
        sym_mat_vec(p, x, &mut px);
        let mut aty = vec![0.0; x.len()];
        mat_t_vec(a, y, &mut aty);
        let dual_vec: Vec<KernelFloat> = px
            .iter()
            .zip(aty.iter())
            .zip(q.iter())
            .map(|((pxi, atyi), qi)| pxi + atyi + qi)
            .collect();

        Self {
            prim: norm_inf(&prim_vec),
            dual: norm_inf(&dual_vec),
            prim_scale: norm_inf(&ax).max(norm_inf(z)),
            dual_scale: norm_inf(&px).max(norm_inf(&aty)).max(norm_inf(q)),
        }
    }

    pub fn converged(&self, eps_abs: KernelFloat, eps_rel: KernelFloat) -> bool {
        self.prim <= eps_abs + eps_rel * self.prim_scale
            && self.dual <= eps_abs + eps_rel * self.dual_scale
    }

    /// Step-size estimate balancing the normalised residuals.
    pub fn rho_estimate(&self, rho: KernelFloat) -> KernelFloat {
        let prim = self.prim / (self.prim_scale + DIVISION_TOL);
        let dual = self.dual / (self.dual_scale + DIVISION_TOL);
        rho * (prim / (dual + DIVISION_TOL)).sqrt()
    }
}

/// Tests whether the dual step `dy` certifies `{x : l ≤ Ax ≤ u}` is empty.
pub fn is_primal_infeasible(
    a: &CscHandle,
    l: &[KernelFloat],
    u: &[KernelFloat],
    dy: &[KernelFloat],
    eps: KernelFloat,
) -> bool {
    // components pushing against an absent bound cannot be part of a certificate
    let dy: Vec<KernelFloat> = dy
        .iter()
        .zip(l.iter().zip(u.iter()))
        .map(|(&d, (&lo, &hi))| {
            if (d > 0.0 && !is_finite_bound(hi)) || (d < 0.0 && !is_finite_bound(lo)) {
                0.0
            } else {
                d
            }
        })
        .collect();
    let norm_dy = norm_inf(&dy);
    if norm_dy <= DIVISION_TOL {
        return false;
    }
    let support: KernelFloat = dy
        .iter()
        .zip(l.iter().zip(u.iter()))
        .map(|(&d, (&lo, &hi))| {
            if d > 0.0 {
                hi * d
            } else if d < 0.0 {
                lo * d
            } else {
                0.0
            }
        })
        .sum();
    if support >= -eps * norm_dy {
        return false;
    }
    let mut aty = vec![0.0; a.ncols()];
    mat_t_vec(a, &dy, &mut aty);
    norm_inf(&aty) < eps * norm_dy
}

/// Tests whether the primal step `dx` is a direction of unbounded descent.
pub fn is_dual_infeasible(
    p: &CscHandle,
    a: &CscHandle,
    q: &[KernelFloat],
    l: &[KernelFloat],
    u: &[KernelFloat],
    dx: &[KernelFloat],
    eps: KernelFloat,
) -> bool {
    let norm_dx = norm_inf(dx);
    if norm_dx <= DIVISION_TOL {
        return false;
    }
    if dot(q, dx) >= -eps * norm_dx {
        return false;
    }
    let mut pdx = vec![0.0; dx.len()];
    sym_mat_vec(p, dx, &mut pdx);
    if norm_inf(&pdx) >= eps * norm_dx {
        return false;
    }
    let mut adx = vec![0.0; l.len()];
    mat_vec(a, dx, &mut adx);
    adx.iter().zip(l.iter().zip(u.iter())).all(|(&v, (&lo, &hi))| {
        let above_ok = !is_finite_bound(hi) || v <= eps * norm_dx;
        let below_ok = !is_finite_bound(lo) || v >= -eps * norm_dx;
        above_ok && below_ok
    })
}
