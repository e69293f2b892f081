use crate::dense::{DenseKktMatrix, DenseKktSolver, DensePattern};
use anyhow::{ensure, Result};
use qpbridge_core::csc::{CscHandle, KernelFloat};
use qpbridge_core::traits::KktSolver;
use tracing::trace;

/// Factorised reduced KKT matrix `P + σI + Aᵀ diag(ρ) A`.
///
/// Only the upper triangle of `P` is read; strictly lower entries are ignored.
pub struct ReducedKkt {
    n: usize,
    solver: DenseKktSolver<KernelFloat>,
}

impl ReducedKkt {
    pub fn new(p: &CscHandle, a: &CscHandle, sigma: KernelFloat, rho: &[KernelFloat]) -> Result<Self> {
        let n = p.ncols();
        let mut solver = DenseKktSolver::new();
        solver.analyze_pattern(&DensePattern::new(n))?;
        let mut kkt = Self { n, solver };
        kkt.refactor(p, a, sigma, rho)?;
        Ok(kkt)
    }

    /// Reassembles and refactors after a change of `P`, `A` values or `ρ`.
    pub fn refactor(
        &mut self,
        p: &CscHandle,
        a: &CscHandle,
        sigma: KernelFloat,
        rho: &[KernelFloat],
    ) -> Result<()> {
        let matrix = assemble(p, a, sigma, rho)?;
        self.solver.factor(&matrix)?;
        trace!(n = self.n, factorizations = self.solver.factorizations(), "reduced KKT factored");
        Ok(())
    }

    pub fn solve(&self, rhs: &mut [KernelFloat]) -> Result<()> {
        self.solver.solve(rhs)
    }

    pub fn factorizations(&self) -> usize {
        self.solver.factorizations()
    }
}

pub fn assemble(
    p: &CscHandle,
    a: &CscHandle,
    sigma: KernelFloat,
    rho: &[KernelFloat],
) -> Result<DenseKktMatrix<KernelFloat>> {
    let n = p.ncols();
    ensure!(p.nrows() == n, "P must be square, got {}x{}", p.nrows(), n);
    ensure!(a.ncols() == n, "A has {} columns, expected {}", a.ncols(), n);
    ensure!(
        rho.len() == a.nrows(),
        "rho length {} != constraint count {}",
        rho.len(),
        a.nrows()
    );

    let mut matrix = DenseKktMatrix::zeros(n);
    for col in 0..n {
        for (row, value) in p.column(col) {
            if row == col {
                matrix.add(row, col, value);
            } else if row < col {
                matrix.add(row, col, value);
                matrix.add(col, row, value);
            }
        }
        matrix.add(col, col, sigma);
    }

    let mut rows: Vec<Vec<(usize, KernelFloat)>> = vec![Vec::new(); a.nrows()];
    for col in 0..n {
        for (row, value) in a.column(col) {
            rows[row].push((col, value));
        }
    }
    for (entries, &rho_i) in rows.iter().zip(rho.iter()) {
        for &(j, vj) in entries {
            for &(k, vk) in entries {
                matrix.add(j, k, rho_i * vj * vk);
            }
        }
    }
    Ok(matrix)
}
