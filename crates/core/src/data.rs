use crate::csc::{copy_buffer, CscHandle, KernelFloat};
use crate::error::{BridgeError, BridgeResult};
use crate::problem::{validate_bounds, ProblemData};
use tracing::debug;

/// The kernel-side problem data: owned copies of every caller buffer.
///
/// Nothing here aliases caller memory, so the caller's `ProblemData` may be
/// dropped as soon as setup returns.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelData {
    n: usize,
    m: usize,
    p: CscHandle,
    a: CscHandle,
    q: Vec<KernelFloat>,
    l: Vec<KernelFloat>,
    u: Vec<KernelFloat>,
}

impl KernelData {
    /// Validates `problem`, encodes both matrices and copies the dense vectors.
    pub fn from_problem(problem: &ProblemData) -> BridgeResult<Self> {
        problem.validate()?;
        let p = CscHandle::from_matrix(&problem.p)?;
        let a = CscHandle::from_matrix(&problem.a)?;
        Ok(Self {
            n: problem.n,
            m: problem.m,
            p,
            a,
            q: copy_buffer(&problem.q, "linear cost")?,
            l: copy_buffer(&problem.l, "lower bounds")?,
            u: copy_buffer(&problem.u, "upper bounds")?,
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn p(&self) -> &CscHandle {
        &self.p
    }

    pub fn a(&self) -> &CscHandle {
        &self.a
    }

    pub fn q(&self) -> &[KernelFloat] {
        &self.q
    }

    pub fn l(&self) -> &[KernelFloat] {
        &self.l
    }

    pub fn u(&self) -> &[KernelFloat] {
        &self.u
    }

    pub fn set_linear_cost(&mut self, q: &[KernelFloat]) -> BridgeResult<()> {
        if q.len() != self.n {
            return Err(BridgeError::shape("linear cost", self.n, q.len()));
        }
        self.q.copy_from_slice(q);
        Ok(())
    }

    /// Replaces both bound vectors; nothing changes if either is rejected.
    pub fn set_bounds(&mut self, l: &[KernelFloat], u: &[KernelFloat]) -> BridgeResult<()> {
        validate_bounds(self.m, l, u)?;
        self.l.copy_from_slice(l);
        self.u.copy_from_slice(u);
        Ok(())
    }

    pub fn p_mut(&mut self) -> &mut CscHandle {
        &mut self.p
    }

    pub fn a_mut(&mut self) -> &mut CscHandle {
        &mut self.a
    }

    /// Releases the owned buffers: constraint matrix, cost matrix, dense vectors.
    pub fn release(self) {
        let Self { a, p, q, l, u, .. } = self;
        drop(a);
        debug!("released constraint matrix");
        drop(p);
        debug!("released cost matrix");
        drop((q, l, u));
        debug!("released dense vectors");
    }
}
