use crate::error::{BridgeError, BridgeResult};
use crate::math::{RealNumber, Scalar};
use serde::{Deserialize, Serialize};
use sprs::TriMat;

/// Application-side sparse matrix in column-oriented form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CscMatrix<T> {
    pub nrows: usize,
    pub ncols: usize,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<T>,
}

impl<T> CscMatrix<T>
where
    T: RealNumber,
{
    /// A matrix with the given shape and no stored entries.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            indptr: vec![0; ncols + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn diagonal(diag: &[T]) -> Self {
        let n = diag.len();
        let mut indptr = Vec::with_capacity(n + 1);
        let mut indices = Vec::with_capacity(n);
        let mut data = Vec::with_capacity(n);
        indptr.push(0);
        for (idx, value) in diag.iter().enumerate() {
            indices.push(idx);
            data.push(*value);
            indptr.push(indices.len());
        }
        Self {
            nrows: n,
            ncols: n,
            indptr,
            indices,
            data,
        }
    }

    /// Builds a matrix from coordinate entries `(row, col, value)`.
    ///
    /// Entries are sorted by column then row; duplicates are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        entries: &[(usize, usize, T)],
    ) -> BridgeResult<Self> {
        if let Some((row, col, _)) = entries
            .iter()
            .find(|(row, col, _)| *row >= nrows || *col >= ncols)
        {
            return Err(BridgeError::InvalidMatrixShape(format!(
                "entry ({row}, {col}) outside a {nrows}x{ncols} matrix"
            )));
        }
        let mut tri = TriMat::with_capacity((nrows, ncols), entries.len());
        for &(row, col, value) in entries {
            tri.add_triplet(row, col, value);
        }
        let csc: sprs::CsMat<T> = tri.to_csc();
        let (indptr, indices, data) = csc.into_raw_storage();
        Ok(Self {
            nrows,
            ncols,
            indptr,
            indices,
            data,
        })
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.indptr.len() != self.ncols + 1 {
            return Err(BridgeError::InvalidMatrixShape(format!(
                "indptr length {} != ncols + 1 ({})",
                self.indptr.len(),
                self.ncols + 1
            )));
        }
        if self.indices.len() != self.data.len() {
            return Err(BridgeError::InvalidMatrixShape(format!(
                "indices length {} != data length {}",
                self.indices.len(),
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// A convex QP `min ½xᵀPx + qᵀx  s.t.  l ≤ Ax ≤ u` as supplied by the caller.
///
/// `p` may be full symmetric or upper triangular; only its upper triangle is
/// read by the kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemData {
    pub n: usize,
    pub m: usize,
    pub p: CscMatrix<Scalar>,
    pub a: CscMatrix<Scalar>,
    pub q: Vec<Scalar>,
    pub l: Vec<Scalar>,
    pub u: Vec<Scalar>,
}

impl ProblemData {
    pub fn validate(&self) -> BridgeResult<()> {
        let (n, m) = (self.n, self.m);
        self.p.validate()?;
        self.a.validate()?;
        if self.p.shape() != (n, n) {
            return Err(BridgeError::InvalidMatrixShape(format!(
                "P is {}x{}, expected {n}x{n}",
                self.p.nrows, self.p.ncols
            )));
        }
        if self.a.shape() != (m, n) {
            return Err(BridgeError::InvalidMatrixShape(format!(
                "A is {}x{}, expected {m}x{n}",
                self.a.nrows, self.a.ncols
            )));
        }
        if self.q.len() != n {
            return Err(BridgeError::shape("linear cost", n, self.q.len()));
        }
        validate_bounds(m, &self.l, &self.u)
    }
}

/// Checks bound lengths against `m` and that no lower bound exceeds its upper bound.
pub fn validate_bounds(m: usize, lower: &[Scalar], upper: &[Scalar]) -> BridgeResult<()> {
    if lower.len() != m {
        return Err(BridgeError::shape("lower bounds", m, lower.len()));
    }
    if upper.len() != m {
        return Err(BridgeError::shape("upper bounds", m, upper.len()));
    }
    for (index, (lo, hi)) in lower.iter().zip(upper.iter()).enumerate() {
        // NaN compares false, so it is rejected here too
        if !(lo <= hi) {
            return Err(BridgeError::InvalidBounds { index });
        }
    }
    Ok(())
}
