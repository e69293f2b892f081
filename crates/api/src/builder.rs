use qpbridge_core::error::BridgeResult;
use qpbridge_core::math::Scalar;
use qpbridge_core::problem::{CscMatrix, ProblemData};
use serde::{Deserialize, Serialize};

/// Chainable construction of [`ProblemData`].
///
/// The variable count is taken from `q` (or from `P` when `q` is omitted); a
/// missing `P` or `q` is filled with zeros and a missing constraint block
/// yields `m = 0`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemBuilder {
    p: Option<CscMatrix<Scalar>>,
    q: Option<Vec<Scalar>>,
    constraints: Option<(CscMatrix<Scalar>, Vec<Scalar>, Vec<Scalar>)>,
}

impl ProblemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn p(mut self, matrix: CscMatrix<Scalar>) -> Self {
        self.p = Some(matrix);
        self
    }

    pub fn q(mut self, vector: Vec<Scalar>) -> Self {
        self.q = Some(vector);
        self
    }

    /// Constraints `l ≤ A x ≤ u`.
    pub fn a(mut self, matrix: CscMatrix<Scalar>, lower: Vec<Scalar>, upper: Vec<Scalar>) -> Self {
        self.constraints = Some((matrix, lower, upper));
        self
    }

    pub fn build(self) -> BridgeResult<ProblemData> {
        let n = match (&self.q, &self.p) {
            (Some(q), _) => q.len(),
            (None, Some(p)) => p.ncols,
            (None, None) => 0,
        };
        let p = self.p.unwrap_or_else(|| CscMatrix::zeros(n, n));
        let q = self.q.unwrap_or_else(|| vec![0.0; n]);
        let (a, l, u) = self
            .constraints
            .unwrap_or_else(|| (CscMatrix::zeros(0, n), Vec::new(), Vec::new()));
        let problem = ProblemData {
            n,
            m: a.nrows,
            p,
            a,
            q,
            l,
            u,
        };
        problem.validate()?;
        Ok(problem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qpbridge_core::error::BridgeError;

    #[test]
    fn builds_unconstrained_problem() {
        let problem = ProblemBuilder::new()
            .p(CscMatrix::diagonal(&[2.0]))
            .q(vec![-2.0])
            .build()
            .unwrap();
        assert_eq!((problem.n, problem.m), (1, 0));
        assert_eq!(problem.a.shape(), (0, 1));
        assert!(problem.l.is_empty());
    }

    #[test]
    fn fills_missing_cost_matrix() {
        let problem = ProblemBuilder::new()
            .q(vec![1.0, 1.0])
            .a(CscMatrix::diagonal(&[1.0, 1.0]), vec![0.0; 2], vec![1.0; 2])
            .build()
            .unwrap();
        assert_eq!(problem.p.shape(), (2, 2));
        assert_eq!(problem.p.nnz(), 0);
        assert_eq!(problem.m, 2);
    }

    #[test]
    fn rejects_crossed_bounds() {
        let err = ProblemBuilder::new()
            .p(CscMatrix::diagonal(&[1.0]))
            .q(vec![0.0])
            .a(CscMatrix::diagonal(&[1.0]), vec![2.0], vec![1.0])
            .build()
            .unwrap_err();
        assert_eq!(err, BridgeError::InvalidBounds { index: 0 });
    }

    #[test]
    fn rejects_inconsistent_dimensions() {
        let result = ProblemBuilder::new()
            .p(CscMatrix::diagonal(&[1.0, 1.0]))
            .q(vec![0.0])
            .build();
        assert!(matches!(result, Err(BridgeError::InvalidMatrixShape(_))));
    }

    #[test]
    fn builds_from_json_description() {
        let json = r#"{
            "p": {"nrows": 1, "ncols": 1, "indptr": [0, 1], "indices": [0], "data": [2.0]},
            "q": [-2.0],
            "constraints": [
                {"nrows": 1, "ncols": 1, "indptr": [0, 1], "indices": [0], "data": [1.0]},
                [1.0],
                [5.0]
            ]
        }"#;
        let builder: ProblemBuilder = serde_json::from_str(json).unwrap();
        let problem = builder.build().unwrap();
        assert_eq!((problem.n, problem.m), (1, 1));
        assert_eq!(problem.u, vec![5.0]);
    }
}
