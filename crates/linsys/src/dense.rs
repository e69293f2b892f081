use anyhow::{anyhow, Result};
use num_traits::{FromPrimitive, One};
use qpbridge_core::math::RealNumber;
use qpbridge_core::traits::KktSolver;

#[derive(Debug, Clone)]
pub struct DensePattern {
    dimension: usize,
}

impl DensePattern {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Row-major symmetric matrix.
#[derive(Debug, Clone)]
pub struct DenseKktMatrix<T: RealNumber> {
    pub dimension: usize,
    pub data: Vec<T>,
}

impl<T> DenseKktMatrix<T>
where
    T: RealNumber,
{
    pub fn new(dimension: usize, data: Vec<T>) -> Self {
        assert_eq!(dimension * dimension, data.len());
        Self { dimension, data }
    }

    pub fn zeros(dimension: usize) -> Self {
        Self::new(dimension, vec![T::zero(); dimension * dimension])
    }

    pub fn entry(&self, row: usize, col: usize) -> T {
        self.data[row * self.dimension + col]
    }

    pub fn add(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.dimension + col] += value;
    }
}

/// LDLᵀ factorisation without pivoting.
pub struct DenseKktSolver<T: RealNumber> {
    dimension: usize,
    l: Vec<T>,
    d: Vec<T>,
    analyzed: bool,
    factorizations: usize,
}

impl<T> DenseKktSolver<T>
where
    T: RealNumber + FromPrimitive + One,
{
    pub fn new() -> Self {
        Self {
            dimension: 0,
            l: Vec::new(),
            d: Vec::new(),
            analyzed: false,
            factorizations: 0,
        }
    }

    pub fn factorizations(&self) -> usize {
        self.factorizations
    }

    fn epsilon() -> T {
        T::from_f64(1e-12).unwrap_or_else(T::epsilon)
    }

    fn l(&self, row: usize, col: usize) -> T {
        let idx = row * self.dimension + col;
        self.l[idx]
    }

    fn l_mut(&mut self, row: usize, col: usize) -> &mut T {
        let idx = row * self.dimension + col;
        &mut self.l[idx]
    }
}

impl<T> Default for DenseKktSolver<T>
where
    T: RealNumber + FromPrimitive + One,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KktSolver<T> for DenseKktSolver<T>
where
    T: RealNumber + FromPrimitive + One,
{
    type Pattern = DensePattern;
    type Matrix = DenseKktMatrix<T>;

    fn analyze_pattern(&mut self, pattern: &Self::Pattern) -> Result<()> {
        self.dimension = pattern.dimension();
        self.l = vec![T::zero(); self.dimension * self.dimension];
        self.d = vec![T::zero(); self.dimension];
        for i in 0..self.dimension {
            *self.l_mut(i, i) = T::one();
        }
        self.analyzed = true;
        Ok(())
    }

    fn factor(&mut self, matrix: &Self::Matrix) -> Result<()> {
        if !self.analyzed {
            self.analyze_pattern(&DensePattern::new(matrix.dimension))?;
        }
        if matrix.dimension != self.dimension {
            return Err(anyhow!(
                "matrix dimension {} does not match analysed dimension {}",
                matrix.dimension,
                self.dimension
            ));
        }
        // factor into scratch buffers so a failed pivot leaves the last factorisation intact
        let dim = self.dimension;
        let mut l = vec![T::zero(); dim * dim];
        let mut d = vec![T::zero(); dim];
        for i in 0..dim {
            l[i * dim + i] = T::one();
        }

        for j in 0..dim {
            let mut d_j = matrix.entry(j, j);
            for k in 0..j {
                let l_jk = l[j * dim + k];
                d_j -= l_jk * l_jk * d[k];
            }
            if d_j.abs() <= Self::epsilon() {
                let magnitude = d_j.abs().to_f64().unwrap_or(f64::NAN);
                return Err(anyhow!(
                    "near-singular pivot encountered at column {} (|d_j| = {:.3e})",
                    j,
                    magnitude
                ));
            }
            d[j] = d_j;

            for i in (j + 1)..dim {
                let mut lij = matrix.entry(i, j);
                for k in 0..j {
                    lij -= l[i * dim + k] * l[j * dim + k] * d[k];
                }
                l[i * dim + j] = lij / d_j;
            }
        }
        self.l = l;
        self.d = d;
        self.factorizations += 1;
        Ok(())
    }

    fn solve(&self, rhs: &mut [T]) -> Result<()> {
        if rhs.len() != self.dimension {
            return Err(anyhow!(
                "rhs length {} does not match dimension {}",
                rhs.len(),
                self.dimension
            ));
        }
        for i in 0..self.dimension {
            for j in 0..i {
                rhs[i] -= self.l(i, j) * rhs[j];
            }
        }
        for i in 0..self.dimension {
            rhs[i] = rhs[i] / self.d[i];
        }
        for i in (0..self.dimension).rev() {
            for j in (i + 1)..self.dimension {
                rhs[i] -= self.l(j, i) * rhs[j];
            }
        }
        Ok(())
    }
}
