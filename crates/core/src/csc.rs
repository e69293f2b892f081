//! Encoding of sparse matrices into the compressed-sparse-column layout read
//! by the kernel.
//!
//! The kernel indexes with a signed 64-bit integer and computes in `f64`.
//! Values are copied without any change of width; indices are converted from
//! `usize` with a checked conversion.

use crate::error::{BridgeError, BridgeResult};
use crate::problem::CscMatrix;

/// Integer type of the kernel's index arrays.
pub type KernelInt = i64;

/// Floating type of the kernel's value arrays.
pub type KernelFloat = f64;

/// A CSC matrix in the kernel's native layout, owning its buffers.
///
/// Only the numeric values may change after encoding; the sparsity pattern is
/// fixed for the lifetime of the handle.
#[derive(Debug, Clone, PartialEq)]
pub struct CscHandle {
    nrows: KernelInt,
    ncols: KernelInt,
    nnz: KernelInt,
    values: Vec<KernelFloat>,
    row_indices: Vec<KernelInt>,
    col_pointers: Vec<KernelInt>,
}

/// Encodes raw CSC triplet arrays given in the kernel's integer type.
pub fn encode(
    rows: KernelInt,
    cols: KernelInt,
    nnz: KernelInt,
    values: &[KernelFloat],
    row_idx: &[KernelInt],
    col_ptr: &[KernelInt],
) -> BridgeResult<CscHandle> {
    validate_triplet(rows, cols, nnz, values, row_idx, col_ptr)?;
    Ok(CscHandle {
        nrows: rows,
        ncols: cols,
        nnz,
        values: copy_buffer(values, "values")?,
        row_indices: copy_buffer(row_idx, "row indices")?,
        col_pointers: copy_buffer(col_ptr, "column pointers")?,
    })
}

impl CscHandle {
    /// Encodes an application-side matrix, converting its `usize` indices.
    pub fn from_matrix(matrix: &CscMatrix<KernelFloat>) -> BridgeResult<Self> {
        let rows = to_kernel_int(matrix.nrows, "row count")?;
        let cols = to_kernel_int(matrix.ncols, "column count")?;
        let nnz = to_kernel_int(matrix.data.len(), "nonzero count")?;
        let row_indices = convert_indices(&matrix.indices, "row indices")?;
        let col_pointers = convert_indices(&matrix.indptr, "column pointers")?;
        validate_triplet(rows, cols, nnz, &matrix.data, &row_indices, &col_pointers)?;
        Ok(Self {
            nrows: rows,
            ncols: cols,
            nnz,
            values: copy_buffer(&matrix.data, "values")?,
            row_indices,
            col_pointers,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows as usize
    }

    pub fn ncols(&self) -> usize {
        self.ncols as usize
    }

    pub fn nnz(&self) -> usize {
        self.nnz as usize
    }

    pub fn values(&self) -> &[KernelFloat] {
        &self.values
    }

    pub fn row_indices(&self) -> &[KernelInt] {
        &self.row_indices
    }

    pub fn col_pointers(&self) -> &[KernelInt] {
        &self.col_pointers
    }

    /// True when both handles share dimensions, row indices and column pointers.
    pub fn same_pattern(&self, other: &CscHandle) -> bool {
        self.nrows == other.nrows
            && self.ncols == other.ncols
            && self.row_indices == other.row_indices
            && self.col_pointers == other.col_pointers
    }

    /// Overwrites every stored value, keeping the pattern.
    pub fn overwrite_values(&mut self, values: &[KernelFloat]) -> BridgeResult<()> {
        if values.len() != self.nnz() {
            return Err(BridgeError::shape("matrix values", self.nnz(), values.len()));
        }
        self.values.copy_from_slice(values);
        Ok(())
    }

    /// Overwrites the values at the given positions of the nonzero array.
    pub fn overwrite_entries(
        &mut self,
        values: &[KernelFloat],
        positions: &[usize],
    ) -> BridgeResult<()> {
        check_entry_positions(self.nnz(), values.len(), positions)?;
        for (&pos, &value) in positions.iter().zip(values.iter()) {
            self.values[pos] = value;
        }
        Ok(())
    }

    /// Row index and value pairs stored in column `col`.
    pub fn column(&self, col: usize) -> impl Iterator<Item = (usize, KernelFloat)> + '_ {
        let start = self.col_pointers[col] as usize;
        let end = self.col_pointers[col + 1] as usize;
        self.row_indices[start..end]
            .iter()
            .zip(self.values[start..end].iter())
            .map(|(&row, &value)| (row as usize, value))
    }
}

/// Checks a selective update: equal lengths and every position below `nnz`.
pub fn check_entry_positions(nnz: usize, nvalues: usize, positions: &[usize]) -> BridgeResult<()> {
    if nvalues != positions.len() {
        return Err(BridgeError::shape("entry positions", nvalues, positions.len()));
    }
    if let Some(&bad) = positions.iter().find(|&&pos| pos >= nnz) {
        return Err(BridgeError::shape("entry position bound", nnz, bad));
    }
    Ok(())
}

fn validate_triplet(
    rows: KernelInt,
    cols: KernelInt,
    nnz: KernelInt,
    values: &[KernelFloat],
    row_idx: &[KernelInt],
    col_ptr: &[KernelInt],
) -> BridgeResult<()> {
    if rows < 0 || cols < 0 || nnz < 0 {
        return Err(BridgeError::InvalidMatrixShape(format!(
            "negative dimension (rows {rows}, cols {cols}, nnz {nnz})"
        )));
    }
    let rows_us = to_usize(rows)?;
    let cols_us = to_usize(cols)?;
    let nnz_us = to_usize(nnz)?;
    if nnz_us > 0 {
        if values.is_empty() {
            return Err(BridgeError::EmptyMatrixBuffer("values"));
        }
        if row_idx.is_empty() {
            return Err(BridgeError::EmptyMatrixBuffer("row index"));
        }
    }
    if values.len() != nnz_us || row_idx.len() != nnz_us {
        return Err(BridgeError::InvalidMatrixShape(format!(
            "nnz {nnz} disagrees with values length {} / row index length {}",
            values.len(),
            row_idx.len()
        )));
    }
    if col_ptr.len() != cols_us + 1 {
        return Err(BridgeError::InvalidMatrixShape(format!(
            "column pointer length {} != cols + 1 ({})",
            col_ptr.len(),
            cols_us + 1
        )));
    }
    if col_ptr[0] != 0 || col_ptr[cols_us] != nnz {
        return Err(BridgeError::InvalidMatrixShape(format!(
            "column pointers must run from 0 to nnz {nnz}, found {} to {}",
            col_ptr[0], col_ptr[cols_us]
        )));
    }
    if let Some(col) = col_ptr.windows(2).position(|w| w[0] > w[1]) {
        return Err(BridgeError::InvalidMatrixShape(format!(
            "column pointers decrease at column {col}"
        )));
    }
    if let Some(&row) = row_idx.iter().find(|&&r| r < 0 || r >= rows) {
        return Err(BridgeError::InvalidMatrixShape(format!(
            "row index {row} outside [0, {rows_us})"
        )));
    }
    Ok(())
}

fn to_usize(value: KernelInt) -> BridgeResult<usize> {
    usize::try_from(value).map_err(|_| {
        BridgeError::InvalidMatrixShape(format!("{value} does not fit the host index type"))
    })
}

fn to_kernel_int(value: usize, what: &str) -> BridgeResult<KernelInt> {
    KernelInt::try_from(value).map_err(|_| {
        BridgeError::InvalidMatrixShape(format!("{what} {value} exceeds the kernel index range"))
    })
}

fn convert_indices(src: &[usize], what: &'static str) -> BridgeResult<Vec<KernelInt>> {
    let mut out = Vec::new();
    out.try_reserve_exact(src.len())
        .map_err(|err| BridgeError::AllocationFailed(format!("{what}: {err}")))?;
    for &value in src {
        out.push(to_kernel_int(value, what)?);
    }
    Ok(out)
}

/// Copies a caller buffer into storage owned by the kernel-side data.
pub fn copy_buffer<T: Copy>(src: &[T], what: &'static str) -> BridgeResult<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(src.len())
        .map_err(|err| BridgeError::AllocationFailed(format!("{what}: {err}")))?;
    out.extend_from_slice(src);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CscMatrix<f64> {
        // [[4, 1], [0, 2], [3, 0]]
        CscMatrix {
            nrows: 3,
            ncols: 2,
            indptr: vec![0, 2, 4],
            indices: vec![0, 2, 0, 1],
            data: vec![4.0, 3.0, 1.0, 2.0],
        }
    }

    #[test]
    fn encoded_handle_reads_back_shape_and_pattern() {
        let matrix = sample();
        let handle = CscHandle::from_matrix(&matrix).unwrap();
        assert_eq!(handle.nrows(), 3);
        assert_eq!(handle.ncols(), 2);
        assert_eq!(handle.nnz(), 4);
        assert_eq!(handle.col_pointers(), &[0, 2, 4]);
        assert_eq!(handle.row_indices(), &[0, 2, 0, 1]);
        assert_eq!(handle.values(), matrix.data.as_slice());
        let second: Vec<_> = handle.column(1).collect();
        assert_eq!(second, vec![(0, 1.0), (1, 2.0)]);
    }

    #[test]
    fn raw_encode_matches_matrix_encode() {
        let raw = encode(3, 2, 4, &[4.0, 3.0, 1.0, 2.0], &[0, 2, 0, 1], &[0, 2, 4]).unwrap();
        assert_eq!(raw, CscHandle::from_matrix(&sample()).unwrap());
    }

    #[test]
    fn empty_matrix_encodes() {
        let handle = encode(0, 3, 0, &[], &[], &[0, 0, 0, 0]).unwrap();
        assert_eq!(handle.nnz(), 0);
        assert_eq!(handle.nrows(), 0);
        assert_eq!(handle.ncols(), 3);
    }

    #[test]
    fn negative_dimensions_are_rejected() {
        let err = encode(-1, 1, 0, &[], &[], &[0, 0]).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidMatrixShape(_)));
        let err = encode(1, 1, -2, &[], &[], &[0, 0]).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidMatrixShape(_)));
    }

    #[test]
    fn empty_buffers_with_nonzeros_are_rejected() {
        assert_eq!(
            encode(1, 1, 1, &[], &[0], &[0, 1]).unwrap_err(),
            BridgeError::EmptyMatrixBuffer("values")
        );
        assert_eq!(
            encode(1, 1, 1, &[1.0], &[], &[0, 1]).unwrap_err(),
            BridgeError::EmptyMatrixBuffer("row index")
        );
    }

    #[test]
    fn malformed_pointers_are_rejected() {
        let bad_len = encode(2, 2, 1, &[1.0], &[0], &[0, 1]);
        assert!(matches!(bad_len, Err(BridgeError::InvalidMatrixShape(_))));
        let bad_tail = encode(2, 2, 1, &[1.0], &[0], &[0, 1, 2]);
        assert!(matches!(bad_tail, Err(BridgeError::InvalidMatrixShape(_))));
        let decreasing = encode(2, 2, 2, &[1.0, 1.0], &[0, 1], &[0, 2, 1]);
        assert!(matches!(decreasing, Err(BridgeError::InvalidMatrixShape(_))));
        let bad_row = encode(2, 1, 1, &[1.0], &[2], &[0, 1]);
        assert!(matches!(bad_row, Err(BridgeError::InvalidMatrixShape(_))));
    }

    #[test]
    fn overwriting_values_keeps_pattern() {
        let mut handle = CscHandle::from_matrix(&sample()).unwrap();
        let before = handle.clone();
        handle.overwrite_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(handle.same_pattern(&before));
        assert_eq!(handle.values(), &[1.0, 2.0, 3.0, 4.0]);

        handle.overwrite_entries(&[9.0], &[2]).unwrap();
        assert_eq!(handle.values(), &[1.0, 2.0, 9.0, 4.0]);

        assert!(matches!(
            handle.overwrite_values(&[1.0]),
            Err(BridgeError::ShapeMismatch { expected: 4, found: 1, .. })
        ));
        assert!(handle.overwrite_entries(&[1.0], &[4]).is_err());
        assert!(handle.overwrite_entries(&[1.0, 2.0], &[0]).is_err());
    }
}
