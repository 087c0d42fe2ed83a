//! Copies between `ndarray` views and `nalgebra` dynamic matrices.
//!
//! The likelihood layer works in `ndarray`; the exponential kernels use
//! `nalgebra` for LU solves. These helpers copy column by column to match the
//! column-major storage of [`DMatrix`].
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Copy an `ndarray` matrix view into a freshly allocated [`DMatrix`].
pub fn to_dmatrix(a: ArrayView2<f64>) -> DMatrix<f64> {
    let (rows, cols) = a.dim();
    let mut out = DMatrix::<f64>::zeros(rows, cols);
    for j in 0..cols {
        for i in 0..rows {
            out[(i, j)] = a[[i, j]];
        }
    }
    out
}

/// Copy an `ndarray` vector view into a [`DVector`].
pub fn to_dvector(v: ArrayView1<f64>) -> DVector<f64> {
    DVector::from_iterator(v.len(), v.iter().copied())
}

/// Copy a [`DMatrix`] back into an owned `ndarray` matrix.
pub fn to_array2(a: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn(a.shape(), |(i, j)| a[(i, j)])
}

/// Copy a [`DVector`] back into an owned `ndarray` vector.
pub fn to_array1(v: &DVector<f64>) -> Array1<f64> {
    Array1::from_iter(v.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Verify that a non-square matrix survives the ndarray -> nalgebra ->
    // ndarray trip with entries in the same (row, col) positions.
    fn matrix_copy_preserves_layout() {
        let a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];

        let dm = to_dmatrix(a.view());
        let back = to_array2(&dm);

        assert_eq!(dm.shape(), (2, 3));
        assert_eq!(dm[(1, 0)], 4.0);
        assert_eq!(dm[(0, 2)], 3.0);
        assert_eq!(back, a);
    }
}
