//! Dense matrix exponential by Padé approximation with scaling and squaring.
//!
//! Implements the degree-selection scheme of Higham (2005): for a 1-norm
//! below `θ_m` a diagonal Padé approximant of degree `m ∈ {3, 5, 7, 9}` is
//! used directly; otherwise `A` is scaled by `2^-s` so that `‖A/2^s‖₁ ≤ θ₁₃`,
//! the degree-13 approximant is formed, and the result is squared `s` times.
//!
//! ## What this module does
//! - [`expm`]: `exp(A)` for a square, finite [`DMatrix`].
//! - [`expm_scaled`]: `exp(A·t)` for an `ndarray` view.
//! - [`expm_action_dense`]: `exp(A·t)·v` by materializing `exp(A·t)`; used for
//!   small blocks and as the inner kernel of the Krylov routine.
//! - [`diagonal_expm_action`]: closed form `exp(d_i·t)·v_i` for diagonal `A`.
//!
//! ## Failure semantics
//! Only structural failures are errors (non-square or non-finite input,
//! negative or non-finite time, singular Padé denominator). Overflow of a
//! finite input shows up as non-finite entries in the returned matrix.
use crate::numerics::{
    bridge::{to_array1, to_array2, to_dmatrix, to_dvector},
    errors::{ExpmError, ExpmResult},
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

const THETA_3: f64 = 1.495585217958292e-2;
const THETA_5: f64 = 2.539398330063230e-1;
const THETA_7: f64 = 9.504178996162932e-1;
const THETA_9: f64 = 2.097847961257068;
const THETA_13: f64 = 5.371920351148152;

const PADE_3: [f64; 4] = [120.0, 60.0, 12.0, 1.0];
const PADE_5: [f64; 6] = [30240.0, 15120.0, 3360.0, 420.0, 30.0, 1.0];
const PADE_7: [f64; 8] = [17297280.0, 8648640.0, 1995840.0, 277200.0, 25200.0, 1512.0, 56.0, 1.0];
const PADE_9: [f64; 10] = [
    17643225600.0,
    8821612800.0,
    2075673600.0,
    302702400.0,
    30270240.0,
    2162160.0,
    110880.0,
    3960.0,
    90.0,
    1.0,
];
const PADE_13: [f64; 14] = [
    64764752532480000.0,
    32382376266240000.0,
    7771770303897600.0,
    1187353796428800.0,
    129060195264000.0,
    10559470521600.0,
    670442572800.0,
    33522128640.0,
    1323241920.0,
    40840800.0,
    960960.0,
    16380.0,
    182.0,
    1.0,
];

/// Largest squaring count; keeps `2^s` representable for extreme norms.
const MAX_SQUARINGS: i32 = 1023;

/// Compute `exp(A)` for a square matrix with finite entries.
///
/// # Errors
/// - `ExpmError::NotSquare` / `ExpmError::NonFiniteMatrix` for invalid input.
/// - `ExpmError::SingularPadeDenominator` if `V - U` cannot be LU-solved.
pub fn expm(a: &DMatrix<f64>) -> ExpmResult<DMatrix<f64>> {
    validate_matrix(a)?;
    if a.nrows() == 0 {
        return Ok(DMatrix::zeros(0, 0));
    }

    let norm = one_norm(a);
    if norm <= THETA_3 {
        return pade_low_order(a, &PADE_3);
    }
    if norm <= THETA_5 {
        return pade_low_order(a, &PADE_5);
    }
    if norm <= THETA_7 {
        return pade_low_order(a, &PADE_7);
    }
    if norm <= THETA_9 {
        return pade_low_order(a, &PADE_9);
    }

    let squarings = ((norm / THETA_13).log2().ceil() as i32).clamp(0, MAX_SQUARINGS);
    let scaled = a / 2f64.powi(squarings);
    let mut result = pade_13(&scaled)?;
    for _ in 0..squarings {
        result = &result * &result;
    }
    Ok(result)
}

/// Compute `exp(A·t)` for an `ndarray` matrix view.
pub fn expm_scaled(a: ArrayView2<f64>, t: f64) -> ExpmResult<Array2<f64>> {
    validate_time(t)?;
    let scaled = to_dmatrix(a) * t;
    Ok(to_array2(&expm(&scaled)?))
}

/// Compute `exp(A·t)·v` by forming the dense exponential.
pub fn expm_action_dense(a: ArrayView2<f64>, t: f64, v: ArrayView1<f64>) -> ExpmResult<Array1<f64>> {
    validate_time(t)?;
    validate_vector(v, a.nrows())?;
    let e = expm(&(to_dmatrix(a) * t))?;
    Ok(to_array1(&(e * to_dvector(v))))
}

/// Compute `exp(diag(d)·t)·v` elementwise.
///
/// Exact for diagonal matrices; `d` is the diagonal of the block.
pub fn diagonal_expm_action(
    diagonal: ArrayView1<f64>, t: f64, v: ArrayView1<f64>,
) -> ExpmResult<Array1<f64>> {
    validate_time(t)?;
    validate_vector(v, diagonal.len())?;
    for (index, &value) in diagonal.iter().enumerate() {
        if !value.is_finite() {
            return Err(ExpmError::NonFiniteMatrix { row: index, col: index, value });
        }
    }
    Ok(diagonal.iter().zip(v.iter()).map(|(&d, &x)| (d * t).exp() * x).collect())
}

// ---- Helper Methods ----

/// Validate that `a` is square with finite entries.
pub(crate) fn validate_matrix(a: &DMatrix<f64>) -> ExpmResult<()> {
    let (rows, cols) = a.shape();
    if rows != cols {
        return Err(ExpmError::NotSquare { rows, cols });
    }
    for j in 0..cols {
        for i in 0..rows {
            let value = a[(i, j)];
            if !value.is_finite() {
                return Err(ExpmError::NonFiniteMatrix { row: i, col: j, value });
            }
        }
    }
    Ok(())
}

/// Validate that `v` has length `n` and finite entries.
pub(crate) fn validate_vector(v: ArrayView1<f64>, n: usize) -> ExpmResult<()> {
    if v.len() != n {
        return Err(ExpmError::LengthMismatch { expected: n, actual: v.len() });
    }
    for (index, &value) in v.iter().enumerate() {
        if !value.is_finite() {
            return Err(ExpmError::NonFiniteVector { index, value });
        }
    }
    Ok(())
}

pub(crate) fn validate_time(t: f64) -> ExpmResult<()> {
    if !t.is_finite() || t < 0.0 {
        return Err(ExpmError::InvalidTime { value: t });
    }
    Ok(())
}

/// Maximum absolute column sum.
pub(crate) fn one_norm(a: &DMatrix<f64>) -> f64 {
    a.column_iter().map(|col| col.iter().map(|x| x.abs()).sum::<f64>()).fold(0.0, f64::max)
}

/// Diagonal Padé approximant of odd degree `m = coeffs.len() - 1 ≤ 9`.
fn pade_low_order(a: &DMatrix<f64>, coeffs: &[f64]) -> ExpmResult<DMatrix<f64>> {
    let n = a.nrows();
    let order = coeffs.len() - 1;
    let ident = DMatrix::<f64>::identity(n, n);
    let a2 = a * a;

    let mut power = ident.clone();
    let mut u_inner = &ident * coeffs[1];
    let mut v = &ident * coeffs[0];
    for k in (2..order).step_by(2) {
        power = &power * &a2;
        v += &power * coeffs[k];
        u_inner += &power * coeffs[k + 1];
    }
    let u = a * u_inner;
    solve_pade(u, v, order)
}

/// Degree-13 approximant with the three-product evaluation scheme.
fn pade_13(a: &DMatrix<f64>) -> ExpmResult<DMatrix<f64>> {
    let b = &PADE_13;
    let n = a.nrows();
    let ident = DMatrix::<f64>::identity(n, n);
    let a2 = a * a;
    let a4 = &a2 * &a2;
    let a6 = &a4 * &a2;

    let u_high = &a6 * b[13] + &a4 * b[11] + &a2 * b[9];
    let u_inner = &a6 * u_high + &a6 * b[7] + &a4 * b[5] + &a2 * b[3] + &ident * b[1];
    let u = a * u_inner;

    let v_high = &a6 * b[12] + &a4 * b[10] + &a2 * b[8];
    let v = &a6 * v_high + &a6 * b[6] + &a4 * b[4] + &a2 * b[2] + &ident * b[0];
    solve_pade(u, v, 13)
}

/// Solve `(V - U) R = (V + U)` for `R`.
fn solve_pade(u: DMatrix<f64>, v: DMatrix<f64>, order: usize) -> ExpmResult<DMatrix<f64>> {
    let numerator = &v + &u;
    let denominator = v - u;
    denominator.lu().solve(&numerator).ok_or(ExpmError::SingularPadeDenominator { order })
}
