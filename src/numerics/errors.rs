//! Errors for the matrix-exponential kernels.
//!
//! [`ExpmError`] is returned by the dense Padé exponential ([`super::expm`])
//! and the Krylov action ([`super::expv`]). Kernels report *structural*
//! failures only (invalid input, a singular Padé denominator, exhausted step
//! rejections); a finite input that merely overflows is returned as-is so the
//! caller can decide how to treat non-finite output.

/// Result alias for the numerics kernels.
pub type ExpmResult<T> = Result<T, ExpmError>;

/// Failure modes of the matrix-exponential kernels.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpmError {
    /// Matrix is not square.
    NotSquare { rows: usize, cols: usize },

    /// Vector length does not match the matrix dimension.
    LengthMismatch { expected: usize, actual: usize },

    /// Input matrix contains NaN/±inf.
    NonFiniteMatrix { row: usize, col: usize, value: f64 },

    /// Input vector contains NaN/±inf.
    NonFiniteVector { index: usize, value: f64 },

    /// Time argument must be finite and >= 0.
    InvalidTime { value: f64 },

    /// The Padé denominator `V - U` could not be factorized.
    SingularPadeDenominator { order: usize },

    /// Krylov time-stepping rejected too many step sizes.
    TooManyRejections { rejections: usize, t_now: f64, t_out: f64 },
}

impl std::error::Error for ExpmError {}

impl std::fmt::Display for ExpmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpmError::NotSquare { rows, cols } => {
                write!(f, "Matrix must be square; got {rows}x{cols}")
            }
            ExpmError::LengthMismatch { expected, actual } => {
                write!(f, "Vector length mismatch: expected {expected}, got {actual}")
            }
            ExpmError::NonFiniteMatrix { row, col, value } => {
                write!(f, "Matrix entry ({row}, {col}) is non-finite: {value}")
            }
            ExpmError::NonFiniteVector { index, value } => {
                write!(f, "Vector entry at index {index} is non-finite: {value}")
            }
            ExpmError::InvalidTime { value } => {
                write!(f, "Exponential time must be finite and >= 0; got: {value}")
            }
            ExpmError::SingularPadeDenominator { order } => {
                write!(f, "Pade({order}) denominator is singular")
            }
            ExpmError::TooManyRejections { rejections, t_now, t_out } => {
                write!(
                    f,
                    "Krylov step size rejected {rejections} times at t = {t_now:e} of {t_out:e}"
                )
            }
        }
    }
}
