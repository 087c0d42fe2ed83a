//! numerics — matrix-exponential kernels for the backward recursion.
//!
//! Purpose
//! -------
//! Collect the dense and Krylov matrix-exponential routines that the
//! likelihood layer uses to propagate beta vectors through a dwell segment,
//! together with the `ndarray` ↔ `nalgebra` copies they need.
//!
//! Key behaviors
//! -------------
//! - [`expm`]: Padé scaling-and-squaring exponential of a dense matrix.
//! - [`expv`]: Expokit-style Krylov action `exp(A·t)·v` with adaptive
//!   sub-stepping; small blocks fall back to the dense action.
//! - [`diagonal_expm_action`]: closed-form action for diagonal blocks.
//!
//! Conventions
//! -----------
//! - Kernels are pure: no logging, no I/O, no global state.
//! - Structural failures are reported as [`ExpmError`]; overflow of finite
//!   input is returned as non-finite output for the caller to classify.

pub mod bridge;
pub mod errors;
pub mod expm;
pub mod expv;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{ExpmError, ExpmResult};
pub use self::expm::{diagonal_expm_action, expm, expm_action_dense, expm_scaled};
pub use self::expv::{ExpvOptions, expv};
