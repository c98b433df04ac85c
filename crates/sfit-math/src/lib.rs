//! # sfit-math
//!
//! The numerical engine of smoothfit: Akima spline interpolation, the
//! stochastic smoothing optimizers built on top of it, and random number
//! generation.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Floating-point comparison utilities.
pub mod comparison;

/// 1D interpolation schemes.
pub mod interpolations;

/// Random number generators.
pub mod random_numbers;

/// Stochastic spline smoothing of noisy data.
pub mod smoothing;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use comparison::{close, close_enough};
pub use interpolations::AkimaSpline;
pub use smoothing::{AkimaSmoother, AkimaSmootherDy};
