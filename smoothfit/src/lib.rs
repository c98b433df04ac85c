//! # smoothfit
//!
//! Akima spline interpolation and stochastic smoothing of noisy tabulated
//! data.
//!
//! This crate is a **façade** that re-exports the public items of the
//! underlying workspace crates.  Application code should depend on this
//! crate rather than the individual `sfit-*` crates.
//!
//! ## Quick start
//!
//! ```toml
//! [dependencies]
//! smoothfit = "0.1"
//! ```
//!
//! ```rust
//! use smoothfit::math::random_numbers::MersenneTwisterUniformRng;
//! use smoothfit::math::smoothing::AkimaSmoother;
//!
//! let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
//! let y0 = [0.1, 0.9, 4.2, 8.8, 16.1, 24.9];
//! let sigma = [0.2; 6];
//!
//! let mut smoother = AkimaSmoother::new(MersenneTwisterUniformRng::new(42));
//! smoother.set_d2fac(1.0).unwrap();
//! smoother.set_input_data(&x, &y0, &sigma).unwrap();
//! smoother.set_proposals_per_epoch(1_000).unwrap();
//! let report = smoother.step();
//! assert!(report.total.is_finite());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, aliases, and error definitions.
pub use sfit_core as core;

/// Mathematical engine: interpolation, smoothing, RNG.
pub use sfit_math as math;
