//! # sfit-core
//!
//! Core types, traits, and error definitions for smoothfit.
//!
//! This crate provides the foundational building blocks shared across the
//! workspace – primitive type aliases, the error hierarchy with its
//! `ensure!` / `fail!` contract macros, and the `Null` sentinel trait used
//! to mark unconstrained values.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Public modules ───────────────────────────────────────────────────────────

/// Error types and the `ensure!` / `fail!` / `ensure_post!` macros.
pub mod errors;

/// Miscellaneous utilities.
pub mod utilities;

// ── Primitive type aliases ────────────────────────────────────────────────────

/// Floating-point type used throughout the library.
pub type Real = f64;

/// Alias used for array sizes / indices.
pub type Size = usize;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use errors::{Error, Result};
pub use utilities::Null;
