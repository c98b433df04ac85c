//! Null / unset value utilities.
//!
//! Several numeric inputs accept a distinguished "unset" sentinel — most
//! importantly per-knot uncertainties, where the sentinel marks a knot as
//! unconstrained.  By convention the sentinel is the **maximum** value of
//! the type, so that sentinel checks compose with infinity checks
//! (`sigma >= f64::MAX` and `sigma.is_infinite()` both mark a knot free).

/// A type that has a distinguished "null" sentinel value.
///
/// Implementors provide a `null()` associated function returning the
/// sentinel.
pub trait Null: Sized + PartialEq + Copy {
    /// The null / unset sentinel value for this type.
    fn null() -> Self;

    /// Return `true` if `self` equals the null sentinel.
    fn is_null(&self) -> bool {
        *self == Self::null()
    }
}

impl Null for f64 {
    fn null() -> Self {
        f64::MAX
    }
}

impl Null for f32 {
    fn null() -> Self {
        f32::MAX
    }
}

impl Null for usize {
    fn null() -> Self {
        usize::MAX
    }
}
