//! Akima spline interpolation.
//!
//! An Akima spline is a C¹ piecewise-cubic Hermite interpolant whose knot
//! tangents blend the two adjacent secant slopes, each weighted by the
//! curvature magnitude on the *opposite* side.  Near locally flat or kinked
//! data the tangent is pulled toward the flatter side, which avoids the
//! overshooting of natural cubic splines.  The second and third derivative
//! are in general discontinuous across knots.

use sfit_core::{errors::Result, Real};

use super::Interpolation1D;

// ── Tangent rule ─────────────────────────────────────────────────────────────

/// Knot-index category selecting the tangent formula.
///
/// The two boundary knots use a quadratic extrapolation of the nearest
/// secant slopes; the knots adjacent to them substitute the nearest
/// available finite-difference pair for the curvature term that would
/// otherwise index out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KnotBand {
    /// `i == 0`
    First,
    /// `i == 1`
    Second,
    /// `1 < i < n - 2`
    Interior,
    /// `i == n - 2`
    SecondToLast,
    /// `i == n - 1`
    Last,
}

impl KnotBand {
    pub(crate) fn of(i: usize, n: usize) -> Self {
        if i == 0 {
            KnotBand::First
        } else if i == n - 1 {
            KnotBand::Last
        } else if i == 1 {
            KnotBand::Second
        } else if i == n - 2 {
            KnotBand::SecondToLast
        } else {
            KnotBand::Interior
        }
    }
}

/// Akima's weighted average of two adjacent secant slopes: each slope is
/// weighted by the curvature magnitude on the opposite side.  Equal
/// curvatures (including the common both-zero case) fall back to the plain
/// average, so the rule never divides by zero.
fn blend(left: Real, right: Real, m_lo: Real, m_hi: Real) -> Real {
    if left != right {
        (right * m_lo + left * m_hi) / (left + right)
    } else {
        0.5 * (m_lo + m_hi)
    }
}

/// Tangent at knot `i` of an `n`-knot series with secant slopes `m`.
///
/// A 2-knot series degenerates to the single secant slope at both ends.
pub(crate) fn tangent_at(m: &[Real], n: usize, i: usize) -> Real {
    match KnotBand::of(i, n) {
        KnotBand::First => {
            if n == 2 {
                m[0]
            } else {
                0.5 * (3.0 * m[0] - m[1])
            }
        }
        KnotBand::Last => {
            if n == 2 {
                m[0]
            } else {
                0.5 * (3.0 * m[n - 2] - m[n - 3])
            }
        }
        KnotBand::Second => {
            let left = (m[1] - m[0]).abs();
            // a 3-knot series has no curvature pair on the right either;
            // both substitutes collapse to the same pair
            let right = if n >= 4 { (m[2] - m[1]).abs() } else { left };
            blend(left, right, m[0], m[1])
        }
        KnotBand::SecondToLast => {
            let left = (m[i - 1] - m[i - 2]).abs();
            let right = (m[n - 2] - m[n - 3]).abs();
            blend(left, right, m[i - 1], m[i])
        }
        KnotBand::Interior => {
            let left = (m[i - 1] - m[i - 2]).abs();
            let right = (m[i + 1] - m[i]).abs();
            blend(left, right, m[i - 1], m[i])
        }
    }
}

/// Fill `m` with the `n - 1` secant slopes of `(xs, ys)`.
pub(crate) fn fill_slopes(xs: &[Real], ys: &[Real], m: &mut Vec<Real>) {
    m.clear();
    for i in 0..xs.len() - 1 {
        m.push((ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]));
    }
}

/// Fill `t` with the `n` Akima tangents derived from the slopes `m`.
pub(crate) fn fill_tangents(m: &[Real], n: usize, t: &mut Vec<Real>) {
    t.clear();
    for i in 0..n {
        t.push(tangent_at(m, n, i));
    }
}

/// Quadratic and cubic coefficients of the Hermite piece on an interval of
/// width `dx` with secant slope `m` and endpoint tangents `t0`, `t1`.
///
/// The piece is `p0 + p1·u + p2·u² + p3·u³` with `p0` the left knot value,
/// `p1 = t0`, and `u` the offset from the left knot.
#[inline]
pub(crate) fn piece_coeffs(dx: Real, m: Real, t0: Real, t1: Real) -> (Real, Real) {
    let p2 = (3.0 * m - 2.0 * t0 - t1) / dx;
    let p3 = (-2.0 * m + t0 + t1) / (dx * dx);
    (p2, p3)
}

// ── Spline ───────────────────────────────────────────────────────────────────

/// Akima spline interpolation.
///
/// Built once from a knot series; evaluation of values, derivatives, and
/// the exact piecewise antiderivative is then a pure function of the cached
/// slopes and tangents.
#[derive(Debug, Clone)]
pub struct AkimaSpline {
    xs: Vec<Real>,
    ys: Vec<Real>,
    /// Secant slopes between consecutive knots.
    m: Vec<Real>,
    /// Hermite tangents at each knot.
    t: Vec<Real>,
}

impl AkimaSpline {
    /// Build an Akima spline through the given data points.
    ///
    /// Requires at least 2 strictly-increasing abscissas; with fewer than
    /// 4 points the boundary slope rules degrade to simpler estimates.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        super::validate_series(xs, ys, 2)?;
        let mut m = Vec::new();
        let mut t = Vec::new();
        fill_slopes(xs, ys, &mut m);
        fill_tangents(&m, xs.len(), &mut t);
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            m,
            t,
        })
    }

    /// Number of knots.
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Always `false`; a spline holds at least 2 knots.
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// The Hermite tangent at each knot.
    pub fn tangents(&self) -> &[Real] {
        &self.t
    }

    /// Evaluate the spline at query abscissas sorted ascending.
    ///
    /// Queries are bracketed in a single left-to-right pass; queries beyond
    /// either end are evaluated on the nearest interval's cubic.
    pub fn interpolate(&self, qx: &[Real]) -> Vec<Real> {
        let mut out = Vec::with_capacity(qx.len());
        let mut seg = 0;
        for &x in qx {
            self.advance(&mut seg, x);
            out.push(self.piece_value(seg, x));
        }
        out
    }

    /// Evaluate the first derivative at query abscissas sorted ascending.
    pub fn interpolate_dy(&self, qx: &[Real]) -> Vec<Real> {
        let mut out = Vec::with_capacity(qx.len());
        let mut seg = 0;
        for &x in qx {
            self.advance(&mut seg, x);
            out.push(self.piece_derivative(seg, x));
        }
        out
    }

    /// First derivative at a single abscissa.
    pub fn derivative(&self, x: Real) -> Real {
        self.piece_derivative(super::locate(&self.xs, x), x)
    }

    /// Cumulative antiderivative at the knots, starting from `c0` at the
    /// first knot.
    ///
    /// Each cubic piece is integrated in closed form, so this is the exact
    /// primitive of the interpolant rather than a quadrature estimate.
    pub fn primitive(&self, c0: Real) -> Vec<Real> {
        let n = self.xs.len();
        let mut out = Vec::with_capacity(n);
        out.push(c0);
        for i in 0..n - 1 {
            let dx = self.xs[i + 1] - self.xs[i];
            let (p2, p3) = piece_coeffs(dx, self.m[i], self.t[i], self.t[i + 1]);
            let inc = dx * (self.ys[i] + dx * (0.5 * self.t[i] + dx * (p2 / 3.0 + dx * p3 / 4.0)));
            out.push(out[i] + inc);
        }
        out
    }

    fn advance(&self, seg: &mut usize, x: Real) {
        while *seg < self.xs.len() - 2 && x > self.xs[*seg + 1] {
            *seg += 1;
        }
    }

    fn piece_value(&self, i: usize, x: Real) -> Real {
        let dx = self.xs[i + 1] - self.xs[i];
        let u = x - self.xs[i];
        let (p2, p3) = piece_coeffs(dx, self.m[i], self.t[i], self.t[i + 1]);
        self.ys[i] + u * (self.t[i] + u * (p2 + u * p3))
    }

    fn piece_derivative(&self, i: usize, x: Real) -> Real {
        let dx = self.xs[i + 1] - self.xs[i];
        let u = x - self.xs[i];
        let (p2, p3) = piece_coeffs(dx, self.m[i], self.t[i], self.t[i + 1]);
        self.t[i] + u * (2.0 * p2 + 3.0 * p3 * u)
    }
}

impl Interpolation1D for AkimaSpline {
    fn x_min(&self) -> Real {
        self.xs[0]
    }

    fn x_max(&self) -> Real {
        *self.xs.last().unwrap()
    }

    fn value(&self, x: Real) -> Real {
        self.piece_value(super::locate(&self.xs, x), x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_on_knots() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [0.0, 1.0, 0.5, 2.0, 1.5, 3.0];
        let s = AkimaSpline::new(&xs, &ys).unwrap();
        for (&x, &y) in xs.iter().zip(ys.iter()) {
            let v = s.value(x);
            assert!((v - y).abs() < 1e-12, "at x={x}: expected {y}, got {v}");
        }
    }

    #[test]
    fn c1_at_interior_knots() {
        let xs = [0.0, 0.5, 1.7, 2.0, 3.1, 4.0, 5.5];
        let ys = [0.0, 1.0, 0.5, 2.0, 1.5, 3.0, 2.0];
        let s = AkimaSpline::new(&xs, &ys).unwrap();
        for i in 1..xs.len() - 1 {
            let from_left = s.piece_derivative(i - 1, xs[i]);
            let from_right = s.piece_derivative(i, xs[i]);
            assert!(
                (from_left - from_right).abs() < 1e-10,
                "derivative jump at knot {i}: {from_left} vs {from_right}"
            );
        }
    }

    #[test]
    fn equal_curvature_averages_slopes() {
        // slopes m = [1, 2, 2, 3]: at i=2 both curvature magnitudes are 1,
        // so the tangent must be the plain average 0.5*(2+2) = 2 exactly
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = [0.0, 1.0, 3.0, 5.0, 8.0];
        let s = AkimaSpline::new(&xs, &ys).unwrap();
        assert_eq!(s.tangents()[2], 2.0);
    }

    #[test]
    fn linear_data_gives_linear_interpolant() {
        // all slopes equal: every curvature weight is zero, which must hit
        // the division-avoidance branch and reproduce the line
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5];
        let s = AkimaSpline::new(&xs, &ys).unwrap();
        let v = s.value(2.5);
        assert!((v - 1.25).abs() < 1e-12, "expected 1.25, got {v}");
        for &t in s.tangents() {
            assert!((t - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn monotone_data_stays_near_bracket() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [0.0, 1.0, 4.0, 9.0, 16.0, 25.0];
        let s = AkimaSpline::new(&xs, &ys).unwrap();
        for i in 0..xs.len() - 1 {
            let mid = 0.5 * (xs[i] + xs[i + 1]);
            let v = s.value(mid);
            let span = ys[i + 1] - ys[i];
            assert!(
                v > ys[i] - 0.25 * span && v < ys[i + 1] + 0.25 * span,
                "overshoot at midpoint {mid}: {v} outside [{}, {}]",
                ys[i],
                ys[i + 1]
            );
        }
    }

    #[test]
    fn sorted_batch_matches_single_queries() {
        let xs = [0.0, 1.0, 2.5, 3.0, 4.2, 5.0];
        let ys = [0.0, 1.0, 0.5, 2.0, 1.5, 3.0];
        let s = AkimaSpline::new(&xs, &ys).unwrap();
        let q = [-0.5, 0.3, 1.0, 2.6, 4.9, 5.5];
        let batch = s.interpolate(&q);
        for (&x, &v) in q.iter().zip(batch.iter()) {
            assert!((v - s.value(x)).abs() < 1e-12);
        }
    }

    #[test]
    fn two_point_series_is_the_chord() {
        let s = AkimaSpline::new(&[0.0, 2.0], &[1.0, 5.0]).unwrap();
        assert!((s.value(1.0) - 3.0).abs() < 1e-12);
        assert!((s.derivative(1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn primitive_of_quadratic_derivative_is_exact() {
        // dy = 3x² sampled uniformly has exact Akima tangents, so the
        // closed-form antiderivative must reproduce x³ to roundoff
        let n = 9;
        let xs: Vec<Real> = (0..n).map(|i| 0.25 * i as Real).collect();
        let dys: Vec<Real> = xs.iter().map(|&x| 3.0 * x * x).collect();
        let s = AkimaSpline::new(&xs, &dys).unwrap();
        let prim = s.primitive(0.0);
        for (&x, &p) in xs.iter().zip(prim.iter()) {
            assert!(
                (p - x * x * x).abs() < 1e-10,
                "at x={x}: expected {}, got {p}",
                x * x * x
            );
        }
    }

    #[test]
    fn knot_bands() {
        assert_eq!(KnotBand::of(0, 6), KnotBand::First);
        assert_eq!(KnotBand::of(1, 6), KnotBand::Second);
        assert_eq!(KnotBand::of(3, 6), KnotBand::Interior);
        assert_eq!(KnotBand::of(4, 6), KnotBand::SecondToLast);
        assert_eq!(KnotBand::of(5, 6), KnotBand::Last);
        // a 3-knot series: the middle knot resolves as Second
        assert_eq!(KnotBand::of(1, 3), KnotBand::Second);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(AkimaSpline::new(&[0.0], &[1.0]).is_err());
        assert!(AkimaSpline::new(&[0.0, 1.0], &[1.0]).is_err());
        assert!(AkimaSpline::new(&[0.0, 1.0, 0.5], &[1.0, 2.0, 3.0]).is_err());
    }
}
