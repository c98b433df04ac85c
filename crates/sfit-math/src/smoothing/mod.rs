//! Stochastic spline smoothing of noisy data.
//!
//! Given knots `x` with nominal values `y0` and per-knot uncertainties,
//! [`AkimaSmoother`] holds a mutable smoothed estimate and improves it by
//! randomized local search against a composite objective: the normalized
//! squared deviation from `y0` plus integral and jump-discontinuity
//! penalties on the second and third derivative of the Akima interpolant
//! through the estimate.  [`AkimaSmootherDy`] applies the same search to
//! derivative samples, integrating them back to the primitive for the
//! data-fit term.
//!
//! An uncertainty equal to the [`Null`] sentinel (or infinity) marks a knot
//! as unconstrained: it contributes nothing to the data fit and acts as
//! pure interpolation padding.

mod smoother;
mod smoother_dy;

pub use smoother::AkimaSmoother;
pub use smoother_dy::AkimaSmootherDy;

use sfit_core::{errors::Result, Null, Real};

use crate::interpolations::AkimaSpline;

// ── Objective ────────────────────────────────────────────────────────────────

/// Full-series objective breakdown, refreshed at the end of every epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObjectiveBreakdown {
    /// Sum of squared deviations from the nominal values, in units of the
    /// per-knot uncertainty.
    pub sum_sq_dy: Real,
    /// Integral of the squared second derivative.
    pub sum_sq_d2: Real,
    /// Sum of squared second-derivative jumps at interior knots.
    pub sum_sq_d2d: Real,
    /// Integral of the squared third derivative.
    pub sum_sq_d3: Real,
    /// Sum of squared third-derivative jumps at interior knots.
    pub sum_sq_d3d: Real,
    /// Weighted total: `sum_sq_dy + d2fac*sum_sq_d2 + d2dfac*sum_sq_d2d +
    /// d3fac*sum_sq_d3 + d3dfac*sum_sq_d3d`.
    pub total: Real,
}

/// Dense first/second-derivative curves of the smoothed function on a
/// subdivision grid.
#[derive(Debug, Clone)]
pub struct DerivativeCurves {
    /// Grid abscissas: `n_sub` points per knot interval plus the last knot.
    pub xs: Vec<Real>,
    /// First derivative on the grid.
    pub dy: Vec<Real>,
    /// Second derivative on the grid.
    pub d2y: Vec<Real>,
}

// ── Adaptive move statistics ─────────────────────────────────────────────────

/// Attempts folded into the acceptance average at a time.
const UPDATE_INTERVAL: u32 = 10;
/// Multiplicative step rescale factor.
const STEP_SCALE: Real = 1.1;
/// Acceptance rate above which the step grows.
const GROW_ABOVE: Real = 0.10;
/// Acceptance rate below which the step shrinks.
const SHRINK_BELOW: Real = 0.05;
/// Initial acceptance-rate estimate.
const INITIAL_RATE: Real = 0.1;
/// Weight of the freshest acceptance fraction in the moving average.
const EMA_WEIGHT: Real = 0.5;

/// Per-knot adaptive step sizes with acceptance-rate tracking for one move
/// kind.
///
/// Every [`UPDATE_INTERVAL`] attempts at a knot, the counters fold into an
/// exponential moving average of the acceptance rate and the step rescales:
/// up when the rate is above [`GROW_ABOVE`], down when below
/// [`SHRINK_BELOW`].
#[derive(Debug, Clone, Default)]
pub(crate) struct MoveStats {
    step: Vec<Real>,
    pac: Vec<Real>,
    attempts: Vec<u32>,
    accepts: Vec<u32>,
}

impl MoveStats {
    pub(crate) fn reset(&mut self, steps: Vec<Real>) {
        let n = steps.len();
        self.step = steps;
        self.pac = vec![INITIAL_RATE; n];
        self.attempts = vec![0; n];
        self.accepts = vec![0; n];
    }

    pub(crate) fn step_size(&self, i: usize) -> Real {
        self.step[i]
    }

    pub(crate) fn record(&mut self, i: usize, accepted: bool) {
        self.attempts[i] += 1;
        if accepted {
            self.accepts[i] += 1;
        }
        if self.attempts[i] >= UPDATE_INTERVAL {
            let fresh = self.accepts[i] as Real / self.attempts[i] as Real;
            self.pac[i] = (1.0 - EMA_WEIGHT) * self.pac[i] + EMA_WEIGHT * fresh;
            if self.pac[i] > GROW_ABOVE {
                self.step[i] *= STEP_SCALE;
            } else if self.pac[i] < SHRINK_BELOW {
                self.step[i] /= STEP_SCALE;
            }
            self.attempts[i] = 0;
            self.accepts[i] = 0;
        }
    }
}

// ── Shared helpers ───────────────────────────────────────────────────────────

/// Is this uncertainty a real constraint (finite and not the `Null`
/// sentinel)?
pub(crate) fn constrained(sigma: Real) -> bool {
    sigma.is_finite() && !sigma.is_null()
}

/// Seed per-knot step sizes from the uncertainties: half the uncertainty
/// where finite, borrowed from the nearest constrained knot otherwise.  A
/// series with no constrained knot at all falls back to the data scale.
pub(crate) fn seed_steps(y0: &[Real], sigma: &[Real]) -> Vec<Real> {
    let n = sigma.len();
    let mut steps = vec![0.0; n];
    let mut any = false;
    for i in 0..n {
        if constrained(sigma[i]) {
            steps[i] = 0.5 * sigma[i];
            any = true;
        }
    }
    if !any {
        let (mut lo, mut hi) = (y0[0], y0[0]);
        for &v in y0 {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        let s = if hi > lo { 0.5 * (hi - lo) } else { 1.0 };
        for v in &mut steps {
            *v = s;
        }
        return steps;
    }
    for i in 0..n {
        if !constrained(sigma[i]) {
            let mut d = 1;
            loop {
                if i >= d && constrained(sigma[i - d]) {
                    steps[i] = 0.5 * sigma[i - d];
                    break;
                }
                if i + d < n && constrained(sigma[i + d]) {
                    steps[i] = 0.5 * sigma[i + d];
                    break;
                }
                d += 1;
            }
        }
    }
    steps
}

// ── Knot doubling ────────────────────────────────────────────────────────────

/// Insert a midpoint knot into every interval of a series.
///
/// Values at the doubled knots come from Akima interpolation of `(x, y)`
/// (knot values are reproduced exactly); the inserted knots carry the
/// [`Null`] uncertainty sentinel so they act as pure interpolation padding
/// in a subsequent smoothing pass.
pub fn double_knots(
    x: &[Real],
    y: &[Real],
    sigma: &[Real],
) -> Result<(Vec<Real>, Vec<Real>, Vec<Real>)> {
    sfit_core::ensure!(
        sigma.len() == x.len(),
        "sigma and x must have the same length ({} vs {})",
        sigma.len(),
        x.len()
    );
    let spline = AkimaSpline::new(x, y)?;
    let n = x.len();
    let mut x2 = Vec::with_capacity(2 * n - 1);
    let mut s2 = Vec::with_capacity(2 * n - 1);
    for i in 0..n - 1 {
        x2.push(x[i]);
        x2.push(0.5 * (x[i] + x[i + 1]));
        s2.push(sigma[i]);
        s2.push(Null::null());
    }
    x2.push(x[n - 1]);
    s2.push(sigma[n - 1]);
    let y2 = spline.interpolate(&x2);
    Ok((x2, y2, s2))
}

// ── Test support ─────────────────────────────────────────────────────────────

/// A scripted random source replaying fixed draws, for steering individual
/// move proposals in tests.
#[cfg(test)]
pub(crate) struct ScriptedSource {
    pub reals: Vec<Real>,
    pub indices: Vec<usize>,
    ri: usize,
    ii: usize,
}

#[cfg(test)]
impl ScriptedSource {
    pub fn new(reals: Vec<Real>, indices: Vec<usize>) -> Self {
        Self {
            reals,
            indices,
            ri: 0,
            ii: 0,
        }
    }
}

#[cfg(test)]
impl crate::random_numbers::UniformSource for ScriptedSource {
    fn next_real(&mut self) -> Real {
        let v = self.reals[self.ri % self.reals.len()];
        self.ri += 1;
        v
    }

    fn next_index(&mut self, bound: usize) -> usize {
        let v = self.indices[self.ii % self.indices.len()];
        self.ii += 1;
        v % bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_grows_on_high_acceptance() {
        let mut stats = MoveStats::default();
        stats.reset(vec![1.0]);
        for _ in 0..UPDATE_INTERVAL {
            stats.record(0, true);
        }
        assert!((stats.step_size(0) - STEP_SCALE).abs() < 1e-12);
    }

    #[test]
    fn step_shrinks_on_low_acceptance() {
        let mut stats = MoveStats::default();
        stats.reset(vec![1.0]);
        // first update lands exactly on the shrink threshold; the second
        // drags the average below it
        for _ in 0..2 * UPDATE_INTERVAL {
            stats.record(0, false);
        }
        assert!((stats.step_size(0) - 1.0 / STEP_SCALE).abs() < 1e-12);
    }

    #[test]
    fn counters_reset_between_updates() {
        let mut stats = MoveStats::default();
        stats.reset(vec![1.0]);
        for _ in 0..UPDATE_INTERVAL - 1 {
            stats.record(0, true);
        }
        assert!((stats.step_size(0) - 1.0).abs() < 1e-12, "no update yet");
        stats.record(0, true);
        assert!(stats.attempts[0] == 0 && stats.accepts[0] == 0);
    }

    #[test]
    fn seed_steps_borrows_from_neighbors() {
        let y0 = [0.0, 1.0, 2.0, 3.0];
        let sigma = [Null::null(), 0.4, Null::null(), 0.8];
        let s = seed_steps(&y0, &sigma);
        assert_eq!(s, vec![0.2, 0.2, 0.2, 0.4]);
    }

    #[test]
    fn seed_steps_unconstrained_series_uses_data_scale() {
        let y0 = [0.0, 4.0, 2.0];
        let sigma = [Null::null(); 3];
        let s = seed_steps(&y0, &sigma);
        assert_eq!(s, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn double_knots_pads_with_null_sigma() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 1.0, 4.0, 9.0, 16.0];
        let sigma = [0.1, 0.2, 0.3, 0.4, 0.5];
        let (x2, y2, s2) = double_knots(&x, &y, &sigma).unwrap();
        assert_eq!(x2.len(), 9);
        assert_eq!(y2.len(), 9);
        assert_eq!(s2.len(), 9);
        for i in 0..x.len() {
            assert_eq!(x2[2 * i], x[i]);
            assert!((y2[2 * i] - y[i]).abs() < 1e-12, "knot value preserved");
            assert_eq!(s2[2 * i], sigma[i]);
        }
        for i in 0..x.len() - 1 {
            assert_eq!(x2[2 * i + 1], 0.5 * (x[i] + x[i + 1]));
            assert!(s2[2 * i + 1].is_null());
        }
    }
}
