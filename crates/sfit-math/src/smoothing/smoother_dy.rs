//! Stochastic smoothing of derivative samples.
//!
//! The optimizer state holds samples of a function's *derivative*; the
//! smoothed primitive is recovered by integrating the Akima interpolant of
//! the state piece by piece in closed form, and the data-fit term compares
//! that primitive against the nominal values.  A fourth move kind perturbs
//! the integration constant.

use sfit_core::{errors::Result, Real};

use crate::interpolations::AkimaSpline;
use crate::random_numbers::UniformSource;

use super::smoother::{AkimaSmoother, FitMode};
use super::{seed_steps, DerivativeCurves, MoveStats, ObjectiveBreakdown};

/// Proposals per `step()` call.  Integration makes the data-fit term reach
/// every knot downstream of a change, so each proposal costs O(n) and the
/// epoch is kept a factor 10 smaller than the direct smoother's.
const DEFAULT_PROPOSALS: usize = 10_000;

/// Stochastic smoother whose state is a series of derivative samples.
///
/// Shares the single-point, hole, and jitter moves of [`AkimaSmoother`]
/// (operating on the derivative samples) and adds a whole-series shift of
/// the integration constant.  The smoothed primitive is read back with
/// [`primitive`](AkimaSmootherDy::primitive).
pub struct AkimaSmootherDy<R: UniformSource> {
    inner: AkimaSmoother<R>,
    shift_stats: MoveStats,
}

impl<R: UniformSource> AkimaSmootherDy<R> {
    /// Create a derivative smoother with no data loaded.
    pub fn new(rng: R) -> Self {
        let mut inner = AkimaSmoother::new(rng);
        inner.mode = FitMode::Integrated;
        inner.proposals = DEFAULT_PROPOSALS;
        inner.trial_p = vec![0.45, 0.70, 0.95];
        Self {
            inner,
            shift_stats: MoveStats::default(),
        }
    }

    // ── Configuration ────────────────────────────────────────────────────────

    /// Load a series, seeding the derivative state from the Akima tangents
    /// of `(x, y0)`.
    pub fn set_input_data(&mut self, x: &[Real], y0: &[Real], sigma: &[Real]) -> Result<()> {
        let spline = AkimaSpline::new(x, y0)?;
        let dy0 = spline.tangents().to_vec();
        self.set_input_data_with_derivative(x, y0, &dy0, sigma)
    }

    /// Load a series with an explicit initial derivative state (used e.g.
    /// after knot doubling, where the previous state is re-interpolated
    /// onto the refined grid).
    pub fn set_input_data_with_derivative(
        &mut self,
        x: &[Real],
        y0: &[Real],
        dy0: &[Real],
        sigma: &[Real],
    ) -> Result<()> {
        sfit_core::ensure!(x.len() >= 2, "need at least 2 points, got {}", x.len());
        sfit_core::ensure!(
            dy0.len() == x.len(),
            "dy0 and x must have the same length ({} vs {})",
            dy0.len(),
            x.len()
        );
        // derivative-state steps scale as the value uncertainty over the
        // mean knot spacing
        let h = (x[x.len() - 1] - x[0]) / (x.len() - 1) as Real;
        self.inner.load_series(x, y0, sigma, dy0.to_vec(), 1.0 / h)?;
        let s = seed_steps(y0, sigma);
        self.shift_stats.reset(vec![s[0]]);
        Ok(())
    }

    /// Weight of the squared-second-derivative integral penalty.
    pub fn set_d2fac(&mut self, v: Real) -> Result<()> {
        self.inner.set_d2fac(v)
    }

    /// Weight of the squared second-derivative jumps at interior knots.
    pub fn set_d2dfac(&mut self, v: Real) -> Result<()> {
        self.inner.set_d2dfac(v)
    }

    /// Weight of the squared-third-derivative integral penalty.
    pub fn set_d3fac(&mut self, v: Real) -> Result<()> {
        self.inner.set_d3fac(v)
    }

    /// Weight of the squared third-derivative jumps at interior knots.
    pub fn set_d3dfac(&mut self, v: Real) -> Result<()> {
        self.inner.set_d3dfac(v)
    }

    /// Cumulative selection probabilities for the first three move kinds
    /// (single-point, hole, jitter); the remainder selects the
    /// integration-constant shift.
    pub fn set_trial_probabilities(&mut self, p: &[Real]) -> Result<()> {
        self.inner.set_trial_p_checked(p, 4)
    }

    /// Number of move proposals executed by each `step()` call.
    pub fn set_proposals_per_epoch(&mut self, n: usize) -> Result<()> {
        self.inner.set_proposals_per_epoch(n)
    }

    /// Override the integration constant (the primitive's value at the
    /// first knot); defaults to `y0[0]` at load time.
    pub fn set_initial_value(&mut self, v: Real) {
        self.inner.iy0 = v;
        if self.inner.x.len() >= 2 {
            self.inner.reintegrate(0);
            self.inner.recompute_objective();
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Knot abscissas.
    pub fn x(&self) -> &[Real] {
        self.inner.x()
    }

    /// Smoothed primitive values at the knots.
    pub fn primitive(&self) -> &[Real] {
        &self.inner.iy
    }

    /// Current derivative-sample state.
    pub fn derivative_state(&self) -> &[Real] {
        &self.inner.y
    }

    /// Nominal (target) values of the primitive.
    pub fn targets(&self) -> &[Real] {
        self.inner.targets()
    }

    /// Per-knot uncertainties of the primitive values.
    pub fn sigmas(&self) -> &[Real] {
        self.inner.sigmas()
    }

    /// The full-series objective breakdown from the last epoch (or data
    /// load), with the weighted total under the current weights.
    pub fn objective(&self) -> ObjectiveBreakdown {
        self.inner.objective()
    }

    /// Normalized residuals `(primitive - y0) / sigma` per knot; zero at
    /// unconstrained knots.
    pub fn residuals(&self) -> Vec<Real> {
        self.inner.residuals()
    }

    /// First and second derivative of the smoothed primitive on a grid of
    /// `n_sub` points per knot interval: the value and first derivative of
    /// the state spline.
    pub fn derivative_curves(&self, n_sub: usize) -> Result<DerivativeCurves> {
        sfit_core::ensure!(n_sub >= 1, "n_sub must be at least 1, got {n_sub}");
        sfit_core::ensure!(self.inner.x.len() >= 2, "no input data loaded");
        let (xs, v0, v1, _) = self.inner.grid_eval(n_sub);
        Ok(DerivativeCurves {
            xs,
            dy: v0,
            d2y: v1,
        })
    }

    // ── Epoch ────────────────────────────────────────────────────────────────

    /// Run one optimization epoch; see [`AkimaSmoother::step`].
    pub fn step(&mut self) -> ObjectiveBreakdown {
        if self.inner.x.len() < 2 {
            return self.inner.objective();
        }
        for _ in 0..self.inner.proposals {
            let r = self.inner.rng.next_real();
            if r < self.inner.trial_p[0] {
                self.inner.try_point_move();
            } else if r < self.inner.trial_p[1] {
                self.inner.try_hole_move();
            } else if r < self.inner.trial_p[2] {
                self.inner.try_jitter_move();
            } else {
                self.try_shift_move();
            }
        }
        self.inner.recompute_objective();
        self.inner.objective()
    }

    /// Shift the integration constant by a random offset.  The state spline
    /// is untouched, so only the data-fit term can change and the
    /// whole-series comparison is exact.
    fn try_shift_move(&mut self) {
        let step = self.shift_stats.step_size(0);
        let delta = (2.0 * self.inner.rng.next_real() - 1.0) * step;
        let old = self.inner.fit_with_offset(0.0);
        let new = self.inner.fit_with_offset(delta);
        let accepted = new <= old;
        if accepted {
            self.inner.iy0 += delta;
            for v in &mut self.inner.iy {
                *v += delta;
            }
        }
        self.shift_stats.record(0, accepted);
    }
}
