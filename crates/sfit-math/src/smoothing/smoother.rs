//! Greedy stochastic smoothing of a noisy knot series.

use sfit_core::{errors::Result, Real};

use crate::interpolations::akima::{fill_slopes, fill_tangents, piece_coeffs, tangent_at};
use crate::random_numbers::UniformSource;

use super::{constrained, seed_steps, DerivativeCurves, MoveStats, ObjectiveBreakdown};

/// How the data-fit term reads the state array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FitMode {
    /// The state holds the smoothed values themselves.
    Direct,
    /// The state holds derivative samples; the fit compares their
    /// closed-form integral against the nominal values.
    Integrated,
}

/// Proposals per `step()` call.
const DEFAULT_PROPOSALS: usize = 100_000;
/// Half-width of the single-point candidate grid (2k+1 offsets tried).
const POINT_GRID_HALF: i64 = 2;
/// Recompute halo around a changed window; covers the full dependency
/// reach of a change (slopes shift by one knot, tangents by two, the
/// per-interval roughness terms by three).
const HALO: usize = 4;
/// Surviving knots kept on each side when re-interpolating across a hole.
const HOLE_NEIGHBORS: usize = 4;
/// A hole must leave more than this many knots in the series.
const MIN_SURVIVORS: usize = 5;

/// Stochastic smoother for a noisy series `(x, y0, sigma)`.
///
/// The working estimate starts as a copy of `y0` and is improved by three
/// kinds of random local proposals, each accepted only when the windowed
/// objective does not increase:
///
/// 1. a best-of-grid perturbation of a single knot value, with a per-knot
///    adaptive step size;
/// 2. removal of a contiguous window of knots, re-filled by interpolating
///    across the gap from the surviving neighbors;
/// 3. a jitter of one knot combined with re-interpolation of the knots
///    flanking it.
///
/// All four roughness weights default to zero; callers must set at least
/// one positive weight, otherwise the objective reduces to the pure data
/// fit and the search merely reproduces `y0`.
pub struct AkimaSmoother<R: UniformSource> {
    pub(crate) rng: R,

    // series
    pub(crate) x: Vec<Real>,
    pub(crate) y: Vec<Real>,
    pub(crate) y0: Vec<Real>,
    pub(crate) ey: Vec<Real>,

    // derived caches, maintained incrementally around each move
    pub(crate) m: Vec<Real>,
    pub(crate) t: Vec<Real>,

    // integrated-mode state
    pub(crate) mode: FitMode,
    pub(crate) iy: Vec<Real>,
    pub(crate) iy0: Real,

    // objective weights
    pub(crate) d2fac: Real,
    pub(crate) d2dfac: Real,
    pub(crate) d3fac: Real,
    pub(crate) d3dfac: Real,

    // move machinery
    pub(crate) trial_p: Vec<Real>,
    pub(crate) proposals: usize,
    pub(crate) point_stats: MoveStats,
    pub(crate) jitter_stats: MoveStats,

    // scratch for hole/jitter re-interpolation, sized once per series
    hole_x: Vec<Real>,
    hole_y: Vec<Real>,
    hole_m: Vec<Real>,
    hole_t: Vec<Real>,
    saved: Vec<Real>,

    // last full-series objective parts (weighted total filled on access)
    parts: ObjectiveBreakdown,
}

impl<R: UniformSource> AkimaSmoother<R> {
    /// Create a smoother with no data loaded, drawing proposals from `rng`.
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            x: Vec::new(),
            y: Vec::new(),
            y0: Vec::new(),
            ey: Vec::new(),
            m: Vec::new(),
            t: Vec::new(),
            mode: FitMode::Direct,
            iy: Vec::new(),
            iy0: 0.0,
            d2fac: 0.0,
            d2dfac: 0.0,
            d3fac: 0.0,
            d3dfac: 0.0,
            trial_p: vec![0.5, 0.75],
            proposals: DEFAULT_PROPOSALS,
            point_stats: MoveStats::default(),
            jitter_stats: MoveStats::default(),
            hole_x: Vec::new(),
            hole_y: Vec::new(),
            hole_m: Vec::new(),
            hole_t: Vec::new(),
            saved: Vec::new(),
            parts: ObjectiveBreakdown::default(),
        }
    }

    // ── Configuration ────────────────────────────────────────────────────────

    /// Load a new series and reset the working estimate to `y0`.
    ///
    /// `sigma` entries must be positive; the `Null` sentinel (or infinity)
    /// marks a knot as unconstrained.
    pub fn set_input_data(&mut self, x: &[Real], y0: &[Real], sigma: &[Real]) -> Result<()> {
        self.load_series(x, y0, sigma, y0.to_vec(), 1.0)
    }

    pub(crate) fn load_series(
        &mut self,
        x: &[Real],
        y0: &[Real],
        sigma: &[Real],
        state: Vec<Real>,
        step_scale: Real,
    ) -> Result<()> {
        crate::interpolations::validate_series(x, y0, 2)?;
        sfit_core::ensure!(
            sigma.len() == x.len(),
            "sigma and x must have the same length ({} vs {})",
            sigma.len(),
            x.len()
        );
        for (i, &s) in sigma.iter().enumerate() {
            sfit_core::ensure!(s > 0.0, "sigma[{i}] must be positive, got {s}");
        }
        let n = x.len();
        self.x = x.to_vec();
        self.y0 = y0.to_vec();
        self.ey = sigma.to_vec();
        self.y = state;
        self.m = vec![0.0; n - 1];
        self.t = vec![0.0; n];
        let mut steps = seed_steps(y0, sigma);
        for s in &mut steps {
            *s *= step_scale;
        }
        self.point_stats.reset(steps.clone());
        self.jitter_stats.reset(steps);
        self.hole_x.clear();
        self.hole_x.reserve(2 * HOLE_NEIGHBORS + 1);
        self.hole_y.clear();
        self.hole_y.reserve(2 * HOLE_NEIGHBORS + 1);
        self.saved.clear();
        self.saved.reserve(n);
        if self.mode == FitMode::Integrated {
            self.iy = vec![0.0; n];
            self.iy0 = y0[0];
        }
        self.refresh_window(0, n - 1);
        if self.mode == FitMode::Integrated {
            self.reintegrate(0);
        }
        self.recompute_objective();
        Ok(())
    }

    /// Weight of the squared-second-derivative integral penalty.
    pub fn set_d2fac(&mut self, v: Real) -> Result<()> {
        sfit_core::ensure!(v >= 0.0 && v.is_finite(), "d2fac must be non-negative, got {v}");
        self.d2fac = v;
        Ok(())
    }

    /// Weight of the squared second-derivative jumps at interior knots.
    pub fn set_d2dfac(&mut self, v: Real) -> Result<()> {
        sfit_core::ensure!(v >= 0.0 && v.is_finite(), "d2dfac must be non-negative, got {v}");
        self.d2dfac = v;
        Ok(())
    }

    /// Weight of the squared-third-derivative integral penalty.
    pub fn set_d3fac(&mut self, v: Real) -> Result<()> {
        sfit_core::ensure!(v >= 0.0 && v.is_finite(), "d3fac must be non-negative, got {v}");
        self.d3fac = v;
        Ok(())
    }

    /// Weight of the squared third-derivative jumps at interior knots.
    pub fn set_d3dfac(&mut self, v: Real) -> Result<()> {
        sfit_core::ensure!(v >= 0.0 && v.is_finite(), "d3dfac must be non-negative, got {v}");
        self.d3dfac = v;
        Ok(())
    }

    /// Cumulative selection probabilities for the first two move kinds
    /// (single-point, hole); the remainder selects the jitter move.
    pub fn set_trial_probabilities(&mut self, p: &[Real]) -> Result<()> {
        self.set_trial_p_checked(p, 3)
    }

    pub(crate) fn set_trial_p_checked(&mut self, p: &[Real], kinds: usize) -> Result<()> {
        sfit_core::ensure!(
            p.len() == kinds - 1,
            "expected {} cumulative probabilities for {kinds} move kinds, got {}",
            kinds - 1,
            p.len()
        );
        let mut prev = 0.0;
        for (i, &v) in p.iter().enumerate() {
            sfit_core::ensure!(
                (0.0..=1.0).contains(&v) && v >= prev,
                "trial probabilities must be non-decreasing within [0, 1]; p[{i}] = {v}"
            );
            prev = v;
        }
        self.trial_p = p.to_vec();
        Ok(())
    }

    /// Number of move proposals executed by each `step()` call.
    pub fn set_proposals_per_epoch(&mut self, n: usize) -> Result<()> {
        sfit_core::ensure!(n > 0, "proposals per epoch must be positive");
        self.proposals = n;
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Knot abscissas.
    pub fn x(&self) -> &[Real] {
        &self.x
    }

    /// Current smoothed estimate.
    pub fn smoothed(&self) -> &[Real] {
        &self.y
    }

    /// Nominal (target) values.
    pub fn targets(&self) -> &[Real] {
        &self.y0
    }

    /// Per-knot uncertainties.
    pub fn sigmas(&self) -> &[Real] {
        &self.ey
    }

    /// The full-series objective breakdown from the last epoch (or data
    /// load), with the weighted total under the current weights.
    pub fn objective(&self) -> ObjectiveBreakdown {
        let mut b = self.parts;
        b.total = b.sum_sq_dy
            + self.d2fac * b.sum_sq_d2
            + self.d2dfac * b.sum_sq_d2d
            + self.d3fac * b.sum_sq_d3
            + self.d3dfac * b.sum_sq_d3d;
        b
    }

    /// Normalized residuals `(value - y0) / sigma` per knot; zero at
    /// unconstrained knots.
    pub fn residuals(&self) -> Vec<Real> {
        let values = match self.mode {
            FitMode::Direct => &self.y,
            FitMode::Integrated => &self.iy,
        };
        values
            .iter()
            .zip(self.y0.iter())
            .zip(self.ey.iter())
            .map(|((&v, &y0), &s)| if constrained(s) { (v - y0) / s } else { 0.0 })
            .collect()
    }

    /// First and second derivative of the smoothed curve on a grid of
    /// `n_sub` points per knot interval (knots included).
    pub fn derivative_curves(&self, n_sub: usize) -> Result<DerivativeCurves> {
        sfit_core::ensure!(n_sub >= 1, "n_sub must be at least 1, got {n_sub}");
        sfit_core::ensure!(self.x.len() >= 2, "no input data loaded");
        let (xs, _, d1, d2) = self.grid_eval(n_sub);
        Ok(DerivativeCurves { xs, dy: d1, d2y: d2 })
    }

    /// Evaluate the state spline's value and first two derivatives on an
    /// `n_sub`-per-interval grid.
    pub(crate) fn grid_eval(&self, n_sub: usize) -> (Vec<Real>, Vec<Real>, Vec<Real>, Vec<Real>) {
        let n = self.x.len();
        let len = (n - 1) * n_sub + 1;
        let mut xs = Vec::with_capacity(len);
        let mut v0 = Vec::with_capacity(len);
        let mut v1 = Vec::with_capacity(len);
        let mut v2 = Vec::with_capacity(len);
        for i in 0..n - 1 {
            let dx = self.x[i + 1] - self.x[i];
            let (p2, p3) = piece_coeffs(dx, self.m[i], self.t[i], self.t[i + 1]);
            for j in 0..n_sub {
                let u = j as Real * dx / n_sub as Real;
                xs.push(self.x[i] + u);
                v0.push(self.y[i] + u * (self.t[i] + u * (p2 + u * p3)));
                v1.push(self.t[i] + u * (2.0 * p2 + 3.0 * p3 * u));
                v2.push(2.0 * p2 + 6.0 * p3 * u);
            }
            if i == n - 2 {
                xs.push(self.x[n - 1]);
                v0.push(self.y[n - 1]);
                v1.push(self.t[n - 1]);
                v2.push(2.0 * p2 + 6.0 * p3 * dx);
            }
        }
        (xs, v0, v1, v2)
    }

    // ── Epoch ────────────────────────────────────────────────────────────────

    /// Run one optimization epoch: a large batch of random move proposals
    /// followed by one full-series objective recomputation.
    ///
    /// Individual proposals are gated on the windowed objective only; the
    /// full recomputation here is for reporting.  Returns the refreshed
    /// breakdown.
    pub fn step(&mut self) -> ObjectiveBreakdown {
        if self.x.len() < 2 {
            return self.objective();
        }
        for _ in 0..self.proposals {
            let r = self.rng.next_real();
            if r < self.trial_p[0] {
                self.try_point_move();
            } else if r < self.trial_p[1] {
                self.try_hole_move();
            } else {
                self.try_jitter_move();
            }
        }
        self.recompute_objective();
        self.objective()
    }

    // ── Windowed objective ───────────────────────────────────────────────────

    /// Recompute secant slopes and tangents around a changed value window.
    pub(crate) fn refresh_window(&mut self, imin: usize, imax: usize) {
        let n = self.x.len();
        let mlo = imin.saturating_sub(1);
        let mhi = imax.min(n - 2);
        for i in mlo..=mhi {
            self.m[i] = (self.y[i + 1] - self.y[i]) / (self.x[i + 1] - self.x[i]);
        }
        let tlo = imin.saturating_sub(3);
        let thi = (imax + 3).min(n - 1);
        for i in tlo..=thi {
            self.t[i] = tangent_at(&self.m, n, i);
        }
    }

    /// Windowed objective around a changed index range: the data-fit term
    /// restricted to the range plus every roughness term the change can
    /// reach.  With the state unchanged outside the range this equals the
    /// same sums recomputed from scratch, so pre/post differences gate
    /// moves exactly.
    pub(crate) fn window_err(&mut self, imin: usize, imax: usize) -> Real {
        self.refresh_window(imin, imax);
        let n = self.x.len();
        let lo = imin.saturating_sub(HALO);
        let hi = (imax + HALO).min(n - 1);
        let fit = match self.mode {
            FitMode::Direct => self.fit_range(imin, imax),
            FitMode::Integrated => {
                // integration reaches every knot downstream of the change
                self.reintegrate(lo);
                self.fit_integrated(lo)
            }
        };
        let (s2, s2d, s3, s3d) = self.roughness(lo, hi);
        fit + self.d2fac * s2 + self.d2dfac * s2d + self.d3fac * s3 + self.d3dfac * s3d
    }

    fn fit_range(&self, imin: usize, imax: usize) -> Real {
        let mut sum = 0.0;
        for i in imin..=imax {
            if constrained(self.ey[i]) {
                let r = (self.y[i] - self.y0[i]) / self.ey[i];
                sum += r * r;
            }
        }
        sum
    }

    fn fit_integrated(&self, lo: usize) -> Real {
        let mut sum = 0.0;
        for i in lo..self.x.len() {
            if constrained(self.ey[i]) {
                let r = (self.iy[i] - self.y0[i]) / self.ey[i];
                sum += r * r;
            }
        }
        sum
    }

    /// Data-fit term of the integrated mode with the whole primitive
    /// shifted by `delta`; used by the integration-constant move.
    pub(crate) fn fit_with_offset(&self, delta: Real) -> Real {
        let mut sum = 0.0;
        for i in 0..self.x.len() {
            if constrained(self.ey[i]) {
                let r = (self.iy[i] + delta - self.y0[i]) / self.ey[i];
                sum += r * r;
            }
        }
        sum
    }

    /// Rebuild the primitive from knot `lo` to the end of the series by
    /// integrating the state spline piece by piece in closed form.
    pub(crate) fn reintegrate(&mut self, lo: usize) {
        let n = self.x.len();
        if lo == 0 {
            self.iy[0] = self.iy0;
        }
        for i in lo..n - 1 {
            let dx = self.x[i + 1] - self.x[i];
            let (p2, p3) = piece_coeffs(dx, self.m[i], self.t[i], self.t[i + 1]);
            let inc = dx * (self.y[i] + dx * (0.5 * self.t[i] + dx * (p2 / 3.0 + dx * p3 / 4.0)));
            self.iy[i + 1] = self.iy[i] + inc;
        }
    }

    /// Roughness sums over the intervals in `[lo, hi)` plus jump terms at
    /// the knots strictly inside the window.
    fn roughness(&self, lo: usize, hi: usize) -> (Real, Real, Real, Real) {
        let mut s2 = 0.0;
        let mut s2d = 0.0;
        let mut s3 = 0.0;
        let mut s3d = 0.0;
        let mut prev: Option<(Real, Real)> = None;
        for i in lo..hi {
            let dx = self.x[i + 1] - self.x[i];
            let (p2, p3) = piece_coeffs(dx, self.m[i], self.t[i], self.t[i + 1]);
            s2 += dx * (4.0 * p2 * p2 + dx * (12.0 * p2 * p3 + dx * 12.0 * p3 * p3));
            s3 += 36.0 * p3 * p3 * dx;
            let d2_left = 2.0 * p2;
            let d3 = 6.0 * p3;
            if let Some((d2_prev_end, d3_prev)) = prev {
                let j2 = d2_left - d2_prev_end;
                let j3 = d3 - d3_prev;
                s2d += j2 * j2;
                s3d += j3 * j3;
            }
            prev = Some((d2_left + d3 * dx, d3));
        }
        (s2, s2d, s3, s3d)
    }

    /// Recompute and store the full-series objective parts.
    pub(crate) fn recompute_objective(&mut self) {
        let n = self.x.len();
        if n < 2 {
            self.parts = ObjectiveBreakdown::default();
            return;
        }
        self.refresh_window(0, n - 1);
        let fit = match self.mode {
            FitMode::Direct => self.fit_range(0, n - 1),
            FitMode::Integrated => {
                self.reintegrate(0);
                self.fit_integrated(0)
            }
        };
        let (s2, s2d, s3, s3d) = self.roughness(0, n - 1);
        self.parts = ObjectiveBreakdown {
            sum_sq_dy: fit,
            sum_sq_d2: s2,
            sum_sq_d2d: s2d,
            sum_sq_d3: s3,
            sum_sq_d3d: s3d,
            total: 0.0,
        };
    }

    // ── Move proposals ───────────────────────────────────────────────────────

    /// Single-point move: try a small grid of offsets of one knot value and
    /// commit the best (keeping the current value is a valid outcome).
    pub(crate) fn try_point_move(&mut self) {
        let n = self.x.len();
        let i = self.rng.next_index(n);
        let step = self.point_stats.step_size(i);
        let y_old = self.y[i];
        let mut best_k = 0i64;
        let mut best_err = self.window_err(i, i);
        for k in -POINT_GRID_HALF..=POINT_GRID_HALF {
            if k == 0 {
                continue;
            }
            self.y[i] = y_old + k as Real * step;
            let e = self.window_err(i, i);
            if e < best_err {
                best_err = e;
                best_k = k;
            }
        }
        self.y[i] = y_old + best_k as Real * step;
        self.window_err(i, i);
        self.point_stats.record(i, best_k != 0);
    }

    /// Hole move: cut a random window of knots out of the series,
    /// re-interpolate across the gap from the surviving neighbors, and keep
    /// the refill only if the windowed objective does not increase.
    pub(crate) fn try_hole_move(&mut self) {
        let n = self.x.len();
        // smallest hole is 3 knots; the 2 boundary knots never join a hole
        if n < MIN_SURVIVORS + 4 {
            return;
        }
        let i = 2 + self.rng.next_index(n - 4);
        let mut nmov = 1usize;
        loop {
            let next = nmov + 1;
            let fits = i > next && i + next <= n - 2 && n - (2 * next + 1) > MIN_SURVIVORS;
            if !fits || self.rng.next_real() >= 0.5 {
                break;
            }
            nmov = next;
        }
        let lo = i - nmov;
        let hi = i + nmov;
        let e_old = self.window_err(lo, hi);
        self.saved.clear();
        self.saved.extend_from_slice(&self.y[lo..=hi]);
        self.fill_hole(lo, hi);
        let e_new = self.window_err(lo, hi);
        if e_new > e_old {
            for (k, j) in (lo..=hi).enumerate() {
                self.y[j] = self.saved[k];
            }
            self.window_err(lo, hi);
        }
    }

    /// Jitter move: perturb one interior knot, then re-interpolate the
    /// knots flanking it inside a small window from the reduced series.
    /// Tracks its own acceptance/step state, separate from the point move.
    pub(crate) fn try_jitter_move(&mut self) {
        let n = self.x.len();
        if n < MIN_SURVIVORS + 4 {
            return;
        }
        let mut nmov = 1usize;
        if self.rng.next_real() < 0.3 && n > 2 * 2 + 1 + MIN_SURVIVORS {
            nmov = 2;
        }
        let span = n - 2 * nmov - 2;
        let i = nmov + 1 + self.rng.next_index(span);
        let lo = i - nmov;
        let hi = i + nmov;
        let e_old = self.window_err(lo, hi);
        self.saved.clear();
        self.saved.extend_from_slice(&self.y[lo..=hi]);
        let jstep = self.jitter_stats.step_size(i);
        self.y[i] += (2.0 * self.rng.next_real() - 1.0) * jstep;
        self.fill_flanks(lo, i, hi);
        let e_new = self.window_err(lo, hi);
        let accepted = e_new <= e_old;
        if !accepted {
            for (k, j) in (lo..=hi).enumerate() {
                self.y[j] = self.saved[k];
            }
            self.window_err(lo, hi);
        }
        self.jitter_stats.record(i, accepted);
    }

    /// Re-interpolate `y[lo..=hi]` from the reduced series with those knots
    /// removed, evaluating the cubic piece that spans the gap from the knot
    /// immediately before it.
    fn fill_hole(&mut self, lo: usize, hi: usize) {
        let n = self.x.len();
        self.hole_x.clear();
        self.hole_y.clear();
        let a = lo.saturating_sub(HOLE_NEIGHBORS);
        for j in a..lo {
            self.hole_x.push(self.x[j]);
            self.hole_y.push(self.y[j]);
        }
        let before = self.hole_x.len();
        let b = (hi + HOLE_NEIGHBORS).min(n - 1);
        for j in hi + 1..=b {
            self.hole_x.push(self.x[j]);
            self.hole_y.push(self.y[j]);
        }
        let rn = self.hole_x.len();
        fill_slopes(&self.hole_x, &self.hole_y, &mut self.hole_m);
        fill_tangents(&self.hole_m, rn, &mut self.hole_t);
        let k = before - 1;
        let dxr = self.hole_x[k + 1] - self.hole_x[k];
        let (p2, p3) = piece_coeffs(dxr, self.hole_m[k], self.hole_t[k], self.hole_t[k + 1]);
        for j in lo..=hi {
            let u = self.x[j] - self.hole_x[k];
            self.y[j] = self.hole_y[k] + u * (self.hole_t[k] + u * (p2 + u * p3));
        }
    }

    /// Rebuild the reduced series keeping the (jittered) centre knot and
    /// re-interpolate both flanks of the window from it.
    fn fill_flanks(&mut self, lo: usize, centre: usize, hi: usize) {
        let n = self.x.len();
        self.hole_x.clear();
        self.hole_y.clear();
        let a = lo.saturating_sub(HOLE_NEIGHBORS);
        for j in a..lo {
            self.hole_x.push(self.x[j]);
            self.hole_y.push(self.y[j]);
        }
        let kc = self.hole_x.len();
        self.hole_x.push(self.x[centre]);
        self.hole_y.push(self.y[centre]);
        let b = (hi + HOLE_NEIGHBORS).min(n - 1);
        for j in hi + 1..=b {
            self.hole_x.push(self.x[j]);
            self.hole_y.push(self.y[j]);
        }
        let rn = self.hole_x.len();
        fill_slopes(&self.hole_x, &self.hole_y, &mut self.hole_m);
        fill_tangents(&self.hole_m, rn, &mut self.hole_t);
        // left flank from the piece ending at the centre
        let k = kc - 1;
        let dxl = self.hole_x[k + 1] - self.hole_x[k];
        let (p2, p3) = piece_coeffs(dxl, self.hole_m[k], self.hole_t[k], self.hole_t[k + 1]);
        for j in lo..centre {
            let u = self.x[j] - self.hole_x[k];
            self.y[j] = self.hole_y[k] + u * (self.hole_t[k] + u * (p2 + u * p3));
        }
        // right flank from the piece starting at the centre
        let dxr = self.hole_x[kc + 1] - self.hole_x[kc];
        let (p2, p3) = piece_coeffs(dxr, self.hole_m[kc], self.hole_t[kc], self.hole_t[kc + 1]);
        for j in centre + 1..=hi {
            let u = self.x[j] - self.hole_x[kc];
            self.y[j] = self.hole_y[kc] + u * (self.hole_t[kc] + u * (p2 + u * p3));
        }
    }
}
