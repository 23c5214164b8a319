//! Thin-plate-spline interpolation from 2D point correspondences.
//!
//! Provides:
//! - An exact interpolating fit from ≥3 non-collinear control points.
//! - Batch point transform through the fitted spline.
//!
//! The linear system is assembled on similarity-normalized coordinates
//! (centroid at the origin, mean radius √2). A thin-plate spline commutes with
//! similarity transforms, so normalization only improves conditioning.

use nalgebra::{DMatrix, Matrix3, Vector3};

/// Smallest number of control points that determines the affine part.
pub const MIN_CONTROL_POINTS: usize = 3;

/// Relative singular-value floor below which the system counts as singular.
const SINGULAR_REL_TOL: f64 = 1e-10;

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    LengthMismatch { src: usize, dst: usize },
    TooFewPoints { needed: usize, got: usize },
    NonFinite { index: usize },
    Degenerate(String),
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LengthMismatch { src, dst } => {
                write!(f, "source/destination length mismatch: {} vs {}", src, dst)
            }
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few control points: need {}, got {}", needed, got)
            }
            Self::NonFinite { index } => {
                write!(f, "control point {} has a non-finite coordinate", index)
            }
            Self::Degenerate(msg) => write!(f, "degenerate control points: {}", msg),
        }
    }
}

impl std::error::Error for FitError {}

// ── Kernel and normalization ─────────────────────────────────────────────

/// Radial basis U(r) = r² ln r, evaluated from the squared radius.
#[inline]
fn tps_kernel(r2: f64) -> f64 {
    if r2 < 1e-20 {
        0.0
    } else {
        0.5 * r2 * r2.ln()
    }
}

/// Translate the centroid to the origin and scale the mean distance to √2.
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy: f64 = pts.iter().map(|p| p[1]).sum::<f64>() / n;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts
        .iter()
        .map(|p| [s * (p[0] - cx), s * (p[1] - cy)])
        .collect();

    (t, normalized)
}

#[inline]
fn apply_similarity(t: &Matrix3<f64>, p: [f64; 2]) -> [f64; 2] {
    let v = t * Vector3::new(p[0], p[1], 1.0);
    [v[0], v[1]]
}

// ── Spline ───────────────────────────────────────────────────────────────

/// Fitted thin-plate spline mapping source points onto destination points.
#[derive(Debug, Clone)]
pub struct ThinPlateSpline {
    /// Source normalization.
    t_src: Matrix3<f64>,
    /// Inverse of the destination normalization.
    t_dst_inv: Matrix3<f64>,
    /// Control points in the normalized source frame.
    controls: Vec<[f64; 2]>,
    /// Kernel weights, one row per control point, one column per axis.
    weights: DMatrix<f64>,
    /// Affine coefficients: rows (1, x, y), one column per axis.
    affine: DMatrix<f64>,
}

impl ThinPlateSpline {
    /// Fit the interpolating spline with `dst[i] == f(src[i])`.
    pub fn fit(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Self, FitError> {
        if src.len() != dst.len() {
            return Err(FitError::LengthMismatch {
                src: src.len(),
                dst: dst.len(),
            });
        }
        let n = src.len();
        if n < MIN_CONTROL_POINTS {
            return Err(FitError::TooFewPoints {
                needed: MIN_CONTROL_POINTS,
                got: n,
            });
        }
        let finite = |p: &[f64; 2]| p[0].is_finite() && p[1].is_finite();
        if let Some(index) = src
            .iter()
            .zip(dst)
            .position(|(s, d)| !(finite(s) && finite(d)))
        {
            return Err(FitError::NonFinite { index });
        }

        let (t_src, src_n) = normalize_points(src);
        let (t_dst, dst_n) = normalize_points(dst);

        // [ K  P ] [ w ]   [ dst ]
        // [ Pᵀ 0 ] [ a ] = [  0  ]
        let m = n + 3;
        let mut l = DMatrix::<f64>::zeros(m, m);
        let mut rhs = DMatrix::<f64>::zeros(m, 2);
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = src_n[i][0] - src_n[j][0];
                let dy = src_n[i][1] - src_n[j][1];
                let u = tps_kernel(dx * dx + dy * dy);
                l[(i, j)] = u;
                l[(j, i)] = u;
            }
            let row = [1.0, src_n[i][0], src_n[i][1]];
            for (k, &v) in row.iter().enumerate() {
                l[(i, n + k)] = v;
                l[(n + k, i)] = v;
            }
            rhs[(i, 0)] = dst_n[i][0];
            rhs[(i, 1)] = dst_n[i][1];
        }

        let svd = l.svd(true, true);
        let sv_max = svd.singular_values.max();
        let sv_min = svd.singular_values.min();
        let eps = sv_max * SINGULAR_REL_TOL;
        if sv_min.is_nan() || sv_min <= eps {
            return Err(FitError::Degenerate(format!(
                "singular system (σ_min={:.3e}, σ_max={:.3e}); points are collinear or duplicated",
                sv_min, sv_max
            )));
        }
        let solution = svd
            .solve(&rhs, eps)
            .map_err(|e| FitError::Degenerate(e.to_string()))?;
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(FitError::Degenerate("non-finite spline coefficients".into()));
        }

        let t_dst_inv = t_dst
            .try_inverse()
            .ok_or_else(|| FitError::Degenerate("T_dst not invertible".into()))?;

        Ok(Self {
            t_src,
            t_dst_inv,
            controls: src_n,
            weights: solution.rows(0, n).into_owned(),
            affine: solution.rows(n, 3).into_owned(),
        })
    }

    /// Number of control points the spline was fitted on.
    pub fn n_controls(&self) -> usize {
        self.controls.len()
    }

    /// Map one point. NaN coordinates propagate to the output.
    pub fn transform_point(&self, p: [f64; 2]) -> [f64; 2] {
        let [x, y] = apply_similarity(&self.t_src, p);
        let mut out = [0.0f64; 2];
        for (axis, v) in out.iter_mut().enumerate() {
            *v = self.affine[(0, axis)] + self.affine[(1, axis)] * x + self.affine[(2, axis)] * y;
        }
        for (i, c) in self.controls.iter().enumerate() {
            let dx = x - c[0];
            let dy = y - c[1];
            let u = tps_kernel(dx * dx + dy * dy);
            out[0] += self.weights[(i, 0)] * u;
            out[1] += self.weights[(i, 1)] * u;
        }
        apply_similarity(&self.t_dst_inv, out)
    }

    /// Map a batch of points.
    pub fn transform(&self, points: &[[f64; 2]]) -> Vec<[f64; 2]> {
        points.iter().map(|&p| self.transform_point(p)).collect()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
