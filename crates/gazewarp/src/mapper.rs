//! Coordinate mapping through a fitted correction, with missing-value handling.

use crate::correspondence::Correspondences;
use crate::store::StoredPairs;
use crate::tps::{FitError, ThinPlateSpline};

/// Placeholder fed to the spline for absent samples.
const MISSING_SENTINEL: [f64; 2] = [f64::NAN, f64::NAN];

/// Maps gaze coordinates through a stimulus correction.
///
/// The identity variant is used when no correction is configured. The spline
/// is not trusted with missing values: every [`apply`](Self::apply) copies
/// missing-ness from the input onto the output row for row.
#[derive(Debug, Clone)]
pub enum CoordinateMapper {
    Identity,
    Spline(ThinPlateSpline),
}

impl CoordinateMapper {
    pub fn identity() -> Self {
        Self::Identity
    }

    /// Fit a spline from index-aligned source/destination lists.
    pub fn fit(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Self, FitError> {
        ThinPlateSpline::fit(src, dst).map(Self::Spline)
    }

    pub fn from_correspondences(pairs: &Correspondences) -> Result<Self, FitError> {
        Self::fit(&pairs.sources(), &pairs.destinations())
    }

    /// Identity for uncorrected stimuli, a fitted spline otherwise.
    pub fn from_stored(stored: &StoredPairs) -> Result<Self, FitError> {
        match stored {
            StoredPairs::Uncorrected => Ok(Self::Identity),
            StoredPairs::Defined(pairs) => Self::from_correspondences(pairs),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Map a column of optional points; absent inputs stay absent.
    pub fn apply(&self, points: &[Option<[f64; 2]>]) -> Vec<Option<[f64; 2]>> {
        let raw: Vec<[f64; 2]> = points
            .iter()
            .map(|p| p.unwrap_or(MISSING_SENTINEL))
            .collect();
        let mapped = match self {
            Self::Identity => raw,
            Self::Spline(tps) => tps.transform(&raw),
        };
        restore_missing(points, &mapped)
    }
}

/// Re-impose input missing-ness on raw mapper output.
///
/// A located input whose mapped value is non-finite is reported missing too.
fn restore_missing(input: &[Option<[f64; 2]>], mapped: &[[f64; 2]]) -> Vec<Option<[f64; 2]>> {
    debug_assert_eq!(input.len(), mapped.len());
    input
        .iter()
        .zip(mapped)
        .map(|(src, out)| {
            src.and_then(|_| (out[0].is_finite() && out[1].is_finite()).then_some(*out))
        })
        .collect()
}
