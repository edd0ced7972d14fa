//! Weighted point candidates produced upstream for every frame

use crate::error::{Result, TrackerError};
use crate::timeline::FrameIndex;
use nalgebra::Point2;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A possible ball location in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub position: Point2<f64>,
    /// Confidence as a log-likelihood; higher lowers the path cost
    pub weight: f64,
}

impl Candidate {
    pub fn new(x: f64, y: f64, weight: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            weight,
        }
    }

    pub fn distance(&self, other: &Candidate) -> f64 {
        nalgebra::distance(&self.position, &other.position)
    }

    fn is_finite(&self) -> bool {
        self.position.x.is_finite() && self.position.y.is_finite() && self.weight.is_finite()
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Candidate(({:.3}, {:.3}), w={:.3})",
            self.position.x, self.position.y, self.weight
        )
    }
}

/// Convert an Nx3 array of `[x, y, weight]` rows into candidates
pub fn candidates_from_rows(rows: ArrayView2<f64>) -> Result<Vec<Candidate>> {
    if rows.nrows() > 0 && rows.ncols() != 3 {
        return Err(TrackerError::CandidateShape(rows.ncols()));
    }
    Ok(rows
        .outer_iter()
        .map(|row| Candidate::new(row[0], row[1], row[2]))
        .collect())
}

/// Reject non-finite candidates and keep at most `limit` of the heaviest
///
/// Truncation uses a stable sort so equally weighted candidates keep their
/// upstream order.
pub(crate) fn prepare(
    frame: FrameIndex,
    mut candidates: Vec<Candidate>,
    limit: Option<usize>,
) -> Result<Vec<Candidate>> {
    if let Some(index) = candidates.iter().position(|c| !c.is_finite()) {
        return Err(TrackerError::invalid_candidate(
            frame,
            index,
            "non-finite position or weight",
        ));
    }

    if let Some(limit) = limit {
        if candidates.len() > limit {
            candidates.sort_by(|a, b| b.weight.total_cmp(&a.weight));
            candidates.truncate(limit);
        }
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_candidate_distance() {
        let a = Candidate::new(1.0, 0.7, 0.2);
        let b = Candidate::new(0.2, -0.5, 0.2);
        assert_abs_diff_eq!(a.distance(&b), 1.4422205101855958, epsilon = 1e-12);
    }

    #[test]
    fn test_from_rows() {
        let rows = array![[0.1, 0.2, 3.0], [0.5, 0.6, -1.0]];
        let candidates = candidates_from_rows(rows.view()).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1], Candidate::new(0.5, 0.6, -1.0));
    }

    #[test]
    fn test_from_rows_bad_shape() {
        let rows = array![[0.1, 0.2], [0.5, 0.6]];
        assert_eq!(
            candidates_from_rows(rows.view()),
            Err(TrackerError::CandidateShape(2))
        );
    }

    #[test]
    fn test_prepare_rejects_nan() {
        let candidates = vec![Candidate::new(0.0, 0.0, 1.0), Candidate::new(f64::NAN, 0.0, 1.0)];
        let err = prepare(4, candidates, None).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::InvalidCandidate {
                frame: 4,
                index: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_prepare_keeps_heaviest() {
        let candidates = vec![
            Candidate::new(0.0, 0.0, 1.0),
            Candidate::new(1.0, 0.0, 5.0),
            Candidate::new(2.0, 0.0, 3.0),
            Candidate::new(3.0, 0.0, 5.0),
        ];
        let kept = prepare(0, candidates, Some(2)).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].position.x, 1.0);
        assert_eq!(kept[1].position.x, 3.0);
    }
}
