//! Support points: the abscissae at which the log density has been evaluated.

use crate::error::{ArsError, Result};

/// An abscissa with its cached log density `h` and derivative `dh`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportPoint {
    pub x: f64,
    pub h: f64,
    pub dh: f64,
}

/**
The ascending sequence of support points.

After every successful [`SupportStore::merge_and_validate`] the abscissae are
strictly increasing (spaced by more than `δ`) and the derivatives strictly
decreasing (by more than `eps`).
*/
#[derive(Debug, Clone, PartialEq)]
pub struct SupportStore {
    points: Vec<SupportPoint>,
    min_spacing: f64,
    min_slope_gap: f64,
}

impl SupportStore {
    /// Creates an empty store. `min_spacing` is the finite-difference step `δ`,
    /// `min_slope_gap` the derivative tolerance `eps`.
    pub fn new(min_spacing: f64, min_slope_gap: f64) -> Self {
        Self {
            points: Vec::new(),
            min_spacing,
            min_slope_gap,
        }
    }

    pub fn points(&self) -> &[SupportPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&SupportPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&SupportPoint> {
        self.points.last()
    }

    /**
    Adds `new_points`, restores the ordering, removes near-duplicates and checks
    log-concavity.

    Near-duplicates are consecutive points whose abscissae differ by at most
    `δ` or whose derivatives differ by at most `eps`. Of such a pair the left
    point is kept. Removal is repeated until no such pair is left.

    # Errors

    [`ArsError::NotLogConcave`] if the surviving derivatives are not strictly
    decreasing. The store is left in its merged state in that case, but the
    run is expected to be abandoned.
    */
    pub fn merge_and_validate<I>(&mut self, new_points: I) -> Result<()>
    where
        I: IntoIterator<Item = SupportPoint>,
    {
        self.points.extend(new_points);
        self.points.sort_by(|a, b| a.x.total_cmp(&b.x));
        self.remove_near_duplicates();
        self.check_log_concave()
    }

    fn is_near_duplicate(&self, left: &SupportPoint, right: &SupportPoint) -> bool {
        (right.dh - left.dh).abs() <= self.min_slope_gap
            || (right.x - left.x).abs() <= self.min_spacing
    }

    fn remove_near_duplicates(&mut self) {
        while self.points.len() > 1 {
            // Flags are computed on the current sequence, then all flagged points
            // are dropped at once. The first point is never flagged.
            let keep: Vec<bool> = std::iter::once(true)
                .chain(
                    self.points
                        .windows(2)
                        .map(|pair| !self.is_near_duplicate(&pair[0], &pair[1])),
                )
                .collect();
            if keep.iter().all(|&k| k) {
                break;
            }
            let mut flags = keep.into_iter();
            self.points.retain(|_| flags.next().unwrap_or(true));
        }
    }

    fn check_log_concave(&self) -> Result<()> {
        for pair in self.points.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            if left.dh - right.dh < self.min_slope_gap {
                return Err(ArsError::NotLogConcave {
                    left: left.x,
                    left_slope: left.dh,
                    right: right.x,
                    right_slope: right.dh,
                });
            }
        }
        Ok(())
    }
}
