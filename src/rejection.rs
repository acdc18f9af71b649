/*!
Drawing candidates from the hull and deciding which of them to keep.

[`SegmentSampler`] draws from the normalized `exp(u(x))`: a segment is picked
with probability equal to its weight, then the segment's truncated exponential
is inverted. [`RejectionTester`] accepts a candidate `x*` with uniform `w` if

1. `w <= exp(l(x*) - u(x*))` (squeeze test, no density call), or else
2. `w <= exp(h(x*) - u(x*))` (full test, one oracle evaluation).

Every candidate sent to the full test comes back as an [`Evaluation`] that the
caller can turn into a new support point, whatever the verdict.
*/

use rand::distributions::{Open01, WeightedIndex};
use rand::prelude::*;

use crate::config::Bounds;
use crate::density::{DensityOracle, Evaluation, LogDensity};
use crate::envelope::Envelope;
use crate::error::{ArsError, Result};

/// A proposal together with the index of the hull segment it was drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x: f64,
    pub segment: usize,
}

/// Draws from the piecewise-exponential proposal defined by an [`Envelope`].
pub struct SegmentSampler<'a> {
    envelope: &'a Envelope,
    segment_dist: WeightedIndex<f64>,
}

impl<'a> SegmentSampler<'a> {
    /// # Errors
    ///
    /// [`ArsError::ZeroMassEnvelope`] if the segment weights cannot form a
    /// categorical distribution.
    pub fn new(envelope: &'a Envelope) -> Result<Self> {
        let weights = envelope.segments().iter().map(|s| s.weight);
        let segment_dist =
            WeightedIndex::new(weights).map_err(|_| ArsError::ZeroMassEnvelope(0.0))?;
        Ok(Self {
            envelope,
            segment_dist,
        })
    }

    /// Draws `count` independent candidates.
    pub fn draw<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Candidate> {
        (0..count)
            .map(|_| {
                let segment = self.segment_dist.sample(rng);
                let u: f64 = rng.sample(Open01);
                Candidate {
                    x: self.envelope.segments()[segment].invert_cdf(u),
                    segment,
                }
            })
            .collect()
    }
}

/// What happened to one chunk of candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Accepted values, in the order the candidates were drawn.
    pub accepted: Vec<f64>,
    /// Oracle results for every candidate that went through the full test.
    pub evaluated: Vec<Evaluation>,
    /// Candidates accepted by the squeeze test alone.
    pub squeeze_accepted: usize,
    /// Candidates dropped for falling outside the bounds.
    pub out_of_bounds: usize,
}

/// Applies the squeeze and full tests against one snapshot of the hull.
pub struct RejectionTester<'a, 'd, D: ?Sized> {
    envelope: &'a Envelope,
    oracle: &'a DensityOracle<'d, D>,
    bounds: Bounds,
}

impl<'a, 'd, D> RejectionTester<'a, 'd, D>
where
    D: LogDensity + ?Sized,
{
    pub fn new(
        envelope: &'a Envelope,
        oracle: &'a DensityOracle<'d, D>,
        bounds: Bounds,
    ) -> Self {
        Self {
            envelope,
            oracle,
            bounds,
        }
    }

    /// Log of `exp(u(x))` on the candidate's own segment.
    fn upper(&self, c: &Candidate) -> f64 {
        self.envelope.segments()[c.segment].upper.at(c.x)
    }

    /**
    Classifies a chunk of candidates.

    One uniform is drawn per candidate, in order, before any density call so
    that the outcome depends only on the RNG stream. All candidates that fail
    the squeeze are then evaluated in one parallel batch.
    */
    pub fn test_batch<R: Rng + ?Sized>(
        &self,
        candidates: &[Candidate],
        rng: &mut R,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut accepted = vec![false; candidates.len()];
        let mut full_test: Vec<(usize, f64)> = Vec::new();

        for (i, c) in candidates.iter().enumerate() {
            let w: f64 = rng.sample(Open01);
            if !self.bounds.admits(c.x) {
                outcome.out_of_bounds += 1;
                continue;
            }
            let squeeze = self.envelope.lower(c.x);
            if squeeze.is_finite() && w <= (squeeze - self.upper(c)).exp() {
                accepted[i] = true;
                outcome.squeeze_accepted += 1;
            } else {
                full_test.push((i, w));
            }
        }

        let xs: Vec<f64> = full_test.iter().map(|&(i, _)| candidates[i].x).collect();
        let evaluations = self.oracle.evaluate_batch(&xs);
        for (&(i, w), eval) in full_test.iter().zip(&evaluations) {
            // NaN compares false: an undefined density never accepts.
            if w <= (eval.h - self.upper(&candidates[i])).exp() {
                accepted[i] = true;
            }
        }
        outcome.evaluated = evaluations;

        // Keeping draw order matters: the final chunk is truncated from the end,
        // and squeeze accepts concentrate near the mode.
        outcome.accepted = candidates
            .iter()
            .zip(&accepted)
            .filter(|&(_, &a)| a)
            .map(|(c, _)| c.x)
            .collect();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::SupportPoint;
    use rand::rngs::SmallRng;

    fn normal_envelope(xs: &[f64]) -> Envelope {
        let points: Vec<SupportPoint> = xs
            .iter()
            .map(|&x| SupportPoint {
                x,
                h: -0.5 * x * x,
                dh: -x,
            })
            .collect();
        Envelope::build(&points, Bounds::default()).unwrap()
    }

    #[test]
    fn test_draws_land_in_their_segment() {
        let env = normal_envelope(&[-2.0, -0.5, 1.0, 2.5]);
        let sampler = SegmentSampler::new(&env).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        for c in sampler.draw(2_000, &mut rng) {
            let seg = env.segments()[c.segment];
            assert!(
                seg.lo <= c.x && c.x <= seg.hi,
                "Candidate {} outside segment [{}, {}].",
                c.x,
                seg.lo,
                seg.hi
            );
        }
    }

    #[test]
    fn test_segment_frequencies_follow_weights() {
        let env = normal_envelope(&[-1.0, 1.0]);
        let sampler = SegmentSampler::new(&env).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        let draws = sampler.draw(20_000, &mut rng);
        let left = draws.iter().filter(|c| c.segment == 0).count() as f64 / 20_000.0;
        // Symmetric hull: both segments weigh 1/2.
        assert!((left - 0.5).abs() < 0.02, "Left frequency {left}.");
    }

    #[test]
    fn test_exact_hull_accepts_everything() {
        // For an exponential log density the tangent is the density itself, so
        // every candidate passes the full test.
        let target = |x: f64| -x;
        let bounds = Bounds::new(0.0, f64::INFINITY).unwrap();
        let point = SupportPoint {
            x: 1.0,
            h: -1.0,
            dh: -1.0,
        };
        let env = Envelope::build(&[point], bounds).unwrap();
        let oracle = DensityOracle::new(&target, 1e-8);
        let tester = RejectionTester::new(&env, &oracle, bounds);
        let mut rng = SmallRng::seed_from_u64(3);
        let candidates = SegmentSampler::new(&env).unwrap().draw(500, &mut rng);
        let outcome = tester.test_batch(&candidates, &mut rng);
        assert_eq!(outcome.accepted.len(), 500);
        assert_eq!(outcome.squeeze_accepted, 0);
        assert_eq!(outcome.evaluated.len(), 500);
    }

    #[test]
    fn test_out_of_bounds_candidates_dropped() {
        let target = |x: f64| -0.5 * x * x;
        let env = normal_envelope(&[-1.0, 1.0]);
        let oracle = DensityOracle::new(&target, 1e-8);
        // Bounds narrower than the support used to build the hull.
        let tester = RejectionTester::new(&env, &oracle, Bounds::new(-0.5, 0.5).unwrap());
        let candidates = [
            Candidate { x: -3.0, segment: 0 },
            Candidate { x: 0.1, segment: 0 },
            Candidate { x: 3.0, segment: 1 },
        ];
        let mut rng = SmallRng::seed_from_u64(11);
        let outcome = tester.test_batch(&candidates, &mut rng);
        assert_eq!(outcome.out_of_bounds, 2);
        assert!(outcome.accepted.iter().all(|x| (-0.5..=0.5).contains(x)));
    }

    #[test]
    fn test_squeeze_skips_oracle_near_support() {
        let target = |_: f64| -> f64 { panic!("oracle must not be called") };
        let env = normal_envelope(&[-1.0, -1e-3, 1e-3, 1.0]);
        let oracle = DensityOracle::new(&target, 1e-8);
        let tester = RejectionTester::new(&env, &oracle, Bounds::default());
        // Right at a support point squeeze and hull coincide: w <= exp(0).
        let candidates = [Candidate {
            x: 1e-3,
            segment: 2,
        }];
        let mut rng = SmallRng::seed_from_u64(5);
        let outcome = tester.test_batch(&candidates, &mut rng);
        assert_eq!(outcome.squeeze_accepted, 1);
        assert!(outcome.evaluated.is_empty());
    }
}
