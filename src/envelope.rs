/*!
# Upper hull, squeeze and the piecewise-exponential proposal

Given support points `(x_i, h_i, h'_i)` of a concave log density `h`, this
module builds

- the **upper hull** `u(x)`: the tangent at `x_k` on `[z_{k-1}, z_k]`, where
  `z_k` is the abscissa at which the tangents at `x_k` and `x_{k+1}` meet and
  `z_0`, `z_n` are the bounds;
- the **squeeze** `l(x)`: the secant between `x_j` and `x_{j+1}` on
  `[x_j, x_{j+1}]`, and `-∞` outside `[x_1, x_n]`;
- the **proposal**: `exp(u(x))` normalized over the domain, a mixture of
  truncated exponentials with one component per hull segment.

Lines are stored in point-slope form around a support point so that neither
the tangents nor the segment masses ever pass through `exp(b)` of a possibly
huge intercept `b`. Segment masses are kept in log space and normalized with
a log-sum-exp.

The envelope is rebuilt from scratch every time the support changes.

```rust
use ars_sampler::config::Bounds;
use ars_sampler::envelope::Envelope;
use ars_sampler::support::SupportPoint;

// Standard normal: h(x) = -x²/2, h'(x) = -x.
let points = [
    SupportPoint { x: -1.0, h: -0.5, dh: 1.0 },
    SupportPoint { x: 1.0, h: -0.5, dh: -1.0 },
];
let env = Envelope::build(&points, Bounds::default()).unwrap();
assert_eq!(env.intercepts(), &[f64::NEG_INFINITY, 0.0, f64::INFINITY]);
assert!(env.upper(0.0) >= 0.0);
assert_eq!(env.lower(-1.0), -0.5);
let total: f64 = env.segments().iter().map(|s| s.weight).sum();
assert!((total - 1.0).abs() < 1e-12);
```
*/

use tracing::trace;

use crate::config::Bounds;
use crate::error::{ArsError, Result};
use crate::support::SupportPoint;

/// A straight line through `(x0, y0)` with the given slope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub x0: f64,
    pub y0: f64,
    pub slope: f64,
}

impl Line {
    pub fn tangent(p: &SupportPoint) -> Self {
        Self {
            x0: p.x,
            y0: p.h,
            slope: p.dh,
        }
    }

    pub fn secant(p: &SupportPoint, q: &SupportPoint) -> Self {
        Self {
            x0: p.x,
            y0: p.h,
            slope: (q.h - p.h) / (q.x - p.x),
        }
    }

    pub fn at(&self, x: f64) -> f64 {
        self.y0 + self.slope * (x - self.x0)
    }

    /// Value of the line at `x = 0`.
    pub fn intercept(&self) -> f64 {
        self.y0 - self.slope * self.x0
    }
}

/// One piece `[lo, hi]` of the upper hull.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub lo: f64,
    pub hi: f64,
    /// Tangent forming the hull on this segment.
    pub upper: Line,
    /// `ln ∫_lo^hi exp(upper(x)) dx`, `-∞` for an empty segment.
    pub log_mass: f64,
    /// Probability of the segment under the normalized proposal.
    pub weight: f64,
}

impl Segment {
    fn new(lo: f64, hi: f64, upper: Line) -> Self {
        Self {
            lo,
            hi,
            upper,
            log_mass: segment_log_mass(&upper, lo, hi),
            weight: 0.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    /**
    Inverse CDF of the proposal restricted to this segment.

    For slope `m ≠ 0` the segment density is proportional to `exp(m x)` and
    `x = ln(u e^{m hi} + (1 - u) e^{m lo}) / m`, rewritten around the finite
    end of the segment to stay representable when the other end is infinite.
    For `m = 0` the segment is uniform. `u` must lie in `(0, 1)`.
    */
    pub fn invert_cdf(&self, u: f64) -> f64 {
        let m = self.upper.slope;
        let width = self.width();
        if m > 0.0 {
            self.hi + ((1.0 - u) * (-m * width).exp_m1()).ln_1p() / m
        } else if m < 0.0 {
            self.lo + (u * (m * width).exp_m1()).ln_1p() / m
        } else {
            self.lo + u * width
        }
    }
}

/// `ln ∫_lo^hi exp(line(x)) dx`, evaluated from the finite end the line decays
/// towards. `+∞` signals a non-integrable segment, `-∞`/NaN an empty one.
fn segment_log_mass(line: &Line, lo: f64, hi: f64) -> f64 {
    let width = hi - lo;
    if width.is_nan() || width <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let m = line.slope;
    if m > 0.0 {
        line.at(hi) + (-(-m * width).exp_m1()).ln() - m.ln()
    } else if m < 0.0 {
        line.at(lo) + (-(m * width).exp_m1()).ln() - (-m).ln()
    } else {
        line.y0 + width.ln()
    }
}

/// Abscissa where the tangents at `p` and `q` meet. Requires `p.dh != q.dh`.
pub fn tangent_intersection(p: &SupportPoint, q: &SupportPoint) -> f64 {
    p.x + (q.h - p.h - q.dh * (q.x - p.x)) / (p.dh - q.dh)
}

/**
Checks that `exp(u(x))` can be integrated over the bounds: on each side the
domain is either finite or the outermost tangent decays towards it.

# Errors

[`ArsError::UnboundedEnvelope`] otherwise, or if `points` is empty.
*/
pub fn check_integrable(points: &[SupportPoint], bounds: Bounds) -> Result<()> {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(ArsError::UnboundedEnvelope(
                "no support points to build the hull from".into(),
            ))
        }
    };
    if !bounds.lower.is_finite() && first.dh <= 0.0 {
        return Err(ArsError::UnboundedEnvelope(format!(
            "lower bound is infinite but the derivative at the leftmost point x = {} is {} \
             (needs an initial point left of the mode)",
            first.x, first.dh
        )));
    }
    if !bounds.upper.is_finite() && last.dh >= 0.0 {
        return Err(ArsError::UnboundedEnvelope(format!(
            "upper bound is infinite but the derivative at the rightmost point x = {} is {} \
             (needs an initial point right of the mode)",
            last.x, last.dh
        )));
    }
    Ok(())
}

/// Upper hull, squeeze and segment weights for one snapshot of the support.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    abscissae: Vec<f64>,
    intercepts: Vec<f64>,
    segments: Vec<Segment>,
    secants: Vec<Line>,
    log_normalizer: f64,
}

impl Envelope {
    /**
    Builds the hull from support points sorted by `x` with strictly
    decreasing derivatives.

    # Errors

    - [`ArsError::UnboundedEnvelope`] if a segment has infinite mass or
      `points` is empty.
    - [`ArsError::ZeroMassEnvelope`] if no segment carries positive mass.
    */
    pub fn build(points: &[SupportPoint], bounds: Bounds) -> Result<Self> {
        if points.is_empty() {
            return Err(ArsError::UnboundedEnvelope(
                "no support points to build the hull from".into(),
            ));
        }

        let mut intercepts = Vec::with_capacity(points.len() + 1);
        intercepts.push(bounds.lower);
        intercepts.extend(
            points
                .windows(2)
                .map(|pair| tangent_intersection(&pair[0], &pair[1])),
        );
        intercepts.push(bounds.upper);

        let mut segments: Vec<Segment> = points
            .iter()
            .zip(intercepts.windows(2))
            .map(|(p, z)| Segment::new(z[0], z[1], Line::tangent(p)))
            .collect();

        if let Some(seg) = segments.iter().find(|s| s.log_mass == f64::INFINITY) {
            return Err(ArsError::UnboundedEnvelope(format!(
                "segment [{}, {}] with slope {} has infinite mass",
                seg.lo, seg.hi, seg.upper.slope
            )));
        }

        let max_log_mass = segments
            .iter()
            .map(|s| s.log_mass)
            .filter(|lm| lm.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if !max_log_mass.is_finite() {
            return Err(ArsError::ZeroMassEnvelope(0.0));
        }
        let scaled_total: f64 = segments
            .iter()
            .map(|s| (s.log_mass - max_log_mass).exp())
            .filter(|w| w.is_finite())
            .sum();
        if !(scaled_total > 0.0 && scaled_total.is_finite()) {
            return Err(ArsError::ZeroMassEnvelope(scaled_total));
        }
        let log_normalizer = max_log_mass + scaled_total.ln();

        for seg in segments.iter_mut() {
            let w = (seg.log_mass - log_normalizer).exp();
            seg.weight = if w.is_finite() && w > 0.0 { w } else { 0.0 };
        }

        let secants = points
            .windows(2)
            .map(|pair| Line::secant(&pair[0], &pair[1]))
            .collect();

        trace!(
            "rebuilt hull: {} segments, log normalizer {log_normalizer}",
            segments.len()
        );

        Ok(Self {
            abscissae: points.iter().map(|p| p.x).collect(),
            intercepts,
            segments,
            secants,
            log_normalizer,
        })
    }

    /// `z_0, ..., z_n`, starting and ending with the bounds.
    pub fn intercepts(&self) -> &[f64] {
        &self.intercepts
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Log of the total mass of `exp(u(x))`.
    pub fn log_normalizer(&self) -> f64 {
        self.log_normalizer
    }

    /// Index of the hull segment containing `x`.
    pub fn segment_index(&self, x: f64) -> usize {
        let last = self.segments.len() - 1;
        self.segments
            .partition_point(|s| s.hi < x)
            .min(last)
    }

    /// Upper hull `u(x)`.
    pub fn upper(&self, x: f64) -> f64 {
        self.segments[self.segment_index(x)].upper.at(x)
    }

    /// Index `j` of the secant covering `x`, i.e. `x_j <= x <= x_{j+1}`, or
    /// `None` outside `[x_1, x_n]`.
    pub fn squeeze_index(&self, x: f64) -> Option<usize> {
        let (first, last) = (*self.abscissae.first()?, *self.abscissae.last()?);
        if self.secants.is_empty() || !(first <= x && x <= last) {
            return None;
        }
        let j = self.abscissae.partition_point(|&xi| xi <= x);
        Some(j.saturating_sub(1).min(self.secants.len() - 1))
    }

    /// Squeeze `l(x)`, `-∞` outside `[x_1, x_n]`.
    pub fn lower(&self, x: f64) -> f64 {
        match self.squeeze_index(x) {
            Some(j) => self.secants[j].at(x),
            None => f64::NEG_INFINITY,
        }
    }

    /// Log density of the normalized proposal at `x`.
    pub fn log_density(&self, x: f64) -> f64 {
        self.upper(x) - self.log_normalizer
    }
}
