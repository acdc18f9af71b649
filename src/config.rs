/*!
Tunables of the sampler and the domain on which the target density lives.

# Examples

```rust
use ars_sampler::config::{ArsConfig, Bounds};

// Reversed bounds are swapped (with a warning) rather than rejected.
let bounds = Bounds::new(5.0, 0.0).unwrap();
assert_eq!((bounds.lower, bounds.upper), (0.0, 5.0));

// Slices must hold exactly two values.
assert!(Bounds::try_from(&[0.0, 1.0, 2.0][..]).is_err());

let config = ArsConfig::default().set_max_iters(500);
assert_eq!(config.max_iters, 500);
```
*/

use tracing::warn;

use crate::error::{ArsError, Result};

/// Default cap on the number of adaptive iterations.
pub const DEFAULT_MAX_ITERS: usize = 10_000;

/// Forward-difference mesh. Balances the `O(δ)` truncation error against the
/// `O(ε_machine / δ)` cancellation error for log densities of unit curvature.
pub const DEFAULT_DERIVATIVE_STEP: f64 = 1e-8;

/// Minimal gap between consecutive derivatives for two support points to be
/// considered distinct.
pub const DEFAULT_DERIVATIVE_EPS: f64 = 1e-7;

/**
Numerical knobs of the adaptive rejection sampler.

All fields have sensible defaults (see [`ArsConfig::default`]); the setters
follow the consuming builder style used by the samplers themselves.
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArsConfig {
    /// Number of adaptive iterations after which the run is abandoned.
    pub max_iters: usize,
    /// Step `δ` of the forward difference, also the minimal spacing between
    /// two support points.
    pub derivative_step: f64,
    /// Minimal derivative gap `eps` between two support points.
    pub derivative_eps: f64,
}

impl Default for ArsConfig {
    fn default() -> Self {
        Self {
            max_iters: DEFAULT_MAX_ITERS,
            derivative_step: DEFAULT_DERIVATIVE_STEP,
            derivative_eps: DEFAULT_DERIVATIVE_EPS,
        }
    }
}

impl ArsConfig {
    pub fn set_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn set_derivative_step(mut self, step: f64) -> Self {
        self.derivative_step = step;
        self
    }

    pub fn set_derivative_eps(mut self, eps: f64) -> Self {
        self.derivative_eps = eps;
        self
    }
}

/**
The (possibly infinite) interval `(lower, upper)` outside of which the target
density is known to vanish.

Once constructed the bounds are always ordered (`lower < upper`) and free of
NaN. Construction never fails for equal or reversed bounds: equal bounds are
taken to mean "no information" and replaced by the whole real line, reversed
bounds are swapped. Both cases emit a warning.
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::whole_line()
    }
}

impl Bounds {
    /// The unbounded domain `(−∞, +∞)`.
    pub fn whole_line() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// Validates and normalizes a pair of bounds.
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if lower.is_nan() || upper.is_nan() {
            return Err(ArsError::InvalidBounds(format!(
                "bounds must not be NaN, got ({lower}, {upper})"
            )));
        }
        if lower == upper {
            warn!("equal bounds ({lower}, {upper}) carry no information, sampling on (-inf, inf) instead");
            return Ok(Self::whole_line());
        }
        if lower > upper {
            warn!("bounds ({lower}, {upper}) are reversed, swapping them");
            return Ok(Self {
                lower: upper,
                upper: lower,
            });
        }
        Ok(Self { lower, upper })
    }

    /// True if `x` lies strictly between the bounds.
    pub fn contains(&self, x: f64) -> bool {
        self.lower < x && x < self.upper
    }

    /// True if `x` lies inside the closed interval `[lower, upper]`.
    pub fn admits(&self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }

    /// Two starting abscissae strictly inside the bounds, used when the caller
    /// supplies none.
    pub fn default_initial_points(&self) -> Vec<f64> {
        match (self.lower.is_finite(), self.upper.is_finite()) {
            (true, true) => {
                let width = self.upper - self.lower;
                vec![self.lower + width / 3.0, self.lower + 2.0 * width / 3.0]
            }
            (true, false) => vec![self.lower + 1.0, self.lower + 2.0],
            (false, true) => vec![self.upper - 2.0, self.upper - 1.0],
            (false, false) => vec![-1.0, 1.0],
        }
    }

    /// Fails with [`ArsError::InitialPointOutOfBounds`] at the first point
    /// not strictly inside the bounds.
    pub fn check_initial_points(&self, points: &[f64]) -> Result<()> {
        match points.iter().find(|&&x| !self.contains(x)) {
            Some(&point) => Err(ArsError::InitialPointOutOfBounds {
                point,
                lower: self.lower,
                upper: self.upper,
            }),
            None => Ok(()),
        }
    }
}

impl TryFrom<&[f64]> for Bounds {
    type Error = ArsError;

    fn try_from(values: &[f64]) -> Result<Self> {
        match values {
            [lower, upper] => Bounds::new(*lower, *upper),
            _ => Err(ArsError::InvalidBounds(format!(
                "expected exactly 2 values, got {}",
                values.len()
            ))),
        }
    }
}

impl TryFrom<(f64, f64)> for Bounds {
    type Error = ArsError;

    fn try_from((lower, upper): (f64, f64)) -> Result<Self> {
        Bounds::new(lower, upper)
    }
}
