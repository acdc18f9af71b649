/*!
Target densities and the oracle through which the sampler evaluates them.

The sampler only ever needs point evaluations of the log density `h = ln f`.
Any closure `Fn(f64) -> f64` is accepted as a log density; densities that are
more naturally written on the linear scale can be wrapped in [`FromDensity`].
Extra parameters of the density are simply captured by the closure.

```rust
use ars_sampler::density::{FromDensity, LogDensity};

let rate = 2.0;
let log_exp = move |x: f64| -rate * x;
assert_eq!(log_exp.log_density(1.0), -2.0);

let exp = FromDensity(move |x: f64| rate * (-rate * x).exp());
assert!((exp.log_density(1.0) - (2.0f64.ln() - 2.0)).abs() < 1e-12);
```

Anything that is not callable is rejected when the program is compiled:

```compile_fail
use ars_sampler::{sample, config::Bounds};

let not_a_function = 3.0_f64;
let _ = sample(not_a_function, 10, &[-1.0, 1.0], Bounds::default());
```
*/

use rayon::prelude::*;

use crate::support::SupportPoint;

/// A univariate log density `h(x) = ln f(x)`, known up to an additive constant.
///
/// Evaluating outside the support may return `-∞` or NaN; such points are
/// filtered by the sampler. Implementors must be `Sync` because the oracle
/// evaluates candidates of one batch in parallel.
pub trait LogDensity: Sync {
    fn log_density(&self, x: f64) -> f64;
}

impl<F> LogDensity for F
where
    F: Fn(f64) -> f64 + Sync,
{
    fn log_density(&self, x: f64) -> f64 {
        self(x)
    }
}

/// Adapts a density on the linear scale into a [`LogDensity`] by taking its
/// natural logarithm.
#[derive(Debug, Clone, Copy)]
pub struct FromDensity<F>(pub F);

impl<F> LogDensity for FromDensity<F>
where
    F: Fn(f64) -> f64 + Sync,
{
    fn log_density(&self, x: f64) -> f64 {
        (self.0)(x).ln()
    }
}

/// Raw result of evaluating the oracle at one abscissa.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub x: f64,
    /// Log density at `x`.
    pub h: f64,
    /// Forward-difference derivative of the log density at `x`.
    pub dh: f64,
}

impl Evaluation {
    /// Converts the evaluation into a support point, dropping it if either the
    /// value or the derivative is not finite.
    pub fn into_support_point(self) -> Option<SupportPoint> {
        if self.h.is_finite() && self.dh.is_finite() {
            Some(SupportPoint {
                x: self.x,
                h: self.h,
                dh: self.dh,
            })
        } else {
            None
        }
    }
}

/// Number of density calls made by one [`DensityOracle::evaluate`].
pub const CALLS_PER_EVALUATION: usize = 2;

/**
Wraps the caller's log density and exposes value and derivative estimates.

Every evaluation costs exactly two calls of the underlying density, at `x` and
at `x + δ`. Nothing is cached across abscissae.
*/
pub struct DensityOracle<'a, D: ?Sized> {
    target: &'a D,
    step: f64,
}

impl<'a, D> DensityOracle<'a, D>
where
    D: LogDensity + ?Sized,
{
    pub fn new(target: &'a D, step: f64) -> Self {
        Self { target, step }
    }

    pub fn log_density(&self, x: f64) -> f64 {
        self.target.log_density(x)
    }

    /// Forward difference `(h(x + δ) - h(x)) / δ`, given `h(x)`.
    pub fn derivative(&self, x: f64, h: f64) -> f64 {
        (self.target.log_density(x + self.step) - h) / self.step
    }

    pub fn evaluate(&self, x: f64) -> Evaluation {
        let h = self.log_density(x);
        let dh = self.derivative(x, h);
        Evaluation { x, h, dh }
    }

    /// Evaluates a whole batch of abscissae in parallel. The output keeps the
    /// order of `xs`.
    pub fn evaluate_batch(&self, xs: &[f64]) -> Vec<Evaluation> {
        xs.par_iter().map(|&x| self.evaluate(x)).collect()
    }
}
