/*!
Adaptive Rejection Sampling (ARS) for univariate log-concave densities.

The sampler needs nothing but point evaluations of the log density. It keeps a
piecewise-linear upper hull and lower squeeze of the log density, proposes
from the exponential of the hull, and refines the hull at every point where
the true density had to be evaluated.

```rust
use ars_sampler::{sample, Bounds};

// Standard normal, known up to a constant.
let samples = sample(|x: f64| -0.5 * x * x, 1_000, &[-1.0, 1.0], Bounds::default()).unwrap();
assert_eq!(samples.len(), 1_000);
```

Densities whose log is not concave are rejected with
[`ArsError::NotLogConcave`] rather than sampled approximately.
*/

pub mod ars;
pub mod config;
pub mod density;
pub mod envelope;
pub mod error;
pub mod io;
pub mod ks_test;
pub mod rejection;
pub mod support;

pub use ars::{sample, AdaptiveRejectionSampler, RunStats};
pub use config::{ArsConfig, Bounds};
pub use density::{FromDensity, LogDensity};
pub use error::{ArsError, Result};
