/*!
# Adaptive Rejection Sampler

This module implements adaptive rejection sampling (ARS) for univariate
log-concave densities known only through point evaluations of their log
density. Samples are drawn from the exponential of a piecewise-linear upper
hull of the log density and accepted with a cheap squeeze test or, failing
that, a full test against the true density. Every full test refines the hull.

## Overview

- **Target (`D`)**: any [`LogDensity`], including plain closures.
- **Batches**: candidates are drawn in chunks whose size grows quadratically
  with the iteration count, `min(remaining, iteration²)`. Small chunks early
  keep the number of density calls low while the hull is crude; large chunks
  late amortize the per-chunk overhead once it has converged.
- **Refinement**: all candidates of a chunk that reach the full test are
  evaluated together (in parallel) and merged into the support before the
  next chunk is drawn.
- **Reproducibility**: a seeded `SmallRng` drives the whole run, so
  `set_seed` makes the output deterministic.

## Example Usage

```rust
use ars_sampler::ars::AdaptiveRejectionSampler;
use ars_sampler::config::Bounds;

// Gamma(shape = 3, rate = 1) up to a constant.
let log_gamma = |x: f64| 2.0 * x.ln() - x;
let bounds = Bounds::new(0.0, f64::INFINITY).unwrap();

let mut ars = AdaptiveRejectionSampler::new(log_gamma, &[1.0, 5.0], bounds)
    .unwrap()
    .set_seed(42);
let samples = ars.run(1_000).unwrap();

assert_eq!(samples.len(), 1_000);
assert!(samples.iter().all(|&x| x > 0.0));
```
*/

use indicatif::{ProgressBar, ProgressStyle};
use rand::prelude::*;
use tracing::{debug, warn};

use crate::config::{ArsConfig, Bounds};
use crate::density::{DensityOracle, LogDensity, CALLS_PER_EVALUATION};
use crate::envelope::{check_integrable, Envelope};
use crate::error::{ArsError, Result};
use crate::rejection::{RejectionTester, SegmentSampler};
use crate::support::{SupportPoint, SupportStore};

/// Bookkeeping of one sampling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Adaptive iterations (chunks) performed.
    pub iterations: usize,
    /// Candidates drawn from the hull.
    pub candidates: usize,
    /// Candidates accepted without calling the density.
    pub squeeze_accepted: usize,
    /// Candidates that needed the full test.
    pub full_tests: usize,
    /// Calls of the caller's density, including the initial points.
    pub oracle_calls: usize,
    /// Candidates dropped for falling outside the bounds.
    pub out_of_bounds: usize,
    /// Support points in the final hull.
    pub support_points: usize,
}

/// The mutable state of one call to the sampler. Nothing outlives the call.
struct BatchState<'a, D: ?Sized> {
    oracle: DensityOracle<'a, D>,
    bounds: Bounds,
    support: SupportStore,
    envelope: Envelope,
    stale: bool,
    samples: Vec<f64>,
    stats: RunStats,
}

impl<'a, D> BatchState<'a, D>
where
    D: LogDensity + ?Sized,
{
    fn new(
        target: &'a D,
        initial_points: &[f64],
        bounds: Bounds,
        config: &ArsConfig,
    ) -> Result<Self> {
        let oracle = DensityOracle::new(target, config.derivative_step);
        let evaluations = oracle.evaluate_batch(initial_points);
        let points: Vec<SupportPoint> = evaluations
            .iter()
            .filter_map(|eval| eval.into_support_point())
            .collect();
        if points.is_empty() {
            return Err(ArsError::AllInitialPointsInvalid);
        }
        if points.len() < evaluations.len() {
            warn!(
                "dropped {} of {} initial points with a non-finite log density or derivative",
                evaluations.len() - points.len(),
                evaluations.len()
            );
        }

        let mut support = SupportStore::new(config.derivative_step, config.derivative_eps);
        support.merge_and_validate(points)?;
        check_integrable(support.points(), bounds)?;
        let envelope = Envelope::build(support.points(), bounds)?;

        Ok(Self {
            oracle,
            bounds,
            support,
            envelope,
            stale: false,
            samples: Vec::new(),
            stats: RunStats {
                oracle_calls: initial_points.len() * CALLS_PER_EVALUATION,
                ..RunStats::default()
            },
        })
    }

    /// One adaptive iteration on a chunk of `chunk_size` candidates.
    fn step<R: Rng + ?Sized>(&mut self, chunk_size: usize, rng: &mut R) -> Result<()> {
        if self.stale {
            self.envelope = Envelope::build(self.support.points(), self.bounds)?;
            self.stale = false;
        }

        let candidates = SegmentSampler::new(&self.envelope)?.draw(chunk_size, rng);
        let outcome = RejectionTester::new(&self.envelope, &self.oracle, self.bounds)
            .test_batch(&candidates, rng);

        if outcome.out_of_bounds > 0 && self.stats.out_of_bounds == 0 {
            warn!(
                "dropped candidates outside the bounds ({}, {}); the bounds may understate the support",
                self.bounds.lower, self.bounds.upper
            );
        }

        self.stats.iterations += 1;
        self.stats.candidates += candidates.len();
        self.stats.squeeze_accepted += outcome.squeeze_accepted;
        self.stats.full_tests += outcome.evaluated.len();
        self.stats.oracle_calls += outcome.evaluated.len() * CALLS_PER_EVALUATION;
        self.stats.out_of_bounds += outcome.out_of_bounds;

        self.samples.extend_from_slice(&outcome.accepted);

        let new_points: Vec<SupportPoint> = outcome
            .evaluated
            .into_iter()
            .filter_map(|eval| eval.into_support_point())
            .collect();
        if !new_points.is_empty() {
            self.support.merge_and_validate(new_points)?;
            self.stale = true;
        }

        debug!(
            "iteration {}: chunk {chunk_size}, accepted {} (total {}), support {}",
            self.stats.iterations,
            outcome.accepted.len(),
            self.samples.len(),
            self.support.len()
        );
        Ok(())
    }
}

/**
Runs the adaptive loop until `n` samples are collected.

The progress bar, if any, tracks the number of accepted samples.
*/
fn generate<D, R>(
    target: &D,
    initial_points: &[f64],
    bounds: Bounds,
    config: &ArsConfig,
    n: usize,
    rng: &mut R,
    pb: Option<&ProgressBar>,
) -> Result<(Vec<f64>, RunStats)>
where
    D: LogDensity + ?Sized,
    R: Rng + ?Sized,
{
    let mut state = BatchState::new(target, initial_points, bounds, config)?;

    let mut iteration: usize = 0;
    while state.samples.len() < n {
        if iteration >= config.max_iters {
            return Err(ArsError::MaxIterationsExceeded {
                iterations: iteration,
                accepted: state.samples.len(),
                requested: n,
            });
        }
        iteration += 1;
        let remaining = n - state.samples.len();
        let chunk_size = remaining.min(iteration.saturating_mul(iteration));
        state.step(chunk_size, rng)?;

        if let Some(pb) = pb {
            pb.set_position(state.samples.len().min(n) as u64);
        }
    }

    // Vectorized chunks overshoot; keep exactly `n`.
    state.samples.truncate(n);
    state.stats.support_points = state.support.len();
    Ok((state.samples, state.stats))
}

/**
The adaptive rejection sampler.

Holds the target log density, the starting abscissae, the domain and the
numerical configuration. Each `run*` call builds a fresh hull from the initial
points; only the random number generator carries over from one call to the
next.

# Type Parameters
- `D`: The target log density. Must implement [`LogDensity`].
*/
#[derive(Debug, Clone)]
pub struct AdaptiveRejectionSampler<D> {
    /// The log density to sample from.
    pub target: D,
    /// Abscissae evaluated before the first chunk is drawn.
    pub initial_points: Vec<f64>,
    /// Domain of the target.
    pub bounds: Bounds,
    /// Numerical knobs.
    pub config: ArsConfig,
    /// The random seed.
    pub seed: u64,
    /// The random number generator.
    pub rng: SmallRng,
}

impl<D> AdaptiveRejectionSampler<D>
where
    D: LogDensity,
{
    /**
    Creates a sampler for `target` on `bounds`.

    If `initial_points` is empty, two points are chosen from the bounds (see
    [`Bounds::default_initial_points`]). On an unbounded side the hull can only
    be integrated if some initial point lies beyond the mode on that side.

    # Errors

    [`ArsError::InitialPointOutOfBounds`] if an initial point does not lie
    strictly inside the bounds.
    */
    pub fn new(target: D, initial_points: &[f64], bounds: Bounds) -> Result<Self> {
        let initial_points = if initial_points.is_empty() {
            bounds.default_initial_points()
        } else {
            initial_points.to_vec()
        };
        bounds.check_initial_points(&initial_points)?;
        let seed = thread_rng().gen::<u64>();
        Ok(Self {
            target,
            initial_points,
            bounds,
            config: ArsConfig::default(),
            seed,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// Sets a new seed and reseeds the generator.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn set_config(mut self, config: ArsConfig) -> Self {
        self.config = config;
        self
    }

    /// Draws `n` independent samples.
    ///
    /// # Errors
    ///
    /// Any [`ArsError`] raised while building or refining the hull. No samples
    /// are returned on error.
    pub fn run(&mut self, n: usize) -> Result<Vec<f64>> {
        self.run_with_stats(n).map(|(samples, _)| samples)
    }

    /// Like [`AdaptiveRejectionSampler::run`], also returning run diagnostics.
    pub fn run_with_stats(&mut self, n: usize) -> Result<(Vec<f64>, RunStats)> {
        generate(
            &self.target,
            &self.initial_points,
            self.bounds,
            &self.config,
            n,
            &mut self.rng,
            None,
        )
    }

    /// Like [`AdaptiveRejectionSampler::run`], showing a progress bar of the
    /// accepted samples.
    pub fn run_progress(&mut self, n: usize) -> Result<Vec<f64>> {
        let pb = ProgressBar::new(n as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("##-"));
        }
        pb.set_prefix("ARS");

        let res = generate(
            &self.target,
            &self.initial_points,
            self.bounds,
            &self.config,
            n,
            &mut self.rng,
            Some(&pb),
        );
        match &res {
            Ok(_) => pb.finish_with_message("Done!"),
            Err(_) => pb.abandon_with_message("Failed"),
        }
        res.map(|(samples, _)| samples)
    }

    /// Runs the sampler on a caller-provided random number generator, leaving
    /// the sampler's own generator untouched.
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<(Vec<f64>, RunStats)> {
        generate(
            &self.target,
            &self.initial_points,
            self.bounds,
            &self.config,
            n,
            rng,
            None,
        )
    }
}

/**
Draws `n` samples from the log-concave density `target` on `bounds`, starting
the hull at `initial_points` (or at defaults derived from the bounds when the
slice is empty).

```rust
use ars_sampler::{sample, config::Bounds};

let samples = sample(|x: f64| -0.5 * x * x, 500, &[-1.0, 1.0], Bounds::default()).unwrap();
assert_eq!(samples.len(), 500);
```
*/
pub fn sample<D: LogDensity>(
    target: D,
    n: usize,
    initial_points: &[f64],
    bounds: Bounds,
) -> Result<Vec<f64>> {
    AdaptiveRejectionSampler::new(target, initial_points, bounds)?.run(n)
}
