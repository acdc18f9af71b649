use ars_sampler::{AdaptiveRejectionSampler, Bounds};

fn main() {
    // N(2, 0.5²) up to a constant.
    let target = |x: f64| -0.5 * ((x - 2.0) / 0.5).powi(2);
    let mut ars = AdaptiveRejectionSampler::new(target, &[1.0, 3.0], Bounds::default())
        .expect("initial points lie inside the bounds")
        .set_seed(42);

    let (samples, stats) = ars.run_with_stats(10_000).expect("normal is log-concave");
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);

    println!("Drew {} samples: mean = {mean:.3}, variance = {var:.3}", samples.len());
    println!(
        "{} density calls, {} support points, {} of {} candidates settled by the squeeze",
        stats.oracle_calls, stats.support_points, stats.squeeze_accepted, stats.candidates
    );
}
