use ars_sampler::{AdaptiveRejectionSampler, Bounds, FromDensity};

fn main() {
    // Gamma(shape = 2.5, rate = 1.5), written on the linear scale.
    let (shape, rate) = (2.5, 1.5);
    let density = FromDensity(move |x: f64| x.powf(shape - 1.0) * (-rate * x).exp());
    let bounds = Bounds::new(0.0, f64::INFINITY).expect("bounds are ordered");

    let mut ars = AdaptiveRejectionSampler::new(density, &[0.5, 3.0], bounds)
        .expect("initial points lie inside the bounds")
        .set_seed(7);
    let samples = ars.run_progress(50_000).expect("gamma with shape >= 1 is log-concave");

    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    println!("Sample mean {mean:.4}, expected {:.4}", shape / rate);
}
