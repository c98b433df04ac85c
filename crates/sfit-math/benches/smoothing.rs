use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sfit_math::interpolations::AkimaSpline;
use sfit_math::random_numbers::MersenneTwisterUniformRng;
use sfit_math::smoothing::AkimaSmoother;

fn series(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let x: Vec<f64> = (0..n).map(|i| 0.1 * i as f64).collect();
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(i, &v)| v.sin() + 0.05 * (((13 * i) % 11) as f64 - 5.0) / 5.0)
        .collect();
    let sigma = vec![0.05; n];
    (x, y, sigma)
}

fn bench_spline(c: &mut Criterion) {
    let (x, y, _) = series(200);
    c.bench_function("akima_build_200", |b| {
        b.iter(|| AkimaSpline::new(black_box(&x), black_box(&y)).unwrap())
    });

    let spline = AkimaSpline::new(&x, &y).unwrap();
    let qx: Vec<f64> = (0..2_000).map(|i| 0.00995 * i as f64).collect();
    c.bench_function("akima_interpolate_2000", |b| {
        b.iter(|| spline.interpolate(black_box(&qx)))
    });
}

fn bench_smoother_epoch(c: &mut Criterion) {
    let (x, y, sigma) = series(100);
    let mut smoother = AkimaSmoother::new(MersenneTwisterUniformRng::new(0xfeed));
    smoother.set_d2dfac(0.01).unwrap();
    smoother.set_input_data(&x, &y, &sigma).unwrap();
    smoother.set_proposals_per_epoch(5_000).unwrap();
    c.bench_function("smoother_epoch_100x5000", |b| {
        b.iter(|| black_box(smoother.step()))
    });
}

criterion_group!(benches, bench_spline, bench_smoother_epoch);
criterion_main!(benches);
