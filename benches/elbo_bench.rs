//! Performance benchmarks for the ELBO forward and backward pass.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use latente::noise::GaussianNoise;
use latente::{backward, Tensor, Vae, VaeConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn batch(size: usize, dim_in: usize) -> Tensor {
    let mut rng = StdRng::seed_from_u64(0);
    let data: Vec<f32> = (0..size * dim_in).map(|_| rng.random::<f32>()).collect();
    Tensor::with_shape(data.into(), vec![size, dim_in], false)
}

fn mnist_sized() -> Vae {
    let config = VaeConfig::new(784, 2).with_image_shape(28, 28);
    Vae::new(config, &mut StdRng::seed_from_u64(42)).expect("valid config")
}

/// Benchmark Vae::elbo for growing batch sizes
fn bench_elbo(c: &mut Criterion) {
    let vae = mnist_sized();
    let mut group = c.benchmark_group("Vae::elbo");

    for size in [1, 8, 32].iter() {
        let x = batch(*size, 784);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("batch", size), size, |b, _| {
            let mut noise = GaussianNoise::seeded(1);
            b.iter(|| black_box(vae.elbo(&x, 1, &mut noise).expect("elbo")));
        });
    }
    group.finish();
}

/// Benchmark the number of latent draws per observation
fn bench_samples(c: &mut Criterion) {
    let vae = mnist_sized();
    let x = batch(8, 784);
    let mut group = c.benchmark_group("Vae::elbo samples");

    for n in [1, 4, 16].iter() {
        group.bench_with_input(BenchmarkId::new("n_samples", n), n, |b, &n| {
            let mut noise = GaussianNoise::seeded(2);
            b.iter(|| black_box(vae.elbo(&x, n, &mut noise).expect("elbo")));
        });
    }
    group.finish();
}

/// Benchmark a full loss + backward step
fn bench_backward(c: &mut Criterion) {
    let vae = mnist_sized();
    let x = batch(16, 784);

    c.bench_function("Vae::forward+backward batch=16", |b| {
        let mut noise = GaussianNoise::seeded(3);
        b.iter(|| {
            let mut loss = vae.forward(&x, 1, true, &mut noise).expect("forward").loss;
            backward(&mut loss, None);
            vae.zero_grad();
        });
    });
}

criterion_group!(benches, bench_elbo, bench_samples, bench_backward);
criterion_main!(benches);
