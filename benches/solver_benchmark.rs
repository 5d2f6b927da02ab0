use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use smosvm::kernel::{Kernel, KernelParams};
use smosvm::{MemoryDataset, Sample, SparseVector, Svm, SvmType};

fn sparse_vector(seed: usize, dim: usize) -> SparseVector {
    let values: Vec<f64> = (0..dim)
        .map(|k| {
            let t = (seed * 31 + k * 17) as f64;
            if (seed + k) % 3 == 0 {
                0.0
            } else {
                t.sin()
            }
        })
        .collect();
    SparseVector::from_dense(&values)
}

fn two_spirals(n: usize) -> MemoryDataset {
    let samples = (0..n)
        .map(|i| {
            let t = i as f64 * 0.15;
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            let x = sign * t * t.cos();
            let y = sign * t * t.sin();
            Sample::new(SparseVector::from_dense(&[x, y]), sign)
        })
        .collect();
    MemoryDataset::new(samples)
}

fn bench_kernels(c: &mut Criterion) {
    let x = sparse_vector(1, 200);
    let y = sparse_vector(2, 200);
    let mut group = c.benchmark_group("kernel");

    for (name, kernel) in [
        ("linear", KernelParams::linear()),
        ("rbf", KernelParams::rbf(0.1)),
        ("polynomial", KernelParams::polynomial(3, 0.1, 1.0)),
        ("sigmoid", KernelParams::sigmoid(0.01, -1.0)),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| kernel.compute(black_box(&x), black_box(&y)))
        });
    }
    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("train");
    group.sample_size(10);

    for &n in &[100usize, 400] {
        let data = two_spirals(n);
        group.bench_with_input(BenchmarkId::new("c_svc_rbf", n), &data, |b, data| {
            let svm = Svm::new().with_kernel(KernelParams::rbf(0.5)).with_c(10.0);
            b.iter(|| svm.train(data))
        });
        group.bench_with_input(BenchmarkId::new("nu_svc_rbf", n), &data, |b, data| {
            let svm = Svm::new()
                .with_type(SvmType::NuSvc)
                .with_kernel(KernelParams::rbf(0.5))
                .with_nu(0.2);
            b.iter(|| svm.train(data))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_kernels, bench_training);
criterion_main!(benches);
