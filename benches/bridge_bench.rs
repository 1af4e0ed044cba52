use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use rand::rng;
use tensor_bridge::test_utils::run_cpu_operator;
use tensor_bridge::{bridge, Argument, Blob, CpuTensor, DeviceOption, Host, OperatorDef};

// Helper function to create random CPU tensor
fn create_random_cpu(shape: &[usize]) -> CpuTensor {
    let size = shape.iter().product();
    let mut rng_instance = rng();
    let data: Vec<f32> = (0..size).map(|_| rng_instance.random::<f32>()).collect();
    CpuTensor::from_vec(shape, data).unwrap()
}

fn bench_fetch_feed(c: &mut Criterion) {
    let shapes = [([64, 64], "64"), ([512, 512], "512"), ([2048, 2048], "2048")];
    let host = Host::new();

    let mut group = c.benchmark_group("fetch_feed");

    for (shape, size) in shapes.iter() {
        let mut blob = Blob::new();
        blob.set(create_random_cpu(shape));

        group.bench_function(format!("cpu_fetch_{}", size), |bencher| {
            bencher.iter(|| {
                black_box(bridge::fetch_blob(black_box(&host), black_box(&blob))).unwrap();
            });
        });

        let array = bridge::fetch_blob(&host, &blob).unwrap();
        let mut target = Blob::new();
        group.bench_function(format!("cpu_feed_{}", size), |bencher| {
            bencher.iter(|| {
                bridge::feed_blob(&host, &DeviceOption::cpu(), black_box(array.view()), &mut target).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_string_fetch(c: &mut Criterion) {
    let host = Host::new();
    let values: Vec<Vec<u8>> = (0..4096).map(|i| format!("token-{}", i).into_bytes()).collect();
    let mut blob = Blob::new();
    blob.set(CpuTensor::from_strings(&[64, 64], values).unwrap());

    c.bench_function("cpu_fetch_strings_4096", |bencher| {
        bencher.iter(|| {
            black_box(bridge::fetch_blob(black_box(&host), black_box(&blob))).unwrap();
        });
    });
}

fn bench_conv_transpose(c: &mut Criterion) {
    let forward = OperatorDef::new("ConvTranspose", &["X", "W", "b"], &["Y"])
        .with_arg(Argument::int("kernel", 4))
        .with_arg(Argument::int("stride", 2))
        .with_arg(Argument::int("pad", 1));
    let x = create_random_cpu(&[8, 16, 16, 16]);
    let w = create_random_cpu(&[16, 8, 4, 4]);
    let b = create_random_cpu(&[8]);

    let mut group = c.benchmark_group("conv_transpose");

    group.bench_function("cpu_forward_16x16", |bencher| {
        bencher.iter(|| {
            black_box(run_cpu_operator(&forward, black_box(&[&x, &w, &b]), 1)).unwrap();
        });
    });

    let grad_def = tensor_bridge::ops::get_gradient_for_op(&forward, &["Y_grad".to_string()])
        .unwrap()
        .ops
        .remove(0);
    let dy = create_random_cpu(&[8, 8, 32, 32]);
    group.bench_function("cpu_backward_16x16", |bencher| {
        bencher.iter(|| {
            black_box(run_cpu_operator(&grad_def, black_box(&[&x, &w, &dy]), 3)).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fetch_feed, bench_string_fetch, bench_conv_transpose);
criterion_main!(benches);
