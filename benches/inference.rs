use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qtlens::quantitation::{
    detect_suspicious_values, infer, ExpressionMatrix, QuantitationType, ScaleType,
    StandardQuantitationType,
};

/// Deterministic log2-scale values with a few missing entries
fn log2_matrix(rows: usize, columns: usize) -> ExpressionMatrix {
    let values = (0..rows * columns)
        .map(|i| {
            if i % 97 == 0 {
                f64::NAN
            } else {
                2.0 + ((i * 7919) % 1000) as f64 / 100.0
            }
        })
        .collect();
    ExpressionMatrix::new(rows, columns, values).unwrap()
}

/// Deterministic counts
fn count_matrix(rows: usize, columns: usize) -> ExpressionMatrix {
    let values = (0..rows * columns).map(|i| ((i * 31) % 500) as f64).collect();
    ExpressionMatrix::new(rows, columns, values).unwrap()
}

/// Benchmark inference on matrices that fall through most rules
fn bench_infer_log2(c: &mut Criterion) {
    let mut group = c.benchmark_group("infer_log2");

    for (rows, columns) in [(1_000, 10), (10_000, 20), (20_000, 100)] {
        let matrix = log2_matrix(rows, columns);
        group.throughput(Throughput::Elements((rows * columns) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", rows, columns)),
            &matrix,
            |b, matrix| b.iter(|| infer(black_box(matrix), None, false).unwrap()),
        );
    }

    group.finish();
}

/// Benchmark inference on counts, which stops early
fn bench_infer_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("infer_counts");

    for (rows, columns) in [(1_000, 10), (20_000, 100)] {
        let matrix = count_matrix(rows, columns);
        group.throughput(Throughput::Elements((rows * columns) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", rows, columns)),
            &matrix,
            |b, matrix| b.iter(|| infer(black_box(matrix), None, false).unwrap()),
        );
    }

    group.finish();
}

/// Benchmark the suspicious-value linter
fn bench_suspicious_values(c: &mut Criterion) {
    let qt = QuantitationType::new("log2", StandardQuantitationType::Amount, ScaleType::Log2, false);
    let matrix = log2_matrix(20_000, 100);

    c.bench_function("suspicious_log2_20000x100", |b| {
        b.iter(|| detect_suspicious_values(black_box(&matrix), &qt).is_ok())
    });
}

criterion_group!(
    benches,
    bench_infer_log2,
    bench_infer_counts,
    bench_suspicious_values
);
criterion_main!(benches);
