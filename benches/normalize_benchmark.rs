use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use psg_importer::{load_record, normalize_channels};
use std::path::Path;

pub fn bench_normalize(c: &mut Criterion) {
    // Ten minutes of PSG at 256 Hz over 24 channels, in reverse name order
    let num_channels = 24;
    let num_samples = 256 * 60 * 10;
    let names: Vec<String> = (0..num_channels)
        .rev()
        .map(|i| format!("CH{:02}", i))
        .collect();
    let signals = Array2::<f64>::from_shape_fn((num_channels, num_samples), |(i, j)| {
        (i * j) as f64
    });

    c.bench_function("normalize_channels", |b| {
        b.iter(|| {
            let record = normalize_channels("bench", 256.0, &names, &[], black_box(&signals));
            black_box(record.is_ok())
        });
    });
}

pub fn bench_load_record(c: &mut Criterion) {
    // You would need a WFDB record in a known location
    let record_path = "path/to/record";

    if Path::new(&format!("{}.hea", record_path)).exists() {
        c.bench_function("load_record", |b| {
            b.iter(|| {
                let result = black_box(load_record(record_path));
                black_box(result.is_ok())
            });
        });
    } else {
        println!("Skipping benchmark: record not found at {}", record_path);
    }
}

criterion_group!(benches, bench_normalize, bench_load_record);
criterion_main!(benches);
