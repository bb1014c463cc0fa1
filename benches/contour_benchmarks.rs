//! Benchmarks for contouring, level selection and grid sampling.
//!
//! Run with: cargo bench --bench contour_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use isobar::render::contour::contour_lines;
use isobar::render::{connect_segments, filled_band_mask, march_squares, smooth_polyline, GridSampler};
use isobar::sources::field_from_fn;
use isobar::styles::auto_range;
use isobar::{quickmap, PlotMethod};
use ndarray::Array2;
use serde_json::json;

/// A smooth temperature-like field with hills and valleys.
fn smooth_field(width: usize, height: usize) -> Vec<f32> {
    let mut data = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let fx = x as f32 / width as f32;
            let fy = y as f32 / height as f32;
            let v1 = (fx * std::f32::consts::PI * 4.0).sin() * 20.0;
            let v2 = (fy * std::f32::consts::PI * 4.0).sin() * 20.0;
            let v3 = ((fx + fy) * std::f32::consts::PI * 2.0).sin() * 10.0;
            data[y * width + x] = 50.0 + v1 + v2 + v3;
        }
    }
    data
}

/// A deterministic high-frequency ripple on top of the smooth field, which
/// produces many short segments.
fn rippled_field(width: usize, height: usize) -> Vec<f32> {
    smooth_field(width, height)
        .into_iter()
        .enumerate()
        .map(|(i, v)| v + ((i * 7919) % 97) as f32 / 97.0 * 10.0 - 5.0)
        .collect()
}

fn bench_march_squares(c: &mut Criterion) {
    let mut group = c.benchmark_group("march_squares");

    for size in [64usize, 256, 512] {
        let data = smooth_field(size, size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("smooth", size), &data, |b, data| {
            b.iter(|| march_squares(black_box(data), size, size, black_box(50.0)));
        });

        let data = rippled_field(size, size);
        group.bench_with_input(BenchmarkId::new("rippled", size), &data, |b, data| {
            b.iter(|| march_squares(black_box(data), size, size, black_box(50.0)));
        });
    }

    group.finish();
}

fn bench_connect_and_smooth(c: &mut Criterion) {
    let mut group = c.benchmark_group("connect_and_smooth");
    let data = smooth_field(256, 256);
    let segments = march_squares(&data, 256, 256, 50.0);

    group.bench_function("connect_segments", |b| {
        b.iter(|| connect_segments(black_box(segments.clone())));
    });

    let contours = connect_segments(segments);
    for iterations in [1u32, 2, 4] {
        group.bench_with_input(BenchmarkId::new("smooth_polyline", iterations), &iterations, |b, &n| {
            b.iter(|| {
                contours
                    .iter()
                    .map(|contour| smooth_polyline(black_box(contour), n))
                    .count()
            });
        });
    }

    group.finish();
}

fn bench_contour_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("contour_lines");
    let data = smooth_field(256, 256);

    for n_levels in [5usize, 11, 21] {
        let levels: Vec<f32> = auto_range(0.0, 100.0, n_levels, None)
            .into_iter()
            .map(|level| level as f32)
            .collect();
        group.bench_with_input(BenchmarkId::new("levels", n_levels), &levels, |b, levels| {
            b.iter(|| contour_lines(black_box(&data), 256, 256, black_box(levels), 1));
        });
    }

    group.finish();
}

fn bench_filled_band_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("filled_band_mask");
    for size in [256usize, 1024] {
        let data = smooth_field(size, size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("band", size), &data, |b, data| {
            b.iter(|| filled_band_mask(black_box(data), 40.0, 60.0));
        });
    }
    group.finish();
}

fn bench_auto_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("auto_range");
    let ranges = [
        (0.0, 100.0, None, "0-100"),
        (-3.7, 12.2, None, "small"),
        (96_000.0, 104_000.0, None, "pressure_pa"),
        (-4.1, 2.6, Some(0.0), "diverging"),
    ];
    for (min, max, divergence, name) in ranges {
        group.bench_function(name, |b| {
            b.iter(|| auto_range(black_box(min), black_box(max), 21, divergence));
        });
    }
    group.finish();
}

fn bench_grid_sampler(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_sampler");
    let lats: Vec<f64> = (0..181).map(|j| 90.0 - j as f64).collect();
    let lons: Vec<f64> = (0..360).map(|i| i as f64).collect();
    let values = Array2::from_shape_fn((lats.len(), lons.len()), |(j, i)| (j * 360 + i) as f32);

    for method in ["nearest", "bilinear", "bicubic"] {
        let sampler = GridSampler::new(&lats, &lons, values.view(), method).unwrap();
        group.throughput(Throughput::Elements(10_000));
        group.bench_function(method, |b| {
            b.iter(|| {
                (0..10_000)
                    .filter_map(|k| {
                        let lon = (k % 100) as f64 * 3.6 - 180.0;
                        let lat = (k / 100) as f64 * 1.8 - 90.0;
                        sampler.sample(black_box(lon), black_box(lat))
                    })
                    .count()
            });
        });
    }
    group.finish();
}

fn bench_quickmap_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("quickmap_render");
    group.sample_size(10);

    let lats: Vec<f64> = (0..=72).map(|j| 90.0 - j as f64 * 2.5).collect();
    let lons: Vec<f64> = (0..144).map(|i| -180.0 + i as f64 * 2.5).collect();
    let field = field_from_fn("2t", lats, lons, |lat, lon| {
        (273.15 + 30.0 * lat.to_radians().cos() + 3.0 * lon.to_radians().sin()) as f32
    })
    .unwrap()
    .with_units("K");

    for method in [PlotMethod::Pcolormesh, PlotMethod::Contourf, PlotMethod::Contour] {
        let figure = quickmap(&field, method, None, &json!({})).unwrap().with_size(800, 500);
        group.bench_function(method.name(), |b| {
            b.iter(|| figure.render().unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_march_squares,
    bench_connect_and_smooth,
    bench_contour_lines,
    bench_filled_band_mask,
    bench_auto_range,
    bench_grid_sampler,
    bench_quickmap_render,
);
criterion_main!(benches);
