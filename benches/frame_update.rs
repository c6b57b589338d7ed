//! Benchmarks for the per-frame CPU work of both components.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Mat4;

use bioscape::camera::{pointer_ndc, Ray};
use bioscape::components::helix::structure::layout;
use bioscape::host::MountBox;
use bioscape::prelude::*;
use bioscape::spawn::SpawnContext;

fn bench_cells_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("cells_frame");

    for count in [2usize, 16, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut host = HeadlessHost::new(1280.0, 720.0);
            let mut backend = HeadlessBackend::new();
            let mut field = AmbientParticleField::new(
                CellFieldConfig::new()
                    .with_cell_count(count)
                    .with_seed(1)
                    .with_performance_mode(PerformanceMode::High),
            );
            field.mount(&mut host, &mut backend);
            b.iter(|| host.advance(&mut field, &mut backend, black_box(17.0)));
        });
    }

    group.finish();
}

fn bench_helix_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("helix_frame");

    for complexity in [Complexity::Low, Complexity::High] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", complexity)),
            &complexity,
            |b, &complexity| {
                let mut host = HeadlessHost::new(1280.0, 720.0);
                let mut backend = HeadlessBackend::new();
                let mut viewer = InteractiveHelixViewer::new(
                    HelixConfig::new()
                        .with_complexity(complexity)
                        .with_seed(1)
                        .with_performance_mode(PerformanceMode::High),
                );
                viewer.mount(&mut host, &mut backend);
                viewer.handle_event(
                    &HostEvent::KeyDown {
                        key: Key::Character('e'),
                    },
                    &mut host,
                    &mut backend,
                );
                b.iter(|| host.advance(&mut viewer, &mut backend, black_box(16.0)));
            },
        );
    }

    group.finish();
}

fn bench_helix_hit_test(c: &mut Criterion) {
    let mut host = HeadlessHost::new(1280.0, 720.0);
    let mut backend = HeadlessBackend::new();
    let mut viewer = InteractiveHelixViewer::new(HelixConfig::new().with_seed(1));
    viewer.mount(&mut host, &mut backend);
    host.advance(&mut viewer, &mut backend, 16.0);

    let (Some(structure), Some(group), Some(view_proj)) =
        (viewer.structure(), viewer.group_matrix(), viewer.view_proj())
    else {
        return;
    };
    let ray = Ray::from_ndc(
        pointer_ndc(glam::Vec2::new(640.0, 360.0), MountBox::new(1280.0, 720.0)),
        view_proj,
    );

    c.bench_function("helix_hit_test", |b| {
        b.iter(|| black_box(structure.hit_test(black_box(&ray), group)))
    });
    c.bench_function("helix_draw_items", |b| {
        b.iter(|| black_box(structure.draw_items(Mat4::IDENTITY)))
    });
}

fn bench_layout(c: &mut Criterion) {
    c.bench_function("helix_layout_high", |b| {
        b.iter(|| {
            let mut ctx = SpawnContext::new(Some(1));
            black_box(layout(Complexity::High, &mut ctx))
        })
    });
}

criterion_group!(
    benches,
    bench_cells_frame,
    bench_helix_frame,
    bench_helix_hit_test,
    bench_layout
);
criterion_main!(benches);
