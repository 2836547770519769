//! Dispatch benchmarks using criterion.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pivot_data::{BasicType, DVec3, Type, Value};
use pivot_ecs::{ComponentDescription, EventDescription, Indexes, Role, Scene, SystemDescription};

fn indexes() -> Indexes {
    let mut indexes = Indexes::new();
    indexes
        .register_component(ComponentDescription::new(
            "Position",
            Type::Basic(BasicType::Vec3),
        ))
        .unwrap();
    indexes
        .register_system(SystemDescription::new(
            "Drift",
            vec![Role::new("e", ["Position"])],
            Some(EventDescription {
                name: "Tick".into(),
                roles: Vec::new(),
                payload: Type::Basic(BasicType::Number),
            }),
            |_, combination, event| {
                let dt = event.event.payload.as_number().unwrap_or_default();
                let Some(id) = combination.component_id("Position") else {
                    return Ok(Vec::new());
                };
                for entity in combination.matching() {
                    if let Some(p) = combination.get(entity, id).and_then(Value::as_vec3) {
                        combination.set(entity, id, Value::Vec3(p + DVec3::X * dt))?;
                    }
                }
                Ok(Vec::new())
            },
        ))
        .unwrap();
    indexes
}

fn populate(indexes: &Indexes, count: u64) -> Scene {
    let position = indexes.components.get("Position").unwrap();
    let mut scene = Scene::new("bench");
    scene.register_system("Drift", indexes).unwrap();
    for i in 0..count {
        let e = scene.create_entity().unwrap();
        scene
            .insert(e, position, Value::Vec3(DVec3::splat(i as f64)))
            .unwrap();
    }
    scene
}

fn spawn_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");
    let indexes = indexes();

    for count in [1, 100, 1000] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::new("with_position", count), &count, |b, &count| {
            b.iter(|| black_box(populate(&indexes, count)));
        });
    }

    group.finish();
}

fn dispatch_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let indexes = indexes();

    for count in [1, 100, 1000] {
        let mut scene = populate(&indexes, count);
        group.throughput(Throughput::Elements(count));
        group.bench_function(BenchmarkId::new("tick", count), |b| {
            b.iter(|| {
                black_box(
                    scene
                        .send_event(&indexes.events, "Tick", Value::Number(0.016), Vec::new())
                        .unwrap(),
                );
            });
        });
    }

    group.finish();
}

criterion_group!(benches, spawn_benchmarks, dispatch_benchmarks);
criterion_main!(benches);
