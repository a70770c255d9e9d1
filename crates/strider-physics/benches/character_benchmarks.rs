//! Character Benchmarks
//!
//! Cost of world steps with a crowd of characters walking on the ground

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::Vec3;
use strider_core::{SceneGraph, Transform};
use strider_physics::{CollisionFilter, PhysicsController, RigidBodyParameters, ShapeDefinition};

const DT: f32 = 1.0 / 60.0;

fn setup(characters: usize) -> (PhysicsController, SceneGraph) {
    let mut controller = PhysicsController::default();
    let mut scene = SceneGraph::new();

    let ground = scene.add_node_with_transform("ground", Transform::from_position(Vec3::new(0.0, -0.5, 0.0)));
    controller
        .create_rigid_body(
            &scene,
            ground,
            &ShapeDefinition::cuboid(Vec3::new(500.0, 1.0, 500.0)),
            RigidBodyParameters::fixed(),
            CollisionFilter::default(),
        )
        .unwrap();

    for i in 0..characters {
        let x = (i % 32) as f32 * 2.0;
        let z = (i / 32) as f32 * 2.0;
        let node = scene.add_node_with_transform(format!("character_{i}"), Transform::from_position(Vec3::new(x, 0.9, z)));
        let id = controller
            .create_character(&scene, node, &ShapeDefinition::capsule(0.4, 1.8), 80.0, CollisionFilter::default())
            .unwrap();
        let character = controller.character_mut(id).unwrap();
        character.set_velocity(Vec3::new(0.0, 0.0, -1.5));
        character.set_right_velocity(0.5);
    }

    // Let everyone settle onto the ground first.
    for _ in 0..10 {
        controller.step_world(&mut scene, DT);
    }
    (controller, scene)
}

fn bench_character_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("character_step");

    for count in [1, 16, 128].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (mut controller, mut scene) = setup(count);
            b.iter(|| {
                controller.step_world(&mut scene, black_box(DT));
            });
        });
    }

    group.finish();
}

fn bench_ray_test(c: &mut Criterion) {
    let (controller, _scene) = setup(128);

    c.bench_function("ray_test_down", |b| {
        b.iter(|| black_box(controller.ray_test(black_box(Vec3::new(10.0, 20.0, 10.0)), -Vec3::Y, 100.0)));
    });
}

criterion_group!(benches, bench_character_step, bench_ray_test);
criterion_main!(benches);
