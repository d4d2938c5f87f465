//! # Trajectory Generation Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use drive_lib::{
    kinematics::DiffDriveKinematics,
    loc::Pose2d,
    traj::{self, TrajGenerator},
    wheel_servo::SimpleFeedforward,
};
use nalgebra::Vector2;

fn traj_gen_benchmark(c: &mut Criterion) {
    // ---- Build the generator ----

    let params = traj::Params {
        max_velocity_ms: 1.0,
        max_accel_mss: 2.0,
        max_voltage_v: 10.0,
        time_step_s: 0.02,
        start_velocity_ms: 0.0,
        end_velocity_ms: 0.0,
        reversed: false,
    };

    let feedforward = SimpleFeedforward {
        ks_v: 0.12124,
        kv_vspm: 2.9834,
        ka_vs2pm: 0.40143,
    };

    let generator = TrajGenerator::new(
        params,
        feedforward,
        DiffDriveKinematics::new(0.46355).unwrap(),
    )
    .unwrap();

    let start = Pose2d::new(0.0, 0.0, 0.0);
    let end = Pose2d::new(3.0, 0.0, 0.0);
    let s_curve = [Vector2::new(1.0, 1.0), Vector2::new(2.0, -1.0)];

    // A longer slalom through ten gates
    let slalom: Vec<Vector2<f64>> = (1..=10)
        .map(|i| Vector2::new(i as f64, if i % 2 == 0 { 0.75 } else { -0.75 }))
        .collect();
    let slalom_end = Pose2d::new(11.0, 0.0, 0.0);

    // ---- Run benchmarks ----

    c.bench_function("traj_gen s-curve", |b| {
        b.iter(|| generator.generate(black_box(&start), black_box(&s_curve), black_box(&end)))
    });

    c.bench_function("traj_gen slalom", |b| {
        b.iter(|| generator.generate(black_box(&start), black_box(&slalom), black_box(&slalom_end)))
    });

    let traj = generator.generate(&start, &s_curve, &end).unwrap();
    c.bench_function("traj sample", |b| {
        b.iter(|| traj.sample(black_box(1.234)))
    });
}

criterion_group!(benches, traj_gen_benchmark);
criterion_main!(benches);
