//! # Gait Tick Benchmark
//!
//! One gait tick must fit comfortably inside the motor period.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use player_lib::walk_ctrl::{
    ik::{solve_leg, LegGeometry, LegJointAngles, LegSide},
    traj::{synthesize, walk},
    GaitParams,
};

fn walk_benchmark(c: &mut Criterion) {
    // Full walking gains, forward with a turn
    let params = GaitParams {
        enabled_gain: 1.0,
        step_gain_m: 0.03,
        lateral_gain_m: 0.01,
        turn_gain_rad: 0.1,
        ..Default::default()
    };
    let dt_s = 0.01;

    c.bench_function("traj::synthesize", |b| {
        b.iter(|| synthesize(black_box(&params), black_box(0.3)))
    });

    let poses = synthesize(&params, 0.3);
    let geom = LegGeometry::from(&params);
    c.bench_function("ik::solve_leg", |b| {
        b.iter(|| {
            solve_leg(
                black_box(&geom),
                &poses.trunk,
                &poses.left_foot,
                LegSide::Left,
            )
            .unwrap()
        })
    });

    let mut phase = 0.0;
    let mut angles = LegJointAngles::default();
    c.bench_function("traj::walk", |b| {
        b.iter(|| walk(black_box(&params), dt_s, &mut phase, &mut angles).unwrap())
    });
}

criterion_group!(benches, walk_benchmark);
criterion_main!(benches);
