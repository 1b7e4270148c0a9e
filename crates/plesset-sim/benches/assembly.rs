use criterion::{criterion_group, criterion_main, Criterion};

use plesset_bie::quadrature::{GAUSS_7, TRI_7};
use plesset_bie::Integrator;
use plesset_mesh::icosphere::icosphere;
use plesset_sim::{Discretization, LinearCollocation, LinearGalerkin};

fn bench_assembly(c: &mut Criterion) {
    let mesh = icosphere(2);
    let mut integrator = Integrator::new();
    integrator.set_tri_rule(&TRI_7);
    integrator.set_line_rule(&GAUSS_7);

    let mut group = c.benchmark_group("assembly");
    group.sample_size(10);

    group.bench_function("collocation_320", |b| {
        let scheme = LinearCollocation::default();
        b.iter(|| scheme.assemble(&mesh, &integrator, 4));
    });

    group.bench_function("collocation_mirror_320", |b| {
        let scheme = LinearCollocation {
            mirror: true,
            cubic: false,
        };
        b.iter(|| scheme.assemble(&mesh, &integrator, 4));
    });

    let coarse = icosphere(1);
    group.bench_function("galerkin_80", |b| {
        let scheme = LinearGalerkin;
        b.iter(|| scheme.assemble(&coarse, &integrator, 4));
    });

    group.finish();
}

criterion_group!(benches, bench_assembly);
criterion_main!(benches);
