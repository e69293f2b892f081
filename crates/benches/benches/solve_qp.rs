use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use qpbridge_api::{CscMatrix, ProblemBuilder, ProblemData, Scalar, Settings, Workspace};
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn random_diagonal_cost(n: usize, rng: &mut SmallRng) -> CscMatrix<Scalar> {
    let diag = (0..n)
        .map(|_| 1.0 + rng.gen::<Scalar>() * 0.1)
        .collect::<Vec<_>>();
    CscMatrix::diagonal(&diag)
}

/// Dense random rows stacked on top of an identity block for variable bounds.
fn random_constraints(m: usize, n: usize, rng: &mut SmallRng) -> CscMatrix<Scalar> {
    let mut triplets = Vec::with_capacity(m * n + n);
    for col in 0..n {
        for row in 0..m {
            triplets.push((row, col, rng.gen::<Scalar>() * 0.5 - 0.25));
        }
        triplets.push((m + col, col, 1.0));
    }
    CscMatrix::from_triplets(m + n, n, &triplets).expect("triplets lie inside the matrix")
}

fn build_problem(n: usize, m: usize, rng: &mut SmallRng) -> ProblemData {
    let p = random_diagonal_cost(n, rng);
    let q = (0..n)
        .map(|_| rng.gen::<Scalar>() - 0.5)
        .collect::<Vec<_>>();
    let a = random_constraints(m, n, rng);
    let mut lower = vec![Scalar::NEG_INFINITY; m];
    let mut upper = (0..m)
        .map(|_| rng.gen::<Scalar>() + 0.5)
        .collect::<Vec<_>>();
    lower.extend(std::iter::repeat(-1.0).take(n));
    upper.extend(std::iter::repeat(1.0).take(n));
    ProblemBuilder::new()
        .p(p)
        .q(q)
        .a(a, lower, upper)
        .build()
        .expect("random problem is well formed")
}

fn setup_benchmark(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(7);
    let problem = build_problem(50, 75, &mut rng);
    c.bench_function("workspace_setup/n=50_m=75", |b| {
        b.iter(|| {
            let mut workspace = Workspace::new();
            workspace.setup(&problem).unwrap();
            workspace.cleanup();
        });
    });
}

fn solve_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("admm_qp_solve");
    let mut rng = SmallRng::seed_from_u64(42);
    group.bench_function("n=50_m=75", |b| {
        b.iter_batched(
            || build_problem(50, 75, &mut rng),
            |problem| {
                let mut workspace = Workspace::from_problem(&problem, Settings::default()).unwrap();
                workspace.solve().unwrap();
                let _ = workspace.objective_value().unwrap();
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn warm_update_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("admm_warm_update");
    let mut rng = SmallRng::seed_from_u64(11);
    let problem = build_problem(50, 75, &mut rng);
    group.bench_function("linear_cost/n=50_m=75", |b| {
        b.iter_batched(
            || {
                let mut workspace = Workspace::from_problem(&problem, Settings::default()).unwrap();
                workspace.solve().unwrap();
                let q = (0..problem.n)
                    .map(|_| rng.gen::<Scalar>() - 0.5)
                    .collect::<Vec<_>>();
                (workspace, q)
            },
            |(mut workspace, q)| {
                workspace.update_linear_cost(&q).unwrap();
                workspace.solve().unwrap();
                workspace
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, setup_benchmark, solve_benchmark, warm_update_benchmark);
criterion_main!(benches);
