use anyhow::Result;
use qpbridge_api::{CscMatrix, ProblemBuilder, Settings, Workspace};

fn main() -> Result<()> {
    // min ½xᵀPx + qᵀx  s.t.  x₁ + x₂ = 1, 0 ≤ x ≤ 0.7
    let p = CscMatrix::from_triplets(2, 2, &[(0, 0, 4.0), (0, 1, 1.0), (1, 1, 2.0)])?;
    let a = CscMatrix::from_triplets(3, 2, &[(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (2, 1, 1.0)])?;
    let problem = ProblemBuilder::new()
        .p(p)
        .q(vec![1.0, 1.0])
        .a(a, vec![1.0, 0.0, 0.0], vec![1.0, 0.7, 0.7])
        .build()?;

    let mut workspace = Workspace::from_problem(&problem, Settings::default())?;
    workspace.solve()?;
    report("initial", &workspace)?;

    workspace.update_linear_cost(&[2.0, 3.0])?;
    workspace.solve()?;
    report("updated q", &workspace)?;

    workspace.update_bounds(&[1.0, 0.0, 0.0], &[1.0, 0.6, 0.6])?;
    workspace.solve()?;
    report("tightened bounds", &workspace)?;

    workspace.cleanup();
    Ok(())
}

fn report(label: &str, workspace: &Workspace) -> Result<()> {
    let view = workspace.solution()?;
    println!("[{label}] status: {}", view.status());
    println!("[{label}] x: {:?}", view.primal()?);
    println!("[{label}] objective: {:.6}", view.objective_value());
    println!("[{label}] iterations: {}", view.iterations());
    Ok(())
}
