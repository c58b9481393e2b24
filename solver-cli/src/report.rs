//! Output file and final report.

use std::path::{Path, PathBuf};

use solver_maxcut::{MaxCutSolution, Settings, SolveStatus};

use crate::rudy::RudyGraph;

/// First free path among `<instance>.output`, `<instance>.output_1`, ...
pub fn output_path(instance: &Path) -> PathBuf {
    let base = instance.as_os_str().to_string_lossy().into_owned();
    let mut path = PathBuf::from(format!("{}.output", base));
    let mut counter = 1;
    while path.exists() {
        path = PathBuf::from(format!("{}.output_{}", base, counter));
        counter += 1;
    }
    path
}

/// Parameter echo and instance summary.
pub fn format_header(settings: &Settings, instance: &Path, graph: &RudyGraph) -> String {
    format!(
        "Max-Cut parameters:\n{}\nInput file: {}\n\nGraph has {} vertices and {} edges.\n",
        settings,
        instance.display(),
        graph.num_vertices,
        graph.edges.len()
    )
}

/// Final report in the layout of the output file.
pub fn format_final(sol: &MaxCutSolution) -> String {
    let mut out = format!("\nNodes = {}\n", sol.nodes_evaluated);

    match sol.status {
        SolveStatus::TimeLimit => out.push_str("TIME LIMIT REACHED.\n"),
        SolveStatus::Interrupted => out.push_str("SEARCH INTERRUPTED.\n"),
        SolveStatus::Optimal | SolveStatus::RootOnly => {}
    }

    match sol.root_bound {
        Some(bound) => out.push_str(&format!("Root node bound = {:.3}\n", bound)),
        None => out.push_str("Root node bound = not evaluated\n"),
    }

    let label = if sol.stopped() { "Best value" } else { "Maximum value" };
    out.push_str(&format!("{} = {:.0}\n", label, sol.best_value));

    let vertices: Vec<String> = sol.cut_vertices().iter().map(|v| v.to_string()).collect();
    if vertices.is_empty() {
        out.push_str("Solution = ( )\n");
    } else {
        out.push_str(&format!("Solution = ( {} )\n", vertices.join(" ")));
    }

    out.push_str(&format!(
        "Wall clock time = {:.2} s\n",
        sol.solve_time.as_secs_f64()
    ));
    out
}
