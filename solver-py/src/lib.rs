//! Python bindings for the Max-Cut solver.
//!
//! Exposes `solve(adjacency, params)` over a numpy adjacency matrix. Parameter
//! names are the ones accepted in parameter files.

use nalgebra::DMatrix;
use numpy::{PyArray1, PyReadonlyArray2};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use solver_maxcut::{solve_maxcut, MaxCutError, MaxCutSolution, Problem, Settings, SolveStatus};

/// Render `name = value` pairs as parameter-file text and parse them.
///
/// Goes through the same parser as parameter files, so names, defaults and
/// validation match the command-line tool.
pub fn settings_from_pairs(pairs: &[(String, String)]) -> Result<Settings, MaxCutError> {
    let text: String = pairs
        .iter()
        .map(|(name, value)| format!("{} = {}\n", name, value))
        .collect();
    Settings::parse_params(&text)
}

/// Lowercase status name reported to Python.
pub fn status_name(status: SolveStatus) -> &'static str {
    match status {
        SolveStatus::Optimal => "optimal",
        SolveStatus::RootOnly => "root_only",
        SolveStatus::TimeLimit => "time_limit",
        SolveStatus::Interrupted => "interrupted",
    }
}

fn value_error(e: MaxCutError) -> PyErr {
    PyErr::new::<PyValueError, _>(e.to_string())
}

/// Result returned from the solve function.
#[pyclass]
#[derive(Clone)]
pub struct MaxCutResult {
    #[pyo3(get)]
    status: String,
    #[pyo3(get)]
    best_value: f64,
    #[pyo3(get)]
    root_bound: Option<f64>,
    #[pyo3(get)]
    nodes: u64,
    #[pyo3(get)]
    solve_time_ms: u64,

    sides: Vec<u8>,
    vertices: Vec<usize>,
}

#[pymethods]
impl MaxCutResult {
    /// 0/1 side of every vertex.
    fn x<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<u8>> {
        PyArray1::from_slice_bound(py, &self.sides)
    }

    /// 1-based vertices on side 1.
    fn cut_vertices(&self) -> Vec<usize> {
        self.vertices.clone()
    }

    fn __repr__(&self) -> String {
        format!(
            "MaxCutResult(status='{}', best_value={:.0}, nodes={}, time={}ms)",
            self.status, self.best_value, self.nodes, self.solve_time_ms
        )
    }
}

impl From<MaxCutSolution> for MaxCutResult {
    fn from(sol: MaxCutSolution) -> Self {
        MaxCutResult {
            status: status_name(sol.status).to_string(),
            best_value: sol.best_value,
            root_bound: sol.root_bound,
            nodes: sol.nodes_evaluated,
            solve_time_ms: sol.solve_time.as_millis() as u64,
            vertices: sol.cut_vertices(),
            sides: sol.x,
        }
    }
}

/// Solve Max-Cut on a symmetric weighted adjacency matrix.
///
/// # Arguments
///
/// * `adjacency` - n x n float array; the diagonal is ignored
/// * `params` - dict of parameter-file names to values (optional)
#[pyfunction]
#[pyo3(signature = (adjacency, params = None))]
fn solve(
    adjacency: PyReadonlyArray2<'_, f64>,
    params: Option<&Bound<'_, PyDict>>,
) -> PyResult<MaxCutResult> {
    let view = adjacency.as_array();
    let (rows, cols) = view.dim();
    let adj = DMatrix::from_fn(rows, cols, |i, j| view[[i, j]]);
    let problem = Problem::from_adjacency(&adj).map_err(value_error)?;

    let mut pairs = Vec::new();
    if let Some(dict) = params {
        for (key, value) in dict.iter() {
            let name: String = key.extract()?;
            let value = match value.extract::<i64>() {
                Ok(v) => v.to_string(),
                Err(_) => value.extract::<f64>()?.to_string(),
            };
            pairs.push((name, value));
        }
    }
    let settings = settings_from_pairs(&pairs).map_err(value_error)?;

    let sol = solve_maxcut(&problem, &settings)
        .map_err(|e| PyErr::new::<PyRuntimeError, _>(format!("Solver error: {}", e)))?;
    Ok(MaxCutResult::from(sol))
}

/// Get version information.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get default parameters as a dict.
#[pyfunction]
fn default_parameters(py: Python<'_>) -> PyResult<Bound<'_, PyDict>> {
    let settings = Settings::default();
    let dict = PyDict::new_bound(py);
    dict.set_item("init_bundle_iter", settings.init_bundle_iter)?;
    dict.set_item("max_bundle_iter", settings.max_bundle_iter)?;
    dict.set_item("min_outer_iter", settings.min_outer_iter)?;
    dict.set_item("max_outer_iter", settings.max_outer_iter)?;
    dict.set_item("violated_Ineq", settings.violated_ineq)?;
    dict.set_item("TriIneq", settings.tri_ineq)?;
    dict.set_item("Pent_Trials", settings.pent_trials)?;
    dict.set_item("Hepta_Trials", settings.hepta_trials)?;
    dict.set_item("include_Pent", settings.include_pent as i64)?;
    dict.set_item("include_Hepta", settings.include_hepta as i64)?;
    dict.set_item("root", settings.root_only as i64)?;
    dict.set_item("use_diff", settings.use_diff as i64)?;
    dict.set_item(
        "time_limit",
        settings.time_limit.map(|d| d.as_secs()).unwrap_or(0),
    )?;
    dict.set_item("branchingStrategy", settings.branching_rule.code())?;
    dict.set_item("detailedOutput", settings.detailed_output as i64)?;
    Ok(dict)
}

/// Python module definition.
#[pymodule]
fn _native(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(solve, m)?)?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(default_parameters, m)?)?;
    m.add_class::<MaxCutResult>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solver_maxcut::BranchingRule;

    fn pair(name: &str, value: &str) -> (String, String) {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn test_settings_from_pairs() {
        let s = settings_from_pairs(&[
            pair("branchingStrategy", "0"),
            pair("violated_Ineq", "0.1"),
            pair("detailedOutput", "0"),
        ])
        .unwrap();
        assert_eq!(s.branching_rule, BranchingRule::LeastFractional);
        assert_eq!(s.violated_ineq, 0.1);
        assert!(!s.detailed_output);

        assert!(settings_from_pairs(&[]).is_ok());
        assert!(settings_from_pairs(&[pair("branchingStrategy", "4")]).is_err());
    }

    #[test]
    fn test_status_names() {
        assert_eq!(status_name(SolveStatus::Optimal), "optimal");
        assert_eq!(status_name(SolveStatus::TimeLimit), "time_limit");
    }
}
