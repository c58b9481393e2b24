//! Command-line front end: `maxcut <instance> <params>`.

mod report;
mod rudy;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use solver_maxcut::{MaxCutSolver, Problem, Settings, SolveStatus};

/// Exact Max-Cut by branch-and-bound with SDP bounds.
#[derive(Parser, Debug)]
#[command(name = "maxcut", version, about)]
struct Args {
    /// Graph in rudy format (`n m` header, then `i j w` per edge, 1-based)
    #[arg(value_name = "INSTANCE")]
    instance: PathBuf,

    /// Parameter file of `name = value` lines
    #[arg(value_name = "PARAMS")]
    params: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Write `text` to stdout and to the output file.
fn emit(out: &mut impl Write, text: &str) -> Result<()> {
    print!("{}", text);
    out.write_all(text.as_bytes())
        .context("Failed to write output file")
}

fn run(args: &Args) -> Result<()> {
    let params = fs::read_to_string(&args.params)
        .with_context(|| format!("Failed to open parameter file: {:?}", args.params))?;
    let settings = Settings::parse_params(&params)
        .with_context(|| format!("Failed to read parameters from {:?}", args.params))?;

    let graph = rudy::read_rudy(&args.instance)?;
    let problem = Problem::from_edges(graph.num_vertices, &graph.edges)?;

    let out_path = report::output_path(&args.instance);
    let file = File::create(&out_path)
        .with_context(|| format!("Cannot create output file: {:?}", out_path))?;
    let mut out = BufWriter::new(file);
    log::info!("Writing results to {:?}", out_path);

    emit(&mut out, &report::format_header(&settings, &args.instance, &graph))?;

    let mut solver = MaxCutSolver::new(problem, settings)?;
    let outcome = solver.solve();

    let result = match outcome {
        Ok(sol) => emit(&mut out, &report::format_final(&sol)),
        Err(e) => {
            // Keep the best cut found before the failure
            let partial = solver.finalize(SolveStatus::Interrupted);
            emit(&mut out, &report::format_final(&partial))?;
            Err(anyhow::Error::new(e).context("Search aborted"))
        }
    };

    out.flush().context("Failed to write output file")?;
    result
}
