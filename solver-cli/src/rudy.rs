//! Rudy graph format reader.
//!
//! A header line `n m` followed by `m` lines `i j w` with 1-based vertex
//! indices. Whitespace between tokens is free-form.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Weighted graph as read from a rudy file.
#[derive(Debug, Clone)]
pub struct RudyGraph {
    /// Number of vertices.
    pub num_vertices: usize,

    /// Edges with 0-based endpoints.
    pub edges: Vec<(usize, usize, f64)>,
}

/// Read a rudy file.
pub fn read_rudy<P: AsRef<Path>>(path: P) -> Result<RudyGraph> {
    let text = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to open graph file: {:?}", path.as_ref()))?;
    parse_rudy(&text).with_context(|| format!("Failed to parse graph file: {:?}", path.as_ref()))
}

/// Parse rudy text.
pub fn parse_rudy(text: &str) -> Result<RudyGraph> {
    let mut tokens = text.split_whitespace();
    let mut next = |what: &'static str| {
        tokens
            .next()
            .with_context(|| format!("Unexpected end of file while reading {}", what))
    };

    let num_vertices: i64 = next("number of vertices")?
        .parse()
        .context("Problem reading number of vertices and edges")?;
    let num_edges: i64 = next("number of edges")?
        .parse()
        .context("Problem reading number of vertices and edges")?;
    if num_vertices <= 0 {
        bail!("Number of vertices has to be positive");
    }
    if num_edges < 0 {
        bail!("Number of edges must not be negative");
    }
    let n = num_vertices as usize;

    let mut edges = Vec::with_capacity(num_edges as usize);
    for edge in 1..=num_edges {
        let i: i64 = next("edge")?
            .parse()
            .with_context(|| format!("Problem reading edge {}", edge))?;
        let j: i64 = next("edge")?
            .parse()
            .with_context(|| format!("Problem reading edge {}", edge))?;
        let w: f64 = next("edge weight")?
            .parse()
            .with_context(|| format!("Problem reading weight of edge {}", edge))?;

        if !(1..=num_vertices).contains(&i) || !(1..=num_vertices).contains(&j) {
            bail!("Problem with edge {} ({} {}): vertex not in range 1..={}", edge, i, j, n);
        }
        edges.push((i as usize - 1, j as usize - 1, w));
    }

    Ok(RudyGraph {
        num_vertices: n,
        edges,
    })
}
