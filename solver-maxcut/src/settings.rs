//! Configuration settings for the Max-Cut solver.

use std::fmt;
use std::time::Duration;

use crate::error::{MaxCutError, MaxCutResult};

/// Branching variable selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchingRule {
    /// Select the free variable whose fractional value is farthest from 0.5.
    LeastFractional,

    /// Select the free variable whose fractional value is closest to 0.5.
    #[default]
    MostFractional,
}

impl BranchingRule {
    /// Decode the numeric code used in parameter files.
    pub fn from_code(code: i64) -> MaxCutResult<Self> {
        match code {
            0 => Ok(BranchingRule::LeastFractional),
            1 => Ok(BranchingRule::MostFractional),
            other => Err(MaxCutError::InvalidBranchingStrategy(other)),
        }
    }

    /// Numeric code used in parameter files.
    pub fn code(&self) -> i64 {
        match self {
            BranchingRule::LeastFractional => 0,
            BranchingRule::MostFractional => 1,
        }
    }
}

/// Max-Cut solver settings.
#[derive(Debug, Clone)]
pub struct Settings {
    // === Bundle method ===
    /// Inner bundle iterations in the first outer pass.
    pub init_bundle_iter: usize,

    /// Cap on inner bundle iterations per outer pass.
    pub max_bundle_iter: usize,

    // === Refinement loop ===
    /// Outer passes before the projected-convergence rule may stop refinement.
    pub min_outer_iter: usize,

    /// Hard cap on outer passes per node.
    pub max_outer_iter: usize,

    // === Cutting planes ===
    /// Minimum violation for an inequality to be added.
    pub violated_ineq: f64,

    /// Maximum triangle inequalities added per separation round.
    pub tri_ineq: usize,

    /// Search trials for pentagonal inequalities per round.
    pub pent_trials: usize,

    /// Search trials for heptagonal inequalities per round.
    pub hepta_trials: usize,

    /// Separate pentagonal inequalities.
    pub include_pent: bool,

    /// Separate heptagonal inequalities.
    pub include_hepta: bool,

    // === Search ===
    /// Evaluate the root node only.
    pub root_only: bool,

    /// Skip refinement below the root when the plain bound is farther from
    /// the incumbent than the gap closed at the root.
    pub use_diff: bool,

    /// Wall-clock budget (None = unlimited).
    pub time_limit: Option<Duration>,

    /// Branching variable selection rule.
    pub branching_rule: BranchingRule,

    // === Capacities ===
    /// Maximum bundle size.
    pub max_bundle: usize,

    /// Maximum active inequalities per family.
    pub max_cuts_per_family: usize,

    /// Maximum open nodes.
    pub queue_capacity: usize,

    // === Output ===
    /// Log a diagnostic row per refinement pass.
    pub detailed_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Bundle
            init_bundle_iter: 3,
            max_bundle_iter: 10,

            // Refinement
            min_outer_iter: 10,
            max_outer_iter: 25,

            // Cuts
            violated_ineq: 5e-2,
            tri_ineq: 500,
            pent_trials: 60,
            hepta_trials: 45,
            include_pent: true,
            include_hepta: true,

            // Search
            root_only: false,
            use_diff: true,
            time_limit: None,
            branching_rule: BranchingRule::default(),

            // Capacities
            max_bundle: 400,
            max_cuts_per_family: 20_000,
            queue_capacity: 10_000_000,

            // Output
            detailed_output: true,
        }
    }
}

impl Settings {
    /// Create settings with diagnostic rows disabled.
    pub fn quiet() -> Self {
        Self {
            detailed_output: false,
            ..Self::default()
        }
    }

    /// Set time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(Duration::from_secs_f64(seconds.max(0.0)));
        self
    }

    /// Set the branching rule.
    pub fn with_branching_rule(mut self, rule: BranchingRule) -> Self {
        self.branching_rule = rule;
        self
    }

    /// Only evaluate the root node.
    pub fn with_root_only(mut self, root_only: bool) -> Self {
        self.root_only = root_only;
        self
    }

    /// Check that the settings are consistent.
    pub fn validate(&self) -> MaxCutResult<()> {
        let fail = |msg: String| Err(MaxCutError::InvalidSettings(msg));

        if self.init_bundle_iter == 0 {
            return fail("init_bundle_iter must be positive".into());
        }
        if self.max_bundle_iter < self.init_bundle_iter {
            return fail(format!(
                "max_bundle_iter ({}) is smaller than init_bundle_iter ({})",
                self.max_bundle_iter, self.init_bundle_iter
            ));
        }
        if self.max_outer_iter == 0 {
            return fail("max_outer_iter must be positive".into());
        }
        if self.min_outer_iter > self.max_outer_iter {
            return fail(format!(
                "min_outer_iter ({}) exceeds max_outer_iter ({})",
                self.min_outer_iter, self.max_outer_iter
            ));
        }
        if !(self.violated_ineq > 0.0) {
            return fail(format!("violated_Ineq must be positive, got {}", self.violated_ineq));
        }
        if self.max_bundle < 2 {
            return fail("max_bundle must be at least 2".into());
        }
        if self.queue_capacity == 0 || self.max_cuts_per_family == 0 {
            return fail("capacities must be positive".into());
        }
        Ok(())
    }

    /// Parse a parameter file of `name = value` lines.
    ///
    /// Missing parameters keep their defaults. Unknown names are logged and
    /// skipped; lines without `=` and `#` comments are ignored.
    pub fn parse_params(text: &str) -> MaxCutResult<Self> {
        let mut settings = Self::default();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                log::warn!("Skipping invalid parameter line {}: {}", idx + 1, raw.trim());
                continue;
            };
            settings.apply(name.trim(), value.trim(), idx + 1)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    fn apply(&mut self, name: &str, value: &str, line: usize) -> MaxCutResult<()> {
        let bad = |reason: &str| MaxCutError::InvalidParameter {
            name: name.to_string(),
            line,
            reason: reason.to_string(),
        };
        let int = || value.parse::<i64>().map_err(|_| bad("expected an integer"));
        let count = || {
            int().and_then(|v| usize::try_from(v).map_err(|_| bad("must not be negative")))
        };
        let flag = || int().map(|v| v != 0);

        match name {
            "init_bundle_iter" => self.init_bundle_iter = count()?,
            "max_bundle_iter" => self.max_bundle_iter = count()?,
            "min_outer_iter" => self.min_outer_iter = count()?,
            "max_outer_iter" => self.max_outer_iter = count()?,
            "violated_Ineq" | "violated_ineq" => {
                self.violated_ineq = value.parse().map_err(|_| bad("expected a number"))?
            }
            "TriIneq" | "tri_ineq" => self.tri_ineq = count()?,
            "Pent_Trials" | "pent_trials" => self.pent_trials = count()?,
            "Hepta_Trials" | "hepta_trials" => self.hepta_trials = count()?,
            "include_Pent" | "include_pent" => self.include_pent = flag()?,
            "include_Hepta" | "include_hepta" => self.include_hepta = flag()?,
            "root" | "root_only" => self.root_only = flag()?,
            "use_diff" => self.use_diff = flag()?,
            "time_limit" => {
                let seconds = count()?;
                self.time_limit = (seconds > 0).then(|| Duration::from_secs(seconds as u64));
            }
            "branchingStrategy" | "branching_strategy" => {
                self.branching_rule = BranchingRule::from_code(int()?)?
            }
            "detailedOutput" | "detailed_output" => self.detailed_output = flag()?,
            unknown => log::warn!("Unknown parameter: {}", unknown),
        }
        Ok(())
    }
}

impl fmt::Display for Settings {
    /// Echo the settings in parameter-file form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = |v: bool| v as u8;
        writeln!(f, "{:>20} = {}", "init_bundle_iter", self.init_bundle_iter)?;
        writeln!(f, "{:>20} = {}", "max_bundle_iter", self.max_bundle_iter)?;
        writeln!(f, "{:>20} = {}", "min_outer_iter", self.min_outer_iter)?;
        writeln!(f, "{:>20} = {}", "max_outer_iter", self.max_outer_iter)?;
        writeln!(f, "{:>20} = {}", "violated_Ineq", self.violated_ineq)?;
        writeln!(f, "{:>20} = {}", "TriIneq", self.tri_ineq)?;
        writeln!(f, "{:>20} = {}", "Pent_Trials", self.pent_trials)?;
        writeln!(f, "{:>20} = {}", "Hepta_Trials", self.hepta_trials)?;
        writeln!(f, "{:>20} = {}", "include_Pent", b(self.include_pent))?;
        writeln!(f, "{:>20} = {}", "include_Hepta", b(self.include_hepta))?;
        writeln!(f, "{:>20} = {}", "root", b(self.root_only))?;
        writeln!(f, "{:>20} = {}", "use_diff", b(self.use_diff))?;
        writeln!(
            f,
            "{:>20} = {}",
            "time_limit",
            self.time_limit.map(|d| d.as_secs()).unwrap_or(0)
        )?;
        writeln!(f, "{:>20} = {}", "branchingStrategy", self.branching_rule.code())?;
        write!(f, "{:>20} = {}", "detailedOutput", b(self.detailed_output))
    }
}
