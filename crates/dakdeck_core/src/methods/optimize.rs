use std::fmt;

use super::jega::{Moga, Soga};
use super::optpp::OptPp;
use super::{write_opt, write_opt_float};
use crate::error::Result;
use crate::validate::{Interval, positive_count};

/// Optimization study: shared stopping criteria plus one algorithm
#[derive(Debug, Clone, PartialEq)]
pub struct Optimize {
    pub(super) id_method: String,
    max_iterations: Option<u32>,
    max_function_evaluations: Option<u32>,
    convergence_tolerance: Option<f64>,
    pub(super) optimizer: Optimizer,
}

impl Optimize {
    pub const DEFAULT_ID: &'static str = "OPT";

    #[must_use]
    pub fn new(optimizer: impl Into<Optimizer>) -> Self {
        Self {
            id_method: Self::DEFAULT_ID.to_string(),
            max_iterations: None,
            max_function_evaluations: None,
            convergence_tolerance: None,
            optimizer: optimizer.into(),
        }
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    pub fn max_iterations_limit(&self) -> Option<u32> {
        self.max_iterations
    }

    pub fn max_function_evaluations_limit(&self) -> Option<u32> {
        self.max_function_evaluations
    }

    pub fn max_iterations(mut self, n: u32) -> Result<Self> {
        let n = positive_count("max_iterations", n)?;
        if let Some(evaluations) = self.max_function_evaluations {
            check_evaluations_exceed(evaluations, n)?;
        }
        self.max_iterations = Some(n);
        Ok(self)
    }

    /// Must exceed `max_iterations` when both are given
    pub fn max_function_evaluations(mut self, n: u32) -> Result<Self> {
        let n = positive_count("max_function_evaluations", n)?;
        if let Some(iterations) = self.max_iterations {
            check_evaluations_exceed(n, iterations)?;
        }
        self.max_function_evaluations = Some(n);
        Ok(self)
    }

    pub fn convergence_tolerance(mut self, tolerance: f64) -> Result<Self> {
        self.convergence_tolerance =
            Some(Interval::POSITIVE.check("convergence_tolerance", tolerance)?);
        Ok(self)
    }

    pub(super) fn write_lines(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n\t{}", self.optimizer.keyword())?;
        write_opt(f, "max_iterations", self.max_iterations)?;
        write_opt(f, "max_function_evaluations", self.max_function_evaluations)?;
        write_opt_float(f, "convergence_tolerance", self.convergence_tolerance)?;
        self.optimizer.write_lines(f)
    }
}

fn check_evaluations_exceed(evaluations: u32, iterations: u32) -> Result<()> {
    Interval::above(f64::from(iterations)).check_count("max_function_evaluations", evaluations)?;
    Ok(())
}

/// Optimization algorithm
#[derive(Debug, Clone, PartialEq)]
pub enum Optimizer {
    NcsuDirect(NcsuDirect),
    Soga(Soga),
    Moga(Moga),
    OptPp(OptPp),
    NlpqlSqp(NlpqlSqp),
    Cobyla(Cobyla),
}

impl Optimizer {
    /// Method keyword written below `id_method`
    pub fn keyword(&self) -> &'static str {
        match self {
            Optimizer::NcsuDirect(_) => "ncsu_direct",
            Optimizer::Soga(_) => "soga",
            Optimizer::Moga(_) => "moga",
            Optimizer::OptPp(o) => o.kind().keyword(),
            Optimizer::NlpqlSqp(_) => "nlpql_sqp",
            Optimizer::Cobyla(_) => "coliny_cobyla",
        }
    }

    pub fn requires_gradients(&self) -> bool {
        match self {
            Optimizer::OptPp(o) => o.kind().requires_gradients(),
            Optimizer::NlpqlSqp(_) => true,
            _ => false,
        }
    }

    pub fn requires_hessians(&self) -> bool {
        match self {
            Optimizer::OptPp(o) => o.kind().requires_hessians(),
            _ => false,
        }
    }

    fn write_lines(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Optimizer::NcsuDirect(o) => o.write_lines(f),
            Optimizer::Soga(o) => o.write_lines(f),
            Optimizer::Moga(o) => o.write_lines(f),
            Optimizer::OptPp(o) => o.write_lines(f),
            Optimizer::NlpqlSqp(o) => o.write_lines(f),
            Optimizer::Cobyla(o) => o.write_lines(f),
        }
    }
}

macro_rules! optimizer_from {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        $(
            impl From<$ty> for Optimizer {
                fn from(o: $ty) -> Self {
                    Optimizer::$variant(o)
                }
            }
        )+
    };
}

optimizer_from! {
    NcsuDirect(NcsuDirect),
    Soga(Soga),
    Moga(Moga),
    OptPp(OptPp),
    NlpqlSqp(NlpqlSqp),
    Cobyla(Cobyla),
}

/// DIviding RECTangles global search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NcsuDirect {
    solution_target: Option<f64>,
    min_boxsize_limit: Option<f64>,
    volume_boxsize_limit: Option<f64>,
}

impl NcsuDirect {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops once an objective value this good is found
    pub fn solution_target(mut self, target: f64) -> Result<Self> {
        self.solution_target = Some(Interval::ANY.check("solution_target", target)?);
        Ok(self)
    }

    pub fn min_boxsize_limit(mut self, limit: f64) -> Result<Self> {
        self.min_boxsize_limit = Some(Interval::UNIT_LEFT_OPEN.check("min_boxsize_limit", limit)?);
        Ok(self)
    }

    pub fn volume_boxsize_limit(mut self, limit: f64) -> Result<Self> {
        self.volume_boxsize_limit =
            Some(Interval::UNIT_LEFT_OPEN.check("volume_boxsize_limit", limit)?);
        Ok(self)
    }

    fn write_lines(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_opt_float(f, "solution_target", self.solution_target)?;
        write_opt_float(f, "min_boxsize_limit", self.min_boxsize_limit)?;
        write_opt_float(f, "volume_boxsize_limit", self.volume_boxsize_limit)
    }
}

/// Sequential quadratic programming
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NlpqlSqp {
    constraint_tolerance: Option<f64>,
}

impl NlpqlSqp {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constraint_tolerance(mut self, tolerance: f64) -> Result<Self> {
        self.constraint_tolerance =
            Some(Interval::POSITIVE.check("constraint_tolerance", tolerance)?);
        Ok(self)
    }

    fn write_lines(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_opt_float(f, "constraint_tolerance", self.constraint_tolerance)
    }
}

/// Constrained optimization by linear approximation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cobyla {
    initial_delta: Option<f64>,
}

impl Cobyla {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial trust region radius
    pub fn initial_delta(mut self, delta: f64) -> Result<Self> {
        self.initial_delta = Some(Interval::POSITIVE.check("initial_delta", delta)?);
        Ok(self)
    }

    fn write_lines(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_opt_float(f, "initial_delta", self.initial_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeckError;

    #[test]
    fn test_evaluations_must_exceed_iterations_either_order() {
        let opt = Optimize::new(Cobyla::new()).max_iterations(10).unwrap();
        assert!(matches!(
            opt.clone().max_function_evaluations(10),
            Err(DeckError::OutOfRange { attribute: "max_function_evaluations", .. })
        ));
        assert!(opt.max_function_evaluations(11).is_ok());

        let opt = Optimize::new(Cobyla::new())
            .max_function_evaluations(5)
            .unwrap();
        assert!(opt.max_iterations(5).is_err());
    }

    #[test]
    fn test_capability_flags() {
        assert!(Optimizer::from(NlpqlSqp::new()).requires_gradients());
        assert!(!Optimizer::from(NlpqlSqp::new()).requires_hessians());
        assert!(!Optimizer::from(NcsuDirect::new()).requires_gradients());
        assert!(!Optimizer::from(Soga::new()).requires_gradients());
    }
}
