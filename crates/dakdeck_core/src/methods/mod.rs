//! Analysis methods
//!
//! A deck runs exactly one method: a sampling study or an optimizer. The
//! method block always starts with the shared header written by [`Method`];
//! each variant then appends its own lines below what its parent wrote.
//!
//! # Example
//!
//! ```ignore
//! use dakdeck_core::methods::{Method, Optimize, OptPp, SearchMethod};
//!
//! let uq = Method::monte_carlo(100, 42)?;
//! let opt: Method = Optimize::new(OptPp::q_newton().search_method(SearchMethod::TrustRegion)?)
//!     .max_iterations(50)?
//!     .into();
//! ```

mod jega;
mod optimize;
mod optpp;
mod sampling;

use std::fmt;

pub use jega::{
    ConvergenceType, CrossoverType, FitnessType, GeneticAlgorithm, InitializationType, Jega,
    Moga, MutationType, ReplacementType, Soga,
};
pub use optimize::{Cobyla, NcsuDirect, NlpqlSqp, Optimize, Optimizer};
pub use optpp::{MeritFunction, OptPp, OptPpKind, SearchMethod};
pub use sampling::{SampleType, Sampling};

use crate::error::{DeckError, Result};
use crate::format;

/// The analysis strategy of a deck
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    Sampling(Sampling),
    Optimize(Optimize),
}

impl Method {
    /// Random sampling with `samples` evaluations
    pub fn monte_carlo(samples: u32, seed: u64) -> Result<Self> {
        Sampling::monte_carlo(samples, seed).map(Method::Sampling)
    }

    /// Latin hypercube sampling with `samples` evaluations
    pub fn latin_hypercube(samples: u32, seed: u64) -> Result<Self> {
        Sampling::latin_hypercube(samples, seed).map(Method::Sampling)
    }

    pub fn id_method(&self) -> &str {
        match self {
            Method::Sampling(s) => &s.id_method,
            Method::Optimize(o) => &o.id_method,
        }
    }

    /// Replaces the display label written as `id_method`
    pub fn set_id_method(&mut self, id: impl Into<String>) -> Result<()> {
        let id = validate_id(id.into())?;
        match self {
            Method::Sampling(s) => s.id_method = id,
            Method::Optimize(o) => o.id_method = id,
        }
        Ok(())
    }

    /// Sample counts of refinement batches, in the order they were added
    pub fn refinements(&self) -> &[u32] {
        match self {
            Method::Sampling(s) => s.refinements(),
            Method::Optimize(_) => &[],
        }
    }

    /// Appends a refinement batch and returns its sample count.
    ///
    /// Only sampling methods can be refined.
    pub fn add_refinement(&mut self, samples: Option<u32>) -> Result<u32> {
        match self {
            Method::Sampling(s) => s.add_refinement(samples),
            Method::Optimize(_) => Err(DeckError::prerequisite(
                "refinement_samples",
                "a sampling method",
            )),
        }
    }

    pub fn requires_gradients(&self) -> bool {
        match self {
            Method::Sampling(_) => false,
            Method::Optimize(o) => o.optimizer.requires_gradients(),
        }
    }

    pub fn requires_hessians(&self) -> bool {
        match self {
            Method::Sampling(_) => false,
            Method::Optimize(o) => o.optimizer.requires_hessians(),
        }
    }

    /// Optimizers act on design variables; sampling studies ignore them
    pub fn uses_design_variables(&self) -> bool {
        matches!(self, Method::Optimize(_))
    }

    pub fn as_sampling(&self) -> Option<&Sampling> {
        match self {
            Method::Sampling(s) => Some(s),
            Method::Optimize(_) => None,
        }
    }

    pub fn as_optimize(&self) -> Option<&Optimize> {
        match self {
            Method::Optimize(o) => Some(o),
            Method::Sampling(_) => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method\n\tid_method = \"{}\"", self.id_method())?;
        match self {
            Method::Sampling(s) => s.write_lines(f),
            Method::Optimize(o) => o.write_lines(f),
        }
    }
}

impl From<Sampling> for Method {
    fn from(s: Sampling) -> Self {
        Method::Sampling(s)
    }
}

impl From<Optimize> for Method {
    fn from(o: Optimize) -> Self {
        Method::Optimize(o)
    }
}

fn validate_id(id: String) -> Result<String> {
    if id.is_empty() || id.contains('"') {
        return Err(DeckError::InvalidKey {
            key: id,
            reason: "id_method must be non-empty and must not contain '\"'".to_string(),
        });
    }
    Ok(id)
}

/// `\n\t\t<key> = <value>`
pub(crate) fn write_param(
    f: &mut fmt::Formatter<'_>,
    key: &str,
    value: impl fmt::Display,
) -> fmt::Result {
    write!(f, "\n\t\t{key} = {value}")
}

pub(crate) fn write_opt<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    key: &str,
    value: Option<T>,
) -> fmt::Result {
    match value {
        Some(value) => write_param(f, key, value),
        None => Ok(()),
    }
}

pub(crate) fn write_opt_float(
    f: &mut fmt::Formatter<'_>,
    key: &str,
    value: Option<f64>,
) -> fmt::Result {
    write_opt(f, key, value.map(format::float))
}
