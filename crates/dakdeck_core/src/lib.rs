//! Dakota input deck compiler
//!
//! This crate builds the text configuration ("deck") read by the Dakota
//! optimization and uncertainty-quantification solver, runs the solver and
//! reads its statistics back. It supports:
//! - State, normal-uncertain, uniform-uncertain and design variables
//! - Monte Carlo and Latin hypercube sampling with incremental refinement
//! - DIRECT, genetic (SOGA/MOGA), OPT++, NLPQL and COBYLA optimizers
//! - Gradient and Hessian directives, checked against the method's needs
//! - Study runs with restart files, and pluggable analysis drivers
//!
//! # Example
//!
//! ```ignore
//! use dakdeck_core::{Deck, Method, NormalUncertainVariable, UniformUncertainVariable};
//!
//! let mut deck = Deck::new(Method::latin_hypercube(100, 42)?, "f")?;
//! deck.add_variable(NormalUncertainVariable::new("nuv", 1.0, 0.05)?)?;
//! deck.add_variable(UniformUncertainVariable::new("u", -3.33, 0.33)?)?;
//! let text = deck.get_deck(None, true, Some(4))?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Deck compilation
// ============================================================================

pub mod deck;
pub mod derivatives;
pub mod error;
pub mod format;
pub mod methods;
pub mod validate;
pub mod variables;

// ============================================================================
// Running the solver
// ============================================================================

pub mod driver;
pub mod io;
pub mod names;
pub mod reader;
pub mod study;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use deck::{Deck, FunctionNames, VariableMut};
pub use derivatives::{Gradients, Hessians};
pub use error::{DeckError, Result};
pub use methods::{Method, Optimize, Optimizer, Sampling};
pub use study::{Study, StudyError, StudyOptions};
pub use variables::{
    DataType, DesignVariable, NormalUncertainVariable, StateVariable, UniformUncertainVariable,
    Value, Variable, VariableKind,
};
