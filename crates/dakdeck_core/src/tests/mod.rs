//! Tests for deck compilation and study runs
//!
//! Tests are organized by topic:
//! - `variables` - Variable construction, type checks and bound updates
//! - `derivatives` - Gradient and Hessian directives
//! - `methods` - Sampling and optimizer blocks, refinement rules
//! - `deck` - Registry invariants and the rendered deck text
//! - `study` - Solver runs, restart chaining and the options file
//! - `reader` - Statistics sections of the solver report

mod deck;
mod study;
