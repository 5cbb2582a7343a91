//! Study files
//!
//! A study file is the human-edited YAML description of one study:
//! response names, variables, method, optional derivative settings and the
//! run options. Keyword-valued settings are plain strings here and are
//! validated when the file is converted into core types.

pub mod convert;
pub mod study_data;

pub use convert::{to_deck, to_study};
pub use study_data::{
    DerivativeData, GeneticData, MethodData, OptimizerData, RunData, StudyData, VariableData,
};
