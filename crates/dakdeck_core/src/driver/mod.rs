//! Analysis drivers
//!
//! The solver runs `driver.sh params.in results.out` once per evaluation.
//! The script hands the two files to `dakdeck drive`, which reads the study
//! options written next to the deck, looks the configured driver up in a
//! [`DriverRegistry`] and runs it:
//!
//! 1. `write_inputs` prepares whatever the analysis needs,
//! 2. `run_analysis` executes it,
//! 3. `get_results` collects the response values, which are written back
//!    in the order the parameters file lists the functions.

mod command;
mod params;
mod script;

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub use command::CommandDriver;
pub use params::{Asv, ParamsFile, ResultsFile};
pub use script::{DEFAULT_PYTHON_PATH, driver_script};

/// Free-form driver settings carried in the study options file
pub type DriverOptions = serde_json::Map<String, serde_json::Value>;

/// Names the driver to construct for each evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverDescriptor {
    /// Registry identifier
    pub class: String,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub path: String,
}

impl DriverDescriptor {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            module: String::new(),
            path: String::new(),
        }
    }
}

/// What one evaluation produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverResults {
    pub failed: bool,
    pub functions: FxHashMap<String, f64>,
    pub gradients: FxHashMap<String, Vec<f64>>,
    pub hessians: FxHashMap<String, Vec<Vec<f64>>>,
}

impl DriverResults {
    pub fn failure() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parameters file line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unknown driver {name:?} (registered: {available:?})")]
    UnknownDriver { name: String, available: Vec<String> },

    #[error("driver option {0:?} is missing or has the wrong type")]
    MissingOption(String),

    #[error("no result for {0}")]
    MissingResult(String),

    #[error("analysis command {command:?} failed with status {status:?}")]
    CommandFailed { command: String, status: Option<i32> },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One evaluation of the user's analysis
pub trait Driver {
    fn eval_id(&self) -> u32;

    /// Write inputs and do any setup before execution
    fn write_inputs(&mut self) -> Result<(), DriverError>;

    fn run_analysis(&mut self) -> Result<(), DriverError>;

    fn get_results(&mut self) -> Result<DriverResults, DriverError>;
}

/// Builds a driver for one evaluation
pub type DriverConstructor =
    fn(u32, ParamsFile, &DriverOptions) -> Result<Box<dyn Driver>, DriverError>;

/// Explicit table of driver constructors keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct DriverRegistry {
    constructors: FxHashMap<String, DriverConstructor>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the drivers shipped with dakdeck
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(CommandDriver::NAME, CommandDriver::construct);
        registry
    }

    /// Adds or replaces a constructor
    pub fn register(&mut self, name: impl Into<String>, constructor: DriverConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Sorted identifiers, for error messages and `--help` output
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn build(
        &self,
        descriptor: &DriverDescriptor,
        params: ParamsFile,
        options: &DriverOptions,
    ) -> Result<Box<dyn Driver>, DriverError> {
        let constructor =
            self.constructors
                .get(&descriptor.class)
                .ok_or_else(|| DriverError::UnknownDriver {
                    name: descriptor.class.clone(),
                    available: self.names(),
                })?;
        constructor(params.eval_id, params, options)
    }

    /// Runs one complete evaluation and writes the results file.
    ///
    /// A driver that reports failure produces a `FAIL` results file so the
    /// solver can continue; errors raised by the driver itself propagate.
    pub fn evaluate(
        &self,
        descriptor: &DriverDescriptor,
        options: &DriverOptions,
        params_path: &Path,
        results_path: &Path,
    ) -> Result<DriverResults, DriverError> {
        let params = ParamsFile::read(params_path)?;
        let layout = params.clone();
        let mut driver = self.build(descriptor, params, options)?;
        let eval_id = driver.eval_id();
        tracing::info!(eval_id, driver = %descriptor.class, "starting evaluation");

        driver.write_inputs()?;
        driver.run_analysis()?;
        let results = driver.get_results()?;
        if results.failed {
            tracing::warn!(eval_id, "evaluation reported failure");
        }

        ResultsFile::from_results(&layout, &results)?.write(results_path)?;
        tracing::info!(eval_id, results = %results_path.display(), "evaluation finished");
        Ok(results)
    }
}
