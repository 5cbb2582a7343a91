use std::path::PathBuf;

use dakdeck_core::DataType;
use dakdeck_core::Value;
use dakdeck_core::driver::{DriverDescriptor, DriverOptions};
use serde::{Deserialize, Serialize};

/// Top-level study file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyData {
    /// Response names, in the order the analysis reports them
    pub functions: Vec<String>,

    #[serde(default)]
    pub variables: Vec<VariableData>,

    pub method: MethodData,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradients: Option<DerivativeData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hessians: Option<DerivativeData>,

    #[serde(default)]
    pub run: RunData,
}

impl StudyData {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    /// Save to YAML string
    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }
}

/// One variable; `type` selects the kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariableData {
    State {
        key: String,
        dtype: DataType,
        value: Value,
    },
    NormalUncertain {
        key: String,
        mean: f64,
        std_deviation: f64,
    },
    UniformUncertain {
        key: String,
        lower_bound: f64,
        upper_bound: f64,
    },
    Design {
        key: String,
        lower_bound: f64,
        upper_bound: f64,
        initial_point: f64,
    },
}

/// Solver method; `type` selects sampling or optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MethodData {
    Sampling {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id_method: Option<String>,
        /// `random` or `lhs` (aliases `monte_carlo`, `latin_hypercube`)
        sample_type: String,
        samples: u32,
        /// Drawn at random and logged when omitted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        refinement_samples: Vec<u32>,
    },
    Optimize {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id_method: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_iterations: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_function_evaluations: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        convergence_tolerance: Option<f64>,
        optimizer: OptimizerData,
    },
}

/// Optimizer settings; `type` is the solver keyword
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerData {
    NcsuDirect {
        #[serde(default)]
        solution_target: Option<f64>,
        #[serde(default)]
        min_boxsize_limit: Option<f64>,
        #[serde(default)]
        volume_boxsize_limit: Option<f64>,
    },
    Soga {
        #[serde(default)]
        genetic: GeneticData,
        #[serde(default)]
        fitness_type: Option<String>,
        #[serde(default)]
        replacement_type: Option<String>,
        #[serde(default)]
        convergence_type: Option<String>,
        #[serde(default)]
        percent_change: Option<f64>,
        #[serde(default)]
        num_generations: Option<u32>,
    },
    Moga {
        #[serde(default)]
        genetic: GeneticData,
        #[serde(default)]
        fitness_type: Option<String>,
        #[serde(default)]
        replacement_type: Option<String>,
        #[serde(default)]
        shrinkage_fraction: Option<f64>,
        #[serde(default)]
        convergence_type: Option<String>,
        #[serde(default)]
        percent_change: Option<f64>,
        #[serde(default)]
        num_generations: Option<u32>,
    },
    Optpp {
        /// `pds`, `cg`, `newton`, `q_newton` or `fd_newton`
        kind: String,
        #[serde(default)]
        search_scheme_size: Option<u32>,
        #[serde(default)]
        search_method: Option<String>,
        #[serde(default)]
        merit_function: Option<String>,
        #[serde(default)]
        steplength_to_boundary: Option<f64>,
        #[serde(default)]
        centering_parameter: Option<f64>,
        #[serde(default)]
        max_step: Option<f64>,
        #[serde(default)]
        gradient_tolerance: Option<f64>,
    },
    NlpqlSqp {
        #[serde(default)]
        constraint_tolerance: Option<f64>,
    },
    #[serde(rename = "coliny_cobyla")]
    Cobyla {
        #[serde(default)]
        initial_delta: Option<f64>,
    },
}

/// Settings shared by SOGA and MOGA
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneticData {
    #[serde(default)]
    pub population_size: Option<u32>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub initialization_type: Option<String>,
    /// Population file; implies `initialization_type: flat_file`
    #[serde(default)]
    pub flat_file: Option<String>,
    #[serde(default)]
    pub crossover_type: Option<String>,
    #[serde(default)]
    pub num_crossover_points: Option<u32>,
    #[serde(default)]
    pub num_parents: Option<u32>,
    #[serde(default)]
    pub num_offspring: Option<u32>,
    #[serde(default)]
    pub crossover_rate: Option<f64>,
    #[serde(default)]
    pub mutation_type: Option<String>,
    #[serde(default)]
    pub mutation_scale: Option<f64>,
    #[serde(default)]
    pub mutation_rate: Option<f64>,
}

/// Gradient or Hessian directives. The same shape serves both; settings
/// that do not apply to one of them are rejected on conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DerivativeData {
    /// `none`, `numerical`, `analytic`, `mixed`, or `quasi` for Hessians
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub method_source: Option<String>,
    #[serde(default)]
    pub interval_type: Option<String>,
    #[serde(default)]
    pub step_scaling: Option<String>,
    #[serde(default)]
    pub fd_step_size: Vec<f64>,
    #[serde(default)]
    pub id_numerical: Vec<u32>,
    #[serde(default)]
    pub id_analytic: Vec<u32>,
    #[serde(default)]
    pub id_quasi: Vec<u32>,
    /// `bfgs` or `sr1`
    #[serde(default)]
    pub quasi_approximation: Option<String>,
    #[serde(default)]
    pub damped: bool,
}

fn default_bin() -> PathBuf {
    PathBuf::from("dakota")
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

fn default_asynchronous() -> bool {
    true
}

/// How and where the solver runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunData {
    /// Solver binary
    #[serde(default = "default_bin")]
    pub bin: PathBuf,

    /// Relative paths are resolved against the study file's directory
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,

    #[serde(default = "default_asynchronous")]
    pub asynchronous: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,

    /// Solver installation exported by the generated `driver.sh`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver_root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverDescriptor>,

    #[serde(default)]
    pub driver_options: DriverOptions,
}

impl Default for RunData {
    fn default() -> Self {
        Self {
            bin: default_bin(),
            workdir: default_workdir(),
            asynchronous: default_asynchronous(),
            concurrency: None,
            solver_root: None,
            python_path: None,
            driver: None,
            driver_options: DriverOptions::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDY: &str = r#"
functions: [f, g]
variables:
  - type: normal_uncertain
    key: nuv
    mean: 1.0
    std_deviation: 0.05
  - type: state
    key: n
    dtype: integer
    value: 3
  - type: state
    key: label
    dtype: string
    value: abc
method:
  type: sampling
  sample_type: lhs
  samples: 100
gradients:
  type: numerical
  interval_type: central
  fd_step_size: [0.0001]
run:
  concurrency: 4
  driver:
    class: command
  driver_options:
    command: python model.py
"#;

    #[test]
    fn test_parse_study_file() {
        let data = StudyData::from_yaml(STUDY).unwrap();
        assert_eq!(data.functions, vec!["f", "g"]);
        assert_eq!(data.variables.len(), 3);
        assert!(matches!(
            &data.variables[1],
            VariableData::State { dtype: DataType::Integer, value: Value::Integer(3), .. }
        ));
        assert!(matches!(
            &data.variables[2],
            VariableData::State { value: Value::String(s), .. } if s == "abc"
        ));
        assert!(matches!(
            data.method,
            MethodData::Sampling { samples: 100, seed: None, .. }
        ));
        let gradients = data.gradients.unwrap();
        assert_eq!(gradients.kind, "numerical");
        assert_eq!(gradients.fd_step_size, vec![0.0001]);
        assert!(data.hessians.is_none());

        assert_eq!(data.run.bin, PathBuf::from("dakota"));
        assert!(data.run.asynchronous);
        assert_eq!(data.run.concurrency, Some(4));
        assert_eq!(data.run.driver.unwrap().class, "command");
        assert_eq!(
            data.run.driver_options.get("command").and_then(|v| v.as_str()),
            Some("python model.py")
        );
    }

    #[test]
    fn test_parse_optimizer() {
        let yaml = r#"
functions: [f]
method:
  type: optimize
  max_iterations: 50
  optimizer:
    type: soga
    genetic:
      population_size: 20
      crossover_type: shuffle_random
    fitness_type: merit_function
"#;
        let data = StudyData::from_yaml(yaml).unwrap();
        let MethodData::Optimize {
            max_iterations,
            optimizer,
            ..
        } = data.method
        else {
            panic!("expected an optimizer");
        };
        assert_eq!(max_iterations, Some(50));
        let OptimizerData::Soga {
            genetic,
            fitness_type,
            ..
        } = optimizer
        else {
            panic!("expected soga");
        };
        assert_eq!(genetic.population_size, Some(20));
        assert_eq!(genetic.crossover_type.as_deref(), Some("shuffle_random"));
        assert_eq!(fitness_type.as_deref(), Some("merit_function"));
    }

    #[test]
    fn test_cobyla_uses_solver_keyword() {
        let yaml = "functions: [f]\nmethod:\n  type: optimize\n  optimizer:\n    type: coliny_cobyla\n";
        let data = StudyData::from_yaml(yaml).unwrap();
        assert!(matches!(
            data.method,
            MethodData::Optimize { optimizer: OptimizerData::Cobyla { initial_delta: None }, .. }
        ));
    }
}
