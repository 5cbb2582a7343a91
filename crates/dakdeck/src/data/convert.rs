use std::path::Path;

use dakdeck_core::derivatives::QuasiApproximation;
use dakdeck_core::methods::{
    Cobyla, GeneticAlgorithm, Moga, NcsuDirect, NlpqlSqp, OptPp, OptPpKind, Optimizer, Soga,
};
use dakdeck_core::{
    Deck, DeckError, DesignVariable, Gradients, Hessians, Method, NormalUncertainVariable,
    Optimize, Result, Sampling, StateVariable, Study, UniformUncertainVariable, Variable,
};
use rand::RngCore;

use super::study_data::{
    DerivativeData, GeneticData, MethodData, OptimizerData, RunData, StudyData, VariableData,
};

/// OPT++ members by their study-file name
const OPTPP_KINDS: [(&str, OptPpKind); 5] = [
    ("pds", OptPpKind::Pds),
    ("cg", OptPpKind::Cg),
    ("newton", OptPpKind::Newton),
    ("q_newton", OptPpKind::QNewton),
    ("fd_newton", OptPpKind::FdNewton),
];

/// Convert a study file into a [`Deck`]
pub fn to_deck(data: &StudyData) -> Result<Deck> {
    let mut deck = Deck::new(convert_method(&data.method)?, data.functions.clone())?;
    for variable in &data.variables {
        deck.add_variable(convert_variable(variable)?)?;
    }
    if let Some(gradients) = &data.gradients {
        deck.set_gradients(convert_gradients(gradients)?);
    }
    if let Some(hessians) = &data.hessians {
        deck.set_hessians(convert_hessians(hessians)?);
    }
    Ok(deck)
}

/// Convert a study file into a ready-to-run [`Study`]. `base_dir` anchors a
/// relative work directory, normally the study file's own directory.
pub fn to_study(data: &StudyData, base_dir: &Path) -> Result<Study> {
    let deck = to_deck(data)?;
    let run: &RunData = &data.run;
    let mut study = Study::new(deck, &run.bin, base_dir.join(&run.workdir))
        .asynchronous(run.asynchronous)
        .concurrency(run.concurrency);
    if let Some(driver) = &run.driver {
        study = study.driver(driver.clone(), run.driver_options.clone());
    }
    if let Some(root) = &run.solver_root {
        study = study.solver_root(root, run.python_path.clone());
    }
    if let Ok(program) = std::env::current_exe() {
        study = study.driver_program(program.display().to_string());
    }
    Ok(study)
}

fn convert_variable(data: &VariableData) -> Result<Variable> {
    let variable: Variable = match data {
        VariableData::State { key, dtype, value } => {
            StateVariable::new(key.as_str(), *dtype, value.clone())?.into()
        }
        VariableData::NormalUncertain {
            key,
            mean,
            std_deviation,
        } => NormalUncertainVariable::new(key.as_str(), *mean, *std_deviation)?.into(),
        VariableData::UniformUncertain {
            key,
            lower_bound,
            upper_bound,
        } => UniformUncertainVariable::new(key.as_str(), *lower_bound, *upper_bound)?.into(),
        VariableData::Design {
            key,
            lower_bound,
            upper_bound,
            initial_point,
        } => DesignVariable::new(key.as_str(), *lower_bound, *upper_bound, *initial_point)?
            .into(),
    };
    Ok(variable)
}

fn convert_method(data: &MethodData) -> Result<Method> {
    let (mut method, id_method): (Method, &Option<String>) = match data {
        MethodData::Sampling {
            id_method,
            sample_type,
            samples,
            seed,
            refinement_samples,
        } => {
            let seed = seed.unwrap_or_else(|| {
                let seed = rand::rng().next_u64();
                tracing::info!(seed, "no sampling seed given, drew one");
                seed
            });
            let mut method: Method = Sampling::new(sample_type.parse()?, *samples, seed)?.into();
            for &n in refinement_samples {
                method.add_refinement(Some(n))?;
            }
            (method, id_method)
        }
        MethodData::Optimize {
            id_method,
            max_iterations,
            max_function_evaluations,
            convergence_tolerance,
            optimizer,
        } => {
            let mut optimize = Optimize::new(convert_optimizer(optimizer)?);
            if let Some(n) = max_iterations {
                optimize = optimize.max_iterations(*n)?;
            }
            if let Some(n) = max_function_evaluations {
                optimize = optimize.max_function_evaluations(*n)?;
            }
            if let Some(tolerance) = convergence_tolerance {
                optimize = optimize.convergence_tolerance(*tolerance)?;
            }
            (optimize.into(), id_method)
        }
    };
    if let Some(id) = id_method {
        method.set_id_method(id.as_str())?;
    }
    Ok(method)
}

fn convert_optimizer(data: &OptimizerData) -> Result<Optimizer> {
    let optimizer: Optimizer = match data {
        OptimizerData::NcsuDirect {
            solution_target,
            min_boxsize_limit,
            volume_boxsize_limit,
        } => {
            let mut direct = NcsuDirect::new();
            if let Some(target) = solution_target {
                direct = direct.solution_target(*target)?;
            }
            if let Some(limit) = min_boxsize_limit {
                direct = direct.min_boxsize_limit(*limit)?;
            }
            if let Some(limit) = volume_boxsize_limit {
                direct = direct.volume_boxsize_limit(*limit)?;
            }
            direct.into()
        }
        OptimizerData::Soga {
            genetic,
            fitness_type,
            replacement_type,
            convergence_type,
            percent_change,
            num_generations,
        } => {
            let mut soga = apply_genetic(Soga::new(), genetic)?;
            if let Some(kind) = fitness_type {
                soga = soga.fitness_type(kind.parse()?)?;
            }
            if let Some(kind) = replacement_type {
                soga = soga.replacement_type(kind.parse()?)?;
            }
            if let Some(kind) = convergence_type {
                soga = soga.convergence_type(kind.parse()?)?;
            }
            if let Some(percent) = percent_change {
                soga = soga.percent_change(*percent)?;
            }
            if let Some(n) = num_generations {
                soga = soga.num_generations(*n)?;
            }
            soga.into()
        }
        OptimizerData::Moga {
            genetic,
            fitness_type,
            replacement_type,
            shrinkage_fraction,
            convergence_type,
            percent_change,
            num_generations,
        } => {
            let mut moga = apply_genetic(Moga::new(), genetic)?;
            if let Some(kind) = fitness_type {
                moga = moga.fitness_type(kind.parse()?)?;
            }
            if let Some(kind) = replacement_type {
                moga = moga.replacement_type(kind.parse()?)?;
            }
            if let Some(fraction) = shrinkage_fraction {
                moga = moga.shrinkage_fraction(*fraction)?;
            }
            if let Some(kind) = convergence_type {
                moga = moga.convergence_type(kind.parse()?)?;
            }
            if let Some(percent) = percent_change {
                moga = moga.percent_change(*percent)?;
            }
            if let Some(n) = num_generations {
                moga = moga.num_generations(*n)?;
            }
            moga.into()
        }
        OptimizerData::Optpp {
            kind,
            search_scheme_size,
            search_method,
            merit_function,
            steplength_to_boundary,
            centering_parameter,
            max_step,
            gradient_tolerance,
        } => {
            let mut optpp = OptPp::new(optpp_kind(kind)?);
            if let Some(n) = search_scheme_size {
                optpp = optpp.search_scheme_size(*n)?;
            }
            if let Some(method) = search_method {
                optpp = optpp.search_method(method.parse()?)?;
            }
            if let Some(merit) = merit_function {
                optpp = optpp.merit_function(merit.parse()?)?;
            }
            if let Some(fraction) = steplength_to_boundary {
                optpp = optpp.steplength_to_boundary(*fraction)?;
            }
            if let Some(sigma) = centering_parameter {
                optpp = optpp.centering_parameter(*sigma)?;
            }
            if let Some(step) = max_step {
                optpp = optpp.max_step(*step)?;
            }
            if let Some(tolerance) = gradient_tolerance {
                optpp = optpp.gradient_tolerance(*tolerance)?;
            }
            optpp.into()
        }
        OptimizerData::NlpqlSqp {
            constraint_tolerance,
        } => {
            let mut nlpql = NlpqlSqp::new();
            if let Some(tolerance) = constraint_tolerance {
                nlpql = nlpql.constraint_tolerance(*tolerance)?;
            }
            nlpql.into()
        }
        OptimizerData::Cobyla { initial_delta } => {
            let mut cobyla = Cobyla::new();
            if let Some(delta) = initial_delta {
                cobyla = cobyla.initial_delta(*delta)?;
            }
            cobyla.into()
        }
    };
    Ok(optimizer)
}

fn optpp_kind(name: &str) -> Result<OptPpKind> {
    let lowered = name.to_lowercase();
    let lowered = lowered.strip_prefix("optpp_").unwrap_or(&lowered);
    OPTPP_KINDS
        .iter()
        .find(|(candidate, _)| *candidate == lowered)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| DeckError::InvalidEnumValue {
            attribute: "optpp",
            value: name.to_string(),
            allowed: OPTPP_KINDS.iter().map(|(candidate, _)| *candidate).collect(),
        })
}

fn apply_genetic<G: GeneticAlgorithm>(mut ga: G, data: &GeneticData) -> Result<G> {
    if let Some(n) = data.population_size {
        ga = ga.population_size(n)?;
    }
    if let Some(seed) = data.seed {
        ga = ga.seed(seed);
    }
    match (&data.flat_file, &data.initialization_type) {
        (Some(path), _) => ga = ga.flat_file_initialization(path.as_str())?,
        (None, Some(kind)) => ga = ga.initialization_type(kind.parse()?)?,
        (None, None) => {}
    }
    if let Some(kind) = &data.crossover_type {
        ga = ga.crossover_type(kind.parse()?);
    }
    if let Some(n) = data.num_crossover_points {
        ga = ga.num_crossover_points(n)?;
    }
    if let Some(n) = data.num_parents {
        ga = ga.num_parents(n)?;
    }
    if let Some(n) = data.num_offspring {
        ga = ga.num_offspring(n)?;
    }
    if let Some(rate) = data.crossover_rate {
        ga = ga.crossover_rate(rate)?;
    }
    if let Some(kind) = &data.mutation_type {
        ga = ga.mutation_type(kind.parse()?);
    }
    if let Some(scale) = data.mutation_scale {
        ga = ga.mutation_scale(scale)?;
    }
    if let Some(rate) = data.mutation_rate {
        ga = ga.mutation_rate(rate)?;
    }
    Ok(ga)
}

fn convert_gradients(data: &DerivativeData) -> Result<Gradients> {
    if data.step_scaling.is_some() || !data.id_quasi.is_empty() || data.damped {
        return Err(DeckError::MissingPrerequisite {
            attribute: "gradients",
            requires: "gradient settings only (no step_scaling, id_quasi or damped)".to_string(),
        });
    }
    let mut gradients = Gradients::new(data.kind.parse()?);
    if let Some(source) = &data.method_source {
        gradients = gradients.method_source(source.parse()?)?;
    }
    if let Some(interval) = &data.interval_type {
        gradients = gradients.interval_type(interval.parse()?)?;
    }
    if !data.fd_step_size.is_empty() {
        gradients = gradients.fd_step_size(data.fd_step_size.clone())?;
    }
    if !data.id_numerical.is_empty() {
        gradients = gradients.id_numerical(data.id_numerical.clone())?;
    }
    if !data.id_analytic.is_empty() {
        gradients = gradients.id_analytic(data.id_analytic.clone())?;
    }
    Ok(gradients)
}

fn convert_hessians(data: &DerivativeData) -> Result<Hessians> {
    if data.method_source.is_some() {
        return Err(DeckError::MissingPrerequisite {
            attribute: "method_source",
            requires: "gradients".to_string(),
        });
    }
    let approximation = data
        .quasi_approximation
        .as_deref()
        .map(str::parse::<QuasiApproximation>)
        .transpose()?;
    // mixed Hessians take the approximation together with their quasi ids
    let mut hessians = match (data.id_quasi.is_empty(), approximation) {
        (false, Some(approximation)) => Hessians::new(data.kind.parse()?, None)?
            .id_quasi(data.id_quasi.clone(), approximation)?,
        _ => Hessians::new(data.kind.parse()?, approximation)?,
    };
    if !data.id_numerical.is_empty() {
        hessians = hessians.id_numerical(data.id_numerical.clone())?;
    }
    if !data.id_analytic.is_empty() {
        hessians = hessians.id_analytic(data.id_analytic.clone())?;
    }
    if let Some(scaling) = &data.step_scaling {
        hessians = hessians.step_scaling(scaling.parse()?)?;
    }
    if let Some(interval) = &data.interval_type {
        hessians = hessians.interval_type(interval.parse()?)?;
    }
    if !data.fd_step_size.is_empty() {
        hessians = hessians.fd_step_size(data.fd_step_size.clone())?;
    }
    if data.damped {
        hessians = hessians.damped(true)?;
    }
    Ok(hessians)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dakdeck_core::methods::SampleType;

    fn study(yaml: &str) -> StudyData {
        StudyData::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_sampling_deck_renders() {
        let data = study(
            r#"
functions: [f]
variables:
  - type: uniform_uncertain
    key: u
    lower_bound: -1.0
    upper_bound: 1.0
method:
  type: sampling
  sample_type: random
  samples: 100
  seed: 42
"#,
        );
        let deck = to_deck(&data).unwrap();
        let text = deck.get_deck(None, false, None).unwrap();
        assert!(text.contains("\tsampling\n\t\tsample_type = random\n\t\tseed = 42\n\t\tsamples = 100\n"));
        assert!(text.contains("\tuniform_uncertain  1\n"));
    }

    #[test]
    fn test_missing_seed_is_drawn() {
        let data = study(
            "functions: [f]\nmethod:\n  type: sampling\n  sample_type: latin_hypercube\n  samples: 10\n",
        );
        let deck = to_deck(&data).unwrap();
        let sampling = deck.method().as_sampling().unwrap();
        assert_eq!(sampling.sample_type(), SampleType::Lhs);
        assert_eq!(sampling.samples(), 10);
    }

    #[test]
    fn test_bad_keyword_surfaces_as_enum_error() {
        let data = study(
            "functions: [f]\nmethod:\n  type: sampling\n  sample_type: sobol\n  samples: 10\n  seed: 1\n",
        );
        assert!(matches!(
            to_deck(&data),
            Err(DeckError::InvalidEnumValue { attribute: "sample_type", .. })
        ));
    }

    #[test]
    fn test_refinements_follow_sampling_rules() {
        let data = study(
            "functions: [f]\nmethod:\n  type: sampling\n  sample_type: lhs\n  samples: 10\n  seed: 1\n  refinement_samples: [10, 20]\n",
        );
        let deck = to_deck(&data).unwrap();
        assert_eq!(deck.method().refinements(), [10, 20]);

        let data = study(
            "functions: [f]\nmethod:\n  type: sampling\n  sample_type: lhs\n  samples: 10\n  seed: 1\n  refinement_samples: [10, 30]\n",
        );
        assert!(matches!(
            to_deck(&data),
            Err(DeckError::RefinementSequence { expected: 20, given: 30 })
        ));
    }

    #[test]
    fn test_optpp_with_derivatives() {
        let data = study(
            r#"
functions: [f]
variables:
  - type: design
    key: x
    lower_bound: 0.0
    upper_bound: 1.0
    initial_point: 0.5
method:
  type: optimize
  max_iterations: 20
  optimizer:
    type: optpp
    kind: newton
    search_method: trust_region
gradients:
  type: analytic
hessians:
  type: quasi
  quasi_approximation: bfgs
  damped: true
"#,
        );
        let deck = to_deck(&data).unwrap();
        let text = deck.get_deck(None, false, None).unwrap();
        assert!(text.contains("\toptpp_newton\n\t\tmax_iterations = 20\n\t\tsearch_method = trust_region\n"));
        assert!(text.contains("\tcontinuous_design  1\n"));
        assert!(text.ends_with("\tanalytic_gradients\n\tquasi_hessians bfgs damped\n"));
    }

    #[test]
    fn test_unknown_optpp_kind() {
        let err = optpp_kind("golden").unwrap_err();
        assert!(matches!(err, DeckError::InvalidEnumValue { attribute: "optpp", .. }));
        assert_eq!(optpp_kind("OPTPP_Q_NEWTON").unwrap(), OptPpKind::QNewton);
    }

    #[test]
    fn test_mixed_hessians_with_quasi_ids() {
        let data = DerivativeData {
            kind: "mixed".to_string(),
            id_numerical: vec![1],
            id_quasi: vec![2],
            quasi_approximation: Some("sr1".to_string()),
            ..DerivativeData::default()
        };
        let hessians = convert_hessians(&data).unwrap();
        assert_eq!(
            hessians.to_string(),
            "\tmixed_hessians\n\t\tid_numerical_hessians 1\n\t\tid_quasi_hessians 2 sr1\n"
        );
    }

    #[test]
    fn test_hessian_only_settings_rejected_on_gradients() {
        let data = DerivativeData {
            kind: "numerical".to_string(),
            step_scaling: Some("relative".to_string()),
            ..DerivativeData::default()
        };
        assert!(convert_gradients(&data).is_err());
    }

    #[test]
    fn test_soga_flat_file_wins_over_initialization_type() {
        let data = GeneticData {
            initialization_type: Some("unique_random".to_string()),
            flat_file: Some("pop.dat".to_string()),
            ..GeneticData::default()
        };
        let soga = apply_genetic(Soga::new(), &data).unwrap();
        let text = Method::from(Optimize::new(soga)).to_string();
        assert!(text.contains("initialization_type flat_file = \"pop.dat\""));
    }

    #[test]
    fn test_study_resolves_workdir_against_base() {
        let data = study("functions: [f]\nmethod:\n  type: sampling\n  sample_type: lhs\n  samples: 4\n  seed: 1\nrun:\n  workdir: out\n");
        let study = to_study(&data, Path::new("/tmp/base")).unwrap();
        assert_eq!(
            study.study_dir(),
            Path::new("/tmp/base/out/dakota_study")
        );
    }
}
