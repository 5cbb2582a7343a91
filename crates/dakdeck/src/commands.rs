//! Subcommand implementations
//!
//! Each function returns what it produced so the binary decides how to
//! report it; nothing here prints.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{WrapErr, eyre};
use dakdeck_core::driver::{DriverRegistry, DriverResults};
use dakdeck_core::io::atomic_write;
use dakdeck_core::reader::{self, Table};
use dakdeck_core::{StudyOptions, names};

use crate::data::{StudyData, to_deck, to_study};

/// Reads and parses a study file
pub fn load_study_file(path: &Path) -> color_eyre::Result<StudyData> {
    let yaml = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read study file {}", path.display()))?;
    StudyData::from_yaml(&yaml)
        .wrap_err_with(|| format!("Failed to parse study file {}", path.display()))
}

/// Renders the deck of a study file. With `output` the deck is written
/// there and `None` is returned; otherwise the text is returned.
pub fn render(
    study_file: &Path,
    output: Option<&Path>,
    label: Option<&str>,
) -> color_eyre::Result<Option<String>> {
    let data = load_study_file(study_file)?;
    let deck = to_deck(&data).wrap_err("Invalid study")?;
    let text = deck.get_deck(label, data.run.asynchronous, data.run.concurrency)?;
    match output {
        Some(path) => {
            atomic_write(path, &text)
                .wrap_err_with(|| format!("Failed to write deck to {}", path.display()))?;
            tracing::info!(path = %path.display(), "deck written");
            Ok(None)
        }
        None => Ok(Some(text)),
    }
}

/// Outcome of `dakdeck run`
#[derive(Debug)]
pub struct RunSummary {
    /// Report of every completed run, in order
    pub reports: Vec<PathBuf>,
    /// Moment statistics of the last run, when its report has them
    pub moments: Option<Table>,
}

/// Runs a study file once, and once more per requested refinement.
/// `refine` is `None` for no refinement and `Some(n)` for one refinement
/// batch of `n` samples (or the method's default batch).
pub fn run(study_file: &Path, refine: Option<Option<u32>>) -> color_eyre::Result<RunSummary> {
    let data = load_study_file(study_file)?;
    let base_dir = study_file.parent().unwrap_or_else(|| Path::new("."));
    let mut study = to_study(&data, base_dir).wrap_err("Invalid study")?;

    let mut reports = vec![study.run_dakota()?];
    if let Some(samples) = refine {
        let batch = study.add_refinement(samples)?;
        tracing::info!(batch, "refining study");
        reports.push(study.run_dakota()?);
    }

    let moments = match study.read_output() {
        Ok(text) => reader::read_moments(&text).ok(),
        Err(e) => {
            tracing::warn!(error = %e, "solver report not readable");
            None
        }
    };
    Ok(RunSummary { reports, moments })
}

/// One analysis evaluation, as invoked by `driver.sh params.in results.out`.
///
/// The study options are read from `options`, or from the study options
/// file next to the parameters file.
pub fn drive(
    params: &Path,
    results: &Path,
    options: Option<&Path>,
) -> color_eyre::Result<DriverResults> {
    let options_path = match options {
        Some(path) => path.to_path_buf(),
        None => params
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(names::STUDY_OPTIONS),
    };
    let study_options = StudyOptions::read(&options_path)
        .wrap_err_with(|| format!("Failed to read {}", options_path.display()))?;
    let descriptor = study_options
        .driver
        .ok_or_else(|| eyre!("No analysis driver configured in {}", options_path.display()))?;

    let registry = DriverRegistry::with_builtin();
    let outcome = registry
        .evaluate(&descriptor, &study_options.driver_options, params, results)
        .wrap_err_with(|| format!("Evaluation of {} failed", params.display()))?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STUDY: &str = "\
functions: [f]
variables:
  - type: uniform_uncertain
    key: u
    lower_bound: -1.0
    upper_bound: 1.0
method:
  type: sampling
  sample_type: lhs
  samples: 8
  seed: 5
run:
  asynchronous: false
";

    #[test]
    fn test_render_to_stdout_and_file() {
        let dir = tempdir().unwrap();
        let study_file = dir.path().join("study.yaml");
        std::fs::write(&study_file, STUDY).unwrap();

        let text = render(&study_file, None, Some("dakota -i dak.in"))
            .unwrap()
            .unwrap();
        assert!(text.contains("# Usage:\n#   dakota -i dak.in\n"));
        assert!(text.contains("\t\tsample_type = lhs\n\t\tseed = 5\n\t\tsamples = 8\n"));
        assert!(!text.contains("asynchronous"));

        let out = dir.path().join("deck.in");
        assert!(render(&study_file, Some(&out), None).unwrap().is_none());
        assert!(std::fs::read_to_string(&out).unwrap().starts_with("# Dakota input deck\n"));
    }

    #[test]
    fn test_render_reports_bad_study() {
        let dir = tempdir().unwrap();
        let study_file = dir.path().join("study.yaml");
        std::fs::write(&study_file, STUDY.replace("lhs", "halton")).unwrap();
        assert!(render(&study_file, None, None).is_err());
        assert!(render(&dir.path().join("missing.yaml"), None, None).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_drive_with_command_driver() {
        let dir = tempdir().unwrap();
        let options = format!(
            r#"{{
  "created": "2026-01-01T00:00:00Z",
  "run": 0,
  "asynchronous": true,
  "functions": ["f"],
  "driver": {{"class": "command"}},
  "driver_options": {{"command": "echo \"f $DAKDECK_VAR_x\"", "workdir": "{}"}}
}}"#,
            dir.path().display()
        );
        std::fs::write(dir.path().join(names::STUDY_OPTIONS), options).unwrap();
        let params = dir.path().join(names::PARAMS_FILE);
        std::fs::write(
            &params,
            "                                          1 variables\n\
             \x20                     2.500000000000000e+00 x\n\
             \x20                                         1 functions\n\
             \x20                                         1 ASV_1:f\n\
             \x20                                         1 derivative_variables\n\
             \x20                                         1 DVV_1:x\n\
             \x20                                         0 analysis_components\n\
             \x20                                       1:1 eval_id\n",
        )
        .unwrap();
        let results = dir.path().join(names::RESULTS_FILE);

        let outcome = drive(&params, &results, None).unwrap();
        assert!(!outcome.failed);
        assert_eq!(outcome.functions.get("f"), Some(&2.5));
        assert_eq!(std::fs::read_to_string(&results).unwrap(), "2.5 f\n");
        assert!(dir.path().join("iters/1/inputs.json").exists());
    }

    #[test]
    fn test_drive_without_driver_fails() {
        let dir = tempdir().unwrap();
        let options = r#"{"created": "2026-01-01T00:00:00Z", "run": 0, "asynchronous": false, "functions": ["f"]}"#;
        std::fs::write(dir.path().join(names::STUDY_OPTIONS), options).unwrap();
        let params = dir.path().join(names::PARAMS_FILE);
        let err = drive(&params, &dir.path().join("results.out"), None).unwrap_err();
        assert!(err.to_string().contains("No analysis driver configured"));
    }
}
