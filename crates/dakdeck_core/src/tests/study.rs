//! Tests for the study runner
//!
//! The solver is replaced by small shell programs so the tests exercise the
//! real process handling without a solver installation.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::deck::Deck;
use crate::driver::DriverDescriptor;
use crate::methods::Method;
use crate::names;
use crate::reader;
use crate::study::{Study, StudyError, StudyOptions};
use crate::variables::UniformUncertainVariable;

const REPORT: &str = "\
Sample moment statistics for each response function:
                            Mean           Std Dev          Skewness          Kurtosis
               f  5.0000000000e-01  2.8867513459e-01  0.0000000000e+00 -1.2000000000e+00

";

fn deck(method: Method) -> Deck {
    let mut deck = Deck::new(method, "f").unwrap();
    deck.add_variable(UniformUncertainVariable::new("u", -1.0, 1.0).unwrap())
        .unwrap();
    deck
}

/// Fake solver that copies a canned report to the `-o` argument
#[cfg(unix)]
fn fake_solver(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let report = dir.join("report.txt");
    std::fs::write(&report, REPORT).unwrap();
    let bin = dir.join("fake_dakota");
    std::fs::write(
        &bin,
        format!("#!/bin/sh\ncp \"{}\" \"$4\"\n", report.display()),
    )
    .unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
    bin
}

#[test]
fn test_invocation_restarts_from_previous_run() {
    let study = Study::new(deck(Method::monte_carlo(10, 1).unwrap()), "dakota", ".");
    assert_eq!(
        study.invocation(0).join(" "),
        "dakota -i dak.in -o dak.out -write_restart Restart0.rst"
    );
    assert_eq!(
        study.invocation(2).join(" "),
        "dakota -i dak_2.in -o dak_2.out -read_restart Restart1.rst -write_restart Restart2.rst"
    );
}

#[test]
fn test_run_writes_deck_and_options() {
    let tmp = TempDir::new().unwrap();
    let descriptor = DriverDescriptor::new("command");
    let mut options = crate::driver::DriverOptions::new();
    options.insert("command".to_string(), "echo f 1.0".into());

    let mut study = Study::new(deck(Method::monte_carlo(10, 1).unwrap()), "echo", tmp.path())
        .concurrency(Some(2))
        .driver(descriptor.clone(), options.clone());
    study.run_dakota().unwrap();
    assert_eq!(study.runs(), 1);

    let dir = tmp.path().join(names::STUDY_DIR);
    let text = std::fs::read_to_string(dir.join("dak.in")).unwrap();
    assert!(text.contains("# Usage:\n#   echo -i dak.in -o dak.out -write_restart Restart0.rst\n"));
    assert!(text.contains("\tasynchronous\n\t\tevaluation_concurrency = 2\n"));

    let written = StudyOptions::read(&dir.join(names::STUDY_OPTIONS)).unwrap();
    assert_eq!(written.run, 0);
    assert!(written.asynchronous);
    assert_eq!(written.functions, vec!["f".to_string()]);
    assert_eq!(written.driver, Some(descriptor));
    assert_eq!(written.driver_options, options);

    // no solver installation configured, so no driver script
    assert!(!dir.join(names::DRIVER_SCRIPT).exists());
}

#[test]
fn test_refinement_run_reads_previous_restart() {
    let tmp = TempDir::new().unwrap();
    let mut study = Study::new(deck(Method::latin_hypercube(50, 3).unwrap()), "echo", tmp.path())
        .asynchronous(false);
    study.run_dakota().unwrap();

    assert_eq!(study.add_refinement(None).unwrap(), 50);
    study.run_dakota().unwrap();
    assert_eq!(study.runs(), 2);

    let dir = study.study_dir();
    let text = std::fs::read_to_string(dir.join("dak_1.in")).unwrap();
    assert!(text.contains("-read_restart Restart0.rst -write_restart Restart1.rst"));
    assert!(text.contains("\t\trefinement_samples = 50\n"));
    assert!(!text.contains("asynchronous"));

    let options = StudyOptions::read(&dir.join(names::STUDY_OPTIONS)).unwrap();
    assert_eq!(options.run, 1);
}

#[test]
fn test_failed_solver_keeps_run_count() {
    let tmp = TempDir::new().unwrap();
    let mut study = Study::new(deck(Method::monte_carlo(10, 1).unwrap()), "false", tmp.path());
    assert!(matches!(
        study.run_dakota(),
        Err(StudyError::SolverFailed { status: Some(1), .. })
    ));
    assert_eq!(study.runs(), 0);
    assert!(matches!(study.read_output(), Err(StudyError::NoRuns)));
}

#[test]
fn test_missing_derivatives_stop_before_writing() {
    use crate::methods::{OptPp, Optimize};

    let tmp = TempDir::new().unwrap();
    let deck = Deck::new(Optimize::new(OptPp::q_newton()), "f").unwrap();
    let study = Study::new(deck, "echo", tmp.path());
    assert!(matches!(study.prepare_run(), Err(StudyError::Deck(_))));
    assert!(!study.study_dir().join("dak.in").exists());
}

#[test]
fn test_solver_root_writes_executable_driver_script() {
    let tmp = TempDir::new().unwrap();
    let study = Study::new(deck(Method::monte_carlo(10, 1).unwrap()), "dakota", tmp.path())
        .solver_root("/opt/dakota", None)
        .driver_program("/usr/local/bin/dakdeck");
    study.prepare_run().unwrap();

    let script_path = study.study_dir().join(names::DRIVER_SCRIPT);
    let script = std::fs::read_to_string(&script_path).unwrap();
    assert!(script.starts_with("#! /bin/sh\n"));
    assert!(script.contains("export DAKOTA=/opt/dakota\n"));
    assert!(script.ends_with("exec /usr/local/bin/dakdeck drive \"$@\"\n"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&script_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[cfg(unix)]
#[test]
fn test_read_output_of_latest_run() {
    let tmp = TempDir::new().unwrap();
    let bin = fake_solver(tmp.path());
    let mut study = Study::new(deck(Method::monte_carlo(10, 1).unwrap()), &bin, tmp.path());

    let report_path = study.run_dakota().unwrap();
    assert_eq!(report_path, study.study_dir().join("dak.out"));

    let text = study.read_output().unwrap();
    let moments = reader::read_moments(&text).unwrap();
    assert_eq!(moments.get("f", "Mean"), Some(0.5));
    assert_eq!(moments.get("f", "Kurtosis"), Some(-1.2));
}
