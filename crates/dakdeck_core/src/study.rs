//! Study runner
//!
//! A [`Study`] writes the deck into `<workdir>/dakota_study`, runs the
//! solver there and keeps track of the run index so refinements can restart
//! from the previous run:
//!
//! ```text
//! run 0: <bin> -i dak.in   -o dak.out                              -write_restart Restart0.rst
//! run 1: <bin> -i dak_1.in -o dak_1.out -read_restart Restart0.rst -write_restart Restart1.rst
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::deck::Deck;
use crate::driver::{DriverDescriptor, DriverOptions, driver_script};
use crate::error::DeckError;
use crate::names;

#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    #[error(transparent)]
    Deck(#[from] DeckError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("study options: {0}")]
    Json(#[from] serde_json::Error),

    #[error("solver exited with status {status:?}: {stderr}")]
    SolverFailed { status: Option<i32>, stderr: String },

    #[error("the study has not been run yet")]
    NoRuns,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StudyError + '_ {
    move |source| StudyError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Runtime configuration written next to each deck for the analysis driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyOptions {
    pub created: Timestamp,
    pub run: u32,
    pub asynchronous: bool,
    #[serde(default)]
    pub concurrency: Option<u32>,
    pub functions: Vec<String>,
    #[serde(default)]
    pub driver: Option<DriverDescriptor>,
    #[serde(default)]
    pub driver_options: DriverOptions,
}

impl StudyOptions {
    pub fn read(path: &Path) -> Result<Self, StudyError> {
        let text = std::fs::read_to_string(path).map_err(io_error(path))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// One solver study and its run history
#[derive(Debug, Clone)]
pub struct Study {
    deck: Deck,
    bin_path: PathBuf,
    workdir: PathBuf,
    asynchronous: bool,
    concurrency: Option<u32>,
    driver: Option<DriverDescriptor>,
    driver_options: DriverOptions,
    solver_root: Option<PathBuf>,
    python_path: Option<String>,
    driver_program: String,
    runs: u32,
}

impl Study {
    pub fn new(deck: Deck, bin_path: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            deck,
            bin_path: bin_path.into(),
            workdir: workdir.into(),
            asynchronous: true,
            concurrency: None,
            driver: None,
            driver_options: DriverOptions::new(),
            solver_root: None,
            python_path: None,
            driver_program: "dakdeck".to_string(),
            runs: 0,
        }
    }

    #[must_use]
    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    #[must_use]
    pub fn concurrency(mut self, concurrency: Option<u32>) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn driver(mut self, descriptor: DriverDescriptor, options: DriverOptions) -> Self {
        self.driver = Some(descriptor);
        self.driver_options = options;
        self
    }

    /// Solver installation exported by `driver.sh`; without one no script
    /// is written and the caller provides its own
    #[must_use]
    pub fn solver_root(mut self, root: impl Into<PathBuf>, python_path: Option<String>) -> Self {
        self.solver_root = Some(root.into());
        self.python_path = python_path;
        self
    }

    /// Program `driver.sh` forwards evaluations to
    #[must_use]
    pub fn driver_program(mut self, program: impl Into<String>) -> Self {
        self.driver_program = program.into();
        self
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn deck_mut(&mut self) -> &mut Deck {
        &mut self.deck
    }

    pub fn study_dir(&self) -> PathBuf {
        self.workdir.join(names::STUDY_DIR)
    }

    /// Number of completed solver runs
    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Command line of run `k`, binary first
    pub fn invocation(&self, k: u32) -> Vec<String> {
        let mut args = vec![
            self.bin_path.display().to_string(),
            "-i".to_string(),
            names::dakota_input(k),
            "-o".to_string(),
            names::dakota_output(k),
        ];
        if k > 0 {
            args.push("-read_restart".to_string());
            args.push(names::restart_file(k - 1));
        }
        args.push("-write_restart".to_string());
        args.push(names::restart_file(k));
        args
    }

    /// Writes the files of the next run without starting the solver.
    /// Returns the input deck path.
    pub fn prepare_run(&self) -> Result<PathBuf, StudyError> {
        let k = self.runs;
        let dir = self.study_dir();
        std::fs::create_dir_all(&dir).map_err(io_error(&dir))?;

        let label = self.invocation(k).join(" ");
        let deck = self
            .deck
            .get_deck(Some(&label), self.asynchronous, self.concurrency)?;
        let input = dir.join(names::dakota_input(k));
        crate::io::atomic_write(&input, &deck).map_err(io_error(&input))?;

        let options = StudyOptions {
            created: Timestamp::now(),
            run: k,
            asynchronous: self.asynchronous,
            concurrency: self.concurrency,
            functions: self.deck.functions().to_vec(),
            driver: self.driver.clone(),
            driver_options: self.driver_options.clone(),
        };
        let options_path = dir.join(names::STUDY_OPTIONS);
        let text = serde_json::to_string_pretty(&options)?;
        crate::io::atomic_write(&options_path, &text).map_err(io_error(&options_path))?;

        if let Some(root) = &self.solver_root {
            let script_path = dir.join(names::DRIVER_SCRIPT);
            let script = driver_script(root, self.python_path.as_deref(), &self.driver_program);
            crate::io::atomic_write(&script_path, &script).map_err(io_error(&script_path))?;
            make_executable(&script_path)?;
        }

        tracing::debug!(run = k, input = %input.display(), "prepared solver run");
        Ok(input)
    }

    /// Runs the solver once and returns the path of its report
    pub fn run_dakota(&mut self) -> Result<PathBuf, StudyError> {
        let k = self.runs;
        self.prepare_run()?;
        let dir = self.study_dir();
        let args = self.invocation(k);

        tracing::info!(run = k, command = %args.join(" "), "running solver");
        let output = Command::new(&self.bin_path)
            .args(&args[1..])
            .current_dir(&dir)
            .output()
            .map_err(io_error(&self.bin_path))?;
        if !output.status.success() {
            return Err(StudyError::SolverFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        self.runs += 1;
        tracing::info!(run = k, "solver finished");
        Ok(dir.join(names::dakota_output(k)))
    }

    /// Adds a refinement batch to the sampling method; the next
    /// [`Study::run_dakota`] restarts from the previous run
    pub fn add_refinement(&mut self, samples: Option<u32>) -> Result<u32, StudyError> {
        Ok(self.deck.method_mut().add_refinement(samples)?)
    }

    /// Report text of the latest completed run
    pub fn read_output(&self) -> Result<String, StudyError> {
        let k = self.runs.checked_sub(1).ok_or(StudyError::NoRuns)?;
        let path = self.study_dir().join(names::dakota_output(k));
        std::fs::read_to_string(&path).map_err(io_error(&path))
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), StudyError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(io_error(path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), StudyError> {
    Ok(())
}
