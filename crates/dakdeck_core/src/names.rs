//! Fixed file and directory names shared by the deck, the study runner and
//! the analysis drivers

/// Solver input deck of the first run
pub const DAKOTA_INPUT: &str = "dak.in";
/// Solver report of the first run
pub const DAKOTA_OUTPUT: &str = "dak.out";
/// Parameters file the solver writes for each evaluation
pub const PARAMS_FILE: &str = "params.in";
/// Results file each evaluation writes back
pub const RESULTS_FILE: &str = "results.out";
/// Analysis driver the interface block points at
pub const DRIVER_SCRIPT: &str = "driver.sh";
/// Runtime options written next to the deck
pub const STUDY_OPTIONS: &str = "study_options.json";
pub const LOG_FILE: &str = "dakdeck.log";

pub const STUDY_DIR: &str = "dakota_study";
pub const ITERATIONS_DIR: &str = "iters";

/// Input deck for run `k`
pub fn dakota_input(k: u32) -> String {
    numbered(DAKOTA_INPUT, "dak_{}.in", k)
}

/// Solver report for run `k`
pub fn dakota_output(k: u32) -> String {
    numbered(DAKOTA_OUTPUT, "dak_{}.out", k)
}

/// Restart file written by run `k`
pub fn restart_file(k: u32) -> String {
    format!("Restart{k}.rst")
}

fn numbered(first: &str, pattern: &str, k: u32) -> String {
    if k == 0 {
        first.to_string()
    } else {
        pattern.replace("{}", &k.to_string())
    }
}
