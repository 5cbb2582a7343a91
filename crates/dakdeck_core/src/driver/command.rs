use std::path::PathBuf;
use std::process::Command;

use super::{Driver, DriverError, DriverOptions, DriverResults, ParamsFile};
use crate::names;
use crate::variables::Value;

/// Runs a shell command per evaluation.
///
/// Options:
/// - `command` (required): run with `sh -c` inside `iters/<eval_id>/`
/// - `workdir` (optional): parent of the `iters` directory, default `.`
///
/// Variable values are written to `inputs.json` in the evaluation directory
/// and exported as `DAKDECK_VAR_<name>`. The command prints one
/// `<function> <value>` line per response on stdout.
#[derive(Debug)]
pub struct CommandDriver {
    eval_id: u32,
    params: ParamsFile,
    command: String,
    eval_dir: PathBuf,
    stdout: Option<String>,
}

impl CommandDriver {
    pub const NAME: &'static str = "command";
    pub const INPUTS_FILE: &'static str = "inputs.json";

    pub fn new(eval_id: u32, params: ParamsFile, options: &DriverOptions) -> Result<Self, DriverError> {
        let command = options
            .get("command")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| DriverError::MissingOption("command".to_string()))?
            .to_string();
        let root = options
            .get("workdir")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| PathBuf::from("."), PathBuf::from);
        let eval_dir = root.join(names::ITERATIONS_DIR).join(eval_id.to_string());
        Ok(Self {
            eval_id,
            params,
            command,
            eval_dir,
            stdout: None,
        })
    }

    pub(super) fn construct(
        eval_id: u32,
        params: ParamsFile,
        options: &DriverOptions,
    ) -> Result<Box<dyn Driver>, DriverError> {
        Ok(Box::new(Self::new(eval_id, params, options)?))
    }

    pub fn eval_dir(&self) -> &std::path::Path {
        &self.eval_dir
    }

    fn io_error(&self, source: std::io::Error) -> DriverError {
        DriverError::Io {
            path: self.eval_dir.clone(),
            source,
        }
    }
}

impl Driver for CommandDriver {
    fn eval_id(&self) -> u32 {
        self.eval_id
    }

    fn write_inputs(&mut self) -> Result<(), DriverError> {
        std::fs::create_dir_all(&self.eval_dir).map_err(|e| self.io_error(e))?;
        let inputs: serde_json::Map<String, serde_json::Value> = self
            .params
            .variables
            .iter()
            .map(|(name, value)| Ok((name.clone(), serde_json::to_value(value)?)))
            .collect::<Result<_, serde_json::Error>>()?;
        let text = serde_json::to_string_pretty(&inputs)?;
        crate::io::atomic_write(&self.eval_dir.join(Self::INPUTS_FILE), &text)
            .map_err(|e| self.io_error(e))
    }

    fn run_analysis(&mut self) -> Result<(), DriverError> {
        let mut command = Command::new("sh");
        command.arg("-c").arg(&self.command).current_dir(&self.eval_dir);
        for (name, value) in &self.params.variables {
            let text = match value {
                Value::Integer(i) => i.to_string(),
                Value::Float(x) => x.to_string(),
                Value::String(s) => s.clone(),
            };
            command.env(format!("DAKDECK_VAR_{name}"), text);
        }

        tracing::debug!(eval_id = self.eval_id, command = %self.command, "running analysis");
        let output = command.output().map_err(|e| self.io_error(e))?;
        if !output.status.success() {
            tracing::warn!(
                eval_id = self.eval_id,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "analysis command failed"
            );
            return Err(DriverError::CommandFailed {
                command: self.command.clone(),
                status: output.status.code(),
            });
        }
        self.stdout = Some(String::from_utf8_lossy(&output.stdout).into_owned());
        Ok(())
    }

    fn get_results(&mut self) -> Result<DriverResults, DriverError> {
        let Some(stdout) = self.stdout.as_deref() else {
            return Ok(DriverResults::failure());
        };
        let mut results = DriverResults::default();
        for line in stdout.lines() {
            let mut tokens = line.split_whitespace();
            let (Some(name), Some(value), None) = (tokens.next(), tokens.next(), tokens.next())
            else {
                continue;
            };
            if let Ok(value) = value.parse::<f64>() {
                results.functions.insert(name.to_string(), value);
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ParamsFile {
        ParamsFile {
            variables: vec![("x".to_string(), Value::Float(2.5))],
            functions: vec![],
            derivative_variables: vec![],
            analysis_components: vec![],
            eval_id: 3,
        }
    }

    fn options(command: &str, workdir: &std::path::Path) -> DriverOptions {
        let mut options = DriverOptions::new();
        options.insert("command".to_string(), command.into());
        options.insert(
            "workdir".to_string(),
            workdir.to_string_lossy().into_owned().into(),
        );
        options
    }

    #[test]
    fn test_command_option_is_required() {
        let err = CommandDriver::new(1, params(), &DriverOptions::new()).unwrap_err();
        assert!(matches!(err, DriverError::MissingOption(name) if name == "command"));
    }

    #[test]
    fn test_command_reads_stdout_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = CommandDriver::new(
            3,
            params(),
            &options("echo \"f $DAKDECK_VAR_x\"; echo noise", dir.path()),
        )
        .unwrap();

        driver.write_inputs().unwrap();
        assert!(dir.path().join("iters/3/inputs.json").exists());
        driver.run_analysis().unwrap();
        let results = driver.get_results().unwrap();
        assert_eq!(results.functions.get("f"), Some(&2.5));
        assert_eq!(results.functions.len(), 1);
    }

    #[test]
    fn test_failing_command_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = CommandDriver::new(1, params(), &options("exit 3", dir.path())).unwrap();
        driver.write_inputs().unwrap();
        let err = driver.run_analysis().unwrap_err();
        assert!(matches!(err, DriverError::CommandFailed { status: Some(3), .. }));
    }
}
