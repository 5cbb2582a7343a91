//! The solver's per-evaluation exchange files
//!
//! The parameters file is a sequence of `<value> <label>` lines in the
//! solver's standard layout:
//!
//! ```text
//!                      2 variables
//!  1.500000000000000e+00 x1
//!                    abc s1
//!                      1 functions
//!                      1 ASV_1:f
//!                      2 derivative_variables
//!                      1 DVV_1:x1
//!                      2 DVV_2:s1
//!                      0 analysis_components
//!                      1 eval_id
//! ```

use std::fmt::Write as _;
use std::path::Path;

use super::{DriverError, DriverResults};
use crate::format;
use crate::variables::Value;

/// Active set vector bits requested for one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asv(pub u8);

impl Asv {
    pub fn value(self) -> bool {
        self.0 & 1 != 0
    }

    pub fn gradient(self) -> bool {
        self.0 & 2 != 0
    }

    pub fn hessian(self) -> bool {
        self.0 & 4 != 0
    }
}

/// Parsed parameters file
#[derive(Debug, Clone, PartialEq)]
pub struct ParamsFile {
    pub variables: Vec<(String, Value)>,
    pub functions: Vec<(String, Asv)>,
    pub derivative_variables: Vec<u32>,
    pub analysis_components: Vec<String>,
    pub eval_id: u32,
}

impl ParamsFile {
    pub fn read(path: &Path) -> Result<Self, DriverError> {
        let text = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, DriverError> {
        let mut rows = Rows::new(text);

        let n = rows.count("variables")?;
        let mut variables = Vec::with_capacity(n);
        for _ in 0..n {
            let (_, value, label) = rows.next_row("a variable row")?;
            variables.push((label.to_string(), parse_value(value)));
        }

        let n = rows.count("functions")?;
        let mut functions = Vec::with_capacity(n);
        for _ in 0..n {
            let (number, value, label) = rows.next_row("a function row")?;
            let asv = value.parse::<u8>().map_err(|_| DriverError::Parse {
                line: number,
                message: format!("invalid active set value {value:?}"),
            })?;
            let name = label.split_once(':').map_or(label, |(_, name)| name);
            functions.push((name.to_string(), Asv(asv)));
        }

        let n = rows.count("derivative_variables")?;
        let mut derivative_variables = Vec::with_capacity(n);
        for _ in 0..n {
            let (number, value, _) = rows.next_row("a derivative variable row")?;
            derivative_variables.push(value.parse::<u32>().map_err(|_| DriverError::Parse {
                line: number,
                message: format!("invalid derivative variable id {value:?}"),
            })?);
        }

        let n = rows.count("analysis_components")?;
        let mut analysis_components = Vec::with_capacity(n);
        for _ in 0..n {
            let (_, value, _) = rows.next_row("an analysis component row")?;
            analysis_components.push(value.to_string());
        }

        let (number, value, label) = rows.next_row("eval_id")?;
        if label != "eval_id" {
            return Err(DriverError::Parse {
                line: number,
                message: format!("expected eval_id, got {label:?}"),
            });
        }
        // hierarchical tags look like `1:3` or `1.3`; the evaluation is the last part
        let id = value.rsplit([':', '.']).next().unwrap_or(value);
        let eval_id = id.parse::<u32>().map_err(|_| DriverError::Parse {
            line: number,
            message: format!("invalid eval_id {value:?}"),
        })?;

        Ok(Self {
            variables,
            functions,
            derivative_variables,
            analysis_components,
            eval_id,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|(name, _)| name.as_str())
    }
}

/// Non-blank lines of a parameters file, split into `(line, value, label)`
struct Rows<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Rows<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
        }
    }

    fn next_row(&mut self, expected: &str) -> Result<(usize, &'a str, &'a str), DriverError> {
        let (index, line) = self
            .lines
            .by_ref()
            .map(|(i, line)| (i, line.trim()))
            .find(|(_, line)| !line.is_empty())
            .ok_or_else(|| DriverError::Parse {
                line: 0,
                message: format!("unexpected end of file, expected {expected}"),
            })?;
        let number = index + 1;
        let (value, label) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| DriverError::Parse {
                line: number,
                message: format!("expected `<value> <label>`, got {line:?}"),
            })?;
        Ok((number, value, label.trim()))
    }

    /// Reads a `<n> <section>` header
    fn count(&mut self, section: &str) -> Result<usize, DriverError> {
        let (number, value, label) = self.next_row(section)?;
        if label != section {
            return Err(DriverError::Parse {
                line: number,
                message: format!("expected {section} header, got {label:?}"),
            });
        }
        value.parse::<usize>().map_err(|_| DriverError::Parse {
            line: number,
            message: format!("invalid {section} count {value:?}"),
        })
    }
}

fn parse_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(x) = raw.parse::<f64>() {
        Value::Float(x)
    } else {
        Value::String(raw.to_string())
    }
}

/// Results file written back to the solver
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsFile {
    /// `<value> <name>` rows, then bracketed gradients and Hessians
    Values(String),
    /// Tells the solver the evaluation failed
    Fail,
}

impl ResultsFile {
    /// Lays out `results` in the order the parameters file lists functions,
    /// honouring each function's active set request
    pub fn from_results(params: &ParamsFile, results: &DriverResults) -> Result<Self, DriverError> {
        if results.failed {
            return Ok(ResultsFile::Fail);
        }
        let mut out = String::new();
        for (name, asv) in &params.functions {
            if asv.value() {
                let value = results
                    .functions
                    .get(name)
                    .ok_or_else(|| DriverError::MissingResult(name.clone()))?;
                let _ = writeln!(out, "{} {name}", format::float(*value));
            }
        }
        for (name, asv) in &params.functions {
            if asv.gradient() {
                let gradient = results
                    .gradients
                    .get(name)
                    .ok_or_else(|| DriverError::MissingResult(format!("{name} gradient")))?;
                let _ = writeln!(out, "[ {} ]", join_floats(gradient));
            }
        }
        for (name, asv) in &params.functions {
            if asv.hessian() {
                let hessian = results
                    .hessians
                    .get(name)
                    .ok_or_else(|| DriverError::MissingResult(format!("{name} hessian")))?;
                let rows: Vec<String> = hessian.iter().map(|row| join_floats(row)).collect();
                let _ = writeln!(out, "[[ {} ]]", rows.join("\n   "));
            }
        }
        Ok(ResultsFile::Values(out))
    }

    pub fn text(&self) -> &str {
        match self {
            ResultsFile::Values(text) => text,
            ResultsFile::Fail => "FAIL\n",
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), DriverError> {
        crate::io::atomic_write(path, self.text()).map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn join_floats(values: &[f64]) -> String {
    values
        .iter()
        .map(|x| format::float(*x))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: &str = "\
                                          2 variables
                      1.500000000000000e+00 x1
                                        abc s1
                                          2 functions
                                          1 ASV_1:f
                                          3 ASV_2:g
                                          1 derivative_variables
                                          1 DVV_1:x1
                                          0 analysis_components
                                        7 eval_id
";

    #[test]
    fn test_parse_standard_layout() {
        let params = ParamsFile::parse(PARAMS).unwrap();
        assert_eq!(params.get("x1"), Some(&Value::Float(1.5)));
        assert_eq!(params.get("s1"), Some(&Value::String("abc".to_string())));
        assert_eq!(params.function_names().collect::<Vec<_>>(), vec!["f", "g"]);
        assert!(params.functions[1].1.gradient());
        assert_eq!(params.derivative_variables, vec![1]);
        assert_eq!(params.eval_id, 7);
    }

    #[test]
    fn test_parse_hierarchical_eval_id() {
        let text = PARAMS.replace("7 eval_id", "1:12 eval_id");
        assert_eq!(ParamsFile::parse(&text).unwrap().eval_id, 12);
    }

    #[test]
    fn test_parse_rejects_truncated_file() {
        let err = ParamsFile::parse("2 variables\n1.0 x1\n").unwrap_err();
        assert!(matches!(err, DriverError::Parse { .. }));
    }

    #[test]
    fn test_results_follow_params_order() {
        let params = ParamsFile::parse(PARAMS).unwrap();
        let mut results = DriverResults::default();
        results.functions.insert("g".to_string(), 2.0);
        results.functions.insert("f".to_string(), 0.5);
        results.gradients.insert("g".to_string(), vec![1.0]);

        let file = ResultsFile::from_results(&params, &results).unwrap();
        assert_eq!(file.text(), "0.5 f\n2.0 g\n[ 1.0 ]\n");
    }

    #[test]
    fn test_failed_results_write_fail() {
        let params = ParamsFile::parse(PARAMS).unwrap();
        let results = DriverResults::failure();
        let file = ResultsFile::from_results(&params, &results).unwrap();
        assert_eq!(file.text(), "FAIL\n");
    }

    #[test]
    fn test_missing_value_is_an_error() {
        let params = ParamsFile::parse(PARAMS).unwrap();
        let mut results = DriverResults::default();
        results.functions.insert("f".to_string(), 0.5);
        let err = ResultsFile::from_results(&params, &results).unwrap_err();
        assert!(matches!(err, DriverError::MissingResult(name) if name == "g"));
    }
}
