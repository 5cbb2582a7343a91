use std::path::Path;

/// Python library location inside a solver installation
pub const DEFAULT_PYTHON_PATH: &str = "$DAKOTA/share/dakota/Python";

/// Contents of `driver.sh`, the analysis driver named in the interface block.
///
/// The script exports the solver installation for analyses that use its
/// libraries and forwards the parameters and results paths to
/// `<program> drive`.
pub fn driver_script(solver_root: &Path, python_path: Option<&str>, program: &str) -> String {
    let python_path = python_path.unwrap_or(DEFAULT_PYTHON_PATH);
    format!(
        "#! /bin/sh\n\
         # Dakota Configuration\n\
         export DAKOTA={}\n\
         export PYTHONPATH=$PYTHONPATH:{python_path}\n\
         # Pass arguments to the analysis driver\n\
         exec {program} drive \"$@\"\n",
        solver_root.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_script_defaults_python_path() {
        let script = driver_script(Path::new("/opt/dakota"), None, "dakdeck");
        assert_eq!(
            script,
            "#! /bin/sh\n\
             # Dakota Configuration\n\
             export DAKOTA=/opt/dakota\n\
             export PYTHONPATH=$PYTHONPATH:$DAKOTA/share/dakota/Python\n\
             # Pass arguments to the analysis driver\n\
             exec dakdeck drive \"$@\"\n"
        );
    }

    #[test]
    fn test_driver_script_custom_python_path() {
        let script = driver_script(Path::new("/opt/dakota"), Some("/usr/lib/dak"), "/bin/dakdeck");
        assert!(script.contains("export PYTHONPATH=$PYTHONPATH:/usr/lib/dak\n"));
        assert!(script.ends_with("exec /bin/dakdeck drive \"$@\"\n"));
    }
}
