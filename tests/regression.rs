//! Common code for running regression tests.
use float_cmp::approx_eq;
use hubdesign::cli::RunOpts;
use hubdesign::cli::example::handle_example_run_command;
use hubdesign::output::RESULTS_FILE_NAME;
use hubdesign::settings::Settings;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Tolerance relative to the stored value, which allows for the tolerances of the solver
const FLOAT_CMP_TOLERANCE: f64 = 1e-6;

/// Run a bundled demo and compare its results with `tests/data/<name>/results.json`.
///
/// Every value in the stored file must be present in the new results. Values left out of the
/// stored file are not checked.
#[allow(dead_code)]
pub fn run_regression_test(demo_name: &str) {
    unsafe { std::env::set_var("HUBDESIGN_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        ..RunOpts::default()
    };
    handle_example_run_command(demo_name, &opts, Some(Settings::default())).unwrap();

    let actual = read_json(&output_dir.join(RESULTS_FILE_NAME));
    let expected = read_json(&Path::new("tests/data").join(demo_name).join(RESULTS_FILE_NAME));
    let mut errors = Vec::new();
    compare_values("", &expected, &actual, &mut errors);

    assert!(
        errors.is_empty(),
        "The following errors occurred:\n  * {}",
        errors.join("\n  * ")
    );
}

fn read_json(file_path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(file_path).unwrap()).unwrap()
}

/// Check `actual` against `expected`, recording a message for every mismatch
fn compare_values(path: &str, expected: &Value, actual: &Value, errors: &mut Vec<String>) {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => {
            for (key, expected) in expected {
                let path = format!("{path}/{key}");
                match actual.get(key) {
                    Some(actual) => compare_values(&path, expected, actual, errors),
                    None => errors.push(format!("{path}: missing")),
                }
            }
        }
        (Value::Number(expected), Value::Number(actual)) => {
            let (Some(expected), Some(actual)) = (expected.as_f64(), actual.as_f64()) else {
                errors.push(format!("{path}: not a finite number"));
                return;
            };
            let epsilon = FLOAT_CMP_TOLERANCE * expected.abs().max(1.0);
            if !approx_eq!(f64, expected, actual, epsilon = epsilon) {
                errors.push(format!("{path}: expected {expected}, found {actual}"));
            }
        }
        _ if expected != actual => {
            errors.push(format!("{path}: expected {expected}, found {actual}"));
        }
        _ => {}
    }
}
