//! Integration tests for the `example run` command.
use hubdesign::cli::RunOpts;
use hubdesign::cli::example::handle_example_run_command;
use hubdesign::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example run` command.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("HUBDESIGN_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().join("results")),
        ..RunOpts::default()
    };
    handle_example_run_command("simple", &opts, Some(Settings::default())).unwrap();
}
