//! A regression test for the "boiler" demo
mod regression;
use regression::run_regression_test;

#[test]
fn test_regression_boiler() {
    run_regression_test("boiler")
}
