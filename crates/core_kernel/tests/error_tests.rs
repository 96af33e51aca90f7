//! Tests for core_kernel error types

use core_kernel::error::CoreError;

#[test]
fn test_core_error_configuration() {
    let error = CoreError::configuration("base_url is empty");

    match &error {
        CoreError::Configuration(msg) => assert_eq!(msg, "base_url is empty"),
    }
    let display = format!("{}", error);
    assert!(display.contains("Configuration error"));
    assert!(display.contains("base_url"));
}
