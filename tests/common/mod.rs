//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use blockflow::{BlockError, Completion};
use std::time::Duration;

/// Upper bound for any single completion wait in tests
pub fn test_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Wait for `completion`, failing the test instead of hanging
pub fn wait(completion: &Completion) -> Result<(), BlockError> {
    completion
        .wait_timeout(test_timeout())
        .expect("block did not complete in time")
}

/// Wait and assert success
pub fn wait_ok(completion: &Completion) {
    if let Err(error) = wait(completion) {
        panic!("expected success, block faulted: {}", error);
    }
}

/// Wait and assert a fault
pub fn wait_err(completion: &Completion) -> BlockError {
    match wait(completion) {
        Ok(()) => panic!("expected a fault, block succeeded"),
        Err(error) => error,
    }
}
