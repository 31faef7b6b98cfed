// ABOUTME: Test helper modules shared across integration tests
// ABOUTME: Re-exports the Axum request builder utilities

// Each test binary uses a subset of the helpers.
#[allow(dead_code)]
pub mod axum_test;
