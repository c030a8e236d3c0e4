// Shared test infrastructure. Each test binary compiles its own copy, so
// not every helper is used everywhere.
#![allow(dead_code)]

pub mod fixtures;
pub mod harness;

pub use harness::TestHarness;
