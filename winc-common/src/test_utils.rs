//! Test utilities shared across winc crates. Enable the `test-utils` feature
//! to use these from another crate's tests.

pub mod roundtrip;
