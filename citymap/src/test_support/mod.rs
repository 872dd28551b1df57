//! Test utilities for the citymap crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or with
//! the `test-support` feature.

pub mod features;
pub mod scripted_source;
