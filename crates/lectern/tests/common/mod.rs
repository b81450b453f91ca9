//! Shared test utilities for lectern integration tests.
//!
//! - `TestHarness`: an isolated store, blob directory and mock upstreams
//! - builders for PDFs, multipart bodies and mocked upstream replies

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
