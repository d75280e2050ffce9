pub mod actions;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use actions::{read_error, read_json, set_cookie_value};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
