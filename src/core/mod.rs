// Public modules
pub mod cancel;
pub mod convert;
pub mod error;
pub mod file;
pub mod lease;
pub mod paths;
pub mod search;
pub mod selection;
pub mod trigger;
pub mod vcs;
pub mod workflow;

// Public modules for CLI access
pub mod defaults;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
