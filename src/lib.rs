//! TANDEM Application Library
//!
//! This library provides the application modules for the two-reader book
//! tracker: the shared library pool and the assignment rotation engine.

pub mod modules;

/// Re-export commonly used types
pub use modules::{register_all, ModuleDeps};
