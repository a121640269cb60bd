//! Dialect registry.
//!
//! Each supported dialect is a data record keyed by its tag: the compile/load
//! command template, the test command template, and the file extension used
//! for temporary sources. Adding a toolchain means adding a descriptor, either
//! in [`DialectRegistry::builtin`] or through the `dialects` list of a
//! harness configuration file.
//!
//! # Example
//!
//! ```ignore
//! use lisp_harness::dialect::DialectRegistry;
//!
//! let registry = DialectRegistry::builtin();
//! let scheme = registry.lookup("scm")?;
//! assert_eq!(scheme.extension, ".scm");
//! ```

pub mod registry;

pub use registry::{DialectDescriptor, DialectRegistry};
