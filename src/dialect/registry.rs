//! Dialect descriptors and the tag-keyed registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DialectError;

/// Invocation table for one dialect.
///
/// Both command templates are argv prefixes: the path of the source file is
/// appended as the final argument at invocation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectDescriptor {
    /// Unique dialect tag (e.g. "clj", "scm").
    pub tag: String,
    /// Compile/load command template.
    pub compile: Vec<String>,
    /// Test command template.
    pub test: Vec<String>,
    /// Extension for temporary sources, including the leading dot.
    pub extension: String,
}

impl DialectDescriptor {
    /// Creates a descriptor from string slices.
    pub fn new(tag: &str, compile: &[&str], test: &[&str], extension: &str) -> Self {
        Self {
            tag: tag.to_string(),
            compile: compile.iter().map(|s| s.to_string()).collect(),
            test: test.iter().map(|s| s.to_string()).collect(),
            extension: extension.to_string(),
        }
    }

    /// Checks that the descriptor can actually be invoked.
    pub fn validate(&self) -> Result<(), DialectError> {
        let invalid = |reason: &str| DialectError::InvalidDescriptor {
            tag: self.tag.clone(),
            reason: reason.to_string(),
        };

        if self.tag.trim().is_empty() {
            return Err(invalid("tag must not be empty"));
        }
        if self.compile.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(invalid("compile command must name a program"));
        }
        if self.test.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(invalid("test command must name a program"));
        }
        if !self.extension.starts_with('.') || self.extension.len() < 2 {
            return Err(invalid("extension must start with '.'"));
        }
        Ok(())
    }
}

/// Read-only mapping from dialect tag to descriptor.
///
/// Built once at startup and shared (behind an `Arc`) by every evaluation.
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    entries: BTreeMap<String, DialectDescriptor>,
}

impl DialectRegistry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the five built-in dialects.
    pub fn builtin() -> Self {
        let descriptors = [
            DialectDescriptor::new("clj", &["clojure", "-M", "-e"], &["clojure", "-M:test"], ".clj"),
            DialectDescriptor::new(
                "cljs",
                &["clojure", "-M:shadow", "compile"],
                &["clojure", "-M:test"],
                ".cljs",
            ),
            DialectDescriptor::new("lisp", &["sbcl", "--script"], &["sbcl", "--load"], ".lisp"),
            DialectDescriptor::new(
                "el",
                &["emacs", "--batch", "--eval"],
                &["emacs", "--batch", "-l", "ert", "-f", "ert-run-tests-batch-and-exit"],
                ".el",
            ),
            DialectDescriptor::new("scm", &["guile", "-c"], &["guile", "-l"], ".scm"),
        ];

        let entries = descriptors
            .into_iter()
            .map(|d| (d.tag.clone(), d))
            .collect();
        Self { entries }
    }

    /// Adds a descriptor, replacing any existing entry with the same tag.
    pub fn with_descriptor(mut self, descriptor: DialectDescriptor) -> Result<Self, DialectError> {
        descriptor.validate()?;
        self.entries.insert(descriptor.tag.clone(), descriptor);
        Ok(self)
    }

    /// Looks up the descriptor for a tag.
    pub fn lookup(&self, tag: &str) -> Result<&DialectDescriptor, DialectError> {
        self.entries
            .get(tag)
            .ok_or_else(|| DialectError::UnsupportedDialect(tag.to_string()))
    }

    /// Returns true if the tag is registered.
    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// All descriptors in tag order.
    pub fn descriptors(&self) -> impl Iterator<Item = &DialectDescriptor> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
