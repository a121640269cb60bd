//! Lexical well-formedness check for S-expression sources.
//!
//! A single pass tracking parenthesis depth, `"` strings, backslash escapes
//! (inside strings and as character literals), and `;` line comments. It knows nothing about any dialect's
//! reader: it is only a cheap short-circuit before spending a toolchain
//! invocation, never a substitute for the toolchain's own compile result.

use std::fmt;

/// First lexical problem found in a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SexpIssue {
    /// A `)` with no matching `(`.
    UnexpectedClose { line: usize, column: usize },
    /// Input ended with this many open parentheses.
    Unclosed { depth: usize },
    /// Input ended inside a string literal opened at this position.
    UnterminatedString { line: usize, column: usize },
}

impl fmt::Display for SexpIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SexpIssue::UnexpectedClose { line, column } => {
                write!(f, "unexpected ')' at line {line}, column {column}")
            }
            SexpIssue::Unclosed { depth } => {
                write!(f, "{depth} unclosed '(' at end of input")
            }
            SexpIssue::UnterminatedString { line, column } => {
                write!(f, "unterminated string starting at line {line}, column {column}")
            }
        }
    }
}

/// Scans `text` and reports the first issue, if any.
///
/// An underflowing `)` is reported immediately; the end-of-input checks
/// (open string, open parens) only apply when no underflow happened.
pub fn check(text: &str) -> Result<(), SexpIssue> {
    let mut depth = 0usize;
    let mut string_start: Option<(usize, usize)> = None;
    let mut escape_next = false;
    let mut in_comment = false;
    let mut line = 1usize;
    let mut column = 0usize;

    for c in text.chars() {
        if c == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }

        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }

        if escape_next {
            escape_next = false;
            continue;
        }

        if string_start.is_some() {
            if c == '\\' {
                escape_next = true;
            } else if c == '"' {
                string_start = None;
            }
            continue;
        }

        match c {
            // Character literals: clj `\(`, CL and Scheme `#\(`, Emacs Lisp `?\(`.
            '\\' => escape_next = true,
            '"' => string_start = Some((line, column)),
            ';' => in_comment = true,
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Err(SexpIssue::UnexpectedClose { line, column });
                }
                depth -= 1;
            }
            _ => {}
        }
    }

    if let Some((line, column)) = string_start {
        return Err(SexpIssue::UnterminatedString { line, column });
    }
    if depth > 0 {
        return Err(SexpIssue::Unclosed { depth });
    }
    Ok(())
}

/// True when `text` could still be extended into a well-formed source.
pub fn is_viable_prefix(text: &str) -> bool {
    !matches!(check(text), Err(SexpIssue::UnexpectedClose { .. }))
}

/// True when `text` is balanced and does not end inside a string.
pub fn is_well_formed(text: &str) -> bool {
    check(text).is_ok()
}
