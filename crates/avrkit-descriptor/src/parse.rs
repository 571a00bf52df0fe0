//! Line-oriented `key=value` descriptor reading, shared by platform and
//! board descriptors.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::error::{DescriptorError, Result};

/// Severity of a resolution diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Info,
    Warning,
}

/// A note about a value that was defaulted or ignored during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Info,
            message: message.into(),
        }
    }
}

/// A fully resolved profile plus the diagnostics raised while building it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved<T> {
    pub profile: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Resolved<T> {
    /// Whether any value had to be replaced with a default.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Warning)
    }

    pub fn into_profile(self) -> T {
        self.profile
    }
}

/// One `key=value` line of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub key: &'a str,
    pub value: &'a str,
    /// 1-based source line.
    pub line: usize,
}

/// Iterate the `key=value` entries of a descriptor.
///
/// Blank lines, `#` comments and lines without `=` are skipped. Keys and
/// values are trimmed; the value is everything after the first `=`.
pub fn entries(text: &str) -> impl Iterator<Item = Entry<'_>> {
    text.lines().enumerate().filter_map(|(idx, raw)| {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (key, value) = line.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Entry {
            key,
            value: value.trim(),
            line: idx + 1,
        })
    })
}

/// Read a descriptor file into memory.
pub fn read_descriptor(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(DescriptorError::NotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| DescriptorError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}

/// Split a flag string on whitespace.
pub(crate) fn split_flags(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Nesting limit for `{key}` references. Deeper or cyclic references are
/// left as written.
pub const MAX_EXPANSION_DEPTH: usize = 8;

/// Replace `{key}` references with the values of other entries.
///
/// References to keys not in `vars` are left as written; see
/// [`unresolved`].
pub fn expand(value: &str, vars: &HashMap<&str, &str>) -> String {
    expand_at(value, vars, 0)
}

fn expand_at(value: &str, vars: &HashMap<&str, &str>, depth: usize) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = &after[..close];
        match vars.get(key) {
            Some(v) if depth < MAX_EXPANSION_DEPTH => out.push_str(&expand_at(v, vars, depth + 1)),
            _ => {
                out.push('{');
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Key of the first `{key}` reference in a value, if any.
pub fn unresolved(value: &str) -> Option<&str> {
    let open = value.find('{')?;
    let close = value[open..].find('}')? + open;
    Some(&value[open + 1..close])
}
