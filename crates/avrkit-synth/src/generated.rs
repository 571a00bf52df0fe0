//! Synthesis output.

use std::collections::BTreeSet;

use serde::Serialize;

use avrkit_core::ProjectKind;

/// Name of the generated initialization entry point.
pub const INIT_ENTRY_POINT: &str = "pins_init_all";

/// Code fragments produced by synthesis.
///
/// Pure value: it owns no file-system state. Each text field is a sequence
/// of complete lines (every line ends with `\n`), or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedCode {
    /// Runtime the fragments are written against.
    pub target: ProjectKind,
    /// Include directives, deduplicated. Rendered in sorted order.
    pub includes: BTreeSet<String>,
    /// Pin aliases and prototypes for the generated header.
    pub declarations: String,
    /// Statements forming the body of `pins_init_all()`.
    pub init_body: String,
    /// Interrupt handler definitions; empty when no interrupt is enabled.
    pub isr_body: String,
}

impl GeneratedCode {
    /// Include directives as a block of lines.
    pub fn include_block(&self) -> String {
        self.includes.iter().map(|inc| format!("{inc}\n")).collect()
    }

    pub fn has_isr(&self) -> bool {
        !self.isr_body.is_empty()
    }

    /// Prototype of the generated entry point.
    pub fn entry_point_prototype() -> String {
        format!("void {INIT_ENTRY_POINT}(void);")
    }

    pub(crate) fn for_target(target: ProjectKind) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub(crate) fn include(&mut self, header: &str) {
        self.includes.insert(format!("#include {header}"));
    }

    pub(crate) fn declare(&mut self, line: impl AsRef<str>) {
        push_line(&mut self.declarations, line.as_ref(), 0);
    }

    pub(crate) fn init(&mut self, statement: impl AsRef<str>) {
        push_line(&mut self.init_body, statement.as_ref(), 4);
    }

    pub(crate) fn isr(&mut self, line: impl AsRef<str>) {
        push_line(&mut self.isr_body, line.as_ref(), 0);
    }
}

fn push_line(buf: &mut String, line: &str, indent: usize) {
    if !line.is_empty() {
        buf.extend(std::iter::repeat(' ').take(indent));
    }
    buf.push_str(line);
    buf.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_are_deduplicated_and_sorted() {
        let mut code = GeneratedCode::default();
        code.include("<Wire.h>");
        code.include("<Arduino.h>");
        code.include("<Wire.h>");
        assert_eq!(code.include_block(), "#include <Arduino.h>\n#include <Wire.h>\n");
    }

    #[test]
    fn init_lines_are_indented() {
        let mut code = GeneratedCode::default();
        code.init("Wire.begin();");
        assert_eq!(code.init_body, "    Wire.begin();\n");
        assert!(!code.has_isr());
    }
}
