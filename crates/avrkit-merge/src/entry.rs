//! Entry-file services: header include and init call inside the
//! lifecycle hook (`setup()` for framework sketches, `main()` otherwise).
//!
//! These work on text patterns only. A function is found by its signature
//! line; nothing here understands C++ beyond that.

use regex::Regex;

use avrkit_core::layout::HEADER_FILE;
use avrkit_core::ProjectKind;
use avrkit_synth::INIT_ENTRY_POINT;

use crate::marker::{locate, Region};
use crate::merge::{merge_region, MergeOutcome, Placement};

/// Function that must call the generated entry point.
pub fn lifecycle_hook(kind: ProjectKind) -> &'static str {
    match kind {
        ProjectKind::Framework => "setup",
        ProjectKind::BareRegister => "main",
    }
}

/// Definition appended when the hook is missing.
fn hook_definition(kind: ProjectKind) -> &'static str {
    match kind {
        ProjectKind::Framework => "void setup() {\n}\n",
        ProjectKind::BareRegister => "int main(void) {\n    for (;;) {\n    }\n}\n",
    }
}

/// Byte offset of the opening brace of `void|int <name>(...) {`, if defined.
pub fn find_function(text: &str, name: &str) -> Option<usize> {
    let pattern = format!(
        r"(?m)^[ \t]*(?:static\s+|inline\s+)*(?:void|int)\s+{}\s*\(\s*(?:void)?\s*\)\s*\{{",
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    re.find(text).map(|m| m.end() - 1)
}

/// Number of argument-less calls to `name` in the text.
pub fn count_calls(text: &str, name: &str) -> usize {
    let pattern = format!(r"(?m)^[ \t]*{}\s*\(\s*\)\s*;", regex::escape(name));
    Regex::new(&pattern).map_or(0, |re| re.find_iter(text).count())
}

/// Whether the text includes `header` with quotes or angle brackets.
pub fn has_include(text: &str, header: &str) -> bool {
    let pattern = format!(r#"(?m)^[ \t]*#\s*include\s*["<]{}[">]"#, regex::escape(header));
    Regex::new(&pattern).is_ok_and(|re| re.is_match(text))
}

/// Byte offset inside the last top-level `#include` line, if any.
fn last_include(text: &str) -> Option<usize> {
    let re = Regex::new(r"(?m)^[ \t]*#\s*include\b").ok()?;
    re.find_iter(text).last().map(|m| m.start())
}

fn has_region(text: &str, region: Region) -> bool {
    locate(text, &region.start_token(), &region.end_token()).is_some()
}

/// Ensure the entry file includes the generated header and calls the
/// generated entry point exactly once from the lifecycle hook of `kind`.
///
/// A call or include the user already wrote outside the markers is
/// respected; otherwise a marker pair is created. A missing hook is
/// appended to the file.
pub fn merge_entry(text: &str, kind: ProjectKind) -> MergeOutcome {
    let outcome = MergeOutcome::unchanged(text).then(|text| {
        if !has_region(text, Region::Includes) && has_include(text, HEADER_FILE) {
            return MergeOutcome::unchanged(text);
        }
        let placement = last_include(text).map_or(Placement::Start, Placement::After);
        merge_region(text, Region::Includes, &format!("#include \"{HEADER_FILE}\"\n"), placement)
    });

    outcome.then(|text| {
        let hook = lifecycle_hook(kind);
        let call = format!("    {INIT_ENTRY_POINT}();\n");
        if has_region(text, Region::InitBody) {
            return merge_region(text, Region::InitBody, &call, Placement::EndOfFile);
        }
        if count_calls(text, INIT_ENTRY_POINT) > 0 {
            return MergeOutcome::unchanged(text);
        }
        if let Some(brace) = find_function(text, hook) {
            return merge_region(text, Region::InitBody, &call, Placement::After(brace));
        }

        tracing::info!(%kind, "no {hook}() found; appending one");
        let mut with_hook = text.to_string();
        if !with_hook.is_empty() && !with_hook.ends_with('\n') {
            with_hook.push('\n');
        }
        with_hook.push('\n');
        with_hook.push_str(hook_definition(kind));
        let brace = find_function(&with_hook, hook).unwrap_or(with_hook.len());
        merge_region(&with_hook, Region::InitBody, &call, Placement::After(brace))
    })
}
