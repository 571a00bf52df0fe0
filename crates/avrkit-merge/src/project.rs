//! Applying generated code to a project's source files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use avrkit_core::layout::{SourceLayout, HEADER_FILE};
use avrkit_core::ProjectKind;
use avrkit_synth::{GeneratedCode, INIT_ENTRY_POINT};

use crate::entry::{find_function, merge_entry};
use crate::error::{MergeError, Result};
use crate::marker::Region;
use crate::merge::{merge_region, MergeOutcome, Placement};

const GENERATED_BANNER: &str =
    "// Generated by avrkit. Code outside the avrkit marker comments is preserved.\n";

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            FileAction::Created => "created",
            FileAction::Updated => "updated",
            FileAction::Unchanged => "unchanged",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: PathBuf,
    pub action: FileAction,
    /// Whether at least one marker pair had to be created.
    pub markers_created: bool,
}

/// Per-file outcome of [`apply`], in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub files: Vec<FileChange>,
}

impl MergeReport {
    /// Number of files written.
    pub fn written(&self) -> usize {
        self.files
            .iter()
            .filter(|c| c.action != FileAction::Unchanged)
            .count()
    }

    pub fn action_for(&self, path: &Path) -> Option<FileAction> {
        self.files.iter().find(|c| c.path == path).map(|c| c.action)
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in &self.files {
            write!(f, "  {:<9} {}", change.action, change.path.display())?;
            if change.markers_created {
                write!(f, " (markers added)")?;
            }
            writeln!(f)?;
        }
        write!(f, "{} of {} file(s) written", self.written(), self.files.len())
    }
}

fn pair(region: Region) -> String {
    format!("{}\n{}\n", region.start_token(), region.end_token())
}

/// Initial content of a missing declarations header.
pub fn header_skeleton() -> String {
    format!("{GENERATED_BANNER}#pragma once\n\n{}", pair(Region::Declarations))
}

/// Initial content of a missing implementation file.
pub fn implementation_skeleton() -> String {
    format!(
        "{GENERATED_BANNER}{}#include \"{HEADER_FILE}\"\n\n\
         void {INIT_ENTRY_POINT}(void) {{\n{}}}\n\n{}",
        pair(Region::Includes),
        pair(Region::InitBody),
        pair(Region::IsrBody),
    )
}

/// Initial content of a missing entry file.
pub fn entry_skeleton(kind: ProjectKind) -> String {
    match kind {
        ProjectKind::Framework => {
            "#include <Arduino.h>\n\nvoid setup() {\n}\n\nvoid loop() {\n}\n".to_string()
        }
        ProjectKind::BareRegister => {
            "#include <avr/io.h>\n\nint main(void) {\n    for (;;) {\n    }\n}\n".to_string()
        }
    }
}

/// Merge generated declarations into the header text.
///
/// The declarations get C linkage so that C entry files and the C++
/// implementation agree on the symbol names.
pub fn merge_header(text: &str, code: &GeneratedCode) -> MergeOutcome {
    let content = format!(
        "#ifdef __cplusplus\nextern \"C\" {{\n#endif\n{}#ifdef __cplusplus\n}}\n#endif\n",
        code.declarations
    );
    merge_region(text, Region::Declarations, &content, Placement::EndOfFile)
}

/// Merge includes, the init body and interrupt handlers into the
/// implementation text.
///
/// The interrupt region is cleared when no handler is generated, and only
/// created when one is.
pub fn merge_implementation(text: &str, code: &GeneratedCode) -> MergeOutcome {
    MergeOutcome::unchanged(text)
        .then(|t| merge_region(t, Region::Includes, &code.include_block(), Placement::Start))
        .then(|t| {
            if let Some(brace) = find_function(t, INIT_ENTRY_POINT) {
                return merge_region(t, Region::InitBody, &code.init_body, Placement::After(brace));
            }
            let mut with_fn = t.to_string();
            if !with_fn.is_empty() && !with_fn.ends_with('\n') {
                with_fn.push('\n');
            }
            with_fn.push_str(&format!("\nvoid {INIT_ENTRY_POINT}(void) {{\n}}\n"));
            let brace = find_function(&with_fn, INIT_ENTRY_POINT).unwrap_or(with_fn.len());
            merge_region(&with_fn, Region::InitBody, &code.init_body, Placement::After(brace))
        })
        .then(|t| {
            let exists = crate::marker::locate(
                t,
                &Region::IsrBody.start_token(),
                &Region::IsrBody.end_token(),
            )
            .is_some();
            if code.has_isr() || exists {
                merge_region(t, Region::IsrBody, &code.isr_body, Placement::EndOfFile)
            } else {
                MergeOutcome::unchanged(t)
            }
        })
}

async fn read_or(path: &Path, skeleton: impl FnOnce() -> String) -> Result<(String, bool)> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok((text, false)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok((skeleton(), true)),
        Err(source) => Err(MergeError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn write_if_changed(
    path: &Path,
    outcome: MergeOutcome,
    is_new: bool,
) -> Result<FileChange> {
    let action = if is_new {
        FileAction::Created
    } else if outcome.changed {
        FileAction::Updated
    } else {
        FileAction::Unchanged
    };
    if action != FileAction::Unchanged {
        tokio::fs::write(path, outcome.text.as_bytes())
            .await
            .map_err(|source| MergeError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(path = %path.display(), %action, "wrote generated code");
    }
    Ok(FileChange {
        path: path.to_path_buf(),
        action,
        markers_created: outcome.created && !is_new,
    })
}

async fn existing_entry(layout: &SourceLayout) -> Option<PathBuf> {
    for candidate in &layout.entry_candidates {
        if tokio::fs::try_exists(candidate).await.unwrap_or(false) {
            return Some(candidate.clone());
        }
    }
    None
}

/// Merge generated code into the header, implementation and entry files.
///
/// Missing files are created from skeletons; a file is only written when
/// its bytes change. The entry file is treated according to
/// [`GeneratedCode::target`].
pub async fn apply(layout: &SourceLayout, code: &GeneratedCode) -> Result<MergeReport> {
    tokio::fs::create_dir_all(&layout.src_dir)
        .await
        .map_err(|source| MergeError::Write {
            path: layout.src_dir.clone(),
            source,
        })?;

    let mut report = MergeReport::default();

    let (text, is_new) = read_or(&layout.header, header_skeleton).await?;
    let outcome = merge_header(&text, code);
    report
        .files
        .push(write_if_changed(&layout.header, outcome, is_new).await?);

    let (text, is_new) = read_or(&layout.implementation, implementation_skeleton).await?;
    let outcome = merge_implementation(&text, code);
    report
        .files
        .push(write_if_changed(&layout.implementation, outcome, is_new).await?);

    let entry = match existing_entry(layout).await {
        Some(path) => path,
        None => layout.default_entry().to_path_buf(),
    };
    let (text, is_new) = read_or(&entry, || entry_skeleton(code.target)).await?;
    let outcome = merge_entry(&text, code.target);
    report.files.push(write_if_changed(&entry, outcome, is_new).await?);

    tracing::debug!(written = report.written(), "merge complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> GeneratedCode {
        let mut code = GeneratedCode::default();
        code.includes.insert("#include <Arduino.h>".into());
        code.declarations = "void pins_init_all(void);\n#define LED 13\n".into();
        code.init_body = "    pinMode(13, OUTPUT);\n".into();
        code
    }

    #[test]
    fn skeletons_carry_every_pair_once() {
        let header = header_skeleton();
        assert_eq!(header.matches("avrkit:declarations:begin").count(), 1);
        let implementation = implementation_skeleton();
        for region in [Region::Includes, Region::InitBody, Region::IsrBody] {
            assert_eq!(implementation.matches(&region.start_token()).count(), 1);
        }
    }

    #[test]
    fn header_declarations_have_c_linkage() {
        let out = merge_header(&header_skeleton(), &code());
        assert!(out.text.contains(
            "/* avrkit:declarations:begin */\n\
             #ifdef __cplusplus\nextern \"C\" {\n#endif\n\
             void pins_init_all(void);\n#define LED 13\n\
             #ifdef __cplusplus\n}\n#endif\n\
             /* avrkit:declarations:end */\n"
        ));
        assert_eq!(merge_header(&out.text, &code()).text, out.text);
    }

    #[test]
    fn implementation_fills_skeleton() {
        let out = merge_implementation(&implementation_skeleton(), &code());
        assert!(!out.created);
        assert!(out.text.contains(
            "void pins_init_all(void) {\n/* avrkit:init:begin */\n    pinMode(13, OUTPUT);\n\
             /* avrkit:init:end */\n}\n"
        ));
        assert!(out.text.contains(
            "/* avrkit:includes:begin */\n#include <Arduino.h>\n/* avrkit:includes:end */\n"
        ));
    }

    #[test]
    fn isr_region_not_created_without_handlers() {
        let text = "void pins_init_all(void) {\n}\n";
        let out = merge_implementation(text, &code());
        assert!(!out.text.contains("avrkit:isr:begin"));

        let mut with_isr = code();
        with_isr.isr_body = "ISR(WDT_vect) {\n}\n".into();
        let out = merge_implementation(text, &with_isr);
        assert!(out
            .text
            .ends_with("/* avrkit:isr:begin */\nISR(WDT_vect) {\n}\n/* avrkit:isr:end */\n"));

        // Disabling the interrupt later empties the region instead of leaving stale handlers.
        let cleared = merge_implementation(&out.text, &code());
        assert!(cleared.text.ends_with("/* avrkit:isr:begin */\n/* avrkit:isr:end */\n"));
    }

    #[test]
    fn missing_init_function_is_appended() {
        let out = merge_implementation("// user notes\n", &code());
        assert!(out.text.starts_with("/* avrkit:includes:begin */"));
        assert!(out.text.contains("// user notes\n"));
        assert_eq!(out.text.matches("void pins_init_all(void) {").count(), 1);
        let again = merge_implementation(&out.text, &code());
        assert_eq!(again.text, out.text);
    }

    #[tokio::test]
    async fn apply_creates_then_leaves_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SourceLayout::new(dir.path(), "blink");

        let report = apply(&layout, &code()).await.unwrap();
        assert_eq!(report.files.len(), 3);
        assert!(report.files.iter().all(|c| c.action == FileAction::Created));
        assert_eq!(report.files[2].path, layout.default_entry());

        let report = apply(&layout, &code()).await.unwrap();
        assert_eq!(report.written(), 0);
        assert!(report.to_string().contains("0 of 3 file(s) written"));
    }

    #[tokio::test]
    async fn apply_preserves_user_code() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SourceLayout::new(dir.path(), "blink");
        std::fs::create_dir_all(&layout.src_dir).unwrap();
        let sketch = layout.src_dir.join("blink.ino");
        std::fs::write(
            &sketch,
            "#include <Arduino.h>\n\nvoid setup() {\n  Serial.begin(9600);\n}\n\n\
             void loop() {\n  blink();\n}\n",
        )
        .unwrap();

        apply(&layout, &code()).await.unwrap();
        let mut header = std::fs::read_to_string(&layout.header).unwrap();
        header.push_str("// user addition\n");
        std::fs::write(&layout.header, &header).unwrap();

        let mut changed = code();
        changed.declarations.push_str("#define BUTTON 2\n");
        let report = apply(&layout, &changed).await.unwrap();
        assert_eq!(report.action_for(&layout.header), Some(FileAction::Updated));
        assert_eq!(report.action_for(&sketch), Some(FileAction::Unchanged));

        let header = std::fs::read_to_string(&layout.header).unwrap();
        assert!(header.ends_with("// user addition\n"));
        assert!(header.contains("#define BUTTON 2\n"));
        let entry = std::fs::read_to_string(&sketch).unwrap();
        assert!(entry.contains("  Serial.begin(9600);\n"));
        assert!(entry.contains("  blink();\n"));
        assert_eq!(entry.matches("pins_init_all();").count(), 1);
    }

    #[tokio::test]
    async fn bare_register_entry_keeps_its_main() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SourceLayout::new(dir.path(), "blink");
        std::fs::create_dir_all(&layout.src_dir).unwrap();
        let main = layout.src_dir.join("main.c");
        std::fs::write(
            &main,
            "#include <avr/io.h>\n\nint main(void) {\n    for (;;) {\n    }\n}\n",
        )
        .unwrap();

        let mut bare = code();
        bare.target = ProjectKind::BareRegister;
        bare.includes.clear();
        bare.includes.insert("#include <avr/io.h>".into());
        let report = apply(&layout, &bare).await.unwrap();
        assert_eq!(report.action_for(&main), Some(FileAction::Updated));

        let entry = std::fs::read_to_string(&main).unwrap();
        assert!(!entry.contains("setup"));
        assert!(!entry.contains("Arduino.h"));
        assert!(entry.contains("int main(void) {\n/* avrkit:init:begin */\n    pins_init_all();"));
        let header = std::fs::read_to_string(&layout.header).unwrap();
        assert!(header.contains("extern \"C\""));
        let implementation = std::fs::read_to_string(&layout.implementation).unwrap();
        assert!(!implementation.contains("Arduino.h"));
    }

    #[test]
    fn entry_skeleton_follows_the_kind() {
        assert!(entry_skeleton(ProjectKind::Framework).contains("void setup() {"));
        let bare = entry_skeleton(ProjectKind::BareRegister);
        assert!(bare.contains("int main(void) {"));
        assert!(!bare.contains("Arduino.h"));
    }
}
