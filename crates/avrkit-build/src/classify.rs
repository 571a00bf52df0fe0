//! Project classification: framework vs. bare-register builds.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use avrkit_core::SourceLayout;

pub use avrkit_core::ProjectKind;

use crate::error::{BuildError, Result};

/// Result of the classification stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ProjectKind,
    /// Entry translation unit.
    pub entry: PathBuf,
    /// Other compilable sources under the source root, sorted.
    pub sources: Vec<PathBuf>,
}

const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp", "cc", "S"];

fn framework_include() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"(?m)^[ \t]*#\s*include\s*[<"]Arduino\.h[>"]"#).ok())
        .as_ref()
}

fn register_include() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?m)^[ \t]*#\s*include\s*<avr/").ok())
        .as_ref()
}

fn includes_framework(text: &str) -> bool {
    framework_include().is_some_and(|re| re.is_match(text))
}

fn defines(text: &str, function: &str) -> bool {
    let pattern = format!(r"(?m)^[ \t]*void\s+{function}\s*\(\s*(?:void)?\s*\)\s*\{{");
    Regex::new(&pattern).is_ok_and(|re| re.is_match(text))
}

/// Classify source text on its own.
///
/// `Arduino.h` wins over `<avr/...>`; sketches with `setup()` and `loop()`
/// but no includes are framework code.
pub fn classify_text(text: &str) -> Option<ProjectKind> {
    if includes_framework(text) {
        Some(ProjectKind::Framework)
    } else if register_include().is_some_and(|re| re.is_match(text)) {
        Some(ProjectKind::BareRegister)
    } else if defines(text, "setup") && defines(text, "loop") {
        Some(ProjectKind::Framework)
    } else {
        None
    }
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BuildError::io(path, e))
}

async fn project_sources(layout: &SourceLayout, entry: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    let mut dir = tokio::fs::read_dir(&layout.src_dir)
        .await
        .map_err(|e| BuildError::io(&layout.src_dir, e))?;
    while let Some(item) = dir
        .next_entry()
        .await
        .map_err(|e| BuildError::io(&layout.src_dir, e))?
    {
        let path = item.path();
        let compilable = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e));
        if compilable && path != entry && path.is_file() {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

/// Find the entry file and decide the project kind.
///
/// Any user source including `Arduino.h` makes the whole project a
/// framework build; otherwise the entry file decides. A `.ino` entry is
/// always a framework sketch. The generated files follow the project kind
/// and take no part in deciding it.
pub async fn classify(layout: &SourceLayout) -> Result<Classification> {
    let mut entry = None;
    for candidate in &layout.entry_candidates {
        if tokio::fs::try_exists(candidate).await.unwrap_or(false) {
            entry = Some(candidate.clone());
            break;
        }
    }
    let Some(entry) = entry else {
        return Err(BuildError::NoEntry {
            candidates: layout
                .entry_candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        });
    };

    let sources = project_sources(layout, &entry).await?;
    let entry_text = read(&entry).await?;

    let mut kind = classify_text(&entry_text);
    if entry.extension().is_some_and(|e| e == "ino") {
        kind = Some(ProjectKind::Framework);
    }
    if kind != Some(ProjectKind::Framework) {
        for source in sources.iter().filter(|s| !layout.is_generated(s)) {
            if includes_framework(&read(source).await?) {
                kind = Some(ProjectKind::Framework);
                break;
            }
        }
    }

    let kind = kind.ok_or_else(|| BuildError::Unclassified {
        path: entry.clone(),
    })?;
    tracing::info!(entry = %entry.display(), %kind, sources = sources.len(), "classified project");
    Ok(Classification {
        kind,
        entry,
        sources,
    })
}
