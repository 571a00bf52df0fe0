//! Byte-offset merge of one marker pair.

use crate::marker::{locate, Region};

/// Where a missing marker pair is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Appended at the end of the file.
    EndOfFile,
    /// At the very start of the file.
    Start,
    /// On the line following the one containing this byte offset (an anchor
    /// such as a function's opening brace).
    After(usize),
}

/// Result of merging one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub text: String,
    /// Whether `text` differs from the input.
    pub changed: bool,
    /// Whether the marker pair had to be created.
    pub created: bool,
}

impl MergeOutcome {
    pub fn unchanged(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            changed: false,
            created: false,
        }
    }

    /// Run another merge step on the resulting text, accumulating flags.
    pub fn then(self, step: impl FnOnce(&str) -> MergeOutcome) -> Self {
        let next = step(&self.text);
        Self {
            text: next.text,
            changed: self.changed || next.changed,
            created: self.created || next.created,
        }
    }
}

/// Replace the text strictly between `start` and `end` with `new_body`.
///
/// When the pair is missing it is created at the end of the file with
/// `new_body` inside. Text outside the pair is never modified.
pub fn merge(text: &str, start: &str, end: &str, new_body: &str) -> MergeOutcome {
    merge_at(text, start, end, new_body, Placement::EndOfFile)
}

/// [`merge`] with an explicit insertion point for a missing pair.
pub fn merge_at(
    text: &str,
    start: &str,
    end: &str,
    new_body: &str,
    placement: Placement,
) -> MergeOutcome {
    if let Some(section) = locate(text, start, end) {
        let mut out = String::with_capacity(text.len() + new_body.len());
        out.push_str(&text[..section.body.start]);
        out.push_str(new_body);
        out.push_str(&text[section.body.end..]);
        let changed = out != text;
        return MergeOutcome {
            text: out,
            changed,
            created: false,
        };
    }

    let pair = format!("{start}{new_body}{end}\n");
    let mut out = String::with_capacity(text.len() + pair.len() + 1);
    match placement {
        Placement::Start => {
            out.push_str(&pair);
            out.push_str(text);
        }
        Placement::EndOfFile => {
            out.push_str(text);
            if !text.is_empty() && !text.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&pair);
        }
        Placement::After(anchor) => {
            let anchor = anchor.min(text.len());
            match text[anchor..].find('\n') {
                Some(rel) => {
                    let at = anchor + rel + 1;
                    out.push_str(&text[..at]);
                    out.push_str(&pair);
                    out.push_str(&text[at..]);
                }
                None => {
                    out.push_str(text);
                    out.push('\n');
                    out.push_str(&pair);
                }
            }
        }
    }
    MergeOutcome {
        text: out,
        changed: true,
        created: true,
    }
}

/// Frame a block of complete lines so that both tokens sit on their own lines.
pub fn frame(block: &str) -> String {
    format!("\n{block}")
}

/// Merge a framed block into one of the generated regions.
pub fn merge_region(text: &str, region: Region, block: &str, placement: Placement) -> MergeOutcome {
    let outcome = merge_at(
        text,
        &region.start_token(),
        &region.end_token(),
        &frame(block),
        placement,
    );
    if outcome.created {
        tracing::debug!(%region, "created marker pair");
    }
    outcome
}
