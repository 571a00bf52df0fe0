//! Marker tokens and marked-section location.

use std::fmt;
use std::ops::Range;

/// One of the four generated-code regions.
///
/// The same tokens are used in the header, implementation and entry files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Includes,
    Declarations,
    InitBody,
    IsrBody,
}

impl Region {
    pub const ALL: [Region; 4] = [
        Region::Includes,
        Region::Declarations,
        Region::InitBody,
        Region::IsrBody,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Region::Includes => "includes",
            Region::Declarations => "declarations",
            Region::InitBody => "init",
            Region::IsrBody => "isr",
        }
    }

    /// Start sentinel. A block comment, so that a pair is valid anywhere in C.
    pub fn start_token(self) -> String {
        format!("/* avrkit:{}:begin */", self.name())
    }

    pub fn end_token(self) -> String {
        format!("/* avrkit:{}:end */", self.name())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated marker pair inside a text, by byte offsets.
///
/// `start` and `end` bound the whole pair including both tokens; `body` is
/// the range strictly between the tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedSection {
    pub start: usize,
    pub body: Range<usize>,
    pub end: usize,
}

impl MarkedSection {
    /// The text strictly between the two tokens.
    pub fn body_text<'a>(&self, text: &'a str) -> &'a str {
        &text[self.body.clone()]
    }
}

/// Locate the marker pair delimited by `start` and `end`.
///
/// The pair is the first end token that has a start token before it (and
/// after any earlier end token); the nearest such start token is used.
/// Unmatched tokens are skipped, never repaired.
pub fn locate(text: &str, start: &str, end: &str) -> Option<MarkedSection> {
    let mut from = 0;
    while let Some(rel) = text[from..].find(end) {
        let end_at = from + rel;
        if let Some(start_rel) = text[from..end_at].rfind(start) {
            let start_at = from + start_rel;
            return Some(MarkedSection {
                start: start_at,
                body: start_at + start.len()..end_at,
                end: end_at + end.len(),
            });
        }
        from = end_at + end.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: &str = "/* avrkit:init:begin */";
    const E: &str = "/* avrkit:init:end */";

    #[test]
    fn tokens_are_block_comments() {
        assert_eq!(Region::InitBody.start_token(), S);
        assert_eq!(Region::InitBody.end_token(), E);
        assert_eq!(Region::Includes.to_string(), "includes");
    }

    #[test]
    fn locates_pair() {
        let text = format!("a{S}body{E}b");
        let section = locate(&text, S, E).unwrap();
        assert_eq!(section.body_text(&text), "body");
        assert_eq!(section.start, 1);
        assert_eq!(section.end, text.len() - 1);
    }

    #[test]
    fn missing_tokens() {
        assert!(locate("", S, E).is_none());
        assert!(locate(&format!("x{S}y"), S, E).is_none());
        assert!(locate(&format!("x{E}y"), S, E).is_none());
    }

    #[test]
    fn stray_end_before_pair_is_skipped() {
        let text = format!("{E} user {S}generated{E}");
        let section = locate(&text, S, E).unwrap();
        assert_eq!(section.body_text(&text), "generated");
    }

    #[test]
    fn nearest_start_wins() {
        let text = format!("{S} orphan {S}inner{E}");
        let section = locate(&text, S, E).unwrap();
        assert_eq!(section.body_text(&text), "inner");
    }
}
