//! Footnote extraction.
//!
//! Definitions (`[^id]: text` on their own line) are pulled out of the
//! source before block parsing, so they never render in place. References
//! are resolved later against the collected ids.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;

use crate::tree::Inline;

static DEFINITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\[\^([^\]\n]+)\]:[ \t]*(.+?)\r?$").unwrap());

static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\^([^\]\s]+)\]").unwrap());

/// Source with definition lines removed, plus the definitions in order of
/// first appearance.
#[derive(Debug, Clone)]
pub struct FootnotePass<'a> {
    pub body: Cow<'a, str>,
    pub definitions: Vec<(SmolStr, String)>,
}

impl FootnotePass<'_> {
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn ids(&self) -> Vec<SmolStr> {
        self.definitions.iter().map(|(id, _)| id.clone()).collect()
    }
}

/// Collect footnote definitions and strip their lines from `source`.
///
/// When an id is defined twice it keeps the first position and the last text.
pub fn extract(source: &str) -> FootnotePass<'_> {
    if !source.contains("[^") {
        return FootnotePass {
            body: Cow::Borrowed(source),
            definitions: Vec::new(),
        };
    }
    let mut definitions: Vec<(SmolStr, String)> = Vec::new();
    for caps in DEFINITION_RE.captures_iter(source) {
        let id = SmolStr::new(&caps[1]);
        let text = caps[2].trim().to_string();
        match definitions.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, existing)) => {
                tracing::debug!(%id, "duplicate footnote definition replaces text");
                *existing = text;
            }
            None => definitions.push((id, text)),
        }
    }
    let body = DEFINITION_RE.replace_all(source, "");
    FootnotePass { body, definitions }
}

/// Split `[^id]` references to known ids out of a text run.
///
/// References to undefined ids stay literal text.
pub fn split_references(text: &str, known: &[SmolStr]) -> Option<Vec<Inline>> {
    if known.is_empty() || !text.contains("[^") {
        return None;
    }
    let mut out = Vec::new();
    let mut last = 0;
    for caps in REFERENCE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let id = &caps[1];
        if !known.iter().any(|k| k == id) {
            continue;
        }
        if whole.start() > last {
            out.push(Inline::Text(text[last..whole.start()].to_string()));
        }
        out.push(Inline::FootnoteRef(SmolStr::new(id)));
        last = whole.end();
    }
    if out.is_empty() {
        return None;
    }
    if last < text.len() {
        out.push(Inline::Text(text[last..].to_string()));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_definitions_in_order() {
        let pass = extract("Text[^b] and[^a]\n\n[^b]: Draft\n[^a]: First\n[^b]: Second\n");
        assert_eq!(
            pass.definitions,
            vec![
                (SmolStr::new("b"), "Second".to_string()),
                (SmolStr::new("a"), "First".to_string()),
            ]
        );
        assert!(!pass.body.contains("Second"));
        assert!(!pass.body.contains("Draft"));
        assert!(pass.body.starts_with("Text[^b] and[^a]"));
    }

    #[test]
    fn leaves_unknown_references() {
        let known = vec![SmolStr::new("a")];
        let split = split_references("x[^a] y[^zz]", &known).unwrap();
        assert_eq!(
            split,
            vec![
                Inline::text("x"),
                Inline::FootnoteRef(SmolStr::new("a")),
                Inline::text(" y[^zz]"),
            ]
        );
        assert!(split_references("plain[^zz]", &known).is_none());
    }
}
