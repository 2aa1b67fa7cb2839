//! Find and replace over the editor's text content.

use std::ops::Range;

use mdbase_markdown::{Block, EditorSurface, Inline, Node, NodePath};

/// One occurrence: a text leaf and a byte range inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub path: NodePath,
    pub range: Range<usize>,
}

/// Ordered occurrences of a search term plus the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    term: String,
    matches: Vec<Match>,
    current: Option<usize>,
}

impl MatchSet {
    /// Case-insensitive search through text spans, inline code and code blocks.
    pub fn search(surface: &EditorSurface, term: &str) -> Self {
        let mut matches = Vec::new();
        if !term.is_empty() {
            surface.walk(&mut |path, node| {
                let text = match node {
                    Node::Inline(Inline::Text(s)) | Node::Inline(Inline::Code(s)) => s.as_str(),
                    Node::Block(Block::CodeBlock(code)) => code.code.as_str(),
                    _ => return,
                };
                for range in find_ignore_case(text, term) {
                    matches.push(Match {
                        path: path.clone(),
                        range,
                    });
                }
            });
        }
        tracing::debug!(term, count = matches.len(), "search");
        let current = (!matches.is_empty()).then_some(0);
        Self {
            term: term.to_string(),
            matches,
            current,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Match> {
        self.matches.get(self.current?)
    }

    pub fn find_next(&mut self) -> Option<&Match> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        self.current = Some(self.current.map_or(0, |i| (i + 1) % len));
        self.current()
    }

    pub fn find_previous(&mut self) -> Option<&Match> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        self.current = Some(self.current.map_or(0, |i| (i + len - 1) % len));
        self.current()
    }

    /// Replace the current occurrence and drop it from the set.
    ///
    /// The pointer stays on the same index, wrapping to the front when the
    /// last occurrence was replaced.
    pub fn replace_current(&mut self, surface: &mut EditorSurface, replacement: &str) -> bool {
        let Some(index) = self.current else {
            return false;
        };
        let found = self.matches.remove(index);
        let Some(text) = surface.text_slot_mut(&found.path) else {
            tracing::warn!(path = %found.path, "match no longer points at text");
            self.reset_pointer(index);
            return false;
        };
        let replaced = if text.get(found.range.clone()).is_some() {
            text.replace_range(found.range.clone(), replacement);
            true
        } else {
            false
        };

        if replaced {
            let delta = replacement.len() as isize - found.range.len() as isize;
            for later in self
                .matches
                .iter_mut()
                .filter(|m| m.path == found.path && m.range.start >= found.range.end)
            {
                later.range.start = (later.range.start as isize + delta) as usize;
                later.range.end = (later.range.end as isize + delta) as usize;
            }
        }
        self.reset_pointer(index);
        replaced
    }

    /// Replace every occurrence. Returns how many were replaced.
    pub fn replace_all(&mut self, surface: &mut EditorSurface, replacement: &str) -> usize {
        let mut count = 0;
        // Back to front so earlier ranges in the same leaf stay valid.
        for found in self.matches.drain(..).rev() {
            if let Some(text) = surface.text_slot_mut(&found.path)
                && text.get(found.range.clone()).is_some()
            {
                text.replace_range(found.range, replacement);
                count += 1;
            }
        }
        self.current = None;
        count
    }

    fn reset_pointer(&mut self, index: usize) {
        self.current = match self.matches.len() {
            0 => None,
            len => Some(index % len),
        };
    }
}

/// Non-overlapping byte ranges of `needle` in `haystack`, ignoring case.
fn find_ignore_case(haystack: &str, needle: &str) -> Vec<Range<usize>> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    let mut found = Vec::new();
    let mut skip_until = 0;
    for (start, _) in haystack.char_indices() {
        if start < skip_until {
            continue;
        }
        if let Some(end) = match_at(&haystack[start..], &needle) {
            found.push(start..start + end);
            skip_until = start + end;
        }
    }
    found
}

/// Byte length of the prefix of `text` matching the lowercased `needle`.
fn match_at(text: &str, needle: &[char]) -> Option<usize> {
    let mut pending = needle.iter();
    let mut lowered = Vec::with_capacity(2);
    for (offset, c) in text.char_indices() {
        lowered.clear();
        lowered.extend(c.to_lowercase());
        for lc in &lowered {
            if pending.next() != Some(lc) {
                return None;
            }
        }
        if pending.as_slice().is_empty() {
            return Some(offset + c.len_utf8());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdbase_markdown::{parse_markdown, to_markdown};

    #[test]
    fn finds_across_text_and_code() {
        let surface = parse_markdown("Cat and **cat**\n\n`CAT`\n\n```\ncat\n```");
        let set = MatchSet::search(&surface, "cat");
        assert_eq!(set.len(), 4);
        assert_eq!(set.current_index(), Some(0));
    }

    #[test]
    fn navigation_wraps() {
        let surface = parse_markdown("a a a");
        let mut set = MatchSet::search(&surface, "A");
        assert_eq!(set.find_next().unwrap().range, 2..3);
        assert_eq!(set.find_next().unwrap().range, 4..5);
        assert_eq!(set.find_next().unwrap().range, 0..1);
        assert_eq!(set.find_previous().unwrap().range, 4..5);
    }

    #[test]
    fn replace_current_shrinks_and_shifts() {
        let mut surface = parse_markdown("x one x two x");
        let mut set = MatchSet::search(&surface, "x");
        set.find_next();
        assert!(set.replace_current(&mut surface, "longer"));
        assert_eq!(to_markdown(&surface), "x one longer two x");
        assert_eq!(set.len(), 2);
        assert_eq!(set.current_index(), Some(1));
        assert_eq!(set.current().unwrap().range, 17..18);

        assert!(set.replace_current(&mut surface, "y"));
        assert_eq!(set.current_index(), Some(0));
        assert!(set.replace_current(&mut surface, "z"));
        assert_eq!(set.current_index(), None);
        assert_eq!(to_markdown(&surface), "z one longer two y");
    }

    #[test]
    fn replace_all_rewrites_every_match() {
        let mut surface = parse_markdown("Foo foo *FOO*");
        let mut set = MatchSet::search(&surface, "foo");
        assert_eq!(set.replace_all(&mut surface, "bar"), 3);
        assert!(set.is_empty());
        assert_eq!(to_markdown(&surface), "bar bar _bar_");
    }

    #[test]
    fn empty_term_matches_nothing() {
        let surface = parse_markdown("text");
        assert!(MatchSet::search(&surface, "").is_empty());
    }

    #[test]
    fn case_folding_keeps_byte_ranges() {
        assert_eq!(find_ignore_case("ÅSA åsa", "åsa"), vec![0..4, 5..9]);
    }
}
