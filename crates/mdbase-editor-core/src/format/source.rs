//! Formatting on the Markdown source pane.
//!
//! Active-state checks look at the text around the caret; toggles rewrite
//! the text and then reposition the selection over the logical text the
//! user had selected.

use crate::source::SourceSurface;
use crate::text_helpers::{find_line_end, find_line_start, line_at};
use crate::types::Selection;

const FENCE: &str = "```";

/// What [`toggle_wrap`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapOutcome {
    /// The markers sat just outside the selection and were removed.
    UnwrappedOutside,
    /// The selection itself started and ended with the markers.
    UnwrappedInside,
    Wrapped,
}

/// What [`toggle_code_fence`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceOutcome {
    Wrapped,
    Unwrapped,
    /// Inside a fence without a closing line.
    Unchanged,
}

/// Whether the caret sits between an opening and a closing `marker` on its line.
///
/// Markers toggle open/closed left to right. An opening marker only counts
/// when the caret is past its start, so a caret right after `**` and before
/// the word is inside. A selection that itself spans `**word**` is also
/// reported active.
pub fn marker_active(src: &SourceSurface, marker: &str) -> bool {
    if marker.is_empty() {
        return false;
    }
    let pos = src.selection().start();
    let (line_start, line) = line_at(src.buffer(), pos);
    let line: Vec<char> = line.chars().collect();
    let marker: Vec<char> = marker.chars().collect();
    let pos_in_line = pos - line_start;

    let mut open = false;
    let mut i = 0;
    while i < line.len() {
        if line[i..].starts_with(&marker) {
            if !open {
                if pos_in_line > i {
                    open = true;
                }
            } else {
                if pos_in_line <= i {
                    return true;
                }
                open = false;
            }
            i += marker.len();
        } else {
            i += 1;
        }
    }

    let selected: Vec<char> = src.selected_text().chars().collect();
    selected.len() > marker.len() * 2 && selected.starts_with(&marker) && selected.ends_with(&marker)
}

/// Whether the caret's line starts with `prefix` (`# `, `## `, `> `, ...).
pub fn line_prefix_active(src: &SourceSurface, prefix: &str) -> bool {
    let (_, line) = line_at(src.buffer(), src.selection().start());
    line.starts_with(prefix)
}

/// Whether the caret sits between an `open` tag and the next `close` tag on
/// its line, or the selection is exactly a wrapped span.
pub fn tag_active(src: &SourceSurface, open: &str, close: &str) -> bool {
    let selected = src.selected_text();
    if selected.len() > open.len() + close.len()
        && selected.starts_with(open)
        && selected.ends_with(close)
    {
        return true;
    }
    let pos = src.selection().start();
    let (line_start, line) = line_at(src.buffer(), pos);
    let split = line
        .char_indices()
        .nth(pos - line_start)
        .map_or(line.len(), |(i, _)| i);
    let (before, after) = line.split_at(split);
    let opened = match (before.rfind(open), before.rfind(close)) {
        (Some(o), Some(c)) => o > c,
        (Some(_), None) => true,
        _ => false,
    };
    opened && after.contains(close)
}

/// Toggle a line prefix on the line(s) the selection touches.
///
/// The selection is widened to whole lines first, so a prefixed line is
/// recognized wherever the caret sits on it.
pub fn toggle_line_prefix(src: &mut SourceSurface, prefix: &str) -> WrapOutcome {
    let start = find_line_start(src.buffer(), src.selection().start());
    let end = find_line_end(src.buffer(), src.selection().end());
    src.set_selection(Selection::new(start, end));
    toggle_wrap(src, prefix, "")
}

/// Fence-parity heuristic: an odd number of lines starting with a triple
/// backtick before the caret means the caret is inside a fenced block.
///
/// Fence balance is not validated, so an unclosed fence earlier in the
/// document flips the answer for everything after it.
pub fn inside_fence(src: &SourceSurface) -> bool {
    let before = src.slice(0..src.selection().start());
    before.split('\n').filter(|line| line.starts_with(FENCE)).count() % 2 == 1
}

/// Toggle `before`/`after` markers around the selection.
///
/// Checked in order: markers immediately outside the selection are removed;
/// markers at both ends of the selected text are stripped; otherwise the
/// selection is wrapped. The selection ends up over the same logical text.
pub fn toggle_wrap(src: &mut SourceSurface, before: &str, after: &str) -> WrapOutcome {
    let start = src.selection().start();
    let end = src.selection().end();
    let before_len = before.chars().count();
    let after_len = after.chars().count();

    let outside = start >= before_len
        && end + after_len <= src.len_chars()
        && src.slice(start - before_len..start) == before
        && src.slice(end..end + after_len) == after;
    if outside {
        src.replace(end..end + after_len, "");
        src.replace(start - before_len..start, "");
        src.set_selection(Selection::new(start - before_len, end - before_len));
        return WrapOutcome::UnwrappedOutside;
    }

    let selected = src.selected_text();
    let selected_len = selected.chars().count();
    if selected_len > before_len + after_len
        && selected.starts_with(before)
        && selected.ends_with(after)
    {
        let inner = &selected[before.len()..selected.len() - after.len()];
        src.replace(start..end, inner);
        src.set_selection(Selection::new(start, start + inner.chars().count()));
        return WrapOutcome::UnwrappedInside;
    }

    src.replace(start..end, &format!("{before}{selected}{after}"));
    src.set_selection(Selection::new(start + before_len, end + before_len));
    WrapOutcome::Wrapped
}

/// Toggle a fenced code block around the selection.
///
/// Inside a fence (by [`inside_fence`]) the nearest opening fence line above
/// and closing fence line below are removed together with the newlines that
/// join them to the content. Elsewhere a `text` fence pair is inserted
/// around the selection.
pub fn toggle_code_fence(src: &mut SourceSurface) -> FenceOutcome {
    if !inside_fence(src) {
        let start = src.selection().start();
        let selected = src.selected_text();
        let opening = format!("\n{FENCE}text\n");
        src.replace(
            src.selection().to_range(),
            &format!("{opening}{selected}\n{FENCE}\n"),
        );
        let inner_start = start + opening.chars().count();
        src.set_selection(Selection::new(
            inner_start,
            inner_start + selected.chars().count(),
        ));
        return FenceOutcome::Wrapped;
    }

    let text = src.text();
    let lines = line_spans(&text);
    let caret_line = line_index(&lines, src.selection().start());
    let Some(open) = (0..=caret_line)
        .rev()
        .find(|&i| lines[i].text.starts_with(FENCE))
    else {
        return FenceOutcome::Unchanged;
    };
    let end_line = line_index(&lines, src.selection().end()).max(open + 1);
    let Some(close) = (end_line..lines.len()).find(|&i| lines[i].text.starts_with(FENCE)) else {
        tracing::debug!("no closing fence below the caret");
        return FenceOutcome::Unchanged;
    };

    let open_span = &lines[open];
    let close_span = &lines[close];
    let content_start = open_span.end + 1;
    let content_end = close_span.start.saturating_sub(1).max(content_start);
    let content = src.slice(content_start..content_end);
    src.replace(open_span.start..close_span.end, &content);
    src.set_selection(Selection::new(
        open_span.start,
        open_span.start + content.chars().count(),
    ));
    FenceOutcome::Unwrapped
}

/// Wrap the selection in an HTML tag, using `placeholder` when nothing is
/// selected. The tag's content ends up selected.
pub fn insert_tag(src: &mut SourceSurface, tag: &str, placeholder: &str) {
    let start = src.selection().start();
    let selected = src.selected_text();
    let inner = if selected.is_empty() {
        placeholder.to_string()
    } else {
        selected
    };
    src.replace(src.selection().to_range(), &format!("<{tag}>{inner}</{tag}>"));
    let inner_start = start + tag.chars().count() + 2;
    src.set_selection(Selection::new(
        inner_start,
        inner_start + inner.chars().count(),
    ));
}

/// Insert `text` at the selection start without removing the selection.
pub fn insert_at_caret(src: &mut SourceSurface, text: &str) {
    let start = src.selection().start();
    src.replace(start..start, text);
    src.set_caret(start + text.chars().count());
}

struct LineSpan<'a> {
    /// Char offset of the first char.
    start: usize,
    /// Char offset of the terminating newline, or the end of the text.
    end: usize,
    text: &'a str,
}

fn line_spans(text: &str) -> Vec<LineSpan<'_>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for line in text.split('\n') {
        let end = start + line.chars().count();
        spans.push(LineSpan {
            start,
            end,
            text: line,
        });
        start = end + 1;
    }
    spans
}

fn line_index(lines: &[LineSpan<'_>], offset: usize) -> usize {
    lines
        .iter()
        .position(|line| offset <= line.end)
        .unwrap_or(lines.len().saturating_sub(1))
}
