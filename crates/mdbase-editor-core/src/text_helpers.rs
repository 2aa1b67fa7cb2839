//! Line navigation over any [`TextBuffer`].

use smol_str::SmolStr;

use crate::text::TextBuffer;

/// Find start of line containing offset.
pub fn find_line_start<B: TextBuffer>(buf: &B, offset: usize) -> usize {
    let mut pos = offset.min(buf.len_chars());
    while pos > 0 {
        if let Some('\n') = buf.char_at(pos - 1) {
            return pos;
        }
        pos -= 1;
    }
    0
}

/// Find end of line containing offset (position of newline or end of buffer).
pub fn find_line_end<B: TextBuffer>(buf: &B, offset: usize) -> usize {
    let len = buf.len_chars();
    let mut pos = offset;
    while pos < len {
        if let Some('\n') = buf.char_at(pos) {
            return pos;
        }
        pos += 1;
    }
    len
}

/// The line containing `offset` and the char offset it starts at.
pub fn line_at<B: TextBuffer>(buf: &B, offset: usize) -> (usize, SmolStr) {
    let start = find_line_start(buf, offset);
    let end = find_line_end(buf, offset);
    (start, buf.slice(start..end).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::EditorRope;

    #[test]
    fn test_find_line_start() {
        let rope = EditorRope::from_str("hello\nworld\ntest");

        assert_eq!(find_line_start(&rope, 0), 0);
        assert_eq!(find_line_start(&rope, 5), 0); // at newline
        assert_eq!(find_line_start(&rope, 6), 6);
        assert_eq!(find_line_start(&rope, 8), 6);
        assert_eq!(find_line_start(&rope, 99), 12);
    }

    #[test]
    fn test_find_line_end() {
        let rope = EditorRope::from_str("hello\nworld\ntest");

        assert_eq!(find_line_end(&rope, 0), 5);
        assert_eq!(find_line_end(&rope, 6), 11);
        assert_eq!(find_line_end(&rope, 12), 16);
    }

    #[test]
    fn test_line_at() {
        let rope = EditorRope::from_str("# Title\nbody");
        assert_eq!(line_at(&rope, 3), (0, SmolStr::new("# Title")));
        assert_eq!(line_at(&rope, 10), (8, SmolStr::new("body")));
    }
}
