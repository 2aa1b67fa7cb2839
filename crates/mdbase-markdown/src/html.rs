//! HTML writer for the editor surface.
//!
//! Produces the markup the rich-text editor displays: standard elements for
//! ordinary Markdown plus the editor's extension markup (alert boxes, code
//! block wrappers with a language tag, heading anchors, colour swatches and
//! the footnote section).

use std::sync::LazyLock;

use markdown_weaver_escape::{FmtWriter, StrWrite, escape_href, escape_html, escape_html_body_text};
use regex::Regex;

use crate::tree::{
    Alert, Block, CodeBlock, ColumnAlign, EditorSurface, FootnoteDef, Heading, Inline, List,
    Table,
};

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());
static RGB_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^rgb\(\s*\d+\s*,\s*\d+\s*,\s*\d+\s*\)$").unwrap()
});
static HSL_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^hsl\(\s*\d+\s*,\s*\d+%?\s*,\s*\d+%?\s*\)$").unwrap()
});

/// Whether an inline code literal is a colour value that gets a swatch.
pub fn is_color_literal(code: &str) -> bool {
    let code = code.trim();
    HEX_COLOR_RE.is_match(code) || RGB_COLOR_RE.is_match(code) || HSL_COLOR_RE.is_match(code)
}

/// Render a surface to an HTML string.
pub fn render_html(surface: &EditorSurface) -> String {
    let mut out = String::new();
    if let Err(e) = HtmlWriter::new(FmtWriter(&mut out)).run(surface) {
        tracing::error!(error = ?e, "failed to write editor markup");
    }
    out
}

/// Render a surface into any [`StrWrite`] sink.
pub fn write_html<W: StrWrite>(writer: W, surface: &EditorSurface) -> Result<(), W::Error> {
    HtmlWriter::new(writer).run(surface)
}

struct HtmlWriter<W> {
    writer: W,

    /// Whether or not the last write wrote a newline.
    end_newline: bool,
}

impl<W: StrWrite> HtmlWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            end_newline: true,
        }
    }

    /// Writes a buffer, and tracks whether or not a newline was written.
    #[inline]
    fn write(&mut self, s: &str) -> Result<(), W::Error> {
        self.writer.write_str(s)?;
        if !s.is_empty() {
            self.end_newline = s.ends_with('\n');
        }
        Ok(())
    }

    #[inline]
    fn write_newline(&mut self) -> Result<(), W::Error> {
        self.end_newline = true;
        self.writer.write_str("\n")
    }

    fn fresh_line(&mut self) -> Result<(), W::Error> {
        if !self.end_newline {
            self.write_newline()?;
        }
        Ok(())
    }

    fn run(mut self, surface: &EditorSurface) -> Result<(), W::Error> {
        self.blocks(&surface.blocks, false)
    }

    fn blocks(&mut self, blocks: &[Block], tight: bool) -> Result<(), W::Error> {
        for block in blocks {
            self.block(block, tight)?;
        }
        Ok(())
    }

    fn block(&mut self, block: &Block, tight: bool) -> Result<(), W::Error> {
        match block {
            Block::Paragraph(content) if tight => self.inlines(content),
            Block::Paragraph(content) => {
                self.fresh_line()?;
                self.write("<p>")?;
                self.inlines(content)?;
                self.write("</p>\n")
            }
            Block::Heading(heading) => self.heading(heading),
            Block::List(list) => self.list(list),
            Block::BlockQuote(blocks) => {
                self.fresh_line()?;
                self.write("<blockquote>\n")?;
                self.blocks(blocks, false)?;
                self.fresh_line()?;
                self.write("</blockquote>\n")
            }
            Block::Alert(alert) => self.alert(alert),
            Block::CodeBlock(code) => self.code_block(code),
            Block::Table(table) => self.table(table),
            Block::Rule => {
                self.fresh_line()?;
                self.write("<hr />\n")
            }
            Block::Html(html) => {
                self.fresh_line()?;
                self.write(html)?;
                self.write_newline()
            }
            Block::Footnotes(defs) => self.footnotes(defs),
        }
    }

    fn heading(&mut self, heading: &Heading) -> Result<(), W::Error> {
        self.fresh_line()?;
        write!(&mut self.writer, "<h{}", heading.level)?;
        self.write(" id=\"")?;
        escape_html(&mut self.writer, &heading.anchor.id)?;
        if heading.anchor.explicit {
            self.write("\" data-custom-anchor=\"true\">")?;
        } else {
            self.write("\" data-custom-anchor=\"false\">")?;
        }
        self.inlines(&heading.content)?;
        write!(&mut self.writer, "</h{}>", heading.level)?;
        self.write_newline()
    }

    fn list(&mut self, list: &List) -> Result<(), W::Error> {
        self.fresh_line()?;
        match list.start {
            Some(1) => self.write("<ol>\n")?,
            Some(start) => {
                write!(&mut self.writer, "<ol start=\"{}\">", start)?;
                self.write_newline()?;
            }
            None => self.write("<ul>\n")?,
        }
        for item in &list.items {
            match item.checked {
                Some(checked) => {
                    self.write("<li class=\"task-list-item\">")?;
                    if checked {
                        self.write("<input type=\"checkbox\" checked=\"\"> ")?;
                    } else {
                        self.write("<input type=\"checkbox\"> ")?;
                    }
                }
                None => self.write("<li>")?,
            }
            self.blocks(&item.blocks, list.tight)?;
            self.write("</li>\n")?;
        }
        if list.is_ordered() {
            self.write("</ol>\n")
        } else {
            self.write("</ul>\n")
        }
    }

    fn alert(&mut self, alert: &Alert) -> Result<(), W::Error> {
        self.fresh_line()?;
        let kind = alert.kind;
        write!(
            &mut self.writer,
            "<div class=\"alert alert-{kind}\" data-alert-type=\"{kind}\"><div class=\"alert-header\"><i class=\"ph {}\"></i><span>{}</span></div><div class=\"alert-content\">",
            kind.icon(),
            kind.label()
        )?;
        self.write_newline()?;
        self.blocks(&alert.blocks, false)?;
        self.write("</div></div>\n")
    }

    fn code_block(&mut self, code: &CodeBlock) -> Result<(), W::Error> {
        self.fresh_line()?;
        let lang = code.markup_lang();
        self.write("<div class=\"code-block-wrapper\" data-lang=\"")?;
        escape_html(&mut self.writer, lang)?;
        self.write("\"><div class=\"code-block-header\" contenteditable=\"false\"><span class=\"code-lang-tag\" title=\"Click to change language\">")?;
        escape_html_body_text(&mut self.writer, code.display_lang())?;
        self.write("</span></div><pre><code class=\"language-")?;
        escape_html(&mut self.writer, lang)?;
        self.write("\">")?;
        escape_html_body_text(&mut self.writer, &code.code)?;
        self.write("</code></pre></div>\n")
    }

    fn table(&mut self, table: &Table) -> Result<(), W::Error> {
        self.fresh_line()?;
        self.write("<table><thead><tr>")?;
        for (i, cell) in table.head.iter().enumerate() {
            self.cell("th", table.alignments.get(i).copied(), cell)?;
        }
        self.write("</tr></thead><tbody>\n")?;
        for row in &table.rows {
            self.write("<tr>")?;
            for (i, cell) in row.iter().enumerate() {
                self.cell("td", table.alignments.get(i).copied(), cell)?;
            }
            self.write("</tr>\n")?;
        }
        self.write("</tbody></table>\n")
    }

    fn cell(
        &mut self,
        tag: &str,
        align: Option<ColumnAlign>,
        content: &[Inline],
    ) -> Result<(), W::Error> {
        write!(&mut self.writer, "<{}", tag)?;
        match align {
            Some(ColumnAlign::Left) => self.write(" style=\"text-align: left\">")?,
            Some(ColumnAlign::Center) => self.write(" style=\"text-align: center\">")?,
            Some(ColumnAlign::Right) => self.write(" style=\"text-align: right\">")?,
            _ => self.write(">")?,
        }
        self.inlines(content)?;
        write!(&mut self.writer, "</{}>", tag)
    }

    fn footnotes(&mut self, defs: &[FootnoteDef]) -> Result<(), W::Error> {
        if defs.is_empty() {
            return Ok(());
        }
        self.fresh_line()?;
        self.write("<div class=\"footnotes\"><hr><ol>")?;
        for def in defs {
            self.write("<li id=\"fn-")?;
            escape_html(&mut self.writer, &def.id)?;
            self.write("\">")?;
            self.inlines(&def.content)?;
            self.write(" <a href=\"#fnref-")?;
            escape_html(&mut self.writer, &def.id)?;
            self.write("\">↩</a></li>")?;
        }
        self.write("</ol></div>\n")
    }

    fn inlines(&mut self, inlines: &[Inline]) -> Result<(), W::Error> {
        for inline in inlines {
            self.inline(inline)?;
        }
        Ok(())
    }

    fn wrapped(&mut self, tag: &str, children: &[Inline]) -> Result<(), W::Error> {
        write!(&mut self.writer, "<{}>", tag)?;
        self.inlines(children)?;
        write!(&mut self.writer, "</{}>", tag)?;
        self.end_newline = false;
        Ok(())
    }

    fn inline(&mut self, inline: &Inline) -> Result<(), W::Error> {
        match inline {
            Inline::Text(text) => {
                escape_html_body_text(&mut self.writer, text)?;
                self.end_newline = text.ends_with('\n');
                Ok(())
            }
            Inline::Code(code) if is_color_literal(code) => {
                self.write("<code class=\"color-code\"><span class=\"color-chip\" style=\"background-color: ")?;
                escape_html(&mut self.writer, code.trim())?;
                self.write(";\"></span>")?;
                escape_html_body_text(&mut self.writer, code)?;
                self.write("</code>")
            }
            Inline::Code(code) => {
                self.write("<code>")?;
                escape_html_body_text(&mut self.writer, code)?;
                self.write("</code>")
            }
            Inline::Emphasis(children) => self.wrapped("em", children),
            Inline::Strong(children) => self.wrapped("strong", children),
            Inline::Strikethrough(children) => self.wrapped("del", children),
            Inline::Underline(children) => self.wrapped("u", children),
            Inline::Subscript(children) => self.wrapped("sub", children),
            Inline::Superscript(children) => self.wrapped("sup", children),
            Inline::Link(link) => {
                self.write("<a href=\"")?;
                escape_href(&mut self.writer, &link.url)?;
                if !link.title.is_empty() {
                    self.write("\" title=\"")?;
                    escape_html(&mut self.writer, &link.title)?;
                }
                self.write("\">")?;
                self.inlines(&link.content)?;
                self.write("</a>")
            }
            Inline::Image(image) => {
                self.write("<img src=\"")?;
                escape_href(&mut self.writer, &image.url)?;
                self.write("\" alt=\"")?;
                escape_html(&mut self.writer, &image.alt)?;
                if !image.title.is_empty() {
                    self.write("\" title=\"")?;
                    escape_html(&mut self.writer, &image.title)?;
                }
                self.write("\" />")
            }
            Inline::FootnoteRef(id) => {
                self.write("<sup class=\"footnote-ref\"><a href=\"#fn-")?;
                escape_html(&mut self.writer, id)?;
                self.write("\" id=\"fnref-")?;
                escape_html(&mut self.writer, id)?;
                self.write("\">[")?;
                escape_html_body_text(&mut self.writer, id)?;
                self.write("]</a></sup>")
            }
            Inline::SoftBreak | Inline::HardBreak => self.write("<br />\n"),
            Inline::Html(html) => self.write(html),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_markdown;

    fn render(source: &str) -> String {
        render_html(&parse_markdown(source))
    }

    #[test]
    fn color_literals() {
        assert!(is_color_literal("#abc"));
        assert!(is_color_literal("#AABBCC"));
        assert!(is_color_literal("rgb(10, 20, 30)"));
        assert!(is_color_literal("hsl(200, 50%, 40%)"));
        assert!(!is_color_literal("#abcd"));
        assert!(!is_color_literal("rgba(1,2,3,0.5)"));
        assert!(!is_color_literal("color"));
    }

    #[test]
    fn color_swatch_markup() {
        insta::assert_snapshot!(render("Brand `#ff6600` and `code`"), @r#"<p>Brand <code class="color-code"><span class="color-chip" style="background-color: #ff6600;"></span>#ff6600</code> and <code>code</code></p>"#);
    }

    #[test]
    fn alert_markup() {
        insta::assert_snapshot!(render("> [!TIP]\n> Use **keys**."), @r#"
        <div class="alert alert-tip" data-alert-type="tip"><div class="alert-header"><i class="ph ph-lightbulb"></i><span>Tip</span></div><div class="alert-content">
        <p>Use <strong>keys</strong>.</p>
        </div></div>
        "#);
    }

    #[test]
    fn code_block_markup_defaults_to_text() {
        insta::assert_snapshot!(render("```\nx < 1\n```"), @r#"<div class="code-block-wrapper" data-lang="text"><div class="code-block-header" contenteditable="false"><span class="code-lang-tag" title="Click to change language">code</span></div><pre><code class="language-text">x &lt; 1</code></pre></div>"#);
    }

    #[test]
    fn heading_anchor_markup() {
        let html = render("## Setup {#setup}\n\n## Getting Started!");
        assert!(html.contains(r#"<h2 id="setup" data-custom-anchor="true">Setup</h2>"#));
        assert!(html.contains(
            r#"<h2 id="getting-started" data-custom-anchor="false">Getting Started!</h2>"#
        ));
    }

    #[test]
    fn footnote_markup() {
        insta::assert_snapshot!(render("Text[^a]\n\n[^a]: Explanation"), @r##"
        <p>Text<sup class="footnote-ref"><a href="#fn-a" id="fnref-a">[a]</a></sup></p>
        <div class="footnotes"><hr><ol><li id="fn-a">Explanation <a href="#fnref-a">↩</a></li></ol></div>
        "##);
    }

    #[test]
    fn task_list_checkboxes_are_interactive() {
        let html = render("- [x] done\n- [ ] todo");
        assert!(html.contains(r#"<li class="task-list-item"><input type="checkbox" checked=""> done</li>"#));
        assert!(html.contains(r#"<li class="task-list-item"><input type="checkbox"> todo</li>"#));
        assert!(!html.contains("disabled"));
    }

    #[test]
    fn soft_breaks_render_as_line_breaks() {
        assert_eq!(render("one\ntwo"), "<p>one<br />\ntwo</p>\n");
    }
}
