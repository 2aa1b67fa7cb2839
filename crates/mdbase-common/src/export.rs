//! Downloadable exports of a document.

use std::fmt::Write as _;

use markdown_weaver_escape::{FmtWriter, escape_html};

const EXPORT_STYLE: &str = r#"body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; max-width: 800px; margin: 2rem auto; padding: 0 1rem; line-height: 1.6; color: #333; }
img { max-width: 100%; }
blockquote { border-left: 4px solid #ddd; padding-left: 1rem; color: #666; margin-left: 0; }
pre { background: #f5f5f5; padding: 1rem; border-radius: 4px; overflow-x: auto; }
code { font-family: monospace; background: #f5f5f5; padding: 0.2rem 0.4rem; border-radius: 3px; }
hr { border: none; border-top: 2px solid #eee; margin: 2rem 0; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid #ddd; padding: 0.5rem; text-align: left; }
th { background-color: #f9f9f9; }
li.task-list-item { list-style: none; margin-left: -1.5em; }
input[type="checkbox"] { margin-right: 0.5em; }"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Html,
}

impl ExportFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown;charset=utf-8",
            ExportFormat::Html => "text/html;charset=utf-8",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = crate::error::MdbaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "html" | "htm" => Ok(ExportFormat::Html),
            other => Err(crate::error::MdbaseError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub filename: String,
    pub mime: &'static str,
    pub contents: String,
}

/// Lower-cases the title and replaces every character outside `[a-z0-9]` with `_`.
pub fn file_stem(title: &str) -> String {
    let title = if title.is_empty() { "document" } else { title };
    title
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn markdown_export(title: &str, markdown: String) -> Export {
    Export {
        filename: format!("{}.{}", file_stem(title), ExportFormat::Markdown.extension()),
        mime: ExportFormat::Markdown.mime(),
        contents: markdown,
    }
}

/// Wraps editor markup in a standalone page with the export stylesheet.
pub fn html_export(title: &str, markup: &str) -> Export {
    let heading = if title.is_empty() { "Document" } else { title };
    let mut page = String::with_capacity(markup.len() + EXPORT_STYLE.len() + 256);
    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>");
    // Writing into a String cannot fail.
    let _ = escape_html(FmtWriter(&mut page), heading);
    let _ = write!(
        page,
        "</title>\n<style>\n{EXPORT_STYLE}\n</style>\n</head>\n<body>\n{markup}\n</body>\n</html>\n"
    );
    Export {
        filename: format!("{}.{}", file_stem(title), ExportFormat::Html.extension()),
        mime: ExportFormat::Html.mime(),
        contents: page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames() {
        assert_eq!(file_stem("My Notes: Draft #2"), "my_notes__draft__2");
        assert_eq!(file_stem(""), "document");
        assert_eq!(file_stem("Åsa"), "_sa");
        assert_eq!(markdown_export("Notes", String::new()).filename, "notes.md");
    }

    #[test]
    fn html_page_escapes_title() {
        let export = html_export("A <b> & C", "<p>hi</p>");
        assert_eq!(export.filename, "a__b____c.html");
        assert_eq!(export.mime, "text/html;charset=utf-8");
        assert!(export.contents.contains("<title>A &lt;b&gt; &amp; C</title>"));
        assert!(export.contents.contains("<body>\n<p>hi</p>\n</body>"));
        assert!(export.contents.contains("li.task-list-item"));
    }

    #[test]
    fn untitled_html_page() {
        let export = html_export("", "");
        assert!(export.contents.contains("<title>Document</title>"));
        assert_eq!(export.filename, "document.html");
    }

    #[test]
    fn format_from_str() {
        assert_eq!("MD".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
