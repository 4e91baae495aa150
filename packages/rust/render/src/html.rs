//! Print-ready HTML rendering.

use std::fmt::Write as _;
use std::path::Path;

use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::{info, instrument};

use blogbook_shared::{Document, Result, Section, TocEntry};

use crate::Renderer;
use crate::output::{RenderOutput, write_atomic};

/// Paged-media stylesheet. `target-counter` fills in TOC page numbers when a
/// paginating engine lays the document out; browsers ignore it.
const PRINT_CSS: &str = r#"
@page {
    size: A4;
    margin: 2cm;
    @top-center { content: string(blog-title); font-size: 10pt; color: #666; }
    @bottom-center { content: counter(page); font-size: 10pt; color: #666; }
}
@page :first {
    @top-center { content: none; }
    @bottom-center { content: none; }
}
* { box-sizing: border-box; }
body {
    font-family: Georgia, 'Times New Roman', serif;
    font-size: 11pt;
    line-height: 1.6;
    color: #333;
}
h1, h2, h3, h4, h5, h6 { color: #1a1a1a; page-break-after: avoid; }
p { margin: 0 0 1em; text-align: justify; orphans: 3; widows: 3; }
a { color: #0066cc; text-decoration: none; }
code {
    font-family: 'Courier New', Courier, monospace;
    font-size: 9pt;
    background: #f5f5f5;
    padding: 0.2em 0.4em;
    border-radius: 3px;
    overflow-wrap: break-word;
}
pre {
    font-family: 'Courier New', Courier, monospace;
    font-size: 8pt;
    background: #f5f5f5;
    padding: 1em;
    border-radius: 5px;
    white-space: pre-wrap;
    word-break: break-all;
    page-break-inside: avoid;
}
pre code { background: none; padding: 0; }
img {
    display: block;
    max-width: 100%;
    max-height: 12cm;
    width: auto;
    height: auto;
    margin: 1em auto;
    object-fit: contain;
}
blockquote { border-left: 3px solid #ddd; margin-left: 0; padding-left: 1em; color: #666; font-style: italic; }
table { max-width: 100%; border-collapse: collapse; margin: 1em 0; font-size: 9pt; page-break-inside: avoid; }
th, td { border: 1px solid #ddd; padding: 0.3em 0.5em; text-align: left; }
th { background: #f5f5f5; }
sup, sub { font-size: 0.75em; line-height: 0; position: relative; vertical-align: baseline; }
sup { top: -0.5em; }
sub { bottom: -0.25em; }
hr { border: none; border-top: 1px solid #ddd; margin: 2em 0; }
.footnotes { font-size: 9pt; margin-top: 2em; }

.cover { text-align: center; padding-top: 30%; page-break-after: always; }
.cover h1 { string-set: blog-title content(); font-size: 24pt; margin-bottom: 0.5em; }
.cover .subtitle { font-size: 12pt; color: #666; }
.cover .source { font-size: 10pt; color: #888; }

.toc { page-break-after: always; }
.toc h2 { text-align: center; font-size: 16pt; }
.toc ol { padding-left: 2em; }
.toc li { margin-bottom: 0.6em; line-height: 1.4; }
.toc a { color: inherit; }
.toc a::after { content: leader('.') target-counter(attr(href url), page); }
.toc .date { color: #666; margin-left: 0.5em; }
.toc .undated { font-style: italic; }

.post { page-break-before: always; }
.post-header { margin-bottom: 1.5em; border-bottom: 2px solid #333; padding-bottom: 0.5em; }
.post-header h2 { margin: 0 0 0.25em; font-size: 16pt; }
.post-meta { color: #666; font-size: 10pt; }
.post-content { overflow-wrap: break-word; }
.post-content * { max-width: 100%; }
"#;

/// Writes the document as one self-contained HTML file.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn name(&self) -> &str {
        "html"
    }

    #[instrument(skip_all, fields(output = %output.display(), sections = doc.sections.len()))]
    fn render(&self, doc: &Document, output: &Path) -> Result<RenderOutput> {
        let html = render_html(doc);
        let written = write_atomic(output, html.as_bytes())?;
        info!(bytes = written.bytes, "HTML document written");
        Ok(written)
    }
}

/// Serialize `doc` to a complete HTML page. Deterministic: the same document
/// always yields the same string.
pub fn render_html(doc: &Document) -> String {
    let title = encode_text(&doc.cover.title);
    let mut out = String::with_capacity(
        PRINT_CSS.len() + doc.sections.iter().map(|s| s.body_html.len() + 512).sum::<usize>(),
    );

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{PRINT_CSS}</style>\n</head>\n<body>\n"
    );

    let _ = write!(
        out,
        "<div class=\"cover\">\n<h1>{title}</h1>\n<p class=\"subtitle\">{}</p>\n\
         <p class=\"source\"><a href=\"{}\">{}</a></p>\n</div>\n",
        encode_text(&doc.cover.subtitle),
        encode_double_quoted_attribute(&doc.cover.source_url),
        encode_text(&doc.cover.source_url),
    );

    out.push_str("<nav class=\"toc\">\n<h2>Table of Contents</h2>\n<ol>\n");
    for entry in &doc.toc {
        push_toc_entry(&mut out, entry);
    }
    out.push_str("</ol>\n</nav>\n");

    for section in &doc.sections {
        push_section(&mut out, section);
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn push_toc_entry(out: &mut String, entry: &TocEntry) {
    let date_class = if entry.undated { "date undated" } else { "date" };
    let _ = writeln!(
        out,
        "<li><a href=\"#{}\">{}</a> <span class=\"{date_class}\">({})</span></li>",
        encode_double_quoted_attribute(&entry.target),
        encode_text(&entry.title),
        encode_text(&entry.display_date),
    );
}

fn push_section(out: &mut String, section: &Section) {
    let _ = write!(
        out,
        "<section class=\"post\" id=\"{}\">\n<div class=\"post-header\">\n<h2>{}</h2>\n\
         <div class=\"post-meta\">{} &middot; <a href=\"{}\">{}</a></div>\n</div>\n\
         <div class=\"post-content\">\n{}\n</div>\n</section>\n",
        encode_double_quoted_attribute(&section.anchor),
        encode_text(&section.title),
        encode_text(&section.display_date),
        encode_double_quoted_attribute(&section.source_url),
        encode_text(&section.source_url),
        section.body_html,
    );
}
