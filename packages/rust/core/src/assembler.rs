//! Document assembly.
//!
//! [`assemble`] builds the [`Document`] in two passes over the ordered posts:
//! the layout pass turns each post into a [`Section`] with its anchor, then the
//! reference pass derives the table of contents from those sections and
//! checks every entry against them. The function is pure: identical input
//! yields an identical document.

use tracing::{info, instrument};
use url::Url;

use blogbook_content::{normalize_text, sanitize_body};
use blogbook_shared::{Cover, Document, OrderedPostRecord, Result, Section, display_date};

use crate::toc;

/// Anchor id for the section at `ordinal`.
pub fn section_anchor(ordinal: usize) -> String {
    format!("post-{ordinal}")
}

/// Assemble the document for `blog_title` from posts already in reading order.
#[instrument(skip_all, fields(posts = ordered.len()))]
pub fn assemble(blog_title: &str, source_url: &Url, ordered: &[OrderedPostRecord]) -> Result<Document> {
    let sections = layout(ordered);

    let toc = toc::build_toc(&sections);
    toc::validate_toc(&toc, &sections)?;

    let cover = Cover {
        title: normalize_text(blog_title),
        subtitle: article_count(sections.len()),
        source_url: source_url.to_string(),
    };

    info!(sections = sections.len(), "document assembled");

    Ok(Document {
        cover,
        toc,
        sections,
    })
}

/// Layout pass: one section per post, positioned by ordinal.
fn layout(ordered: &[OrderedPostRecord]) -> Vec<Section> {
    ordered
        .iter()
        .map(|o| {
            let record = &o.record;
            let title = normalize_text(&record.title);
            Section {
                ordinal: o.ordinal,
                anchor: section_anchor(o.ordinal),
                // An untitled post is still listed; its URL is the best label.
                title: if title.is_empty() {
                    record.source_url.to_string()
                } else {
                    title
                },
                display_date: display_date(record.published),
                source_url: record.source_url.to_string(),
                body_html: sanitize_body(&record.body_html, &record.source_url),
            }
        })
        .collect()
}

fn article_count(n: usize) -> String {
    match n {
        1 => "1 article".to_string(),
        n => format!("{n} articles"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogbook_shared::{PostRecord, UNDATED_LABEL};
    use chrono::NaiveDate;

    use crate::ordering::order_posts;

    fn record(slug: &str, title: &str, date: Option<(i32, u32, u32)>, index: usize) -> PostRecord {
        PostRecord {
            source_url: Url::parse(&format!("https://example.com/blog/{slug}/")).unwrap(),
            title: title.into(),
            published: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            body_html: format!(
                "<h1>{title}</h1><p>Body of {slug} with <a href=\"../other\">a link</a>.</p>\
                 <form><input></form>"
            ),
            discovery_index: index,
        }
    }

    fn root() -> Url {
        Url::parse("https://example.com/blog/").unwrap()
    }

    #[test]
    fn sections_and_toc_line_up() {
        let ordered = order_posts(vec![
            record("p1", "P1", Some((2024, 1, 10)), 0),
            record("p2", "P2", Some((2024, 3, 1)), 1),
            record("p3", "P3", Some((2024, 2, 15)), 2),
        ]);
        let doc = assemble("Example Blog", &root(), &ordered).unwrap();

        let toc_titles: Vec<_> = doc.toc.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(toc_titles, vec!["P1", "P3", "P2"]);
        for (entry, section) in doc.toc.iter().zip(&doc.sections) {
            assert_eq!(entry.target, section.anchor);
        }
        assert_eq!(doc.sections[0].anchor, "post-1");
        assert_eq!(doc.sections[0].display_date, "January 10, 2024");
        assert_eq!(doc.cover.subtitle, "3 articles");
        assert_eq!(doc.cover.source_url, "https://example.com/blog/");
    }

    #[test]
    fn bodies_are_sanitized_against_their_source() {
        let ordered = order_posts(vec![record("p1", "P1", Some((2024, 1, 10)), 0)]);
        let doc = assemble("Blog", &root(), &ordered).unwrap();
        let body = &doc.sections[0].body_html;

        assert!(!body.contains("<h1>"));
        assert!(!body.contains("<form"));
        assert!(body.contains("href=\"https://example.com/blog/other\""));
        assert_eq!(doc.cover.subtitle, "1 article");
    }

    #[test]
    fn undated_and_untitled_posts_are_labelled() {
        let ordered = order_posts(vec![
            record("nodate", "", None, 0),
            record("dated", "Dated", Some((2020, 6, 1)), 1),
        ]);
        let doc = assemble("Blog", &root(), &ordered).unwrap();

        assert_eq!(doc.toc[0].title, "Dated");
        assert_eq!(doc.toc[1].title, "https://example.com/blog/nodate/");
        assert_eq!(doc.toc[1].display_date, UNDATED_LABEL);
        assert!(doc.toc[1].undated);
    }

    #[test]
    fn assembly_is_pure() {
        let ordered = order_posts(vec![
            record("a", "A", Some((2024, 1, 1)), 0),
            record("b", "B", None, 1),
        ]);
        let first = assemble("Blog", &root(), &ordered).unwrap();
        let second = assemble("Blog", &root(), &ordered).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_gives_empty_document() {
        let doc = assemble("Blog", &root(), &[]).unwrap();
        assert!(doc.toc.is_empty());
        assert!(doc.sections.is_empty());
        assert_eq!(doc.cover.subtitle, "0 articles");
    }
}
