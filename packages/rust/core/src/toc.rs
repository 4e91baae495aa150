//! Table of contents (reference pass).
//!
//! Built from the sections the layout pass produced, so every entry points at
//! an anchor that exists and belongs to the section with the same title.

use std::collections::HashMap;

use tracing::{debug, instrument};

use blogbook_shared::{BlogbookError, Result, Section, TocEntry, UNDATED_LABEL};

/// One TOC entry per laid-out section, in layout order.
#[instrument(skip_all, fields(sections = sections.len()))]
pub fn build_toc(sections: &[Section]) -> Vec<TocEntry> {
    let toc: Vec<TocEntry> = sections
        .iter()
        .map(|s| TocEntry {
            title: s.title.clone(),
            display_date: s.display_date.clone(),
            undated: s.display_date == UNDATED_LABEL,
            target: s.anchor.clone(),
        })
        .collect();

    debug!(entries = toc.len(), "TOC built");
    toc
}

/// Verify that every entry resolves to the matching section.
pub fn validate_toc(toc: &[TocEntry], sections: &[Section]) -> Result<()> {
    if toc.len() != sections.len() {
        return Err(BlogbookError::validation(format!(
            "TOC has {} entries for {} sections",
            toc.len(),
            sections.len()
        )));
    }

    let mut by_anchor: HashMap<&str, &Section> = HashMap::with_capacity(sections.len());
    for section in sections {
        if by_anchor.insert(section.anchor.as_str(), section).is_some() {
            return Err(BlogbookError::validation(format!(
                "duplicate section anchor '{}'",
                section.anchor
            )));
        }
    }

    for (entry, expected) in toc.iter().zip(sections) {
        let target = by_anchor.get(entry.target.as_str()).ok_or_else(|| {
            BlogbookError::validation(format!("TOC target '{}' has no section", entry.target))
        })?;
        if target.ordinal != expected.ordinal || target.title != entry.title {
            return Err(BlogbookError::validation(format!(
                "TOC entry '{}' points at section {} ('{}')",
                entry.title, target.ordinal, target.title
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(ordinal: usize, title: &str, date: &str) -> Section {
        Section {
            ordinal,
            anchor: format!("post-{ordinal}"),
            title: title.into(),
            display_date: date.into(),
            source_url: format!("https://example.com/{ordinal}"),
            body_html: String::new(),
        }
    }

    #[test]
    fn entries_follow_sections() {
        let sections = vec![
            section(1, "First", "January 10, 2024"),
            section(2, "Second", UNDATED_LABEL),
        ];
        let toc = build_toc(&sections);

        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].target, "post-1");
        assert!(!toc[0].undated);
        assert!(toc[1].undated);
        validate_toc(&toc, &sections).unwrap();
    }

    #[test]
    fn dangling_or_mismatched_targets_fail() {
        let sections = vec![section(1, "First", "x"), section(2, "Second", "y")];

        let mut toc = build_toc(&sections);
        toc[1].target = "post-9".into();
        assert!(validate_toc(&toc, &sections).is_err());

        let mut toc = build_toc(&sections);
        toc.swap(0, 1);
        assert!(validate_toc(&toc, &sections).is_err());

        let toc = build_toc(&sections[..1]);
        assert!(validate_toc(&toc, &sections).is_err());
    }

    #[test]
    fn duplicate_anchors_fail() {
        let mut sections = vec![section(1, "A", "x"), section(2, "B", "y")];
        sections[1].anchor = "post-1".into();
        let toc = build_toc(&sections);
        assert!(validate_toc(&toc, &sections).is_err());
    }
}
