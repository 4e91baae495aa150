//! HTML fragment writer.
//!
//! `scraper` cannot remove nodes from a parsed tree, so removals are expressed
//! as a skip set of node ids and applied while re-serializing the subtree.
//! The same walk resolves relative links and rewrites text nodes.

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Node};
use url::Url;

use crate::text;

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text content is written verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements inside which inline math is left untouched.
const LITERAL_ELEMENTS: &[&str] = &["pre", "code", "kbd", "samp"];

/// URL schemes (and the bare fragment) left as written.
const UNRESOLVED_PREFIXES: &[&str] = &["#", "mailto:", "tel:", "javascript:", "data:"];

/// Options for one serialization pass.
#[derive(Debug, Default)]
pub(crate) struct WriteOptions<'a> {
    /// Nodes (and their subtrees) to leave out.
    pub skip: HashSet<NodeId>,
    /// Resolve relative `href`/`src` values against this URL.
    pub base_url: Option<&'a Url>,
    /// Normalize text and convert inline math.
    pub rewrite_text: bool,
}

/// Serialize `el` including its own tag.
pub(crate) fn outer_html(el: ElementRef<'_>, opts: &WriteOptions<'_>) -> String {
    let mut out = String::new();
    write_node(*el, opts, false, &mut out);
    out
}

/// Serialize the children of `el`.
pub(crate) fn inner_html(el: ElementRef<'_>, opts: &WriteOptions<'_>) -> String {
    let mut out = String::new();
    let literal = LITERAL_ELEMENTS.contains(&el.value().name());
    for child in el.children() {
        write_node(child, opts, literal, &mut out);
    }
    out
}

fn write_node(node: NodeRef<'_, Node>, opts: &WriteOptions<'_>, literal: bool, out: &mut String) {
    if opts.skip.contains(&node.id()) {
        return;
    }

    match node.value() {
        Node::Text(t) => {
            let raw: &str = t;
            let raw_parent = node
                .parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|p| RAW_TEXT_ELEMENTS.contains(&p.value().name()));
            if raw_parent {
                out.push_str(raw);
                return;
            }

            let escaped = html_escape::encode_text(raw);
            if opts.rewrite_text {
                out.push_str(&text::rewrite_html_text(&escaped, !literal));
            } else {
                out.push_str(&escaped);
            }
        }
        Node::Element(el) => {
            let name = el.name();
            out.push('<');
            out.push_str(name);
            for (attr, value) in el.attrs() {
                let value = match (attr, opts.base_url) {
                    ("href" | "src", Some(base)) => resolve(value, base),
                    _ => value.to_string(),
                };
                out.push(' ');
                out.push_str(attr);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(&value));
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&name) {
                return;
            }

            let literal = literal || LITERAL_ELEMENTS.contains(&name);
            for child in node.children() {
                write_node(child, opts, literal, out);
            }

            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Node::Document | Node::Fragment => {
            for child in node.children() {
                write_node(child, opts, literal, out);
            }
        }
        // Comments, doctypes and processing instructions are dropped.
        _ => {}
    }
}

/// Resolve a link or image reference against `base`.
fn resolve(value: &str, base: &Url) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || UNRESOLVED_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return value.to_string();
    }
    match base.join(trimmed) {
        Ok(url) => url.to_string(),
        Err(_) => value.to_string(),
    }
}
