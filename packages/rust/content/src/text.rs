//! Text passes applied to post titles and body text nodes.
//!
//! Each pass is a function `&str -> String`, applied in sequence. Body text
//! arrives HTML-escaped, so passes that emit `<sup>`/`<sub>` may do so directly.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

/// UTF-8 punctuation decoded as Windows-1252, longest sequences first.
const MOJIBAKE: &[(&str, &str)] = &[
    ("â€™", "'"),
    ("â€˜", "'"),
    ("â€œ", "\""),
    ("â€\u{9d}", "\""),
    ("â€”", "\u{2014}"),
    ("â€“", "\u{2013}"),
    ("â€¦", "..."),
    ("Ã©", "é"),
    ("Ã¨", "è"),
    ("Ã¼", "ü"),
    ("Ã¶", "ö"),
    ("Ã¤", "ä"),
    ("â€", "\""),
];

/// Characters replaced for print-friendly output.
const TYPOGRAPHY: &[(char, &str)] = &[
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201c}', "\""),
    ('\u{201d}', "\""),
    ('\u{2026}', "..."),
    ('\u{00a0}', " "),
    ('\u{200b}', ""),
    ('\u{2022}', "*"),
    ('\u{00ab}', "\""),
    ('\u{00bb}', "\""),
    ('\u{fffd}', ""),
];

/// Normalize plain text (titles, dates, cover text).
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let fixed = fix_mojibake(text);
    let composed: String = fixed.nfc().collect();
    replace_typography(&composed)
}

/// Rewrite an already-escaped body text node.
///
/// `math` is false inside `pre`/`code`, where TeX-looking text is literal.
pub(crate) fn rewrite_html_text(escaped: &str, math: bool) -> String {
    let text = superscripts_to_tags(escaped);
    let text = normalize_text(&text);
    if math { convert_math(&text) } else { text }
}

fn fix_mojibake(text: &str) -> String {
    if !text.contains('â') && !text.contains('Ã') {
        return text.to_string();
    }
    MOJIBAKE
        .iter()
        .fold(text.to_string(), |acc, (bad, good)| acc.replace(bad, good))
}

fn replace_typography(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match TYPOGRAPHY.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Superscripts / subscripts
// ---------------------------------------------------------------------------

fn superscript(c: char) -> Option<char> {
    Some(match c {
        '⁰' => '0',
        '¹' => '1',
        '²' => '2',
        '³' => '3',
        '⁴' => '4',
        '⁵' => '5',
        '⁶' => '6',
        '⁷' => '7',
        '⁸' => '8',
        '⁹' => '9',
        '⁺' => '+',
        '⁻' => '-',
        '⁼' => '=',
        '⁽' => '(',
        '⁾' => ')',
        'ⁿ' => 'n',
        'ⁱ' => 'i',
        _ => return None,
    })
}

fn subscript(c: char) -> Option<char> {
    Some(match c {
        '₀' => '0',
        '₁' => '1',
        '₂' => '2',
        '₃' => '3',
        '₄' => '4',
        '₅' => '5',
        '₆' => '6',
        '₇' => '7',
        '₈' => '8',
        '₉' => '9',
        '₊' => '+',
        '₋' => '-',
        '₌' => '=',
        '₍' => '(',
        '₎' => ')',
        _ => return None,
    })
}

/// Turn runs of Unicode super/subscript characters into `<sup>`/`<sub>`.
fn superscripts_to_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let (tag, map): (&str, fn(char) -> Option<char>) = if let Some(m) = superscript(c) {
            out.push_str("<sup>");
            out.push(m);
            ("sup", superscript)
        } else if let Some(m) = subscript(c) {
            out.push_str("<sub>");
            out.push(m);
            ("sub", subscript)
        } else {
            out.push(c);
            continue;
        };

        while let Some(m) = chars.peek().copied().and_then(map) {
            out.push(m);
            chars.next();
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }

    out
}

// ---------------------------------------------------------------------------
// Inline math
// ---------------------------------------------------------------------------

static INLINE_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\\((.+?)\\\)").expect("inline math regex"));

static DISPLAY_BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\\[(.+?)\\\]").expect("display math regex"));

static DOLLAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([^$\n]+)\$").expect("dollar math regex"));

static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([a-zA-Z]+)").expect("command regex"));

static SUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^\{([^}]+)\}|\^([^\s{}\\])").expect("sup regex"));

static SUB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_\{([^}]+)\}|_([^\s{}\\])").expect("sub regex"));

/// Convert TeX inline/display math into readable text with sup/sub tags.
///
/// `$…$` is only treated as math when the inside contains TeX markup, so
/// prices like `$10 and $20` survive.
pub(crate) fn convert_math(text: &str) -> String {
    if !text.contains('\\') && !text.contains('$') {
        return text.to_string();
    }

    let text = INLINE_PAREN_RE.replace_all(text, |c: &Captures<'_>| convert_expression(&c[1]));
    let text = DISPLAY_BRACKET_RE.replace_all(&text, |c: &Captures<'_>| convert_expression(&c[1]));
    let text = DOLLAR_RE.replace_all(&text, |c: &Captures<'_>| {
        let inner = &c[1];
        if inner.contains(['\\', '^', '_']) {
            convert_expression(inner)
        } else {
            c[0].to_string()
        }
    });

    text.into_owned()
}

fn convert_expression(latex: &str) -> String {
    let spaced = latex
        .replace("\\,", " ")
        .replace("\\;", " ")
        .replace("\\ ", " ")
        .replace("\\!", "");

    let symbols = COMMAND_RE.replace_all(&spaced, |c: &Captures<'_>| {
        command_symbol(&c[1]).unwrap_or_default().to_string()
    });

    let sup = SUP_RE.replace_all(&symbols, |c: &Captures<'_>| {
        let inner = c.get(1).or_else(|| c.get(2)).map_or("", |m| m.as_str());
        format!("<sup>{inner}</sup>")
    });
    let sub = SUB_RE.replace_all(&sup, |c: &Captures<'_>| {
        let inner = c.get(1).or_else(|| c.get(2)).map_or("", |m| m.as_str());
        format!("<sub>{inner}</sub>")
    });

    sub.replace(['{', '}'], "").trim().to_string()
}

/// Printable replacement for a TeX command; unknown commands are dropped.
fn command_symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        "times" => "×",
        "cdot" => "·",
        "div" => "÷",
        "pm" => "±",
        "mp" => "∓",
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        "neq" | "ne" => "≠",
        "approx" => "≈",
        "infty" => "∞",
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" => "ε",
        "theta" => "θ",
        "lambda" => "λ",
        "mu" => "μ",
        "pi" => "π",
        "sigma" => "σ",
        "omega" => "ω",
        "sum" => "Σ",
        "prod" => "Π",
        "sqrt" => "√",
        "log" => "log",
        "ln" => "ln",
        "sin" => "sin",
        "cos" => "cos",
        "tan" => "tan",
        "exp" => "exp",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smart_quotes_become_ascii() {
        assert_eq!(
            normalize_text("\u{201c}It\u{2019}s fine\u{201d}\u{2026}"),
            "\"It's fine\"..."
        );
    }

    #[test]
    fn mojibake_is_repaired() {
        assert_eq!(normalize_text("Itâ€™s broken"), "It's broken");
        assert_eq!(normalize_text("plain text"), "plain text");
    }

    #[test]
    fn nbsp_and_zero_width_space() {
        assert_eq!(normalize_text("a\u{00a0}b\u{200b}c"), "a bc");
    }

    #[test]
    fn superscript_runs_become_tags() {
        assert_eq!(superscripts_to_tags("10⁻⁹ s"), "10<sup>-9</sup> s");
        assert_eq!(superscripts_to_tags("H₂O"), "H<sub>2</sub>O");
    }

    #[test]
    fn inline_math_converts() {
        assert_eq!(
            convert_math(r"rate is \(1 \times 10^{-9}\) per op"),
            "rate is 1 × 10<sup>-9</sup> per op"
        );
        assert_eq!(convert_math(r"\(x_1 + n^2\)"), "x<sub>1</sub> + n<sup>2</sup>");
    }

    #[test]
    fn currency_is_not_math() {
        assert_eq!(convert_math("costs $10 or $20"), "costs $10 or $20");
        assert_eq!(convert_math(r"area $\pi r^2$"), "area π r<sup>2</sup>");
    }

    #[test]
    fn math_skipped_when_disabled() {
        assert_eq!(rewrite_html_text(r"\(n^2\)", false), r"\(n^2\)");
        assert_eq!(rewrite_html_text(r"\(n^2\)", true), "n<sup>2</sup>");
    }
}
