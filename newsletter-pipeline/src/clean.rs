//! Markup stripping for feed text.
//!
//! Feed bodies arrive as HTML, sometimes entity-escaped twice. Cleaning parses
//! the fragment, keeps visible text only, and repeats until the output stops
//! changing so a cleaned string always cleans to itself.

use scraper::{ElementRef, Html};

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text of an HTML fragment, whitespace-collapsed into single spaces.
pub fn clean_text(html: &str) -> String {
    let mut current = normalize_whitespace(html);
    // A pass that changes the text decodes or strips something, so it shrinks.
    loop {
        let next = strip_markup(&current);
        if next.len() >= current.len() {
            return if next == current { current } else { next };
        }
        current = next;
    }
}

fn strip_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut tokens = Vec::new();
    collect_text(fragment.root_element(), &mut tokens);
    normalize_whitespace(&tokens.join(" "))
}

fn collect_text<'a>(element: ElementRef<'a>, tokens: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let text = text.trim();
            if !text.is_empty() {
                tokens.push(text);
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !SKIPPED_ELEMENTS.contains(&child_element.value().name()) {
                collect_text(child_element, tokens);
            }
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
