//! Textual step language
//!
//! ```text
//! navigate:<path or url>
//! click:<locator>
//! type:<locator>|<text>
//! wait:<locator>
//! assert:text=<expected>
//! ```
//!
//! Parsing never fails: anything else becomes [`Command::Unknown`].

use crate::locator::Locator;

const NAVIGATE: &str = "navigate:";
const CLICK: &str = "click:";
const TYPE: &str = "type:";
const WAIT: &str = "wait:";
const ASSERT_TEXT: &str = "assert:text=";

/// Locator text as written in the step, plus its resolved form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementTarget {
    pub text: String,
    pub locator: Locator,
}

impl ElementTarget {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        Self {
            text: text.to_string(),
            locator: Locator::resolve(text),
        }
    }
}

/// A parsed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Navigate(String),
    Click(ElementTarget),
    Type(ElementTarget, String),
    WaitFor(ElementTarget),
    AssertText(String),
    Unknown(String),
}

impl Command {
    pub fn parse(raw: &str) -> Self {
        if let Some(target) = raw.strip_prefix(NAVIGATE) {
            Command::Navigate(target.trim().to_string())
        } else if let Some(selector) = raw.strip_prefix(CLICK) {
            Command::Click(ElementTarget::parse(selector))
        } else if let Some(rest) = raw.strip_prefix(TYPE) {
            let rest = rest.trim();
            let (selector, text) = rest.split_once('|').unwrap_or((rest, ""));
            Command::Type(ElementTarget::parse(selector), text.to_string())
        } else if let Some(selector) = raw.strip_prefix(WAIT) {
            Command::WaitFor(ElementTarget::parse(selector))
        } else if let Some(expected) = raw.strip_prefix(ASSERT_TEXT) {
            Command::AssertText(expected.to_string())
        } else {
            Command::Unknown(raw.to_string())
        }
    }
}

/// Whether `target` carries its own URL scheme (`https://…`, `file://…`)
pub fn has_scheme(target: &str) -> bool {
    let Some((scheme, _)) = target.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Destination for a navigate target: absolute URLs pass through, anything
/// else is appended to `base_url`
pub fn resolve_url(base_url: &str, target: &str) -> String {
    if has_scheme(target) {
        target.to_string()
    } else {
        format!("{}{}", base_url, target)
    }
}
