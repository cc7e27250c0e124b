//! Element locators

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a locator value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Css,
    Id,
    Name,
    Xpath,
}

impl Strategy {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "css" => Some(Strategy::Css),
            "id" => Some(Strategy::Id),
            "name" => Some(Strategy::Name),
            "xpath" => Some(Strategy::Xpath),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Strategy::Css => "css",
            Strategy::Id => "id",
            Strategy::Name => "name",
            Strategy::Xpath => "xpath",
        }
    }
}

/// A strategy + value pair identifying an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: Strategy,
    pub value: String,
}

impl Locator {
    pub fn css(value: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Css,
            value: value.into(),
        }
    }

    /// Resolve `<strategy>=<value>`.
    ///
    /// Anything without `=` or with an unrecognized strategy falls back to a
    /// CSS locator over the whole input.
    pub fn resolve(text: &str) -> Self {
        text.split_once('=')
            .and_then(|(prefix, value)| {
                Strategy::from_prefix(prefix).map(|strategy| Self {
                    strategy,
                    value: value.to_string(),
                })
            })
            .unwrap_or_else(|| Self::css(text))
    }

    /// `(using, value)` pair for the W3C WebDriver find-element command
    pub fn to_webdriver(&self) -> (&'static str, String) {
        match self.strategy {
            Strategy::Css => ("css selector", self.value.clone()),
            Strategy::Xpath => ("xpath", self.value.clone()),
            // W3C has no id/name strategies; Selenium maps them onto CSS the same way
            Strategy::Id => ("css selector", attribute_selector("id", &self.value)),
            Strategy::Name => ("css selector", attribute_selector("name", &self.value)),
        }
    }
}

fn attribute_selector(attribute: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[{}=\"{}\"]", attribute, escaped)
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy.as_str(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("css=#submit", Strategy::Css, "#submit" ; "css")]
    #[test_case("id=user", Strategy::Id, "user" ; "id")]
    #[test_case("name=email", Strategy::Name, "email" ; "name")]
    #[test_case("xpath=//button[@type='submit']", Strategy::Xpath, "//button[@type='submit']" ; "xpath keeps inner equals")]
    #[test_case("CSS=.btn", Strategy::Css, ".btn" ; "strategy is case insensitive")]
    #[test_case("XPath=//a", Strategy::Xpath, "//a" ; "mixed case xpath")]
    #[test_case("css=a[href=\"/x\"]", Strategy::Css, "a[href=\"/x\"]" ; "value split on first equals")]
    #[test_case("#submit", Strategy::Css, "#submit" ; "no prefix falls back to css")]
    #[test_case("link=Home", Strategy::Css, "link=Home" ; "unknown strategy keeps whole input")]
    #[test_case("input[type=text]", Strategy::Css, "input[type=text]" ; "bare css with equals")]
    #[test_case("", Strategy::Css, "" ; "empty input")]
    fn test_resolve(input: &str, strategy: Strategy, value: &str) {
        let locator = Locator::resolve(input);
        assert_eq!(locator.strategy, strategy);
        assert_eq!(locator.value, value);
    }

    #[test]
    fn test_webdriver_mapping() {
        assert_eq!(
            Locator::resolve("id=user").to_webdriver(),
            ("css selector", "[id=\"user\"]".to_string())
        );
        assert_eq!(
            Locator::resolve("name=a\"b").to_webdriver(),
            ("css selector", "[name=\"a\\\"b\"]".to_string())
        );
        assert_eq!(
            Locator::resolve("xpath=//div").to_webdriver(),
            ("xpath", "//div".to_string())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Locator::resolve("#main").to_string(), "css=#main");
        assert_eq!(Locator::resolve("ID=x").to_string(), "id=x");
    }
}
