//! Core type definitions for element location

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One way of addressing a DOM element.
///
/// A candidate list is an ordered `Vec<Selector>`; earlier entries win.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "lowercase")]
pub enum Selector {
    /// CSS selector (e.g. `input[type='search']`)
    Css(String),
    /// XPath expression (e.g. `//h4[text()='Hello World!']`)
    XPath(String),
    /// Element id attribute
    Id(String),
    /// Tag name (e.g. `input`)
    #[serde(rename = "tag")]
    TagName(String),
    /// Anchor whose visible text equals the value
    #[serde(rename = "link")]
    LinkText(String),
    /// Any element whose own text contains the value
    Text(String),
}

/// Query language a selector compiles to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Self::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::XPath(value.into())
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }

    pub fn tag_name(value: impl Into<String>) -> Self {
        Self::TagName(value.into())
    }

    pub fn link_text(value: impl Into<String>) -> Self {
        Self::LinkText(value.into())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Strategy name used in the display form
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
            Self::Id(_) => "id",
            Self::TagName(_) => "tag",
            Self::LinkText(_) => "link",
            Self::Text(_) => "text",
        }
    }

    /// Raw locator value
    pub fn value(&self) -> &str {
        match self {
            Self::Css(v)
            | Self::XPath(v)
            | Self::Id(v)
            | Self::TagName(v)
            | Self::LinkText(v)
            | Self::Text(v) => v,
        }
    }

    /// Compile to a CSS or XPath query a session can run
    pub fn query(&self) -> Query {
        match self {
            Self::Css(css) => Query::Css(css.clone()),
            Self::XPath(xpath) => Query::XPath(xpath.clone()),
            Self::Id(id) => Query::Css(format!("[id={}]", css_string(id))),
            Self::TagName(tag) => Query::Css(tag.clone()),
            Self::LinkText(text) => {
                Query::XPath(format!("//a[normalize-space(.)={}]", xpath_literal(text)))
            }
            Self::Text(text) => Query::XPath(format!(
                "//*[text()[contains(normalize-space(.), {})]]",
                xpath_literal(text)
            )),
        }
    }

    /// Render a candidate list for error messages: `[css:a, xpath://b]`
    pub fn display_list(selectors: &[Selector]) -> String {
        let parts: Vec<String> = selectors.iter().map(|s| s.to_string()).collect();
        format!("[{}]", parts.join(", "))
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.strategy(), self.value())
    }
}

impl std::str::FromStr for Selector {
    type Err = String;

    /// Parse the display form back (`css:nav a`); bare values are CSS
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (strategy, value) = match s.split_once(':') {
            Some((prefix, rest))
                if matches!(prefix, "css" | "xpath" | "id" | "tag" | "link" | "text") =>
            {
                (prefix, rest)
            }
            _ => ("css", s),
        };

        if value.trim().is_empty() {
            return Err(format!("Empty selector: {}", s));
        }

        Ok(match strategy {
            "xpath" => Self::xpath(value),
            "id" => Self::id(value),
            "tag" => Self::tag_name(value),
            "link" => Self::link_text(value),
            "text" => Self::text(value),
            _ => Self::css(value),
        })
    }
}

/// Quote a string as a CSS string token
fn css_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Quote a string as an XPath literal, falling back to concat() when it
/// contains both quote kinds
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value
            .split('\'')
            .map(|part| format!("'{}'", part))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Opaque handle to a live DOM node.
///
/// The node is owned by the browser session; a handle is only valid for the
/// session that produced it. Two handles compare equal when they refer to the
/// same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Session-scoped node identity
    pub id: String,
    /// Lowercase tag name
    pub tag_name: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into().to_lowercase(),
        }
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}#{}>", self.tag_name, self.id)
    }
}

/// Snapshot of an element's rendered state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    /// Not hidden by style (`display`, `visibility`, `opacity`) or attribute
    /// (`hidden`, `aria-hidden`)
    pub displayed: bool,
    /// Rendered width in CSS pixels
    pub width: f64,
    /// Rendered height in CSS pixels
    pub height: f64,
    /// Attribute name to value
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Trimmed visible text
    #[serde(default)]
    pub text: String,
}

impl ElementState {
    /// Displayed and rendered with a non-zero size
    pub fn is_visible(&self) -> bool {
        self.displayed && self.width > 0.0 && self.height > 0.0
    }

    /// Attribute value, if present
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_display_and_parse() {
        let sel = Selector::css("nav a");
        assert_eq!(sel.to_string(), "css:nav a");
        assert_eq!("css:nav a".parse::<Selector>().unwrap(), sel);
        assert_eq!("xpath://h4".parse::<Selector>().unwrap(), Selector::xpath("//h4"));
        assert_eq!("#finish".parse::<Selector>().unwrap(), Selector::css("#finish"));
        assert!("text:".parse::<Selector>().is_err());
    }

    #[test]
    fn test_css_with_colon_is_not_a_strategy() {
        let sel: Selector = "a:hover".parse().unwrap();
        assert_eq!(sel, Selector::css("a:hover"));
    }

    #[test]
    fn test_selector_queries() {
        assert_eq!(Selector::id("start").query(), Query::Css("[id=\"start\"]".to_string()));
        assert_eq!(Selector::tag_name("input").query(), Query::Css("input".to_string()));
        assert_eq!(
            Selector::link_text("Dynamic Loading").query(),
            Query::XPath("//a[normalize-space(.)='Dynamic Loading']".to_string())
        );
        assert_eq!(
            Selector::text("Hello World!").query(),
            Query::XPath("//*[text()[contains(normalize-space(.), 'Hello World!')]]".to_string())
        );
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }

    #[test]
    fn test_json_strategy_names_match_display_form() {
        for sel in [
            Selector::css("nav a"),
            Selector::xpath("//a"),
            Selector::id("start"),
            Selector::tag_name("input"),
            Selector::link_text("Docs"),
            Selector::text("Search"),
        ] {
            let json = serde_json::to_value(&sel).unwrap();
            assert_eq!(json["strategy"], sel.strategy());
            assert_eq!(serde_json::from_value::<Selector>(json).unwrap(), sel);
        }

        assert_eq!(
            serde_json::to_string(&Selector::xpath("//a")).unwrap(),
            r#"{"strategy":"xpath","value":"//a"}"#
        );
    }

    #[test]
    fn test_display_list() {
        let list = vec![Selector::css("a"), Selector::text("Search")];
        assert_eq!(Selector::display_list(&list), "[css:a, text:Search]");
    }

    #[test]
    fn test_element_state_visibility() {
        let mut state = ElementState {
            displayed: true,
            width: 120.0,
            height: 30.0,
            ..Default::default()
        };
        assert!(state.is_visible());

        state.height = 0.0;
        assert!(!state.is_visible());

        state.height = 30.0;
        state.displayed = false;
        assert!(!state.is_visible());
    }

    #[test]
    fn test_handle_identity() {
        let a = ElementHandle::new("42", "INPUT");
        let b = ElementHandle::new("42", "input");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "<input#42>");
    }
}
