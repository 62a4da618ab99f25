//! Locator abstraction for describing how to find an element.
//!
//! A [`Locator`] is a pure value: a selection strategy plus a selector
//! string. It carries no live reference to the page — resolving it into
//! element handles is the job of the [`UiSurface`](crate::driver::UiSurface)
//! on every poll tick, so a locator never goes stale.

use serde::{Deserialize, Serialize};

/// Selection strategy for locating elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Element id attribute
    Id,
    /// CSS selector (e.g. `button.primary`)
    Css,
    /// XPath expression
    XPath,
    /// Tag name
    Tag,
    /// Exact anchor text
    LinkText,
    /// Element name attribute
    Name,
    /// Test id attribute (`data-testid`)
    TestId,
}

impl Strategy {
    /// Short name used in diagnostics
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::Tag => "tag",
            Self::LinkText => "link-text",
            Self::Name => "name",
            Self::TestId => "test-id",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A locator: strategy plus selector string.
///
/// Immutable once constructed. Equality is structural and used for
/// logging and for keying scripted elements in the mock surface, never
/// for caching live handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    strategy: Strategy,
    value: String,
}

impl Locator {
    /// Create a locator from a strategy and selector string
    #[must_use]
    pub fn new(strategy: Strategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    /// Locate by element id
    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self::new(Strategy::Id, value)
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(value: impl Into<String>) -> Self {
        Self::new(Strategy::Css, value)
    }

    /// Locate by XPath expression
    #[must_use]
    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, value)
    }

    /// Locate by tag name
    #[must_use]
    pub fn tag(value: impl Into<String>) -> Self {
        Self::new(Strategy::Tag, value)
    }

    /// Locate by exact anchor text
    #[must_use]
    pub fn link_text(value: impl Into<String>) -> Self {
        Self::new(Strategy::LinkText, value)
    }

    /// Locate by name attribute
    #[must_use]
    pub fn name(value: impl Into<String>) -> Self {
        Self::new(Strategy::Name, value)
    }

    /// Locate by `data-testid` attribute
    #[must_use]
    pub fn test_id(value: impl Into<String>) -> Self {
        Self::new(Strategy::TestId, value)
    }

    /// Get the strategy
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Get the selector string
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.strategy, self.value)
    }
}
