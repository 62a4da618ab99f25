//! `UiSurface` — the abstract query surface the harness runs against.
//!
//! Everything above this trait (waits, interactions, synchronization
//! helpers) is backend-agnostic. Production wires it to a real browser
//! driver; tests wire it to [`MockSurface`](crate::mock::MockSurface),
//! which scripts delayed appearance, flaky clicks, and stale handles
//! deterministically.

use serde::{Deserialize, Serialize};

use crate::locator::Locator;
use crate::result::{ComprobarError, ComprobarResult};

/// Opaque reference to a live UI node.
///
/// Owned by the query surface; the harness holds a handle only for the
/// duration of a single operation and re-resolves the locator on every
/// poll tick. A handle may go stale if the underlying node is removed or
/// replaced, in which case element-level calls return
/// [`ComprobarError::StaleElement`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Surface-assigned identifier for the node
    pub id: String,
    /// Element tag name
    pub tag_name: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
        }
    }
}

/// Non-character keys the interaction layer can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Enter / Return
    Enter,
    /// Tab
    Tab,
    /// Escape
    Escape,
}

impl Key {
    /// Key name as sent to the surface
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "Enter",
            Self::Tab => "Tab",
            Self::Escape => "Escape",
        }
    }
}

/// Capabilities the environment must supply: locate elements, introspect
/// them, and act on them — naturally or synthetically.
///
/// All methods are synchronous; each test execution owns its surface
/// exclusively, so polling cost stays local to that execution.
pub trait UiSurface: Send + Sync {
    /// All elements currently matching the locator, empty when none match.
    fn find_all(&self, locator: &Locator) -> ComprobarResult<Vec<ElementHandle>>;

    /// Whether the element is rendered and visible
    fn is_visible(&self, element: &ElementHandle) -> ComprobarResult<bool>;

    /// Whether the element accepts interaction
    fn is_enabled(&self, element: &ElementHandle) -> ComprobarResult<bool>;

    /// Trimmed text content of the element
    fn text(&self, element: &ElementHandle) -> ComprobarResult<String>;

    /// Attribute value, `None` when the attribute is absent
    fn attribute(&self, element: &ElementHandle, name: &str)
        -> ComprobarResult<Option<String>>;

    /// Native click, subject to hit-testing. May fail on transient
    /// overlays even after a successful clickability wait.
    fn click(&self, element: &ElementHandle) -> ComprobarResult<()>;

    /// Synthetic click dispatched directly against the element, bypassing
    /// hit-testing. The fallback primitive — only invoked after a native
    /// click has failed.
    fn dispatch_click(&self, element: &ElementHandle) -> ComprobarResult<()>;

    /// Clear an input field's value
    fn clear(&self, element: &ElementHandle) -> ComprobarResult<()>;

    /// Send text to the element as keystrokes
    fn send_keys(&self, element: &ElementHandle, text: &str) -> ComprobarResult<()>;

    /// Send a non-character key to the element
    fn press_key(&self, element: &ElementHandle, key: Key) -> ComprobarResult<()>;

    /// Move the pointer over the element
    fn hover(&self, element: &ElementHandle) -> ComprobarResult<()>;

    /// Drag one element onto another
    fn drag_and_drop(
        &self,
        source: &ElementHandle,
        target: &ElementHandle,
    ) -> ComprobarResult<()>;

    /// Select a dropdown option by its visible text
    fn select_by_visible_text(
        &self,
        element: &ElementHandle,
        text: &str,
    ) -> ComprobarResult<()>;

    /// Select a dropdown option by its value attribute
    fn select_by_value(&self, element: &ElementHandle, value: &str) -> ComprobarResult<()>;

    /// Select a dropdown option by index
    fn select_by_index(&self, element: &ElementHandle, index: usize) -> ComprobarResult<()>;

    /// Scroll the element into the viewport
    fn scroll_into_view(&self, element: &ElementHandle) -> ComprobarResult<()>;

    /// First element matching the locator.
    ///
    /// # Errors
    ///
    /// Returns [`ComprobarError::ElementNotFound`] when nothing matches.
    fn find(&self, locator: &Locator) -> ComprobarResult<ElementHandle> {
        self.find_all(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| ComprobarError::ElementNotFound {
                locator: locator.to_string(),
            })
    }
}
