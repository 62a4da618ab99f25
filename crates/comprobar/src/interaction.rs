//! User-facing actions over the UI surface: click with a synthetic
//! fallback, typing, selection, hover, drag.
//!
//! Failure semantics: wait-phase errors always propagate (the caller must
//! know the element never became ready). Action-phase errors get exactly
//! one fallback where a fallback exists (click); everywhere else they are
//! logged and propagated.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::driver::{Key, UiSurface};
use crate::locator::Locator;
use crate::result::{ComprobarError, ComprobarResult};
use crate::wait::WaitEngine;

/// Default delay between characters for slow typing (50ms)
pub const DEFAULT_SLOW_TYPE_DELAY_MS: u64 = 50;

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for [`Interactor::type_text`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeOptions {
    /// Clear the field before typing
    pub clear: bool,
    /// Press Enter after typing
    pub press_enter: bool,
}

impl TypeOptions {
    /// Create options with nothing enabled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the field first
    #[must_use]
    pub const fn clearing(mut self) -> Self {
        self.clear = true;
        self
    }

    /// Submit with Enter afterwards
    #[must_use]
    pub const fn submitting(mut self) -> Self {
        self.press_enter = true;
        self
    }
}

/// How to pick a dropdown option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectMode {
    /// Match the option's visible text
    VisibleText,
    /// Match the option's value attribute
    Value,
    /// Pick by zero-based index
    Index,
}

impl FromStr for SelectMode {
    type Err = ComprobarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::VisibleText),
            "value" => Ok(Self::Value),
            "index" => Ok(Self::Index),
            other => Err(ComprobarError::Configuration {
                message: format!("unknown selection mode {other:?}"),
            }),
        }
    }
}

// =============================================================================
// INTERACTOR
// =============================================================================

/// Performs actions on elements, tolerating overlay/occlusion/animation
/// races via the native-then-synthetic click pipeline.
#[derive(Clone)]
pub struct Interactor {
    surface: Arc<dyn UiSurface>,
    clock: Arc<dyn Clock>,
    waits: WaitEngine,
}

impl std::fmt::Debug for Interactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interactor")
            .field("waits", &self.waits)
            .finish_non_exhaustive()
    }
}

impl Interactor {
    /// Create an interactor sharing the wait engine's surface and clock
    #[must_use]
    pub fn new(surface: Arc<dyn UiSurface>, clock: Arc<dyn Clock>, waits: WaitEngine) -> Self {
        Self {
            surface,
            clock,
            waits,
        }
    }

    /// The wait engine this interactor fronts
    #[must_use]
    pub const fn waits(&self) -> &WaitEngine {
        &self.waits
    }

    /// Click the element: wait for clickability, try a native click, and
    /// on any action-phase failure fall back to exactly one synthetic
    /// click. Many UIs render elements that are logically clickable
    /// before they are pixel-stable, so a failed native click is not by
    /// itself a verdict.
    ///
    /// # Errors
    ///
    /// Wait-phase timeout propagates. If the fallback also fails, the
    /// fallback error surfaces — there is no further fallback.
    pub fn click(&self, locator: &Locator) -> ComprobarResult<()> {
        let element = self.waits.clickable(locator)?;
        match self.surface.click(&element) {
            Ok(()) => {
                debug!(%locator, "clicked");
                Ok(())
            }
            Err(native_err) => {
                warn!(%locator, %native_err, "native click failed, trying synthetic click");
                self.forced_click(locator)
            }
        }
    }

    /// Synthetic click dispatched directly against the element. Waits
    /// only for presence — the point is to reach elements hit-testing
    /// rejects.
    pub fn forced_click(&self, locator: &Locator) -> ComprobarResult<()> {
        let element = self.waits.present(locator)?;
        match self.surface.dispatch_click(&element) {
            Ok(()) => {
                debug!(%locator, "synthetic click dispatched");
                Ok(())
            }
            Err(err) => {
                error!(%locator, %err, "synthetic click failed");
                Err(err)
            }
        }
    }

    /// Type text into the element. A missing input field is always a
    /// hard error — no later assertion can succeed without it.
    pub fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        options: TypeOptions,
    ) -> ComprobarResult<()> {
        let element = self.waits.visible(locator).map_err(|err| {
            error!(%locator, %err, "input field never became visible");
            err
        })?;
        if options.clear {
            self.surface.clear(&element)?;
        }
        self.surface.send_keys(&element, text).map_err(|err| {
            error!(%locator, %err, "failed to send text");
            err
        })?;
        if options.press_enter {
            self.surface.press_key(&element, Key::Enter)?;
            debug!(%locator, "typed text and pressed Enter");
        } else {
            debug!(%locator, "typed text");
        }
        Ok(())
    }

    /// Clear the field, then send one character at a time with a fixed
    /// delay between characters — for widgets whose autocomplete only
    /// fires on incremental input events. The delay simulates human
    /// typing cadence and stays configurable.
    ///
    /// # Errors
    ///
    /// An interrupted sleep abandons the remaining characters and
    /// surfaces [`ComprobarError::Interrupted`].
    pub fn type_slow(
        &self,
        locator: &Locator,
        text: &str,
        per_char_delay: Duration,
    ) -> ComprobarResult<()> {
        let element = self.waits.visible(locator)?;
        self.surface.clear(&element)?;
        for ch in text.chars() {
            self.surface.send_keys(&element, &ch.to_string())?;
            if let Err(err) = self.clock.sleep(per_char_delay) {
                warn!(%locator, "slow typing interrupted, abandoning remaining characters");
                return Err(err);
            }
        }
        debug!(%locator, delay_ms = per_char_delay.as_millis() as u64, "typed text character by character");
        Ok(())
    }

    /// Select a dropdown option, dispatching on `mode`. For
    /// [`SelectMode::Index`] the value must parse as a zero-based index.
    pub fn select(
        &self,
        locator: &Locator,
        mode: SelectMode,
        value: &str,
    ) -> ComprobarResult<()> {
        let element = self.waits.visible(locator)?;
        match mode {
            SelectMode::VisibleText => self.surface.select_by_visible_text(&element, value),
            SelectMode::Value => self.surface.select_by_value(&element, value),
            SelectMode::Index => {
                let index: usize =
                    value
                        .parse()
                        .map_err(|_| ComprobarError::Configuration {
                            message: format!("selection index must be a number, got {value:?}"),
                        })?;
                self.surface.select_by_index(&element, index)
            }
        }
        .map_err(|err| {
            error!(%locator, ?mode, value, %err, "selection failed");
            err
        })
    }

    /// Move the pointer over the element
    pub fn hover(&self, locator: &Locator) -> ComprobarResult<()> {
        let element = self.waits.visible(locator)?;
        self.surface.hover(&element)
    }

    /// Drag one element onto another
    pub fn drag_and_drop(&self, source: &Locator, target: &Locator) -> ComprobarResult<()> {
        let source_el = self.waits.visible(source)?;
        let target_el = self.waits.visible(target)?;
        self.surface.drag_and_drop(&source_el, &target_el)
    }

    /// Send a non-character key to the element
    pub fn press_key(&self, locator: &Locator, key: Key) -> ComprobarResult<()> {
        let element = self.waits.visible(locator)?;
        self.surface.press_key(&element, key)
    }

    /// Trimmed text of the element, after waiting for visibility
    pub fn read_text(&self, locator: &Locator) -> ComprobarResult<String> {
        let element = self.waits.visible(locator)?;
        self.surface.text(&element)
    }

    /// Attribute value of the element, after waiting for visibility
    pub fn attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> ComprobarResult<Option<String>> {
        let element = self.waits.visible(locator)?;
        self.surface.attribute(&element, name)
    }

    /// Poll-free displayed check: absent elements are `false`, never an
    /// error. For optional UI like a cart badge that only renders once
    /// the cart is non-empty.
    pub fn is_displayed(&self, locator: &Locator) -> ComprobarResult<bool> {
        let handles = match self.surface.find_all(locator) {
            Ok(handles) => handles,
            Err(err) if err.is_absence() => return Ok(false),
            Err(err) => return Err(err),
        };
        for handle in handles {
            match self.surface.is_visible(&handle) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(err) if err.is_absence() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(false)
    }

    /// Whether the element accepts interaction, after waiting for presence
    pub fn is_enabled(&self, locator: &Locator) -> ComprobarResult<bool> {
        let element = self.waits.present(locator)?;
        self.surface.is_enabled(&element)
    }

    /// Clear an input field, after waiting for visibility
    pub fn clear_field(&self, locator: &Locator) -> ComprobarResult<()> {
        let element = self.waits.visible(locator)?;
        self.surface.clear(&element)
    }

    /// Scroll the element into the viewport, after waiting for presence
    pub fn scroll_into_view(&self, locator: &Locator) -> ComprobarResult<()> {
        let element = self.waits.present(locator)?;
        self.surface.scroll_into_view(&element)
    }

    /// Poll-free count of currently matching elements
    pub fn element_count(&self, locator: &Locator) -> ComprobarResult<usize> {
        match self.surface.find_all(locator) {
            Ok(handles) => Ok(handles.len()),
            Err(err) if err.is_absence() => Ok(0),
            Err(err) => Err(err),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::mock::{ClickScript, MockElement, MockSurface};
    use crate::wait::WaitOptions;

    fn interactor_with(
        elements: Vec<MockElement>,
    ) -> (Arc<FakeClock>, Arc<MockSurface>, Interactor) {
        let clock = Arc::new(FakeClock::new());
        let surface = Arc::new(MockSurface::with_elements(Arc::clone(&clock), elements));
        let waits = WaitEngine::with_defaults(
            Arc::clone(&surface) as Arc<dyn UiSurface>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            WaitOptions::new().with_timeout(1000).with_poll_interval(50),
        );
        let interactor = Interactor::new(
            Arc::clone(&surface) as Arc<dyn UiSurface>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            waits,
        );
        (clock, surface, interactor)
    }

    mod select_mode_tests {
        use super::*;

        #[test]
        fn test_from_str_known_modes() {
            assert_eq!("text".parse::<SelectMode>().unwrap(), SelectMode::VisibleText);
            assert_eq!("value".parse::<SelectMode>().unwrap(), SelectMode::Value);
            assert_eq!("index".parse::<SelectMode>().unwrap(), SelectMode::Index);
        }

        #[test]
        fn test_from_str_unknown_mode_fails_fast() {
            assert!(matches!(
                "label".parse::<SelectMode>(),
                Err(ComprobarError::Configuration { .. })
            ));
        }
    }

    mod click_tests {
        use super::*;

        #[test]
        fn test_native_click_skips_fallback() {
            let (_clock, surface, interactor) =
                interactor_with(vec![MockElement::new(Locator::id("add")).tag("button")]);
            interactor.click(&Locator::id("add")).unwrap();
            assert_eq!(surface.native_click_count(), 1);
            assert_eq!(surface.synthetic_click_count(), 0);
        }

        #[test]
        fn test_flaky_native_click_falls_back_once() {
            let (_clock, surface, interactor) = interactor_with(vec![MockElement::new(
                Locator::id("add"),
            )
            .click_script(ClickScript::AlwaysFails)]);
            interactor.click(&Locator::id("add")).unwrap();
            assert_eq!(surface.native_click_count(), 1);
            assert_eq!(surface.synthetic_click_count(), 1);
        }

        #[test]
        fn test_both_clicks_failing_surfaces_fallback_error() {
            let (_clock, surface, interactor) = interactor_with(vec![MockElement::new(
                Locator::id("add"),
            )
            .click_script(ClickScript::AlwaysFails)
            .dispatch_click_fails()]);
            let result = interactor.click(&Locator::id("add"));
            assert!(matches!(
                result,
                Err(ComprobarError::NotInteractable { .. })
            ));
            // Exactly one fallback attempt, no retry loop.
            assert_eq!(surface.synthetic_click_count(), 1);
        }

        #[test]
        fn test_click_wait_phase_timeout_propagates() {
            let (_clock, surface, interactor) = interactor_with(vec![]);
            let result = interactor.click(&Locator::id("missing"));
            assert!(matches!(result, Err(ComprobarError::Timeout { .. })));
            assert_eq!(surface.native_click_count(), 0);
            assert_eq!(surface.synthetic_click_count(), 0);
        }

        #[test]
        fn test_forced_click_reaches_hidden_element() {
            // Present but hidden: clickable would time out, forced click works.
            let (_clock, surface, interactor) =
                interactor_with(vec![MockElement::new(Locator::id("overlay-ok")).hidden()]);
            interactor.forced_click(&Locator::id("overlay-ok")).unwrap();
            assert_eq!(surface.synthetic_click_count(), 1);
        }
    }

    mod type_tests {
        use super::*;

        #[test]
        fn test_type_text_with_clear_and_enter() {
            let locator = Locator::name("search");
            let (_clock, surface, interactor) =
                interactor_with(vec![MockElement::new(locator.clone()).tag("input")]);

            // Pre-existing content gets cleared.
            let handle = surface.find_all(&locator).unwrap().remove(0);
            surface.send_keys(&handle, "old").unwrap();

            interactor
                .type_text(&locator, "ZARA", TypeOptions::new().clearing().submitting())
                .unwrap();

            assert_eq!(surface.field_value(&locator), "ZARA");
            let keys = surface.keys_pressed();
            assert_eq!(keys.len(), 1);
            assert_eq!(keys[0].1, Key::Enter);
        }

        #[test]
        fn test_type_text_without_clear_appends() {
            let locator = Locator::name("coupon");
            let (_clock, surface, interactor) =
                interactor_with(vec![MockElement::new(locator.clone()).tag("input")]);
            interactor
                .type_text(&locator, "SAVE", TypeOptions::new())
                .unwrap();
            interactor
                .type_text(&locator, "20", TypeOptions::new())
                .unwrap();
            assert_eq!(surface.field_value(&locator), "SAVE20");
        }

        #[test]
        fn test_type_text_missing_field_is_hard_error() {
            let (_clock, _surface, interactor) = interactor_with(vec![]);
            let result =
                interactor.type_text(&Locator::name("search"), "India", TypeOptions::new());
            assert!(matches!(result, Err(ComprobarError::Timeout { .. })));
        }

        #[test]
        fn test_type_slow_paces_keystrokes() {
            let locator = Locator::name("country");
            let (_clock, surface, interactor) =
                interactor_with(vec![MockElement::new(locator.clone()).tag("input")]);

            interactor
                .type_slow(&locator, "India", Duration::from_millis(50))
                .unwrap();

            let strokes = surface.keystrokes();
            assert_eq!(strokes.len(), 5);
            let typed: String = strokes.iter().map(|k| k.text.as_str()).collect();
            assert_eq!(typed, "India");
            for pair in strokes.windows(2) {
                assert!(pair[1].at_ms - pair[0].at_ms >= 50);
            }
            assert_eq!(surface.field_value(&locator), "India");
        }

        #[test]
        fn test_type_slow_interruption_abandons_remaining() {
            let locator = Locator::name("country");
            let (clock, surface, interactor) =
                interactor_with(vec![MockElement::new(locator.clone()).tag("input")]);

            // Two characters get typed, the second pacing sleep is interrupted.
            clock.interrupt_after(2);
            let result = interactor.type_slow(&locator, "India", Duration::from_millis(50));

            assert!(matches!(result, Err(ComprobarError::Interrupted { .. })));
            assert_eq!(surface.keystrokes().len(), 2);
            assert_eq!(surface.field_value(&locator), "In");
        }
    }

    mod select_tests {
        use super::*;

        #[test]
        fn test_select_dispatches_by_mode() {
            let locator = Locator::id("country");
            let (_clock, surface, interactor) =
                interactor_with(vec![MockElement::new(locator.clone()).tag("select")]);

            interactor
                .select(&locator, SelectMode::VisibleText, "India")
                .unwrap();
            interactor.select(&locator, SelectMode::Value, "IN").unwrap();
            interactor.select(&locator, SelectMode::Index, "2").unwrap();

            assert_eq!(
                surface.selections(),
                vec![
                    ("text".to_string(), "India".to_string()),
                    ("value".to_string(), "IN".to_string()),
                    ("index".to_string(), "2".to_string()),
                ]
            );
        }

        #[test]
        fn test_select_bad_index_is_configuration_error() {
            let locator = Locator::id("country");
            let (_clock, _surface, interactor) =
                interactor_with(vec![MockElement::new(locator.clone()).tag("select")]);
            assert!(matches!(
                interactor.select(&locator, SelectMode::Index, "two"),
                Err(ComprobarError::Configuration { .. })
            ));
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_is_displayed_absent_is_false_not_error() {
            let (_clock, _surface, interactor) = interactor_with(vec![]);
            assert!(!interactor.is_displayed(&Locator::css(".badge")).unwrap());
        }

        #[test]
        fn test_is_displayed_hidden_is_false() {
            let (_clock, _surface, interactor) =
                interactor_with(vec![MockElement::new(Locator::css(".badge")).hidden()]);
            assert!(!interactor.is_displayed(&Locator::css(".badge")).unwrap());
        }

        #[test]
        fn test_read_text_and_attribute() {
            let locator = Locator::test_id("cart-count");
            let (_clock, _surface, interactor) = interactor_with(vec![MockElement::new(
                locator.clone(),
            )
            .text("3")
            .attribute("aria-label", "Cart items")]);
            assert_eq!(interactor.read_text(&locator).unwrap(), "3");
            assert_eq!(
                interactor.attribute(&locator, "aria-label").unwrap(),
                Some("Cart items".to_string())
            );
        }

        #[test]
        fn test_element_count_poll_free() {
            let (_clock, _surface, interactor) = interactor_with(vec![
                MockElement::new(Locator::css(".card")),
                MockElement::new(Locator::css(".card")),
            ]);
            assert_eq!(interactor.element_count(&Locator::css(".card")).unwrap(), 2);
            assert_eq!(interactor.element_count(&Locator::css(".row")).unwrap(), 0);
        }

        #[test]
        fn test_hover_and_drag_record_calls() {
            let (_clock, surface, interactor) = interactor_with(vec![
                MockElement::new(Locator::id("menu")),
                MockElement::new(Locator::id("bin")),
            ]);
            interactor.hover(&Locator::id("menu")).unwrap();
            interactor
                .drag_and_drop(&Locator::id("menu"), &Locator::id("bin"))
                .unwrap();
            assert_eq!(surface.hover_count(), 1);
            assert_eq!(surface.drag_count(), 1);
        }

        #[test]
        fn test_scroll_into_view() {
            let (_clock, surface, interactor) =
                interactor_with(vec![MockElement::new(Locator::id("footer"))]);
            interactor.scroll_into_view(&Locator::id("footer")).unwrap();
            assert_eq!(surface.scroll_count(), 1);
        }
    }
}
