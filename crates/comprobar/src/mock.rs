//! Scripted in-memory [`UiSurface`] for deterministic tests.
//!
//! Elements are scripted with appearance/disappearance times evaluated
//! against a shared [`FakeClock`], so tests of delayed rendering, flaky
//! clicks, and vanishing overlays run instantly and reproducibly. The
//! surface also records keystrokes, field contents, and per-action call
//! counters — the side channels the timing and fallback properties are
//! asserted through.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::clock::{Clock, FakeClock};
use crate::driver::{ElementHandle, Key, UiSurface};
use crate::locator::Locator;
use crate::result::{ComprobarError, ComprobarResult};

/// Scripted native-click behavior for one element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickScript {
    /// Native clicks succeed
    Succeeds,
    /// The first `n` native clicks fail, later ones succeed
    FailsFirst(u32),
    /// Every native click fails
    AlwaysFails,
}

/// One scripted element: a locator, a lifetime on the fake timeline, and
/// interaction behavior.
#[derive(Debug, Clone)]
pub struct MockElement {
    locator: Locator,
    tag_name: String,
    appears_at_ms: u64,
    disappears_at_ms: Option<u64>,
    visible: bool,
    enabled: bool,
    text: String,
    attributes: HashMap<String, String>,
    click_script: ClickScript,
    dispatch_click_fails: bool,
}

impl MockElement {
    /// Script an element present from time zero, visible and enabled
    #[must_use]
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            tag_name: "div".to_string(),
            appears_at_ms: 0,
            disappears_at_ms: None,
            visible: true,
            enabled: true,
            text: String::new(),
            attributes: HashMap::new(),
            click_script: ClickScript::Succeeds,
            dispatch_click_fails: false,
        }
    }

    /// Set the tag name
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag_name = tag.into();
        self
    }

    /// Element enters the DOM at this fake time
    #[must_use]
    pub const fn appears_at_ms(mut self, ms: u64) -> Self {
        self.appears_at_ms = ms;
        self
    }

    /// Element leaves the DOM at this fake time
    #[must_use]
    pub const fn disappears_at_ms(mut self, ms: u64) -> Self {
        self.disappears_at_ms = Some(ms);
        self
    }

    /// Present in the DOM but not visible
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Present but refusing interaction
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Set the text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Script native-click behavior
    #[must_use]
    pub const fn click_script(mut self, script: ClickScript) -> Self {
        self.click_script = script;
        self
    }

    /// Synthetic clicks fail too
    #[must_use]
    pub const fn dispatch_click_fails(mut self) -> Self {
        self.dispatch_click_fails = true;
        self
    }

    fn present_at(&self, now_ms: u64) -> bool {
        now_ms >= self.appears_at_ms
            && self.disappears_at_ms.map_or(true, |gone| now_ms < gone)
    }
}

/// A recorded keystroke batch with its fake timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keystroke {
    /// Fake time the keys were sent
    pub at_ms: u64,
    /// Text sent in this batch
    pub text: String,
}

#[derive(Debug, Default)]
struct SurfaceState {
    entries: Vec<Entry>,
    fields: HashMap<String, String>,
    keystrokes: Vec<Keystroke>,
    keys_pressed: Vec<(u64, Key)>,
    selections: Vec<(String, String)>,
    native_clicks: u64,
    synthetic_clicks: u64,
    hovers: u64,
    drags: u64,
    scrolls: u64,
    find_fault: Option<String>,
}

#[derive(Debug)]
struct Entry {
    id: String,
    element: MockElement,
    native_failures_left: u32,
}

/// Scripted fake [`UiSurface`] driven by a shared [`FakeClock`].
#[derive(Debug)]
pub struct MockSurface {
    clock: Arc<FakeClock>,
    state: Mutex<SurfaceState>,
}

impl MockSurface {
    /// Create an empty surface bound to a clock
    #[must_use]
    pub fn new(clock: Arc<FakeClock>) -> Self {
        Self {
            clock,
            state: Mutex::new(SurfaceState::default()),
        }
    }

    /// Create a surface pre-loaded with scripted elements
    #[must_use]
    pub fn with_elements(clock: Arc<FakeClock>, elements: Vec<MockElement>) -> Self {
        let surface = Self::new(clock);
        for element in elements {
            surface.add_element(element);
        }
        surface
    }

    /// Add a scripted element; returns the handle it will resolve to
    pub fn add_element(&self, element: MockElement) -> ElementHandle {
        let mut state = self.lock();
        let id = format!("el-{}", state.entries.len());
        let handle = ElementHandle::new(id.clone(), element.tag_name.clone());
        let native_failures_left = match element.click_script {
            ClickScript::FailsFirst(n) => n,
            _ => 0,
        };
        state.entries.push(Entry {
            id,
            element,
            native_failures_left,
        });
        handle
    }

    /// Script every subsequent locate call to fail at the session level,
    /// for testing hard-error propagation through the wait loop.
    pub fn fail_finds_with_infrastructure(&self, message: impl Into<String>) {
        self.lock().find_fault = Some(message.into());
    }

    /// Native click attempts observed (including failed ones)
    #[must_use]
    pub fn native_click_count(&self) -> u64 {
        self.lock().native_clicks
    }

    /// Synthetic click attempts observed (including failed ones)
    #[must_use]
    pub fn synthetic_click_count(&self) -> u64 {
        self.lock().synthetic_clicks
    }

    /// Hover calls observed
    #[must_use]
    pub fn hover_count(&self) -> u64 {
        self.lock().hovers
    }

    /// Drag-and-drop calls observed
    #[must_use]
    pub fn drag_count(&self) -> u64 {
        self.lock().drags
    }

    /// Scroll-into-view calls observed
    #[must_use]
    pub fn scroll_count(&self) -> u64 {
        self.lock().scrolls
    }

    /// Keystroke batches in send order, with fake timestamps
    #[must_use]
    pub fn keystrokes(&self) -> Vec<Keystroke> {
        self.lock().keystrokes.clone()
    }

    /// Non-character keys pressed, with fake timestamps
    #[must_use]
    pub fn keys_pressed(&self) -> Vec<(u64, Key)> {
        self.lock().keys_pressed.clone()
    }

    /// Selections performed as (mode, value) pairs
    #[must_use]
    pub fn selections(&self) -> Vec<(String, String)> {
        self.lock().selections.clone()
    }

    /// Current field content for the first element scripted under this
    /// locator, empty if nothing was ever typed.
    #[must_use]
    pub fn field_value(&self, locator: &Locator) -> String {
        let state = self.lock();
        state
            .entries
            .iter()
            .find(|entry| entry.element.locator == *locator)
            .and_then(|entry| state.fields.get(&entry.id))
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().expect("mock surface lock poisoned")
    }

    fn with_entry<T>(
        &self,
        element: &ElementHandle,
        f: impl FnOnce(&mut Entry, &mut SurfaceState) -> ComprobarResult<T>,
    ) -> ComprobarResult<T> {
        let now = self.clock.now_ms();
        let mut state = self.lock();
        let index = state
            .entries
            .iter()
            .position(|entry| entry.id == element.id)
            .ok_or_else(|| ComprobarError::StaleElement {
                message: format!("unknown element {}", element.id),
            })?;
        if !state.entries[index].element.present_at(now) {
            return Err(ComprobarError::StaleElement {
                message: format!("element {} left the DOM", element.id),
            });
        }
        // Split borrow: take the entry out, run, put it back.
        let mut entry = state.entries.remove(index);
        let result = f(&mut entry, &mut state);
        state.entries.insert(index, entry);
        result
    }
}

impl UiSurface for MockSurface {
    fn find_all(&self, locator: &Locator) -> ComprobarResult<Vec<ElementHandle>> {
        let now = self.clock.now_ms();
        let state = self.lock();
        if let Some(message) = &state.find_fault {
            return Err(ComprobarError::Infrastructure {
                message: message.clone(),
            });
        }
        Ok(state
            .entries
            .iter()
            .filter(|entry| entry.element.locator == *locator && entry.element.present_at(now))
            .map(|entry| ElementHandle::new(entry.id.clone(), entry.element.tag_name.clone()))
            .collect())
    }

    fn is_visible(&self, element: &ElementHandle) -> ComprobarResult<bool> {
        self.with_entry(element, |entry, _| Ok(entry.element.visible))
    }

    fn is_enabled(&self, element: &ElementHandle) -> ComprobarResult<bool> {
        self.with_entry(element, |entry, _| Ok(entry.element.enabled))
    }

    fn text(&self, element: &ElementHandle) -> ComprobarResult<String> {
        self.with_entry(element, |entry, _| Ok(entry.element.text.clone()))
    }

    fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> ComprobarResult<Option<String>> {
        self.with_entry(element, |entry, _| {
            Ok(entry.element.attributes.get(name).cloned())
        })
    }

    fn click(&self, element: &ElementHandle) -> ComprobarResult<()> {
        self.with_entry(element, |entry, state| {
            state.native_clicks += 1;
            match entry.element.click_script {
                ClickScript::AlwaysFails => Err(ComprobarError::NotInteractable {
                    message: format!("native click intercepted on {}", entry.id),
                }),
                ClickScript::FailsFirst(_) if entry.native_failures_left > 0 => {
                    entry.native_failures_left -= 1;
                    Err(ComprobarError::NotInteractable {
                        message: format!("native click intercepted on {}", entry.id),
                    })
                }
                _ => Ok(()),
            }
        })
    }

    fn dispatch_click(&self, element: &ElementHandle) -> ComprobarResult<()> {
        self.with_entry(element, |entry, state| {
            state.synthetic_clicks += 1;
            if entry.element.dispatch_click_fails {
                Err(ComprobarError::NotInteractable {
                    message: format!("synthetic click rejected on {}", entry.id),
                })
            } else {
                Ok(())
            }
        })
    }

    fn clear(&self, element: &ElementHandle) -> ComprobarResult<()> {
        self.with_entry(element, |entry, state| {
            state.fields.insert(entry.id.clone(), String::new());
            Ok(())
        })
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> ComprobarResult<()> {
        let at_ms = self.clock.now_ms();
        self.with_entry(element, |entry, state| {
            state
                .fields
                .entry(entry.id.clone())
                .or_default()
                .push_str(text);
            state.keystrokes.push(Keystroke {
                at_ms,
                text: text.to_string(),
            });
            Ok(())
        })
    }

    fn press_key(&self, element: &ElementHandle, key: Key) -> ComprobarResult<()> {
        let at_ms = self.clock.now_ms();
        self.with_entry(element, |_, state| {
            state.keys_pressed.push((at_ms, key));
            Ok(())
        })
    }

    fn hover(&self, element: &ElementHandle) -> ComprobarResult<()> {
        self.with_entry(element, |_, state| {
            state.hovers += 1;
            Ok(())
        })
    }

    fn drag_and_drop(
        &self,
        source: &ElementHandle,
        target: &ElementHandle,
    ) -> ComprobarResult<()> {
        // Validate both ends before recording.
        self.with_entry(source, |_, _| Ok(()))?;
        self.with_entry(target, |_, state| {
            state.drags += 1;
            Ok(())
        })
    }

    fn select_by_visible_text(
        &self,
        element: &ElementHandle,
        text: &str,
    ) -> ComprobarResult<()> {
        self.with_entry(element, |_, state| {
            state.selections.push(("text".to_string(), text.to_string()));
            Ok(())
        })
    }

    fn select_by_value(&self, element: &ElementHandle, value: &str) -> ComprobarResult<()> {
        self.with_entry(element, |_, state| {
            state
                .selections
                .push(("value".to_string(), value.to_string()));
            Ok(())
        })
    }

    fn select_by_index(&self, element: &ElementHandle, index: usize) -> ComprobarResult<()> {
        self.with_entry(element, |_, state| {
            state
                .selections
                .push(("index".to_string(), index.to_string()));
            Ok(())
        })
    }

    fn scroll_into_view(&self, element: &ElementHandle) -> ComprobarResult<()> {
        self.with_entry(element, |_, state| {
            state.scrolls += 1;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<FakeClock>, MockSurface) {
        let clock = Arc::new(FakeClock::new());
        let surface = MockSurface::new(Arc::clone(&clock));
        (clock, surface)
    }

    #[test]
    fn test_find_all_respects_timeline() {
        let (clock, surface) = setup();
        surface.add_element(MockElement::new(Locator::css(".card")).appears_at_ms(100));

        assert!(surface.find_all(&Locator::css(".card")).unwrap().is_empty());
        clock.advance_ms(100);
        assert_eq!(surface.find_all(&Locator::css(".card")).unwrap().len(), 1);
    }

    #[test]
    fn test_disappearance_makes_handle_stale() {
        let (clock, surface) = setup();
        let handle = surface
            .add_element(MockElement::new(Locator::css(".toast")).disappears_at_ms(200));

        assert!(surface.is_visible(&handle).unwrap());
        clock.advance_ms(200);
        assert!(matches!(
            surface.is_visible(&handle),
            Err(ComprobarError::StaleElement { .. })
        ));
    }

    #[test]
    fn test_click_script_fails_first_n() {
        let (_clock, surface) = setup();
        let handle = surface.add_element(
            MockElement::new(Locator::id("add"))
                .click_script(ClickScript::FailsFirst(2)),
        );

        assert!(surface.click(&handle).is_err());
        assert!(surface.click(&handle).is_err());
        assert!(surface.click(&handle).is_ok());
        assert_eq!(surface.native_click_count(), 3);
    }

    #[test]
    fn test_send_keys_accumulates_field_value() {
        let (clock, surface) = setup();
        let locator = Locator::name("search");
        let handle = surface.add_element(MockElement::new(locator.clone()).tag("input"));

        surface.send_keys(&handle, "In").unwrap();
        clock.advance_ms(50);
        surface.send_keys(&handle, "dia").unwrap();

        assert_eq!(surface.field_value(&locator), "India");
        let strokes = surface.keystrokes();
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].at_ms, 0);
        assert_eq!(strokes[1].at_ms, 50);
    }

    #[test]
    fn test_clear_resets_field() {
        let (_clock, surface) = setup();
        let locator = Locator::name("search");
        let handle = surface.add_element(MockElement::new(locator.clone()));
        surface.send_keys(&handle, "stale query").unwrap();
        surface.clear(&handle).unwrap();
        assert_eq!(surface.field_value(&locator), "");
    }

    #[test]
    fn test_find_fault_surfaces_infrastructure_error() {
        let (_clock, surface) = setup();
        surface.fail_finds_with_infrastructure("session closed");
        assert!(matches!(
            surface.find_all(&Locator::css(".card")),
            Err(ComprobarError::Infrastructure { .. })
        ));
    }

    #[test]
    fn test_find_returns_first_match_or_not_found() {
        let (_clock, surface) = setup();
        surface.add_element(MockElement::new(Locator::css(".card")).tag("div"));
        surface.add_element(MockElement::new(Locator::css(".card")).tag("div"));

        let first = surface.find(&Locator::css(".card")).unwrap();
        assert_eq!(first.id, "el-0");
        assert!(matches!(
            surface.find(&Locator::css(".missing")),
            Err(ComprobarError::ElementNotFound { .. })
        ));
    }

    #[test]
    fn test_attribute_lookup() {
        let (_clock, surface) = setup();
        let handle = surface.add_element(
            MockElement::new(Locator::css(".badge")).attribute("aria-label", "Cart"),
        );
        assert_eq!(
            surface.attribute(&handle, "aria-label").unwrap(),
            Some("Cart".to_string())
        );
        assert_eq!(surface.attribute(&handle, "missing").unwrap(), None);
    }
}
