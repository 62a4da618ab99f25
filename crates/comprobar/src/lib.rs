//! Comprobar: the synchronization, interaction, and retry core of a
//! browser-driven e2e suite.
//!
//! Page objects ask three questions of every screen: is the UI ready,
//! how do I act on it, and — when an action failed — should the whole
//! test run again. Comprobar answers them with a polling wait engine, an
//! interaction layer with a single synthetic-click fallback, and a
//! bounded retry classifier.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  page objects (external)          test runner (external)         │
//! │        │                                  │                      │
//! │        ▼                                  ▼                      │
//! │  Interactor / SyncHelper            RetryRegistry                │
//! │        │                                  │                      │
//! │        ▼                                  ▼                      │
//! │    WaitEngine ──── Clock            RetryClassifier              │
//! │        │                                                         │
//! │        ▼                                                         │
//! │    UiSurface (trait) ── production driver / MockSurface          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`UiSurface`] trait is the seam: production wires it to a real
//! browser driver, tests wire it to the scripted [`mock::MockSurface`]
//! and a [`FakeClock`], so every timing property is checked
//! deterministically.

#![warn(missing_docs)]

mod clock;
mod config;
mod driver;
mod interaction;
mod locator;
mod logging;
mod result;
mod retry;
mod session;
mod sync;
mod wait;

/// Scripted fake surface for deterministic tests
pub mod mock;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{HarnessConfig, HarnessConfigBuilder};
pub use driver::{ElementHandle, Key, UiSurface};
pub use interaction::{
    Interactor, SelectMode, TypeOptions, DEFAULT_SLOW_TYPE_DELAY_MS,
};
pub use locator::{Locator, Strategy};
pub use logging::{init as init_logging, LOG_ENV_VAR};
pub use result::{ComprobarError, ComprobarResult};
pub use retry::{
    ExecutionId, FailureKind, FailureRecord, RetryClassifier, RetryDecision, RetryRegistry,
    RetryState, DEFAULT_MAX_RETRIES,
};
pub use session::Session;
pub use sync::{
    ResultsState, SyncHelper, DEFAULT_OVERLAY_TIMEOUT_MS, DEFAULT_TOAST_TIMEOUT_MS,
};
pub use wait::{
    Condition, WaitEngine, WaitOptions, WaitOutcome, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};
