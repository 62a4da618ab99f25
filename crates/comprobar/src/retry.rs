//! Retry classification: decide whether a failed test execution deserves
//! one more attempt.
//!
//! Transient infrastructure faults (element timing, stale handles,
//! session/socket errors, 5xx responses) are worth re-running; assertion
//! mismatches never are — retrying cannot fix a wrong expected value.
//! Each execution unit carries its own bounded [`RetryState`]; nothing is
//! shared between concurrently running units, so a stale counter can
//! neither under-retry a fresh test nor loop an exhausted one.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::result::ComprobarError;

/// Default maximum number of retries per execution unit
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Identifier of one execution unit (one test-method invocation on one
/// worker)
pub type ExecutionId = Uuid;

// =============================================================================
// FAILURE TAXONOMY
// =============================================================================

/// Kinds of failure a test execution can end with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// A wait condition never held within its budget
    WaitTimeout,
    /// An element handle outlived its DOM node
    StaleElement,
    /// A click was intercepted by another element
    ClickIntercepted,
    /// The element refused interaction
    NotInteractable,
    /// The element was briefly not in the DOM
    ElementNotFound,
    /// Driver-level communication fault
    DriverCommunication,
    /// Socket/connection-level fault
    Connection,
    /// 5xx-class server error
    ServerError,
    /// An explicit assertion mismatch
    Assertion,
    /// Anything the taxonomy does not recognize
    Unknown,
}

impl FailureKind {
    /// Whether this kind of failure is worth an automatic retry.
    /// Unknown failures retry optimistically; only assertion mismatches
    /// are certain to fail again.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        !matches!(self, Self::Assertion)
    }
}

/// A failed execution's error, reduced to what the classifier needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Classified failure kind
    pub kind: FailureKind,
    /// Original error message, for logs and reports
    pub message: String,
}

fn retryable_class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            "(?i)TimeoutException|StaleElementReferenceException|\
             ElementClickInterceptedException|ElementNotInteractableException|\
             NoSuchElementException|WebDriverException|SocketException|\
             ConnectException",
        )
        .expect("retryable class pattern")
    })
}

fn connection_message_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new("(?i)connection refused|connection reset|broken pipe|socket")
            .expect("connection message pattern")
    })
}

fn server_error_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b5\d\d\b|Internal Server Error|Service Unavailable|Bad Gateway")
            .expect("server error pattern")
    })
}

fn assertion_class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new("AssertionError|AssertionFailedError|ComparisonFailure")
            .expect("assertion class pattern")
    })
}

impl FailureRecord {
    /// Create a record with a known kind
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify from the error class name and message the runner caught.
    ///
    /// Class names take precedence; the message is consulted for faults
    /// that surface as plain strings (socket errors, HTTP status lines).
    #[must_use]
    pub fn classify(class_name: &str, message: &str) -> Self {
        let kind = if assertion_class_pattern().is_match(class_name) {
            FailureKind::Assertion
        } else if class_name.contains("TimeoutException") {
            FailureKind::WaitTimeout
        } else if class_name.contains("StaleElementReferenceException") {
            FailureKind::StaleElement
        } else if class_name.contains("ElementClickInterceptedException") {
            FailureKind::ClickIntercepted
        } else if class_name.contains("ElementNotInteractableException") {
            FailureKind::NotInteractable
        } else if class_name.contains("NoSuchElementException") {
            FailureKind::ElementNotFound
        } else if class_name.contains("SocketException")
            || class_name.contains("ConnectException")
            || connection_message_pattern().is_match(message)
        {
            FailureKind::Connection
        } else if server_error_pattern().is_match(message) {
            FailureKind::ServerError
        } else if class_name.contains("WebDriverException")
            || retryable_class_pattern().is_match(class_name)
        {
            FailureKind::DriverCommunication
        } else {
            FailureKind::Unknown
        };
        Self::new(kind, message)
    }
}

impl From<&ComprobarError> for FailureRecord {
    fn from(err: &ComprobarError) -> Self {
        let kind = match err {
            ComprobarError::Timeout { .. } => FailureKind::WaitTimeout,
            ComprobarError::StaleElement { .. } => FailureKind::StaleElement,
            ComprobarError::NotInteractable { .. } => FailureKind::NotInteractable,
            ComprobarError::ElementNotFound { .. } => FailureKind::ElementNotFound,
            ComprobarError::Infrastructure { .. } => FailureKind::DriverCommunication,
            ComprobarError::AssertionFailed { .. } => FailureKind::Assertion,
            _ => FailureKind::Unknown,
        };
        Self::new(kind, err.to_string())
    }
}

// =============================================================================
// RETRY STATE
// =============================================================================

/// Per-execution-unit retry bookkeeping: created on first failure,
/// discarded when the unit passes, exhausts its budget, or fails
/// non-retryably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    attempts_so_far: u32,
    max_attempts: u32,
}

impl RetryState {
    /// Fresh state with the given retry budget
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            attempts_so_far: 0,
            max_attempts,
        }
    }

    /// Retries consumed so far
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts_so_far
    }

    /// The retry budget
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether the budget is spent
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.attempts_so_far >= self.max_attempts
    }

    /// Consume one retry. Saturates at the budget so
    /// `attempts_so_far <= max_attempts` always holds.
    pub fn record_retry(&mut self) {
        if self.attempts_so_far < self.max_attempts {
            self.attempts_so_far += 1;
        }
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

// =============================================================================
// CLASSIFIER
// =============================================================================

/// Verdict for one failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule exactly one more attempt
    Retry,
    /// Report the failure; the unit is done
    GiveUp,
}

/// Pure decision logic over the failure taxonomy and a bounded counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryClassifier {
    max_attempts: u32,
}

impl RetryClassifier {
    /// Create a classifier with the given retry budget
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// The retry budget applied to fresh units
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide the fate of a failed attempt, updating the unit's state.
    ///
    /// An exhausted budget gives up unconditionally, regardless of kind.
    /// An assertion mismatch gives up immediately even with budget left.
    /// Everything else — including unrecognized failures — retries.
    pub fn decide(&self, record: &FailureRecord, state: &mut RetryState) -> RetryDecision {
        if state.exhausted() {
            warn!(
                kind = ?record.kind,
                attempts = state.attempts(),
                "retry budget exhausted, giving up"
            );
            return RetryDecision::GiveUp;
        }
        if !record.kind.is_transient() {
            info!(kind = ?record.kind, "non-retryable failure, giving up");
            return RetryDecision::GiveUp;
        }
        state.record_retry();
        info!(
            kind = ?record.kind,
            attempt = state.attempts(),
            max = state.max_attempts(),
            "transient failure, scheduling retry"
        );
        RetryDecision::Retry
    }
}

impl Default for RetryClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Per-execution-context retry bookkeeping for the test runner.
///
/// The runner calls [`should_retry`](Self::should_retry) after each
/// failure and [`mark_passed`](Self::mark_passed) when a retried attempt
/// succeeds. State is created on a unit's first failure and removed as
/// soon as the unit is done, so the next unit under the same context id
/// always starts fresh. Each entry is only ever touched by its own
/// unit's decision calls; the interior lock is map bookkeeping, not
/// cross-unit sharing.
#[derive(Debug)]
pub struct RetryRegistry {
    classifier: RetryClassifier,
    states: Mutex<HashMap<ExecutionId, RetryState>>,
}

impl RetryRegistry {
    /// Create a registry with the given classifier
    #[must_use]
    pub fn new(classifier: RetryClassifier) -> Self {
        Self {
            classifier,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the failed execution should be re-run. `true` also
    /// consumes one retry from the context's budget.
    pub fn should_retry(&self, record: &FailureRecord, context: ExecutionId) -> bool {
        let mut states = self.lock();
        let state = states
            .entry(context)
            .or_insert_with(|| RetryState::new(self.classifier.max_attempts()));
        match self.classifier.decide(record, state) {
            RetryDecision::Retry => true,
            RetryDecision::GiveUp => {
                states.remove(&context);
                false
            }
        }
    }

    /// Discard the context's counter after a (possibly retried) pass
    pub fn mark_passed(&self, context: ExecutionId) {
        self.lock().remove(&context);
    }

    /// Retries consumed by the context so far (0 if it has no state)
    #[must_use]
    pub fn attempts(&self, context: ExecutionId) -> u32 {
        self.lock().get(&context).map_or(0, RetryState::attempts)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ExecutionId, RetryState>> {
        self.states.lock().expect("retry registry lock poisoned")
    }
}

impl Default for RetryRegistry {
    fn default() -> Self {
        Self::new(RetryClassifier::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================
