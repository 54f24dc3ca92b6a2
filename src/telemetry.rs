//! Structured telemetry for broken preconditions and invariants.
//!
//! Precondition violations in this crate (asking for a player that was never set up,
//! feeding negative frame timings, tripping a state invariant) are caller bugs rather
//! than recoverable errors. Instead of panicking, they are reported as structured
//! [`SpecViolation`]s that can be:
//!
//! - Logged via tracing (default behavior)
//! - Collected programmatically for testing
//! - Sent to custom observers (metrics, alerting, etc.)
//!
//! # Example
//!
//! ```
//! use unsynced_state::telemetry::{CollectingObserver, ViolationKind};
//! use unsynced_state::{PlayerHandle, UnsyncedStateBuilder, TeamRegistry};
//! use std::sync::Arc;
//!
//! let observer = Arc::new(CollectingObserver::new());
//! let mut state = UnsyncedStateBuilder::new()
//!     .with_violation_observer(observer.clone())
//!     .build();
//!
//! // Nobody was loaded from setup, so player 3 does not exist.
//! let teams = TeamRegistry::default();
//! assert!(state.assign_local_player(PlayerHandle::new(3), &teams).is_err());
//! assert!(observer.has_violation(ViolationKind::PlayerLookup));
//! ```

use crate::PlayerHandle;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Severity of a violation.
///
/// Severities are ordered from least to most severe, allowing filtering
/// and comparison operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Unexpected but recoverable - operation continued with fallback.
    ///
    /// Example: a negative frame duration was clamped to zero.
    Warning,
    /// Serious issue - operation was refused.
    Error,
    /// Critical invariant broken - client-local state may be corrupted.
    ///
    /// Example: identity resolution for a player the registry never heard of.
    Critical,
}

impl ViolationSeverity {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories of violations.
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]`. Always include a wildcard arm when matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ViolationKind {
    /// A lifecycle operation was refused, such as restoring an inconsistent snapshot.
    Lifecycle,
    /// A player record lookup failed for a handle that should exist.
    PlayerLookup,
    /// Frame-timing statistics received out-of-range values.
    Timing,
    /// Configuration constraint violated.
    Configuration,
    /// Runtime invariant check failed.
    ///
    /// Only checked in debug builds, with the `paranoid` feature, or when
    /// [`UnsyncedConfig::check_invariants`](crate::UnsyncedConfig::check_invariants) is set.
    Invariant,
}

impl ViolationKind {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lifecycle => "lifecycle",
            Self::PlayerLookup => "player_lookup",
            Self::Timing => "timing",
            Self::Configuration => "configuration",
            Self::Invariant => "invariant",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded violation.
///
/// # Example
///
/// ```
/// use unsynced_state::telemetry::{SpecViolation, ViolationSeverity, ViolationKind};
/// use unsynced_state::PlayerHandle;
///
/// let violation = SpecViolation::new(
///     ViolationSeverity::Critical,
///     ViolationKind::PlayerLookup,
///     "no record for local player",
///     "unsynced_state.rs:42",
/// ).with_player(PlayerHandle::new(7))
///  .with_context("num_players", "2");
///
/// assert_eq!(violation.player, Some(PlayerHandle::new(7)));
/// assert!(violation.to_string().contains("player=7"));
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct SpecViolation {
    /// The severity level of this violation.
    pub severity: ViolationSeverity,
    /// The category where the violation occurred.
    pub kind: ViolationKind,
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Source location where the violation was detected (file:line).
    pub location: &'static str,
    /// The player the violation concerns, if any.
    pub player: Option<PlayerHandle>,
    /// Additional structured context as key-value pairs.
    pub context: BTreeMap<String, String>,
}

impl SpecViolation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(
        severity: ViolationSeverity,
        kind: ViolationKind,
        message: impl Into<String>,
        location: &'static str,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location,
            player: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the player this violation concerns.
    #[must_use]
    pub fn with_player(mut self, player: PlayerHandle) -> Self {
        self.player = Some(player);
        self
    }

    /// Adds a context key-value pair.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Serializes this violation to a JSON string.
    ///
    /// Returns `None` if serialization fails (which should not happen for
    /// well-formed violations).
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

impl std::fmt::Display for SpecViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} (at {}",
            self.severity, self.kind, self.message, self.location
        )?;
        if let Some(player) = self.player {
            write!(f, ", player={player}")?;
        }
        if !self.context.is_empty() {
            write!(f, ", context={:?}", self.context)?;
        }
        write!(f, ")")
    }
}

/// Trait for observing violations.
///
/// # Example
///
/// ```
/// use unsynced_state::telemetry::{ViolationObserver, SpecViolation};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CountingObserver {
///     count: AtomicUsize,
/// }
///
/// impl ViolationObserver for CountingObserver {
///     fn on_violation(&self, _violation: &SpecViolation) {
///         self.count.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
#[cfg(feature = "sync-send")]
pub trait ViolationObserver: Send + Sync {
    /// Called when a violation is detected.
    fn on_violation(&self, violation: &SpecViolation);
}

#[cfg(not(feature = "sync-send"))]
/// Trait for observing violations.
///
/// Implement this trait to create custom observers that can react to
/// violations in various ways (logging, metrics, alerting, etc.).
pub trait ViolationObserver {
    /// Called when a violation is detected.
    fn on_violation(&self, violation: &SpecViolation);
}

/// Built-in observer that logs violations via the `tracing` crate.
///
/// - `Warning` severity → `tracing::warn!`
/// - `Error` and `Critical` severity → `tracing::error!`
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates a new tracing observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn format_player(player: Option<PlayerHandle>) -> String {
        player.map_or_else(|| "null".to_owned(), |p| p.to_string())
    }
}

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, violation: &SpecViolation) {
        let severity = violation.severity.as_str();
        let kind = violation.kind.as_str();
        let location = violation.location;
        let player_str = Self::format_player(violation.player);

        let context_str = if violation.context.is_empty() {
            "{}".to_owned()
        } else {
            let pairs: Vec<String> = violation
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        };

        match violation.severity {
            ViolationSeverity::Warning => {
                tracing::warn!(
                    severity,
                    kind,
                    location,
                    player = %player_str,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
            ViolationSeverity::Error | ViolationSeverity::Critical => {
                tracing::error!(
                    severity,
                    kind,
                    location,
                    player = %player_str,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
        }
    }
}

/// Built-in observer that collects violations for testing.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    violations: Mutex<Vec<SpecViolation>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer with an empty violation list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            violations: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of all collected violations.
    #[must_use]
    pub fn violations(&self) -> Vec<SpecViolation> {
        self.violations.lock().clone()
    }

    /// Returns the number of collected violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.lock().len()
    }

    /// Returns true if no violations have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.lock().is_empty()
    }

    /// Checks if any violation of the specified kind has been collected.
    #[must_use]
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.lock().iter().any(|v| v.kind == kind)
    }

    /// Checks if any violation with the specified severity has been collected.
    #[must_use]
    pub fn has_severity(&self, severity: ViolationSeverity) -> bool {
        self.violations
            .lock()
            .iter()
            .any(|v| v.severity == severity)
    }

    /// Returns all violations matching the specified kind.
    #[must_use]
    pub fn violations_of_kind(&self, kind: ViolationKind) -> Vec<SpecViolation> {
        self.violations
            .lock()
            .iter()
            .filter(|v| v.kind == kind)
            .cloned()
            .collect()
    }

    /// Clears all collected violations.
    pub fn clear(&self) {
        self.violations.lock().clear();
    }
}

impl ViolationObserver for CollectingObserver {
    fn on_violation(&self, violation: &SpecViolation) {
        self.violations.lock().push(violation.clone());
    }
}

/// Reports a violation to an optional observer, falling back to [`TracingObserver`] if `None`.
pub fn report_to_observer<O: ViolationObserver + ?Sized>(
    observer: Option<&Arc<O>>,
    violation: &SpecViolation,
) {
    match observer {
        Some(obs) => obs.on_violation(violation),
        None => TracingObserver.on_violation(violation),
    }
}

/// Macro for reporting violations with location tracking to the default
/// [`TracingObserver`].
///
/// # Example
///
/// ```
/// use unsynced_state::{report_violation, telemetry::{ViolationSeverity, ViolationKind}};
///
/// report_violation!(ViolationSeverity::Warning, ViolationKind::Timing,
///     "negative frame time {} clamped", -0.5);
/// ```
#[macro_export]
macro_rules! report_violation {
    ($severity:expr, $kind:expr, $msg:literal) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};

    ($severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};
}

/// Macro for reporting violations through an optional observer.
///
/// If the observer is `None`, it falls back to the default [`TracingObserver`].
///
/// # Example
///
/// ```
/// use unsynced_state::{report_violation_to, telemetry::{ViolationSeverity, ViolationKind, CollectingObserver, ViolationObserver}};
/// use std::sync::Arc;
///
/// let observer: Option<Arc<dyn ViolationObserver>> = Some(Arc::new(CollectingObserver::new()));
///
/// report_violation_to!(&observer, ViolationSeverity::Warning, ViolationKind::Timing,
///     "frame time {} out of range", -1.0);
/// ```
#[macro_export]
macro_rules! report_violation_to {
    ($observer:expr, $severity:expr, $kind:expr, $msg:literal) => {{
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::report_to_observer($observer.as_ref(), &violation);
    }};

    ($observer:expr, $severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::report_to_observer($observer.as_ref(), &violation);
    }};
}

// ==========================================
// Runtime Invariant Checking
// ==========================================

/// Result of an invariant check.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InvariantViolation {
    /// Name of the type whose invariant was violated.
    pub type_name: &'static str,
    /// Description of the violated invariant.
    pub invariant: String,
    /// Additional diagnostic context.
    pub details: Option<String>,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    #[must_use]
    pub fn new(type_name: &'static str, invariant: impl Into<String>) -> Self {
        Self {
            type_name,
            invariant: invariant.into(),
            details: None,
        }
    }

    /// Adds additional details to the violation.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.type_name, self.invariant)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

/// Trait for types that maintain internal invariants.
///
/// # Example
///
/// ```
/// use unsynced_state::telemetry::{InvariantChecker, InvariantViolation};
///
/// struct Accumulator {
///     elapsed: f32,
/// }
///
/// impl InvariantChecker for Accumulator {
///     fn check_invariants(&self) -> Result<(), InvariantViolation> {
///         if self.elapsed < 0.0 {
///             return Err(InvariantViolation::new("Accumulator", "elapsed is negative")
///                 .with_details(format!("elapsed={}", self.elapsed)));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait InvariantChecker {
    /// Checks that all invariants of this type are satisfied.
    ///
    /// Returns `Ok(())` if all invariants hold, or an `InvariantViolation`
    /// describing the first broken invariant.
    fn check_invariants(&self) -> Result<(), InvariantViolation>;
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn violation(severity: ViolationSeverity, kind: ViolationKind) -> SpecViolation {
        SpecViolation::new(severity, kind, "test", "test.rs:1")
    }

    #[test]
    fn test_violation_severity_ordering() {
        assert!(ViolationSeverity::Warning < ViolationSeverity::Error);
        assert!(ViolationSeverity::Error < ViolationSeverity::Critical);
    }

    #[test]
    fn test_violation_kind_as_str() {
        assert_eq!(ViolationKind::Lifecycle.as_str(), "lifecycle");
        assert_eq!(ViolationKind::PlayerLookup.as_str(), "player_lookup");
        assert_eq!(ViolationKind::Timing.as_str(), "timing");
        assert_eq!(ViolationKind::Invariant.as_str(), "invariant");
    }

    #[test]
    fn test_spec_violation_builder() {
        let v = SpecViolation::new(
            ViolationSeverity::Critical,
            ViolationKind::PlayerLookup,
            "missing record",
            "test.rs:42",
        )
        .with_player(PlayerHandle::new(4))
        .with_context("num_players", "2");

        assert_eq!(v.player, Some(PlayerHandle::new(4)));
        assert_eq!(v.context.get("num_players"), Some(&"2".to_owned()));

        let display = v.to_string();
        assert!(display.contains("critical"));
        assert!(display.contains("player_lookup"));
        assert!(display.contains("player=4"));
        assert!(display.contains("test.rs:42"));
    }

    #[test]
    fn test_collecting_observer() {
        let observer = CollectingObserver::new();
        assert!(observer.is_empty());

        observer.on_violation(&violation(ViolationSeverity::Warning, ViolationKind::Timing));
        observer.on_violation(&violation(
            ViolationSeverity::Critical,
            ViolationKind::PlayerLookup,
        ));

        assert_eq!(observer.len(), 2);
        assert!(observer.has_violation(ViolationKind::Timing));
        assert!(!observer.has_violation(ViolationKind::Lifecycle));
        assert!(observer.has_severity(ViolationSeverity::Critical));
        assert_eq!(observer.violations_of_kind(ViolationKind::Timing).len(), 1);

        observer.clear();
        assert!(observer.is_empty());
    }

    #[test]
    fn test_report_to_observer_prefers_custom_observer() {
        let observer = Arc::new(CollectingObserver::new());
        report_to_observer(
            Some(&observer),
            &violation(ViolationSeverity::Warning, ViolationKind::Timing),
        );
        assert_eq!(observer.len(), 1);

        // Falls back to tracing; must not panic.
        report_to_observer(
            None::<&Arc<CollectingObserver>>,
            &violation(ViolationSeverity::Warning, ViolationKind::Timing),
        );
    }

    #[test]
    fn test_report_violation_to_macro_with_none() {
        let observer: Option<Arc<dyn ViolationObserver>> = None;
        report_violation_to!(
            &observer,
            ViolationSeverity::Warning,
            ViolationKind::Timing,
            "value {}",
            1
        );
    }

    #[test]
    fn test_invariant_violation_display() {
        let v = InvariantViolation::new("UnsyncedState", "spectator controls a team")
            .with_details("playing_team=3");
        assert_eq!(
            v.to_string(),
            "UnsyncedState: spectator controls a team (playing_team=3)"
        );
    }

    #[test]
    fn test_severity_serializes_snake_case() {
        let json = serde_json::to_string(&ViolationKind::PlayerLookup).unwrap();
        assert_eq!(json, r#""player_lookup""#);
    }
}
