// The #[error] attribute from thiserror uses struct fields via string interpolation,
// but Rust's unused_assignments lint doesn't recognize this.
#![allow(unused_assignments)]

//! Bindery Error Types with Error Codes
//!
//! Error code ranges:
//! - BND-000-009: Property access errors
//! - BND-010-019: Dependency graph errors
//! - BND-020-029: Timer errors
//! - BND-030-039: Configuration errors

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BinderyError>;

/// All error variants are part of the public API.
///
/// Implements both `thiserror::Error` for std error compatibility
/// and `miette::Diagnostic` for fancy terminal error display.
#[derive(Error, Debug, Diagnostic)]
pub enum BinderyError {
    // ═══════════════════════════════════════════
    // PROPERTY ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[BND-001] Invalid property name '{name}': {reason}")]
    #[diagnostic(
        code(bindery::invalid_property_name),
        help("Property names must be non-empty")
    )]
    InvalidPropertyName { name: String, reason: String },

    #[error("[BND-002] Property '{property}' expects {expected}, got {actual}")]
    #[diagnostic(
        code(bindery::type_mismatch),
        help("Set a value matching the kind declared in the model schema, or null")
    )]
    TypeMismatch {
        property: String,
        expected: String,
        actual: String,
    },

    #[error("[BND-003] Cannot read property '{property}' as the requested type: {source}")]
    #[diagnostic(code(bindery::deserialize))]
    Deserialize {
        property: String,
        #[source]
        source: serde_json::Error,
    },

    // ═══════════════════════════════════════════
    // DEPENDENCY ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[BND-010] Adding trigger property '{trigger}' for property '{dependent}' creates a dependency loop")]
    #[diagnostic(
        code(bindery::dependency_cycle),
        help("Remove one direction of the dependency: a property cannot (transitively) trigger itself")
    )]
    DependencyCycle { trigger: String, dependent: String },

    // ═══════════════════════════════════════════
    // TIMER ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[BND-020] Timer '{timer}' callback not initialized")]
    #[diagnostic(
        code(bindery::missing_callback),
        help("Register a callback with on_tick() before starting or invoking the timer")
    )]
    MissingCallback { timer: String },

    #[error("[BND-021] Timer '{timer}' invocation cancelled")]
    #[diagnostic(code(bindery::cancelled))]
    Cancelled { timer: String },

    #[error("[BND-022] Timer '{timer}' callback failed: {reason:#}")]
    #[diagnostic(code(bindery::callback_failed))]
    CallbackFailed { timer: String, reason: anyhow::Error },

    #[error("[BND-023] Timer '{timer}' has been disposed")]
    #[diagnostic(
        code(bindery::timer_disposed),
        help("Create a new timer instead of reusing a disposed one")
    )]
    TimerDisposed { timer: String },

    #[error("[BND-024] Timer '{timer}' must be started inside a tokio runtime")]
    #[diagnostic(
        code(bindery::no_runtime),
        help("Call start() from async code or within Runtime::enter()")
    )]
    NoRuntime { timer: String },

    #[error("[BND-025] Timer '{timer}' interval must be greater than zero")]
    #[diagnostic(code(bindery::invalid_interval))]
    InvalidInterval { timer: String },

    // ═══════════════════════════════════════════
    // CONFIG ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[BND-030] Configuration error: {reason}")]
    #[diagnostic(code(bindery::config_error), help("Check the TOML syntax and field names"))]
    ConfigError { reason: String },
}

impl BinderyError {
    /// Get the error code (e.g., "BND-010")
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPropertyName { .. } => "BND-001",
            Self::TypeMismatch { .. } => "BND-002",
            Self::Deserialize { .. } => "BND-003",
            Self::DependencyCycle { .. } => "BND-010",
            Self::MissingCallback { .. } => "BND-020",
            Self::Cancelled { .. } => "BND-021",
            Self::CallbackFailed { .. } => "BND-022",
            Self::TimerDisposed { .. } => "BND-023",
            Self::NoRuntime { .. } => "BND-024",
            Self::InvalidInterval { .. } => "BND-025",
            Self::ConfigError { .. } => "BND-030",
        }
    }

    /// Whether this error comes from declaring the model wrong (fail-fast at construction)
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::DependencyCycle { .. } | Self::InvalidPropertyName { .. }
        )
    }
}

/// Reject names that cannot identify a property.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(BinderyError::InvalidPropertyName {
            name: name.to_string(),
            reason: "name is empty".to_string(),
        });
    }
    Ok(())
}
