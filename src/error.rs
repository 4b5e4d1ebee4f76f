//! Error taxonomy for the resolution engine.
//!
//! `TransformFailure` is the only fatal error the resolver produces: it tags
//! the failing stage's token and filename onto whatever the engine raised
//! and propagates it untouched, so the embedding tool decides whether one
//! file's failure aborts a whole build or is logged and skipped. An
//! extension without a registered engine is NOT an error - the chain simply
//! stops early with partial output.

use crate::engine::Classification;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// TransformFailure
// ============================================================================

/// A stage raised an error. Fatal to that resolution, never retried here.
#[derive(Debug, Error)]
#[error("transform `{token}` failed for `{}`", .filename.display())]
pub struct TransformFailure {
    /// Extension token of the failing stage.
    pub token: String,
    /// Originating file.
    pub filename: PathBuf,
    /// Whatever the engine raised.
    #[source]
    pub source: anyhow::Error,
}

impl TransformFailure {
    pub(crate) fn new(
        token: impl Into<String>,
        filename: impl Into<PathBuf>,
        source: anyhow::Error,
    ) -> Self {
        Self {
            token: token.into(),
            filename: filename.into(),
            source,
        }
    }
}

// ============================================================================
// RenderFailure
// ============================================================================

/// A callable terminal representation failed while executing against locals.
///
/// Absent locals alone never cause this - they are an empty context.
#[derive(Debug, Error)]
#[error("render failed for `{}`", .filename.display())]
pub struct RenderFailure {
    pub filename: PathBuf,
    #[source]
    pub source: anyhow::Error,
}

// ============================================================================
// CapabilityConflict
// ============================================================================

/// Two descriptors claimed the same token with different classifications.
///
/// Non-fatal: surfaced as a warning at registration time; the later
/// registration always wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityConflict {
    /// The contested extension token.
    pub token: String,
    /// Classification of the descriptor that was replaced.
    pub replaced: Classification,
    /// Classification of the descriptor that won.
    pub kept: Classification,
}

impl fmt::Display for CapabilityConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` re-registered as {} engine, replacing a {} engine",
            self.token, self.kept, self.replaced
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_transform_failure_display() {
        let err = TransformFailure::new("sass", "assets/app.css.sass", anyhow!("bad syntax"));
        let display = format!("{err}");
        assert!(display.contains("sass"));
        assert!(display.contains("assets/app.css.sass"));
    }

    #[test]
    fn test_transform_failure_source_chain() {
        let err = TransformFailure::new("post", "a.css.post", anyhow!("missing plugin"));
        let source = std::error::Error::source(&err).unwrap();
        assert!(format!("{source}").contains("missing plugin"));
    }

    #[test]
    fn test_capability_conflict_display() {
        let conflict = CapabilityConflict {
            token: "sass".into(),
            replaced: Classification::Markup,
            kept: Classification::Style,
        };
        let display = format!("{conflict}");
        assert!(display.contains("`sass`"));
        assert!(display.contains("style"));
        assert!(display.contains("markup"));
    }
}
