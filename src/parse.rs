//! Compound filename parsing.
//!
//! `view.md.hbs.js` carries three stacked extensions: `js` is applied
//! first, then `hbs`, then `md`. The leftmost token doubles as the file's
//! base extension - the lookahead fallback once the stack runs out or the
//! next token has no engine.
//!
//! Callers that already hold a split token sequence can skip this module
//! and build an [`ExtensionStack`] directly.

use std::path::Path;

use crate::resolver::state::ExtensionStack;

/// A compound filename split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Name up to the first extension. Leading dots belong here, so
    /// `.env.hbs` has stem `.env`.
    pub stem: String,
    /// The leftmost extension token.
    pub base_ext: String,
    /// All extension tokens in filename order, consumed from the tail.
    pub stack: ExtensionStack,
}

/// Split a compound filename into stem, base extension and token stack.
///
/// Returns None when the name carries no extension at all. Empty segments
/// (doubled dots) are dropped. No case normalization - tokens resolve
/// case-sensitively downstream.
pub fn parse_filename(path: &Path) -> Option<ParsedName> {
    let name = path.file_name()?.to_str()?;

    // Leading dots are part of the stem, not extension separators.
    let trimmed = name.trim_start_matches('.');
    let leading = name.len() - trimmed.len();

    let mut segments = trimmed.split('.');
    let stem_core = segments.next()?;
    let tokens: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();

    let first = tokens.first()?;
    Some(ParsedName {
        stem: name[..leading + stem_core.len()].to_string(),
        base_ext: (*first).to_string(),
        stack: tokens.iter().copied().collect(),
    })
}

// =============================================================================
// Tests
// =============================================================================
