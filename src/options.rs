//! Per-invocation options, partitioned by extension token.
//!
//! One resolution carries a single `ResolveOptions`: global `locals` shared
//! with every stage, plus per-token option tables so each engine only ever
//! sees its own slice (`options.slice("sass")` for the `sass` stage). The
//! embedding tool assembles these from its own config merging; this crate
//! only defines the shape and the slicing.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Runtime data handed to templates and shared with every stage.
///
/// An ordered map so repeated compiles serialize identically.
pub type Locals = serde_json::Map<String, Value>;

// ============================================================================
// ResolveOptions
// ============================================================================

/// Configuration for one resolution call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Global locals, visible to every stage and to `Partial::render`.
    pub locals: Locals,
    /// Per-extension-token option tables (e.g. a `sass` table with
    /// `includePaths`). A stage sees only the table for its own token.
    pub engines: FxHashMap<String, Locals>,
    /// Emit per-stage instrumentation even when global verbose is off.
    pub compile_debug: bool,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the global locals.
    pub fn with_locals(mut self, locals: Locals) -> Self {
        self.locals = locals;
        self
    }

    /// Set the option table for one extension token.
    pub fn with_engine(mut self, token: impl Into<String>, table: Locals) -> Self {
        self.engines.insert(token.into(), table);
        self
    }

    /// The view a single stage receives: its own table plus the locals.
    pub fn slice(&self, token: &str) -> OptionsSlice<'_> {
        OptionsSlice {
            locals: &self.locals,
            engine: self.engines.get(token),
        }
    }

    /// Merge caller-supplied locals in; the supplied values win.
    pub(crate) fn merge_locals(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }
}

// ============================================================================
// OptionsSlice
// ============================================================================

/// One stage's view of the options: its own token's table plus the locals.
#[derive(Debug, Clone, Copy)]
pub struct OptionsSlice<'a> {
    /// Global locals.
    pub locals: &'a Locals,
    engine: Option<&'a Locals>,
}

impl<'a> OptionsSlice<'a> {
    /// Look up a key in this stage's own option table.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.engine.and_then(|table| table.get(key))
    }

    /// Look up a key in the global locals.
    pub fn local(&self, key: &str) -> Option<&'a Value> {
        self.locals.get(key)
    }

    /// The full table for this stage's token, when one was configured.
    pub fn table(&self) -> Option<&'a Locals> {
        self.engine
    }
}

// ============================================================================
// Tests
// ============================================================================
