//! Transform state threaded through one resolution chain.
//!
//! The state is single-owner: the resolver moves it stage to stage by value
//! and hands each engine a borrowed [`StageInput`](crate::engine::StageInput)
//! view for the duration of one call. Nothing is aliased across stages, so a
//! previous stage's effects cannot leak anywhere except through the source
//! payload itself.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use smallvec::SmallVec;

use super::deps::DependencyList;
use crate::options::{Locals, ResolveOptions};
use crate::parse::parse_filename;

// =============================================================================
// Mode
// =============================================================================

/// Whether downstream stages produce a reusable representation or an
/// executed value. Set once at resolution start, read-only thereafter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Produce a source-level representation that can be serialized and
    /// embedded elsewhere.
    #[default]
    Compile,
    /// Produce a value by executing the compiled representation.
    Render,
}

impl Mode {
    pub fn is_render(self) -> bool {
        matches!(self, Self::Render)
    }
}

// =============================================================================
// Template / SourceValue
// =============================================================================

/// A callable terminal representation, produced by engines whose output is
/// executable (a compiled template function) rather than plain text.
pub trait Template: Send + Sync {
    /// Execute against runtime data.
    fn call(&self, locals: &Locals) -> Result<Value>;

    /// Serialize back to source text, so a resolved chain can be embedded
    /// verbatim without re-running earlier stages.
    fn to_source(&self) -> String;
}

/// The payload being transformed, replaced anew by each stage.
#[derive(Clone)]
pub enum SourceValue {
    Text(String),
    Callable(Arc<dyn Template>),
}

impl SourceValue {
    pub fn text(source: impl Into<String>) -> Self {
        Self::Text(source.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Callable(_) => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Callable(_))
    }

    /// Source-level representation: text unchanged, callables serialized.
    pub fn to_source(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Callable(template) => Cow::Owned(template.to_source()),
        }
    }

    /// Byte size for instrumentation output.
    pub(crate) fn size_hint(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Callable(template) => template.to_source().len(),
        }
    }
}

impl fmt::Debug for SourceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

// =============================================================================
// ExtensionStack
// =============================================================================

/// Ordered extension tokens still to be applied, consumed from the tail
/// (rightmost token in the filename resolves first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionStack {
    tokens: SmallVec<[String; 4]>,
}

impl ExtensionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// The tail token: the next one to be resolved.
    pub fn peek(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    pub(crate) fn pop(&mut self) -> Option<String> {
        self.tokens.pop()
    }

    pub(crate) fn push(&mut self, token: String) {
        self.tokens.push(token);
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExtensionStack {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_tokens(iter)
    }
}

// =============================================================================
// TransformState
// =============================================================================

/// Mutable, single-owner state for one resolution.
///
/// Created fresh per resolution call, never reused across files, and
/// discarded once the Partial is produced - except that the collected
/// dependencies are copied out for the caller's watch-list maintenance.
#[derive(Debug, Clone)]
pub struct TransformState {
    filename: PathBuf,
    remaining: ExtensionStack,
    base_ext: String,
    source: SourceValue,
    mode: Mode,
    options: ResolveOptions,
    dependencies: DependencyList,
    destination: Option<String>,
}

impl TransformState {
    /// Build the initial state from an already-split extension stack.
    ///
    /// The base extension falls back to the filename's own extension when
    /// the stack is empty (a file with nothing to resolve).
    pub fn new(
        filename: impl Into<PathBuf>,
        source: impl Into<String>,
        remaining: ExtensionStack,
        mode: Mode,
        options: ResolveOptions,
    ) -> Self {
        let filename = filename.into();
        let base_ext = remaining.tokens().first().cloned().unwrap_or_else(|| {
            filename
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Self {
            filename,
            remaining,
            base_ext,
            source: SourceValue::text(source),
            mode,
            options,
            dependencies: DependencyList::new(),
            destination: None,
        }
    }

    /// Build the initial state by parsing the compound filename itself.
    ///
    /// Returns None when the filename carries no extension.
    pub fn for_file(
        filename: impl Into<PathBuf>,
        source: impl Into<String>,
        mode: Mode,
        options: ResolveOptions,
    ) -> Option<Self> {
        let filename = filename.into();
        let parsed = parse_filename(&filename)?;
        Some(Self::new(filename, source, parsed.stack, mode, options))
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn remaining(&self) -> &ExtensionStack {
        &self.remaining
    }

    /// The file's base extension: the lookahead fallback once the stack
    /// runs out or the next token has no engine.
    pub fn base_ext(&self) -> &str {
        &self.base_ext
    }

    pub fn source(&self) -> &SourceValue {
        &self.source
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn dependencies(&self) -> &DependencyList {
        &self.dependencies
    }

    /// Destination extension reported by the last applied engine.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub(crate) fn pop_token(&mut self) -> Option<String> {
        self.remaining.pop()
    }

    pub(crate) fn restore_token(&mut self, token: String) {
        self.remaining.push(token);
    }

    pub(crate) fn replace_source(&mut self, source: SourceValue) {
        self.source = source;
    }

    pub(crate) fn set_destination(&mut self, ext: Option<&str>) {
        self.destination = ext.map(ToOwned::to_owned);
    }

    /// Append discovered files, preserving first-discovery order, dropping
    /// duplicates and self-references.
    pub(crate) fn absorb_dependencies(&mut self, deps: Vec<PathBuf>) {
        for dep in deps {
            self.dependencies.push_excluding(&dep, &self.filename);
        }
    }

    pub(crate) fn merge_locals(&mut self, locals: Locals) {
        self.options.merge_locals(locals);
    }
}

// =============================================================================
// Tests
// =============================================================================
