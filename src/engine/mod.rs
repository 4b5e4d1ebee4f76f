//! Engine descriptors and the unified transform contract.
//!
//! An engine is a registered capability converting source in one extension's
//! format into another's. Engines natively complete synchronously or
//! asynchronously; [`Transform`] is the single awaited contract the resolver
//! sees, and the adapters below lift plain closures into it so the resolver
//! never branches on calling convention.

pub mod registry;

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use smallvec::SmallVec;

use crate::options::OptionsSlice;
use crate::resolver::state::{Mode, SourceValue, Template};

pub use registry::EngineRegistry;

// =============================================================================
// Classification
// =============================================================================

/// What kind of capability an engine provides.
///
/// Used only for duplicate-capability compatibility checks at registration
/// time - never as a dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Script,
    Style,
    Markup,
    Template,
}

impl Classification {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Style => "style",
            Self::Markup => "markup",
            Self::Template => "template",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Stage Input / Output
// =============================================================================

/// Everything one stage sees: a borrowed view of the resolution state.
///
/// Valid for the duration of one invocation only - a transform must not
/// retain references past its own call.
pub struct StageInput<'a> {
    /// Originating file, constant for the whole chain.
    pub filename: &'a Path,
    /// The token being resolved by this stage.
    pub current: &'a str,
    /// The next token that would be resolved, or the file's base extension
    /// when the stack is exhausted or the next token has no engine. Lets a
    /// transform decide terminal behavior ("am I the last stage before
    /// plain script output?").
    pub lookahead: &'a str,
    /// Compile or render, fixed at resolution start.
    pub mode: Mode,
    /// The payload being transformed.
    pub source: &'a SourceValue,
    /// This stage's option table plus the global locals.
    pub options: OptionsSlice<'a>,
}

impl StageInput<'_> {
    /// The source payload as text (callable representations serialize).
    pub fn source_text(&self) -> Cow<'_, str> {
        self.source.to_source()
    }
}

/// What one stage hands back.
#[derive(Default, Debug)]
pub struct StageOutput {
    source: Option<SourceValue>,
    dependencies: Vec<PathBuf>,
}

impl StageOutput {
    /// Declare that no transformation occurred.
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Replace the source with new text.
    pub fn text(source: impl Into<String>) -> Self {
        Self {
            source: Some(SourceValue::Text(source.into())),
            dependencies: Vec::new(),
        }
    }

    /// Replace the source with a callable representation.
    pub fn callable(template: Arc<dyn Template>) -> Self {
        Self {
            source: Some(SourceValue::Callable(template)),
            dependencies: Vec::new(),
        }
    }

    /// Report files discovered during this stage (e.g. imported partials).
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = PathBuf>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    pub fn is_unchanged(&self) -> bool {
        self.source.is_none()
    }

    pub(crate) fn size_hint(&self) -> Option<usize> {
        self.source.as_ref().map(SourceValue::size_hint)
    }

    pub(crate) fn into_parts(self) -> (Option<SourceValue>, Vec<PathBuf>) {
        (self.source, self.dependencies)
    }
}

// =============================================================================
// Transform Contract
// =============================================================================

/// The unified invocation contract.
///
/// A transform may complete immediately or suspend; the resolver awaits it
/// uniformly either way. It must not be invoked concurrently with itself for
/// the same logical resolution, and must not retain the input past its own
/// call.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(&self, input: StageInput<'_>) -> Result<StageOutput>;
}

/// Adapter for engines that complete synchronously.
pub struct SyncTransform<F>(pub F);

#[async_trait]
impl<F> Transform for SyncTransform<F>
where
    F: Fn(StageInput<'_>) -> Result<StageOutput> + Send + Sync,
{
    async fn apply(&self, input: StageInput<'_>) -> Result<StageOutput> {
        (self.0)(input)
    }
}

/// Adapter for engines that hand back a future.
///
/// The future must own whatever it needs from the input - a transform may
/// not retain state borrows past its own call anyway.
pub struct AsyncTransform<F>(pub F);

#[async_trait]
impl<F> Transform for AsyncTransform<F>
where
    F: Fn(StageInput<'_>) -> BoxFuture<'static, Result<StageOutput>> + Send + Sync,
{
    async fn apply(&self, input: StageInput<'_>) -> Result<StageOutput> {
        (self.0)(input).await
    }
}

// =============================================================================
// EngineDescriptor
// =============================================================================

/// Describes one registered capability: which extension tokens it answers
/// to, what its output should be treated as, its classification, and the
/// transform that performs the conversion.
pub struct EngineDescriptor {
    classification: Classification,
    claims: SmallVec<[String; 2]>,
    output: Option<String>,
    transform: Box<dyn Transform>,
}

impl EngineDescriptor {
    pub fn new(classification: Classification, transform: impl Transform + 'static) -> Self {
        Self {
            classification,
            claims: SmallVec::new(),
            output: None,
            transform: Box::new(transform),
        }
    }

    /// Convenience constructor for synchronous closures.
    pub fn sync<F>(classification: Classification, f: F) -> Self
    where
        F: Fn(StageInput<'_>) -> Result<StageOutput> + Send + Sync + 'static,
    {
        Self::new(classification, SyncTransform(f))
    }

    /// Claim an extension token. Call repeatedly for aliases
    /// (e.g. `sass` and `scss`).
    pub fn with_claim(mut self, token: impl Into<String>) -> Self {
        self.claims.push(token.into());
        self
    }

    /// Claim several extension tokens at once.
    pub fn with_claims<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.claims.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Extension the output should be treated as by subsequent stages
    /// (e.g. `css` for a `sass` engine). Absent means terminal.
    pub fn with_output(mut self, ext: impl Into<String>) -> Self {
        self.output = Some(ext.into());
        self
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn claims(&self) -> &[String] {
        &self.claims
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub(crate) fn transform(&self) -> &dyn Transform {
        self.transform.as_ref()
    }
}

impl fmt::Debug for EngineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineDescriptor")
            .field("classification", &self.classification)
            .field("claims", &self.claims)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
