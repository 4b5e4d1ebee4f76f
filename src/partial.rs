//! Compiled artifact with the compile/render dual contract.
//!
//! A `Partial` wraps the terminal state of one resolution. `compile`
//! produces a reusable source representation (so a resolved chain can be
//! serialized once and embedded verbatim elsewhere); `render` produces a
//! value by executing the compiled representation against runtime data.
//! Both can be called repeatedly with different locals.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::engine::EngineRegistry;
use crate::error::{RenderFailure, TransformFailure};
use crate::options::Locals;
use crate::resolver;
use crate::resolver::state::{SourceValue, TransformState};

/// The resolver's output, exclusively owned by the caller that requested
/// resolution. Stateless after construction aside from the captured
/// terminal state - safe to retain and invoke repeatedly.
#[derive(Debug, Clone)]
pub struct Partial {
    registry: Arc<EngineRegistry>,
    state: TransformState,
}

impl Partial {
    pub(crate) fn new(registry: Arc<EngineRegistry>, state: TransformState) -> Self {
        Self { registry, state }
    }

    /// Files discovered across all stages, in first-discovery order with
    /// duplicates dropped. The file watcher embedding this crate consumes
    /// these to decide what else to track for this output.
    pub fn dependencies(&self) -> &[PathBuf] {
        self.state.dependencies().as_slice()
    }

    /// Destination extension reported by the last applied engine, when it
    /// declared one (e.g. `css` after a `sass` stage).
    pub fn output_extension(&self) -> Option<&str> {
        self.state.destination()
    }

    /// Tokens the chain never resolved. Empty when it ran to completion;
    /// otherwise the stack from the stopping point down (the stopping token
    /// last).
    pub fn unresolved(&self) -> &[String] {
        self.state.remaining().tokens()
    }

    /// The terminal source payload.
    pub fn source(&self) -> &SourceValue {
        self.state.source()
    }

    /// Produce the reusable source representation.
    ///
    /// Deep-copies the captured state augmented with `locals`, re-threads
    /// it through the chain only when unresolved stages remain at capture
    /// time (normally none), then serializes: callable representations via
    /// [`Template::to_source`](crate::resolver::Template::to_source), plain
    /// text unchanged. Calling twice with the same locals yields identical
    /// output.
    pub async fn compile(&self, locals: Locals) -> Result<String, TransformFailure> {
        let mut state = self.state.clone();
        state.merge_locals(locals);

        let state = if state.remaining().is_empty() {
            state
        } else {
            resolver::run_chain(&self.registry, state).await?
        };

        Ok(state.source().to_source().into_owned())
    }

    /// Execute the compiled representation against runtime data.
    ///
    /// A callable terminal is invoked with `locals` layered over the locals
    /// captured at resolution time (absent means an empty layer - never an
    /// error by itself); plain text comes back as a string value.
    pub fn render(&self, locals: Option<&Locals>) -> Result<Value, RenderFailure> {
        match self.state.source() {
            SourceValue::Text(text) => Ok(Value::String(text.clone())),
            SourceValue::Callable(template) => {
                let mut merged = self.state.options().locals.clone();
                if let Some(locals) = locals {
                    merged.extend(locals.clone());
                }
                template.call(&merged).map_err(|source| RenderFailure {
                    filename: self.state.filename().to_path_buf(),
                    source,
                })
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
