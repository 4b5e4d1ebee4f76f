//! Script engine: terminal stage for `js` chains.
//!
//! In render mode the module body is evaluated into a callable
//! representation. In compile mode the script stays source text when a
//! later stage (or the file itself) still expects script input, and is
//! wrapped into a function-shaped source string otherwise.

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use serde_json::Value;

use crate::engine::{Classification, EngineDescriptor, StageInput, StageOutput};
use crate::options::Locals;
use crate::resolver::state::Template;

pub(crate) const TOKEN: &str = "js";

pub fn descriptor() -> EngineDescriptor {
    EngineDescriptor::sync(Classification::Script, apply)
        .with_claim(TOKEN)
        .with_output(TOKEN)
}

fn apply(input: StageInput<'_>) -> Result<StageOutput> {
    let text = input.source_text();

    if input.mode.is_render() {
        let exported = eval_module(&text)?;
        return Ok(StageOutput::callable(Arc::new(ModuleTemplate {
            exported,
            source: wrap(&text),
        })));
    }

    // A later stage (or the file itself) treats the output as script
    // source: leave it alone.
    if input.lookahead == TOKEN {
        return Ok(StageOutput::unchanged());
    }

    Ok(StageOutput::text(wrap(&text)))
}

// =============================================================================
// ModuleTemplate
// =============================================================================

/// A module evaluated down to its exported value.
struct ModuleTemplate {
    exported: Value,
    source: String,
}

impl Template for ModuleTemplate {
    fn call(&self, _locals: &Locals) -> Result<Value> {
        Ok(self.exported.clone())
    }

    fn to_source(&self) -> String {
        self.source.clone()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Wrap a module body into a function-shaped source string.
fn wrap(source: &str) -> String {
    let trimmed = source.trim();
    if trimmed.starts_with("function") {
        format!("(function (locals_) {{ return ({trimmed})(locals_); }})")
    } else {
        format!("(function (locals_) {{ {trimmed} }})")
    }
}

/// Evaluate a literal `module.exports = <value>` body.
///
/// The crate hosts no JavaScript VM; only modules exporting a literal value
/// can be rendered. Anything else is a stage failure.
fn eval_module(source: &str) -> Result<Value> {
    let body = source.trim().trim_end_matches(';').trim_end();
    let Some(rest) = body.strip_prefix("module.exports") else {
        bail!("script render supports only literal `module.exports` modules");
    };
    let Some(expr) = rest.trim_start().strip_prefix('=') else {
        bail!("`module.exports` must be assigned a literal value");
    };

    let expr = expr.trim();
    serde_json::from_str(expr).map_err(|e| anyhow!("`{expr}` is not a literal export: {e}"))
}

// =============================================================================
// Tests
// =============================================================================
