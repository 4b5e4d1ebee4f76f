//! The chain resolver.
//!
//! Walks a file's extension stack from the tail (rightmost token first),
//! resolves each token against the registry and folds the source through
//! the matching engines until the stack is exhausted or no further token
//! resolves. Stages execute strictly in stack order - each stage's input is
//! the previous stage's output, so there is nothing to reorder or run
//! speculatively within one chain.

pub mod deps;
mod invoke;
pub mod state;

use std::sync::Arc;

use crate::engine::EngineRegistry;
use crate::error::TransformFailure;
use crate::partial::Partial;

pub use deps::DependencyList;
pub use state::{ExtensionStack, Mode, SourceValue, Template, TransformState};

/// Resolve one file's chain into a compiled artifact.
///
/// This is the per-file entry point the build driver calls. A token nothing
/// claims terminates the chain early with the source so far as final output
/// (a filename may carry extensions with no registered meaning, e.g. a
/// version tag). A failing stage is fatal: the error is tagged with token
/// and filename and handed straight back - whether that aborts a whole
/// build or is logged and skipped is the caller's call.
pub async fn resolve(
    registry: Arc<EngineRegistry>,
    state: TransformState,
) -> Result<Partial, TransformFailure> {
    let state = run_chain(&registry, state).await?;
    Ok(Partial::new(registry, state))
}

/// The fold itself. Also re-entered by `Partial::compile` when a captured
/// state still carries unresolved stages.
pub(crate) async fn run_chain(
    registry: &EngineRegistry,
    mut state: TransformState,
) -> Result<TransformState, TransformFailure> {
    loop {
        // Base case: stack exhausted, the state is terminal.
        let Some(current) = state.pop_token() else {
            return Ok(state);
        };

        // Unresolved token: early, successful termination. The token goes
        // back on the stack so the caller can observe where the chain
        // stopped.
        let Some(descriptor) = registry.resolve(&current).map(Arc::clone) else {
            crate::debug!("resolve";
                "no engine for `{}`, `{}` stops with partial output",
                current, state.filename().display());
            state.restore_token(current);
            return Ok(state);
        };

        let lookahead = lookahead_of(registry, &state);

        let output = invoke::invoke(&descriptor, &state, &current, &lookahead)
            .await
            .map_err(|source| TransformFailure::new(&current, state.filename(), source))?;

        let (source, dependencies) = output.into_parts();
        state.absorb_dependencies(dependencies);

        match source {
            Some(source) => {
                state.replace_source(source);
                state.set_destination(descriptor.output());
            }
            // No-op guard: nothing changed and no distinct token follows,
            // so recursing would reprocess the same token indefinitely.
            None if current == lookahead => return Ok(state),
            None => {}
        }
    }
}

/// The token the next stage would resolve: the new tail of the stack if it
/// has a registered engine, otherwise the file's base extension.
fn lookahead_of(registry: &EngineRegistry, state: &TransformState) -> String {
    match state.remaining().peek() {
        Some(next) if registry.contains(next) => next.to_owned(),
        _ => state.base_ext().to_owned(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Classification, EngineDescriptor, StageOutput};
    use crate::options::ResolveOptions;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Engine that records its invocations and tags the source with its
    /// token, so tests can assert both order and payload threading.
    fn tagging(
        token: &str,
        calls: Arc<Mutex<Vec<String>>>,
        classification: Classification,
    ) -> EngineDescriptor {
        let tag = token.to_string();
        EngineDescriptor::sync(classification, move |input| {
            calls.lock().unwrap().push(tag.clone());
            Ok(StageOutput::text(format!(
                "{}+{}",
                input.source_text(),
                tag
            )))
        })
        .with_claim(token)
    }

    fn state_with(tokens: &[&str], source: &str) -> TransformState {
        TransformState::new(
            format!("view.{}", tokens.join(".")),
            source,
            tokens.iter().copied().collect(),
            Mode::Compile,
            ResolveOptions::new(),
        )
    }

    #[tokio::test]
    async fn test_stages_run_in_descending_stack_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = EngineRegistry::new();
        for token in ["md", "hbs", "js"] {
            registry.register(tagging(token, Arc::clone(&calls), Classification::Template));
        }

        let partial = resolve(registry.into_shared(), state_with(&["md", "hbs", "js"], "x"))
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["js", "hbs", "md"]);
        assert_eq!(partial.source().as_text(), Some("x+js+hbs+md"));
        assert!(partial.unresolved().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_token_stops_chain_with_partial_output() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = EngineRegistry::new();
        // `hbs` (position 2 of [md, hbs, js]) is deliberately missing.
        registry.register(tagging("md", Arc::clone(&calls), Classification::Markup));
        registry.register(tagging("js", Arc::clone(&calls), Classification::Script));

        let partial = resolve(registry.into_shared(), state_with(&["md", "hbs", "js"], "x"))
            .await
            .unwrap();

        // Only the stage after the gap ran; the source is exactly its output.
        assert_eq!(*calls.lock().unwrap(), vec!["js"]);
        assert_eq!(partial.source().as_text(), Some("x+js"));
        // The unresolved token and everything before it stay observable.
        assert_eq!(partial.unresolved(), &["md", "hbs"]);
    }

    #[tokio::test]
    async fn test_lookahead_skips_unregistered_next_token() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_engine = Arc::clone(&seen);
        let mut registry = EngineRegistry::new();
        registry.register(
            EngineDescriptor::sync(Classification::Template, move |input| {
                seen_in_engine.lock().unwrap().push(input.lookahead.to_string());
                Ok(StageOutput::text(input.source_text().into_owned()))
            })
            .with_claim("hbs"),
        );

        // `v2` is not registered, so the `hbs` stage's lookahead falls back
        // to the base extension.
        let state = state_with(&["css", "v2", "hbs"], "x");
        let _ = resolve(registry.into_shared(), state).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["css"]);
    }

    #[tokio::test]
    async fn test_failure_aborts_chain_before_later_stages() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = EngineRegistry::new();
        registry.register(tagging("md", Arc::clone(&calls), Classification::Markup));
        registry.register(
            EngineDescriptor::sync(Classification::Template, |_| {
                anyhow::bail!("unexpected token on line 3")
            })
            .with_claim("hbs"),
        );

        let err = resolve(registry.into_shared(), state_with(&["md", "hbs"], "x"))
            .await
            .unwrap_err();

        assert_eq!(err.token, "hbs");
        assert_eq!(err.filename, PathBuf::from("view.md.hbs"));
        assert!(format!("{}", err.source).contains("unexpected token"));
        // The stage after the failure never ran.
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dependency_union_across_stages() {
        let mut registry = EngineRegistry::new();
        registry.register(
            EngineDescriptor::sync(Classification::Style, |input| {
                Ok(StageOutput::text(input.source_text().into_owned())
                    .with_dependencies([
                        PathBuf::from("/imports/reset.css"),
                        PathBuf::from("/imports/vars.css"),
                    ]))
            })
            .with_claim("post"),
        );
        registry.register(
            EngineDescriptor::sync(Classification::Style, |input| {
                Ok(StageOutput::text(input.source_text().into_owned())
                    .with_dependencies([
                        // Overlaps with what the previous stage reported.
                        PathBuf::from("/imports/vars.css"),
                        PathBuf::from("/imports/theme.css"),
                    ]))
            })
            .with_claim("css"),
        );

        let partial = resolve(registry.into_shared(), state_with(&["css", "post"], ".a{}"))
            .await
            .unwrap();

        assert_eq!(
            partial.dependencies(),
            &[
                PathBuf::from("/imports/reset.css"),
                PathBuf::from("/imports/vars.css"),
                PathBuf::from("/imports/theme.css"),
            ]
        );
    }

    #[tokio::test]
    async fn test_noop_terminal_stage_stops_without_cycling() {
        // Scenario: ["css", "post"] - `post` passes through untouched, then
        // the css-classified terminal stage declares no transformation.
        let css_calls = Arc::new(Mutex::new(0usize));
        let css_counter = Arc::clone(&css_calls);

        let mut registry = EngineRegistry::new();
        registry.register(
            EngineDescriptor::sync(Classification::Style, |_| Ok(StageOutput::unchanged()))
                .with_claim("post"),
        );
        registry.register(
            EngineDescriptor::sync(Classification::Style, move |_| {
                *css_counter.lock().unwrap() += 1;
                Ok(StageOutput::unchanged())
            })
            .with_claim("css"),
        );

        let partial = resolve(
            registry.into_shared(),
            state_with(&["css", "post"], ".a{color:red}"),
        )
        .await
        .unwrap();

        assert_eq!(partial.source().as_text(), Some(".a{color:red}"));
        assert!(partial.dependencies().is_empty());
        // The terminal stage ran exactly once - the no-op guard stopped the
        // fold instead of reprocessing `css` forever.
        assert_eq!(*css_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_noop_mid_chain_still_consumes_token() {
        let mut registry = EngineRegistry::new();
        registry.register(
            EngineDescriptor::sync(Classification::Style, |_| Ok(StageOutput::unchanged()))
                .with_claim("post"),
        );
        registry.register(
            EngineDescriptor::sync(Classification::Style, |input| {
                Ok(StageOutput::text(format!("{}!", input.source_text())))
            })
            .with_claim("css"),
        );

        let partial = resolve(registry.into_shared(), state_with(&["css", "post"], "body"))
            .await
            .unwrap();

        // The no-op `post` stage consumed its token; `css` still ran.
        assert_eq!(partial.source().as_text(), Some("body!"));
    }

    #[tokio::test]
    async fn test_async_engine_suspends_only_its_own_chain() {
        let mut registry = EngineRegistry::new();
        registry.register(
            EngineDescriptor::new(
                Classification::Markup,
                crate::engine::AsyncTransform(|input: crate::engine::StageInput<'_>| {
                    let text = input.source_text().into_owned();
                    Box::pin(async move {
                        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                        Ok(StageOutput::text(format!("<p>{text}</p>")))
                    })
                        as futures::future::BoxFuture<'static, anyhow::Result<StageOutput>>
                }),
            )
            .with_claim("md"),
        );
        let registry = registry.into_shared();

        // Two independent resolutions share the frozen registry freely.
        let (a, b) = tokio::join!(
            resolve(Arc::clone(&registry), state_with(&["md"], "one")),
            resolve(Arc::clone(&registry), state_with(&["md"], "two")),
        );

        assert_eq!(a.unwrap().source().as_text(), Some("<p>one</p>"));
        assert_eq!(b.unwrap().source().as_text(), Some("<p>two</p>"));
    }

    #[tokio::test]
    async fn test_empty_stack_is_terminal_as_is() {
        let registry = EngineRegistry::new().into_shared();
        let state = TransformState::new(
            "plain.css",
            "body{}",
            ExtensionStack::new(),
            Mode::Compile,
            ResolveOptions::new(),
        );

        let partial = resolve(registry, state).await.unwrap();
        assert_eq!(partial.source().as_text(), Some("body{}"));
        assert!(partial.unresolved().is_empty());
    }

    #[tokio::test]
    async fn test_tokens_compared_case_sensitively() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = EngineRegistry::new();
        registry.register(tagging("md", Arc::clone(&calls), Classification::Markup));

        let partial = resolve(registry.into_shared(), state_with(&["MD"], "x"))
            .await
            .unwrap();

        // `MD` is not `md`: no stage runs.
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(partial.unresolved(), &["MD"]);
    }
}
