//! Execution wrapper around each engine invocation.
//!
//! Builds the per-stage input view, awaits the unified transform contract
//! (engines that complete immediately and engines that suspend look the
//! same from here), and attaches timing/size instrumentation. The wrapper
//! is transparent: the outcome passes through untouched.

use std::time::Instant;

use crate::engine::{EngineDescriptor, StageInput, StageOutput};
use crate::logger;

use super::state::TransformState;

pub(crate) async fn invoke(
    descriptor: &EngineDescriptor,
    state: &TransformState,
    current: &str,
    lookahead: &str,
) -> anyhow::Result<StageOutput> {
    let input = StageInput {
        filename: state.filename(),
        current,
        lookahead,
        mode: state.mode(),
        source: state.source(),
        options: state.options().slice(current),
    };

    // Instrumentation is on when the caller asked for it per-invocation
    // (compile_debug) or globally (verbose); either way it must not change
    // what the engine returned.
    let instrument = state.options().compile_debug || logger::is_verbose();
    let input_size = state.source().size_hint();
    let started = Instant::now();

    let output = descriptor.transform().apply(input).await?;

    if instrument {
        match output.size_hint() {
            Some(output_size) => crate::log!("engine";
                "`{}` finished in {:.1?} ({} -> {} bytes)",
                current, started.elapsed(), input_size, output_size),
            None => crate::log!("engine";
                "`{}` passed through in {:.1?}", current, started.elapsed()),
        }
    }

    Ok(output)
}

// =============================================================================
// Tests
// =============================================================================
