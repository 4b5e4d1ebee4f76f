//! Built-in engines.
//!
//! The stock set is deliberately small - real pipelines register their own
//! markup/style/template engines as plugins at startup. Shipping the script
//! engine here keeps plain `.js` chains working out of the box.

pub mod script;

use crate::engine::EngineRegistry;

/// Register the stock engine set.
pub fn register_builtins(registry: &mut EngineRegistry) {
    registry.register(script::descriptor());
}
