//! Lamina - chained transform resolution for compound-extension assets.
//!
//! A filename like `view.md.hbs.js` encodes a chain of transforms: `js`
//! resolves first, its output feeds `hbs`, and so on until the stack is
//! exhausted or a token has no registered engine. The result is a
//! [`Partial`] exposing the compile/render dual contract, together with the
//! union of files discovered along the way.
//!
//! Orchestration - finding files, watching them, bundling and serving the
//! output - belongs to the embedding tool. This crate owns the resolution
//! itself: the registry, the chain fold, the unified engine contract and
//! the compiled artifact.
//!
//! # Example
//!
//! ```ignore
//! use lamina::{EngineRegistry, Mode, ResolveOptions, TransformState, engines, resolve};
//!
//! let mut registry = EngineRegistry::new();
//! engines::register_builtins(&mut registry);
//! // ...plugin loading registers markup/style/template engines here...
//! let registry = registry.into_shared();
//!
//! let state = TransformState::for_file(
//!     "views/home.md.hbs",
//!     source_text,
//!     Mode::Compile,
//!     ResolveOptions::new(),
//! ).expect("compound filename");
//!
//! let partial = resolve(registry, state).await?;
//! let output = partial.compile(Default::default()).await?;
//! watcher.track(partial.dependencies());
//! ```

pub mod engine;
pub mod engines;
pub mod error;
pub mod logger;
pub mod options;
pub mod parse;
pub mod partial;
pub mod resolver;

pub use engine::{
    AsyncTransform, Classification, EngineDescriptor, EngineRegistry, StageInput, StageOutput,
    SyncTransform, Transform,
};
pub use error::{CapabilityConflict, RenderFailure, TransformFailure};
pub use options::{Locals, OptionsSlice, ResolveOptions};
pub use parse::{ParsedName, parse_filename};
pub use partial::Partial;
pub use resolver::{
    DependencyList, ExtensionStack, Mode, SourceValue, Template, TransformState, resolve,
};
