pub mod compiler;
pub mod data;
pub mod engine;
pub mod error;
pub mod helpers;
pub mod output;
pub mod partials;
pub mod project;

// Re-export main types
pub use compiler::{CompiledPage, compile_and_write, compile_project};
pub use engine::Engine;
pub use error::Error;
pub use helpers::{PostBuildTransform, ScriptLoader};
pub use project::{DirNames, Options, Project, ProjectPaths};
