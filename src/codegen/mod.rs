//! Page generation framework.
//!
//! Resolves what a table's pages look like from the catalog, renders the
//! artifacts and lands them in the target application through the emitter.

pub mod artifacts;
pub mod defaults;
pub mod dependency_graph;
pub mod effective_config;
pub mod emitter;
pub mod fs_utils;
pub mod orchestration;
pub mod project_config;
pub mod utils;

// Re-export key types
pub use artifacts::{ArtifactContext, ArtifactKind, BuiltinRenderer, Layout, Template, TemplateRenderer};
pub use dependency_graph::{DependencyOrder, DependencyResolver, DependencyStatus};
pub use effective_config::{ConfigResolver, EffectiveConfig};
pub use emitter::{EmitOutcome, Emission, Emitter, SkipReason};
pub use orchestration::{
    apply_deltas, BookkeepingDelta, GenerationReport, GenerationRequest, Orchestrator,
    TableSelection,
};
pub use project_config::{CliOverrides, ProjectConfig};
