//! # Pagesmith: CRUD page generation from a metadata catalog
//!
//! Pagesmith reads a YAML catalog of tables, columns, pages, modals and menus
//! and writes list/form/delete templates, view handlers and routes into a
//! target web application.
//!
//! ## Features
//!
//! - **Dependency resolution**: tables are generated after every table their
//!   `id_<name>` columns point at
//! - **Effective configuration**: type defaults, naming conventions and sparse
//!   overrides merged into one rendering-ready tree
//! - **Idempotent emission**: generated text lives in marker-delimited regions;
//!   hand-written code around them is never touched
//! - **Target probing**: optional read-only PostgreSQL probe (feature: `postgres`)
//!
//! ## Example: catalog entry
//!
//! ```yaml
//! tables:
//!   - name: facturas
//!     kind: transaction
//!     columns:
//!       - { column: id, position: 1 }
//!       - { column: id_clientes, position: 2 }
//!       - { column: monto, position: 3 }
//! ```

pub mod error;

// Metadata model
pub mod schema;

// Resolvers, emitter and orchestration
pub mod codegen;

// Read-only view of the target database
pub mod probe;

// Post-generation service reload
pub mod service;

pub use error::{Error, FsFailure, Result};
pub use schema::{Catalog, CatalogStore, YamlCatalogStore};
pub use codegen::{
    BuiltinRenderer, ConfigResolver, DependencyResolver, EffectiveConfig, EmitOutcome, Emitter,
    GenerationReport, GenerationRequest, Orchestrator, ProjectConfig, TableSelection,
};
pub use probe::{OfflineProbe, ProbeAnswer, TargetProbe};

#[cfg(feature = "postgres")]
pub use probe::PgProbe;
