//! Metadata model consumed by the generator.

pub mod catalog;
pub mod types;
pub mod ui;
pub mod validation;

pub use catalog::{Catalog, CatalogStore, YamlCatalogStore};
pub use types::*;
pub use ui::{Alignment, ColumnAction, ColumnFormat, InputKind, Validation, WidthFraction};
