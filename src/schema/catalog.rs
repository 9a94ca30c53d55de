//! In-memory catalog and its YAML-backed store.
//!
//! The catalog holds every metadata record the generator reads: tables,
//! global columns, applications, pages, modals and menus. Lookups are by
//! exact name; lifecycle helpers keep the link invariants (one link per
//! (table, column), dense positions, no deletion while referenced).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codegen::fs_utils;
use crate::error::{Error, Result};
use crate::schema::types::{
    Application, Column, ColumnFacts, ColumnType, Menu, Modal, Page, Table, TableAssignment,
    TableColumn, TableKind,
};
use crate::schema::validation::{
    validate_column, validate_identifier, validate_link, validate_positions,
};

/// Every metadata record known to the generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub modals: Vec<Modal>,
    #[serde(default)]
    pub menus: Vec<Menu>,
}

impl Catalog {
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    // ---- queries ----

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn application(&self, name: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.name == name)
    }

    pub fn application_mut(&mut self, name: &str) -> Option<&mut Application> {
        self.applications.iter_mut().find(|a| a.name == name)
    }

    pub fn page(&self, slug: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.slug == slug)
    }

    /// The page generated for a table: slug equal to the table name first,
    /// then any page whose primary table is it.
    pub fn page_for_table(&self, table: &str) -> Option<&Page> {
        self.page(table).or_else(|| {
            self.pages
                .iter()
                .find(|p| p.primary_table().map_or(false, |pt| pt.table == table))
        })
    }

    pub fn modal(&self, id: &str) -> Option<&Modal> {
        self.modals.iter().find(|m| m.id == id)
    }

    pub fn menu(&self, name: &str) -> Option<&Menu> {
        self.menus.iter().find(|m| m.name == name)
    }

    /// Columns of a table with link overrides applied, ordered by position
    pub fn table_columns(&self, table: &Table) -> Result<Vec<ColumnFacts>> {
        let mut links: Vec<&TableColumn> = table.columns.iter().collect();
        links.sort_by_key(|l| l.position);
        links
            .into_iter()
            .map(|link| {
                self.column(&link.column)
                    .map(|column| link.resolve(column))
                    .ok_or_else(|| Error::ColumnNotFound(link.column.clone()))
            })
            .collect()
    }

    /// Tables holding a link that points at `table`
    pub fn referencing_tables(&self, table: &str) -> Vec<String> {
        self.tables
            .iter()
            .filter(|t| t.name != table)
            .filter(|t| {
                t.columns.iter().any(|l| {
                    l.references.as_deref() == Some(table)
                        || crate::schema::types::fk_target_of(&l.column) == Some(table)
                })
            })
            .map(|t| t.name.clone())
            .collect()
    }

    // ---- lifecycle ----

    pub fn create_table(&mut self, table: Table) -> Result<()> {
        validate_identifier("Table", &table.name)?;
        validate_identifier("Schema", &table.schema)?;
        if self
            .tables
            .iter()
            .any(|t| t.name == table.name && t.schema == table.schema)
        {
            return Err(Error::Catalog(format!(
                "Table '{}' already exists",
                table.qualified_name()
            )));
        }
        self.tables.push(table);
        Ok(())
    }

    pub fn create_column(&mut self, column: Column) -> Result<()> {
        validate_column(&column)?;
        if self.column(&column.name).is_some() {
            return Err(Error::Catalog(format!(
                "Column '{}' already exists",
                column.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Attach a column to a table at the next position.
    ///
    /// The link's own position is ignored; returns the assigned position.
    pub fn link_column(&mut self, table: &str, mut link: TableColumn) -> Result<u32> {
        let column = self
            .column(&link.column)
            .cloned()
            .ok_or_else(|| Error::ColumnNotFound(link.column.clone()))?;
        let t = self
            .tables
            .iter_mut()
            .find(|t| t.name == table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;
        if t.link(&link.column).is_some() {
            return Err(Error::Catalog(format!(
                "Column '{}' is already linked to '{}'",
                link.column, table
            )));
        }
        validate_link(table, &link, &column)?;
        link.position = t.columns.len() as u32 + 1;
        let position = link.position;
        t.columns.push(link);
        Ok(position)
    }

    /// Move a column to `new_position` (clamped to 1..N) and renumber densely
    pub fn reorder_column(&mut self, table: &str, column: &str, new_position: u32) -> Result<()> {
        let t = self
            .tables
            .iter_mut()
            .find(|t| t.name == table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;
        t.columns.sort_by_key(|l| l.position);
        let idx = t
            .columns
            .iter()
            .position(|l| l.column == column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;
        let link = t.columns.remove(idx);
        let target = (new_position.max(1) as usize - 1).min(t.columns.len());
        t.columns.insert(target, link);
        renumber(t);
        Ok(())
    }

    pub fn unlink_column(&mut self, table: &str, column: &str) -> Result<()> {
        let t = self
            .tables
            .iter_mut()
            .find(|t| t.name == table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;
        let before = t.columns.len();
        t.columns.retain(|l| l.column != column);
        if t.columns.len() == before {
            return Err(Error::ColumnNotFound(column.to_string()));
        }
        t.columns.sort_by_key(|l| l.position);
        renumber(t);
        Ok(())
    }

    /// Delete a global column; refused while any table links it
    pub fn delete_column(&mut self, name: &str) -> Result<()> {
        if self.column(name).is_none() {
            return Err(Error::ColumnNotFound(name.to_string()));
        }
        let tables: Vec<String> = self
            .tables
            .iter()
            .filter(|t| t.link(name).is_some())
            .map(|t| t.name.clone())
            .collect();
        if !tables.is_empty() {
            return Err(Error::ColumnInUse {
                column: name.to_string(),
                tables,
            });
        }
        self.columns.retain(|c| c.name != name);
        Ok(())
    }

    /// Delete a table; refused while another table or a page references it
    pub fn delete_table(&mut self, name: &str) -> Result<()> {
        if self.table(name).is_none() {
            return Err(Error::TableNotFound(name.to_string()));
        }
        let mut referenced_by = self.referencing_tables(name);
        for page in &self.pages {
            if page.tables.iter().any(|pt| pt.table == name) {
                referenced_by.push(format!("page {}", page.slug));
            }
        }
        if !referenced_by.is_empty() {
            return Err(Error::TableInUse {
                table: name.to_string(),
                referenced_by,
            });
        }
        self.tables.retain(|t| t.name != name);
        for app in &mut self.applications {
            app.tables.retain(|a| a.table != name);
        }
        Ok(())
    }

    /// Attach the mandatory columns for the table's kind.
    ///
    /// Every table gets `id`; catalog tables get `nombre`; transaction tables
    /// get `activo`, `created_at`, `updated_at` and the audit-user column.
    /// Global columns are created when missing and reused otherwise. Returns
    /// the names that were newly linked.
    pub fn assign_default_columns(
        &mut self,
        table: &str,
        audit_user_column: &str,
    ) -> Result<Vec<String>> {
        let kind = self
            .table(table)
            .map(|t| t.kind)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;

        let mut wanted = vec![mandatory_id()];
        match kind {
            TableKind::Catalog => {
                let mut nombre = Column::new("nombre", ColumnType::Varchar);
                nombre.length = Some(100);
                nombre.unique = true;
                nombre.nullable = false;
                wanted.push(nombre);
            }
            TableKind::Transaction => {
                let mut activo = Column::new("activo", ColumnType::Boolean);
                activo.nullable = false;
                activo.default_value = Some("true".to_string());
                let mut created = Column::new("created_at", ColumnType::Timestamp);
                created.nullable = false;
                created.default_value = Some("now()".to_string());
                let updated = Column::new("updated_at", ColumnType::Timestamp);
                let audit = Column::new(audit_user_column, ColumnType::Integer);
                wanted.extend([activo, created, updated, audit]);
            }
        }

        let mut linked = Vec::new();
        for column in wanted {
            let name = column.name.clone();
            if self.column(&name).is_none() {
                self.create_column(column)?;
            }
            let already = self
                .table(table)
                .map_or(false, |t| t.link(&name).is_some());
            if !already {
                self.link_column(table, TableColumn::new(name.clone(), 0))?;
                linked.push(name);
            }
        }
        Ok(linked)
    }

    /// Attach a table to an application; returns false when already attached
    pub fn assign_table(&mut self, app: &str, table: &str, notes: &str) -> Result<bool> {
        if self.table(table).is_none() {
            return Err(Error::TableNotFound(table.to_string()));
        }
        let application = self
            .application_mut(app)
            .ok_or_else(|| Error::ApplicationNotFound(app.to_string()))?;
        if application.is_assigned(table) {
            return Ok(false);
        }
        application.tables.push(TableAssignment {
            table: table.to_string(),
            notes: notes.to_string(),
            assigned_at: Some(chrono::Utc::now()),
            generated_at: None,
        });
        Ok(true)
    }

    // ---- bookkeeping upserts ----

    pub fn upsert_page(&mut self, page: Page) {
        match self.pages.iter_mut().find(|p| p.slug == page.slug) {
            Some(existing) => *existing = page,
            None => self.pages.push(page),
        }
    }

    pub fn upsert_modal(&mut self, modal: Modal) {
        match self.modals.iter_mut().find(|m| m.id == modal.id) {
            Some(existing) => *existing = modal,
            None => self.modals.push(modal),
        }
    }

    pub fn upsert_menu(&mut self, menu: Menu) {
        match self.menus.iter_mut().find(|m| m.name == menu.name) {
            Some(existing) => *existing = menu,
            None => self.menus.push(menu),
        }
    }

    // ---- validation ----

    /// Every problem found in the catalog, one message each
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for column in &self.columns {
            if let Err(e) = validate_column(column) {
                issues.push(e.to_string());
            }
        }
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                issues.push(format!("Column '{}' is defined more than once", column.name));
            }
        }

        for (i, table) in self.tables.iter().enumerate() {
            if let Err(e) = validate_identifier("Table", &table.name) {
                issues.push(e.to_string());
            }
            if self.tables[..i]
                .iter()
                .any(|t| t.name == table.name && t.schema == table.schema)
            {
                issues.push(format!(
                    "Table '{}' is defined more than once",
                    table.qualified_name()
                ));
            }
            if let Err(e) = validate_positions(table) {
                issues.push(e.to_string());
            }
            for link in &table.columns {
                match self.column(&link.column) {
                    Some(column) => {
                        if let Err(e) = validate_link(&table.name, link, column) {
                            issues.push(e.to_string());
                        }
                    }
                    None => issues.push(format!(
                        "Table '{}' links unknown column '{}'",
                        table.name, link.column
                    )),
                }
            }
        }

        for app in &self.applications {
            for assignment in &app.tables {
                if self.table(&assignment.table).is_none() {
                    issues.push(format!(
                        "Application '{}' is assigned unknown table '{}'",
                        app.name, assignment.table
                    ));
                }
            }
        }

        for page in &self.pages {
            for pm in &page.modals {
                if self.modal(&pm.modal).is_none() {
                    issues.push(format!(
                        "Page '{}' references unknown modal '{}'",
                        page.slug, pm.modal
                    ));
                }
            }
        }

        issues
    }

    pub fn validate(&self) -> Result<()> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(issues.join("\n")))
        }
    }
}

fn mandatory_id() -> Column {
    let mut id = Column::new("id", ColumnType::Serial);
    id.primary_key = true;
    id.auto_increment = true;
    id.nullable = false;
    id
}

fn renumber(table: &mut Table) {
    for (i, link) in table.columns.iter_mut().enumerate() {
        link.position = i as u32 + 1;
    }
}

/// Persistence collaborator for the catalog
pub trait CatalogStore {
    fn load(&self) -> Result<Catalog>;
    fn save(&self, catalog: &Catalog) -> Result<()>;
}

/// Catalog kept in one YAML file
#[derive(Debug, Clone)]
pub struct YamlCatalogStore {
    path: PathBuf,
}

impl YamlCatalogStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        YamlCatalogStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for YamlCatalogStore {
    fn load(&self) -> Result<Catalog> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Catalog(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        Catalog::from_yaml_str(&contents).map_err(|e| {
            Error::Catalog(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, catalog: &Catalog) -> Result<()> {
        let contents = catalog.to_yaml_string()?;
        fs_utils::write_text(&self.path, &contents)?;
        Ok(())
    }
}
