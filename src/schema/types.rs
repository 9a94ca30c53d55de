//! Catalog entity definitions.
//!
//! These types mirror the records kept by the catalog store: tables, global
//! columns and the table-column links, the target applications, and the
//! page/modal/menu records that group tables into navigable units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::schema::ui::{Alignment, ColumnAction, ColumnFormat, InputKind, WidthFraction};

fn default_true() -> bool {
    true
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_page_size() -> u32 {
    25
}

fn default_columns_per_row() -> u32 {
    2
}

fn default_submit_label() -> String {
    "Guardar".to_string()
}

fn default_cancel_label() -> String {
    "Cancelar".to_string()
}

/// Prefix of a column name that references another table by convention
pub const FK_PREFIX: &str = "id_";

/// Closed set of column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Bigint,
    Smallint,
    Varchar,
    Text,
    Boolean,
    Date,
    Timestamp,
    Numeric,
    Serial,
    Bigserial,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Bigint => "bigint",
            ColumnType::Smallint => "smallint",
            ColumnType::Varchar => "varchar",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Numeric => "numeric",
            ColumnType::Serial => "serial",
            ColumnType::Bigserial => "bigserial",
        }
    }

    /// Integer-valued types, including the auto-incrementing ones
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer
                | ColumnType::Bigint
                | ColumnType::Smallint
                | ColumnType::Serial
                | ColumnType::Bigserial
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || *self == ColumnType::Numeric
    }
}

/// Table kind; drives the mandatory audit columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    #[default]
    Catalog,
    Transaction,
}

/// On-delete policy of an explicit foreign-key reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    #[default]
    Cascade,
    Restrict,
    SetNull,
    NoAction,
}

/// A global, reusable column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Column {
            name: name.into(),
            data_type,
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            unique: false,
            indexed: false,
            primary_key: false,
            auto_increment: false,
            default_value: None,
            notes: String::new(),
        }
    }

    /// Table referenced by naming convention (`id_<target>`), if any
    pub fn fk_target(&self) -> Option<&str> {
        fk_target_of(&self.name)
    }
}

/// Target table named by an `id_<target>` column name
pub fn fk_target_of(column_name: &str) -> Option<&str> {
    column_name
        .strip_prefix(FK_PREFIX)
        .filter(|target| !target.is_empty())
}

/// Link between a table and a global column, with per-table overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub column: String,
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    #[serde(default)]
    pub on_delete: OnDelete,
}

impl TableColumn {
    pub fn new(column: impl Into<String>, position: u32) -> Self {
        TableColumn {
            column: column.into(),
            position,
            nullable: None,
            unique: None,
            indexed: None,
            primary_key: None,
            auto_increment: None,
            default_value: None,
            references: None,
            on_delete: OnDelete::default(),
        }
    }

    /// Merge the link overrides over the global column definition
    pub fn resolve(&self, column: &Column) -> ColumnFacts {
        ColumnFacts {
            name: column.name.clone(),
            data_type: column.data_type,
            length: column.length,
            precision: column.precision,
            scale: column.scale,
            nullable: self.nullable.unwrap_or(column.nullable),
            unique: self.unique.unwrap_or(column.unique),
            primary_key: self.primary_key.unwrap_or(column.primary_key),
            auto_increment: self.auto_increment.unwrap_or(column.auto_increment),
            default_value: self
                .default_value
                .clone()
                .or_else(|| column.default_value.clone()),
            position: self.position,
        }
    }
}

/// A column as implemented by one table (link overrides applied)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnFacts {
    pub name: String,
    pub data_type: ColumnType,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub default_value: Option<String>,
    pub position: u32,
}

impl ColumnFacts {
    pub fn fk_target(&self) -> Option<&str> {
        fk_target_of(&self.name)
    }

    /// Auto-incrementing primary keys never get a form field
    pub fn is_generated_key(&self) -> bool {
        self.primary_key
            && (self.auto_increment
                || matches!(self.data_type, ColumnType::Serial | ColumnType::Bigserial))
    }
}

/// A relational table definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub kind: TableKind,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub columns: Vec<TableColumn>,
}

impl Table {
    pub fn new(name: impl Into<String>, kind: TableKind) -> Self {
        Table {
            name: name.into(),
            schema: default_schema(),
            alias: None,
            description: String::new(),
            kind,
            active: true,
            columns: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn link(&self, column: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|l| l.column == column)
    }
}

/// Connection fields of a target application's database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetDatabase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// A table attached to an application for generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableAssignment {
    pub table: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

/// A target application receiving generated artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Project root of the target; artifacts land under it
    pub base_path: PathBuf,
    #[serde(default)]
    pub database: TargetDatabase,
    #[serde(default)]
    pub tables: Vec<TableAssignment>,
    #[serde(default)]
    pub menus: Vec<String>,
}

impl Application {
    pub fn assignment(&self, table: &str) -> Option<&TableAssignment> {
        self.tables.iter().find(|a| a.table == table)
    }

    pub fn is_assigned(&self, table: &str) -> bool {
        self.assignment(table).is_some()
    }
}

/// Where a page gets its content from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    #[default]
    DbTable,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub by: String,
    #[serde(default)]
    pub dir: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            by: "id".to_string(),
            dir: SortDirection::Desc,
        }
    }
}

/// Coordinate an override record applies to.
///
/// Written as `column:<name>` or `field:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OverrideTarget {
    /// The derived default of a table column
    Column(String),
    /// An explicitly named form or list field
    Field(String),
}

impl OverrideTarget {
    pub fn name(&self) -> &str {
        match self {
            OverrideTarget::Column(name) | OverrideTarget::Field(name) => name,
        }
    }
}

impl TryFrom<String> for OverrideTarget {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.split_once(':') {
            Some(("column", name)) if !name.trim().is_empty() => {
                Ok(OverrideTarget::Column(name.trim().to_string()))
            }
            Some(("field", name)) if !name.trim().is_empty() => {
                Ok(OverrideTarget::Field(name.trim().to_string()))
            }
            _ => Err(format!(
                "Override target '{}' must be 'column:<name>' or 'field:<name>'",
                value
            )),
        }
    }
}

impl From<OverrideTarget> for String {
    fn from(value: OverrideTarget) -> Self {
        match value {
            OverrideTarget::Column(name) => format!("column:{}", name),
            OverrideTarget::Field(name) => format!("field:{}", name),
        }
    }
}

/// Sparse list-column override inside a page table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOverride {
    pub target: OverrideTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_px: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ColumnFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ColumnAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_template: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ColumnOverride {
    pub fn for_column(column: impl Into<String>) -> Self {
        ColumnOverride {
            target: OverrideTarget::Column(column.into()),
            order_index: None,
            width_px: None,
            title: None,
            alignment: None,
            format: None,
            visible: None,
            action: None,
            link_template: None,
            active: true,
        }
    }
}

/// Sparse form-field override inside a modal form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOverride {
    pub target: OverrideTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<WidthFraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl FieldOverride {
    pub fn for_column(column: impl Into<String>) -> Self {
        FieldOverride {
            target: OverrideTarget::Column(column.into()),
            order_index: None,
            label: None,
            placeholder: None,
            input: None,
            width: None,
            required: None,
            help_text: None,
            visible: None,
            default_value: None,
            active: true,
        }
    }
}

/// A table placed on a page, with list behavior flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageTable {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_true")]
    pub searchable: bool,
    #[serde(default = "default_true")]
    pub export_csv: bool,
    #[serde(default = "default_true")]
    pub export_xlsx: bool,
    #[serde(default = "default_true")]
    pub export_pdf: bool,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub default_sort: SortSpec,
    #[serde(default)]
    pub show_inactive: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub column_overrides: Vec<ColumnOverride>,
}

impl PageTable {
    pub fn new(table: impl Into<String>) -> Self {
        PageTable {
            table: table.into(),
            title: None,
            searchable: true,
            export_csv: true,
            export_xlsx: true,
            export_pdf: true,
            page_size: default_page_size(),
            default_sort: SortSpec::default(),
            show_inactive: false,
            active: true,
            column_overrides: Vec::new(),
        }
    }
}

/// Reference from a page to a modal, with its position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageModal {
    pub modal: String,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Shortcut button linking a page to another page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageShortcut {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A navigable unit grouping tables, modals and shortcuts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub source: PageSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_path: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub tables: Vec<PageTable>,
    #[serde(default)]
    pub modals: Vec<PageModal>,
    #[serde(default)]
    pub shortcuts: Vec<PageShortcut>,
}

impl Page {
    /// The primary table of the page (first active page table)
    pub fn primary_table(&self) -> Option<&PageTable> {
        self.tables.iter().find(|t| t.active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModalPurpose {
    #[default]
    CreateEdit,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModalSize {
    Sm,
    #[default]
    Md,
    Lg,
    Xl,
    Full,
}

impl ModalSize {
    pub fn css_class(&self) -> &'static str {
        match self {
            ModalSize::Sm => "modal-sm",
            ModalSize::Md => "",
            ModalSize::Lg => "modal-lg",
            ModalSize::Xl => "modal-xl",
            ModalSize::Full => "modal-fullscreen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormMode {
    None,
    #[default]
    Auto,
    External,
}

/// Form bound to a table inside a modal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default = "default_columns_per_row")]
    pub columns_per_row: u32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub field_overrides: Vec<FieldOverride>,
}

impl ModalForm {
    pub fn for_table(table: impl Into<String>) -> Self {
        ModalForm {
            table: Some(table.into()),
            columns_per_row: default_columns_per_row(),
            active: true,
            field_overrides: Vec::new(),
        }
    }
}

/// Modal dialog definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modal {
    pub id: String,
    #[serde(default)]
    pub purpose: ModalPurpose,
    pub title: String,
    #[serde(default)]
    pub size: ModalSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default = "default_true")]
    pub close_on_backdrop: bool,
    #[serde(default = "default_true")]
    pub close_on_escape: bool,
    #[serde(default = "default_true")]
    pub prevent_close_on_enter: bool,
    #[serde(default = "default_true")]
    pub prevent_close_on_space: bool,
    #[serde(default = "default_submit_label")]
    pub submit_label: String,
    #[serde(default = "default_cancel_label")]
    pub cancel_label: String,
    #[serde(default)]
    pub form_mode: FormMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_template: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<ModalForm>,
}

impl Modal {
    /// Create/edit modal with a form bound to `table`
    pub fn create_edit(id: impl Into<String>, title: impl Into<String>, table: &str) -> Self {
        Modal {
            id: id.into(),
            purpose: ModalPurpose::CreateEdit,
            title: title.into(),
            size: ModalSize::default(),
            icon: None,
            close_on_backdrop: true,
            close_on_escape: true,
            prevent_close_on_enter: true,
            prevent_close_on_space: true,
            submit_label: default_submit_label(),
            cancel_label: default_cancel_label(),
            form_mode: FormMode::Auto,
            external_template: None,
            active: true,
            form: Some(ModalForm::for_table(table)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuPage {
    pub page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default)]
    pub order_index: i32,
}

/// Navigation menu listing pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub pages: Vec<MenuPage>,
}
