//! Rendering context handed to template renderers.

use serde::Serialize;

use super::Layout;
use crate::codegen::defaults::{ColumnDescriptor, FieldDescriptor};
use crate::codegen::effective_config::{
    EffectiveConfig, ModalDescriptor, PageDescriptor, ShortcutDescriptor, TableDescriptor,
};
use crate::codegen::utils::to_pascal_case;

/// Template names (relative to the templates directory) of one table's pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateNames {
    pub list: String,
    pub form_modal: String,
    pub form: String,
    pub confirm_delete: String,
}

impl TemplateNames {
    pub fn new(app: &str, table: &str, layout: &Layout) -> Self {
        TemplateNames {
            list: format!("{}/{}_list.html", app, table),
            form_modal: format!("{}/{}/{}_form_modal.html", app, layout.modals_dir, table),
            form: format!("{}/{}_form.html", app, table),
            confirm_delete: format!("{}/{}_confirm_delete.html", app, table),
        }
    }
}

/// Everything a renderer needs for one table, already resolved.
///
/// Only visible columns and fields are carried; ordering is final.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactContext {
    pub app: String,
    pub table: String,
    pub model_class: String,
    pub page: PageDescriptor,
    pub list: Option<TableDescriptor>,
    pub columns: Vec<ColumnDescriptor>,
    /// Create/edit modal of the page, absent when modals are disabled
    pub modal: Option<ModalDescriptor>,
    pub fields: Vec<FieldDescriptor>,
    pub columns_per_row: u32,
    pub shortcuts: Vec<ShortcutDescriptor>,
    pub templates: TemplateNames,
    pub filters_library: String,
    pub audit_user_column: String,
}

impl ArtifactContext {
    pub fn build(
        app: &str,
        table: &str,
        config: &EffectiveConfig,
        layout: &Layout,
        with_modals: bool,
        audit_user_column: &str,
    ) -> Self {
        let form = config.primary_form();
        let modal = if with_modals {
            config
                .modals
                .iter()
                .find(|m| m.form.is_some())
                .or_else(|| config.modals.first())
                .cloned()
        } else {
            None
        };

        ArtifactContext {
            app: app.to_string(),
            table: table.to_string(),
            model_class: to_pascal_case(table),
            page: config.page.clone(),
            list: config.table.clone(),
            columns: config.columns.iter().filter(|c| c.visible).cloned().collect(),
            modal,
            fields: form
                .map(|f| f.fields.iter().filter(|f| f.visible).cloned().collect())
                .unwrap_or_default(),
            columns_per_row: form.map(|f| f.columns_per_row).unwrap_or(1),
            shortcuts: config.shortcuts.clone(),
            templates: TemplateNames::new(app, table, layout),
            filters_library: layout.filters_library.clone(),
            audit_user_column: audit_user_column.to_string(),
        }
    }

    /// Title shown in headings: the list title, else the page title
    pub fn title(&self) -> &str {
        self.list
            .as_ref()
            .map(|l| l.title.as_str())
            .unwrap_or(self.page.title.as_str())
    }

    /// Names of the editable fields, in form order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Names of the listed columns, in display order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
