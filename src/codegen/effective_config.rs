//! Effective-configuration resolver.
//!
//! Merges the derived defaults of every column with the sparse override
//! records of a page into one immutable, rendering-ready tree. Precedence per
//! attribute, lowest first: type default, naming convention, `column:` override,
//! `field:` override. An unset override attribute never clears a lower value.

use serde::Serialize;
use tracing::{debug, warn};

use crate::codegen::defaults::{
    derive_column, derive_field, ColumnDescriptor, FieldDescriptor, FormPolicy, SelectOption,
    FK_LABEL_COLUMN,
};
use crate::codegen::utils::to_label;
use crate::error::{Error, Result};
use crate::probe::{OptionsQuery, TargetProbe};
use crate::schema::{
    Catalog, ColumnOverride, ColumnType, FieldOverride, FormMode, Modal, ModalSize, OverrideTarget,
    Page, PageModal, PageSource, PageTable, SortSpec, Table,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDescriptor {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub source: PageSource,
    pub icon: Option<String>,
    pub route_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDescriptor {
    pub table: String,
    pub title: String,
    pub searchable: bool,
    pub export_csv: bool,
    pub export_xlsx: bool,
    pub export_pdf: bool,
    pub page_size: u32,
    pub default_sort: SortSpec,
    pub show_inactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormDescriptor {
    pub table: Option<String>,
    pub columns_per_row: u32,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalDescriptor {
    pub id: String,
    pub title: String,
    pub size: ModalSize,
    pub icon: Option<String>,
    pub close_on_backdrop: bool,
    pub close_on_escape: bool,
    pub prevent_close_on_enter: bool,
    pub prevent_close_on_space: bool,
    pub submit_label: String,
    pub cancel_label: String,
    pub form_mode: FormMode,
    pub external_template: Option<String>,
    pub form: Option<FormDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortcutDescriptor {
    pub target: String,
    pub label: String,
    pub icon: Option<String>,
    pub route_path: String,
}

/// Fully merged description of how a page renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    pub page: PageDescriptor,
    pub table: Option<TableDescriptor>,
    pub columns: Vec<ColumnDescriptor>,
    pub modals: Vec<ModalDescriptor>,
    pub shortcuts: Vec<ShortcutDescriptor>,
    /// Synthesized from the table because no page record exists
    pub fallback: bool,
}

impl EffectiveConfig {
    /// The create/edit form of the page, if any
    pub fn primary_form(&self) -> Option<&FormDescriptor> {
        self.modals.iter().find_map(|m| m.form.as_ref())
    }
}

/// Default page for a table: slug and route from the name, title from the
/// alias, one create/edit modal bound to the table.
pub fn default_page_for(table: &Table) -> (Page, Modal) {
    let title = table
        .alias
        .clone()
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| to_label(&table.name));
    let modal = Modal::create_edit(modal_id_for(&table.name), title.clone(), &table.name);
    let page = Page {
        slug: table.name.clone(),
        title,
        description: table.description.clone(),
        source: PageSource::DbTable,
        icon: None,
        route_path: Some(default_route(&table.name)),
        active: true,
        tables: vec![PageTable::new(table.name.clone())],
        modals: vec![PageModal {
            modal: modal.id.clone(),
            order_index: 0,
            active: true,
        }],
        shortcuts: Vec::new(),
    };
    (page, modal)
}

pub fn modal_id_for(table: &str) -> String {
    format!("{}_form", table)
}

fn default_route(slug: &str) -> String {
    format!("/{}/", slug)
}

/// Resolves effective configurations against a catalog
pub struct ConfigResolver<'a> {
    catalog: &'a Catalog,
    probe: &'a dyn TargetProbe,
    policy: FormPolicy,
    options_limit: u32,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(catalog: &'a Catalog, probe: &'a dyn TargetProbe) -> Self {
        ConfigResolver {
            catalog,
            probe,
            policy: FormPolicy::default(),
            options_limit: 200,
        }
    }

    pub fn with_policy(mut self, policy: FormPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options_limit(mut self, limit: u32) -> Self {
        self.options_limit = limit;
        self
    }

    /// Configuration of the page with this slug
    pub fn resolve_page(&self, slug: &str) -> Result<EffectiveConfig> {
        let page = self
            .catalog
            .page(slug)
            .ok_or_else(|| Error::PageNotFound(slug.to_string()))?;
        self.resolve(page, &[], false)
    }

    /// Configuration of a table's page, synthesized when no page exists
    pub fn resolve_table(&self, table: &str) -> Result<EffectiveConfig> {
        if let Some(page) = self.catalog.page_for_table(table) {
            return self.resolve(page, &[], false);
        }
        let t = self
            .catalog
            .table(table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;
        warn!(table, "No page configured, using name-derived fallback configuration");
        let (page, modal) = default_page_for(t);
        self.resolve(&page, std::slice::from_ref(&modal), true)
    }

    fn resolve(&self, page: &Page, extra_modals: &[Modal], fallback: bool) -> Result<EffectiveConfig> {
        let page_desc = PageDescriptor {
            slug: page.slug.clone(),
            title: page.title.clone(),
            description: page.description.clone(),
            source: page.source,
            icon: page.icon.clone(),
            route_path: page
                .route_path
                .clone()
                .unwrap_or_else(|| default_route(&page.slug)),
        };

        let page_table = page.primary_table();
        let (table, columns) = match page_table {
            Some(pt) => {
                let desc = TableDescriptor {
                    table: pt.table.clone(),
                    title: pt.title.clone().unwrap_or_else(|| page.title.clone()),
                    searchable: pt.searchable,
                    export_csv: pt.export_csv,
                    export_xlsx: pt.export_xlsx,
                    export_pdf: pt.export_pdf,
                    page_size: pt.page_size,
                    default_sort: pt.default_sort.clone(),
                    show_inactive: pt.show_inactive,
                };
                (Some(desc), self.resolve_columns(pt)?)
            }
            None => {
                debug!(page = %page.slug, "Page has no table; empty column list");
                (None, Vec::new())
            }
        };

        let mut page_modals: Vec<&PageModal> = page.modals.iter().filter(|m| m.active).collect();
        page_modals.sort_by_key(|m| m.order_index);
        let mut modals = Vec::new();
        for pm in page_modals {
            let modal = self
                .catalog
                .modal(&pm.modal)
                .or_else(|| extra_modals.iter().find(|m| m.id == pm.modal));
            match modal {
                Some(modal) if modal.active => {
                    modals.push(self.resolve_modal(modal, page_table, &page.title)?)
                }
                Some(_) => {}
                None => warn!(page = %page.slug, modal = %pm.modal, "Page references unknown modal"),
            }
        }

        let mut shortcuts: Vec<_> = page.shortcuts.iter().filter(|s| s.active).collect();
        shortcuts.sort_by_key(|s| s.order_index);
        let shortcuts = shortcuts
            .into_iter()
            .map(|s| {
                let target = self.catalog.page(&s.target);
                ShortcutDescriptor {
                    target: s.target.clone(),
                    label: s
                        .label
                        .clone()
                        .or_else(|| target.map(|p| p.title.clone()))
                        .unwrap_or_else(|| to_label(&s.target)),
                    icon: s.icon.clone().or_else(|| target.and_then(|p| p.icon.clone())),
                    route_path: target
                        .and_then(|p| p.route_path.clone())
                        .unwrap_or_else(|| default_route(&s.target)),
                }
            })
            .collect();

        Ok(EffectiveConfig {
            page: page_desc,
            table,
            columns,
            modals,
            shortcuts,
            fallback,
        })
    }

    fn resolve_columns(&self, pt: &PageTable) -> Result<Vec<ColumnDescriptor>> {
        let Some(table) = self.catalog.table(&pt.table) else {
            warn!(table = %pt.table, "Page table not found in catalog; empty column list");
            return Ok(Vec::new());
        };
        let mut columns: Vec<ColumnDescriptor> = self
            .catalog
            .table_columns(table)?
            .iter()
            .map(|facts| {
                let mut desc = derive_column(facts);
                for ov in matching(&pt.column_overrides, &facts.name, |o| (&o.target, o.active)) {
                    apply_column_override(&mut desc, ov);
                }
                desc
            })
            .collect();
        columns.sort_by_key(|c| c.order_index);
        Ok(columns)
    }

    fn resolve_modal(
        &self,
        modal: &Modal,
        page_table: Option<&PageTable>,
        page_title: &str,
    ) -> Result<ModalDescriptor> {
        let form = match (modal.form_mode, modal.form.as_ref()) {
            (FormMode::Auto, Some(form)) if form.active => {
                let table = form
                    .table
                    .clone()
                    .or_else(|| page_table.map(|pt| pt.table.clone()));
                let fields = match table.as_deref() {
                    Some(t) => self.resolve_fields(t, &form.field_overrides, page_title)?,
                    None => Vec::new(),
                };
                Some(FormDescriptor {
                    table,
                    columns_per_row: form.columns_per_row.max(1),
                    fields,
                })
            }
            _ => None,
        };

        Ok(ModalDescriptor {
            id: modal.id.clone(),
            title: modal.title.clone(),
            size: modal.size,
            icon: modal.icon.clone(),
            close_on_backdrop: modal.close_on_backdrop,
            close_on_escape: modal.close_on_escape,
            prevent_close_on_enter: modal.prevent_close_on_enter,
            prevent_close_on_space: modal.prevent_close_on_space,
            submit_label: modal.submit_label.clone(),
            cancel_label: modal.cancel_label.clone(),
            form_mode: modal.form_mode,
            external_template: modal.external_template.clone(),
            form,
        })
    }

    /// Form fields of `table` with overrides and FK options applied
    pub fn resolve_fields(
        &self,
        table: &str,
        overrides: &[FieldOverride],
        page_title: &str,
    ) -> Result<Vec<FieldDescriptor>> {
        let Some(t) = self.catalog.table(table) else {
            warn!(table, "Form table not found in catalog; empty field list");
            return Ok(Vec::new());
        };
        let mut fields = Vec::new();
        for facts in self.catalog.table_columns(t)? {
            let Some(mut field) = derive_field(&facts, &self.policy, Some(page_title)) else {
                continue;
            };
            for ov in matching(overrides, &facts.name, |o| (&o.target, o.active)) {
                apply_field_override(&mut field, ov);
            }
            if field.input == crate::schema::InputKind::Select {
                if let Some(target) = field.fk_table.clone() {
                    field.options = self.fk_options(&target);
                }
            }
            fields.push(field);
        }
        fields.sort_by_key(|f| f.order_index);
        Ok(fields)
    }

    /// Best-effort (value, label) pairs of an FK target.
    ///
    /// Active rows first; an unfiltered query if that fails; empty on any
    /// other failure or when the target table is not in the catalog.
    fn fk_options(&self, target: &str) -> Vec<SelectOption> {
        let Some(table) = self.catalog.table(target) else {
            debug!(target, "FK target not in catalog, no options");
            return Vec::new();
        };
        let mut query = OptionsQuery {
            table: target.to_string(),
            value_column: "id".to_string(),
            label_column: self.label_column(table),
            active_only: true,
            limit: self.options_limit,
        };
        match self.probe.select_options(&query) {
            Ok(options) => options,
            Err(e) => {
                debug!(target, error = %e, "Active-row options probe failed, retrying unfiltered");
                query.active_only = false;
                self.probe.select_options(&query).unwrap_or_else(|e| {
                    debug!(target, error = %e, "Options probe failed, using empty list");
                    Vec::new()
                })
            }
        }
    }

    /// `nombre` when the target has it, else its first text column, else `id`
    fn label_column(&self, table: &Table) -> String {
        if table.link(FK_LABEL_COLUMN).is_some() {
            return FK_LABEL_COLUMN.to_string();
        }
        self.catalog
            .table_columns(table)
            .ok()
            .and_then(|cols| {
                cols.into_iter()
                    .find(|c| matches!(c.data_type, ColumnType::Varchar | ColumnType::Text))
                    .map(|c| c.name)
            })
            .unwrap_or_else(|| "id".to_string())
    }
}

/// Active overrides for `name`: `column:` targets first, then `field:` targets
fn matching<'o, T, F>(overrides: &'o [T], name: &str, key: F) -> Vec<&'o T>
where
    F: Fn(&T) -> (&OverrideTarget, bool),
{
    let mut by_column = Vec::new();
    let mut by_field = Vec::new();
    for ov in overrides {
        let (target, active) = key(ov);
        if !active || target.name() != name {
            continue;
        }
        match target {
            OverrideTarget::Column(_) => by_column.push(ov),
            OverrideTarget::Field(_) => by_field.push(ov),
        }
    }
    by_column.extend(by_field);
    by_column
}

fn apply_column_override(desc: &mut ColumnDescriptor, ov: &ColumnOverride) {
    if let Some(v) = ov.order_index {
        desc.order_index = v;
    }
    if let Some(v) = ov.width_px {
        desc.width_px = Some(v);
    }
    if let Some(ref v) = ov.title {
        desc.title = v.clone();
    }
    if let Some(v) = ov.alignment {
        desc.alignment = v;
    }
    if let Some(v) = ov.format {
        desc.format = Some(v);
    }
    if let Some(v) = ov.visible {
        desc.visible = v;
    }
    if let Some(v) = ov.action {
        desc.action = Some(v);
    }
    if let Some(ref v) = ov.link_template {
        desc.link_template = Some(v.clone());
    }
}

fn apply_field_override(field: &mut FieldDescriptor, ov: &FieldOverride) {
    if let Some(v) = ov.order_index {
        field.order_index = v;
    }
    if let Some(ref v) = ov.label {
        field.label = v.clone();
    }
    if let Some(ref v) = ov.placeholder {
        field.placeholder = v.clone();
    }
    if let Some(v) = ov.input {
        field.input = v;
    }
    if let Some(v) = ov.width {
        field.width = v;
    }
    if let Some(v) = ov.required {
        field.required = v;
    }
    if let Some(ref v) = ov.help_text {
        field.help_text = Some(v.clone());
    }
    if let Some(v) = ov.visible {
        field.visible = v;
    }
    if let Some(ref v) = ov.default_value {
        field.default_value = Some(v.clone());
    }
}
