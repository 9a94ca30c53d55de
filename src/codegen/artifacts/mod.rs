//! Per-table artifacts: what gets rendered, where it lands and how.
//!
//! Content shaping lives in the per-file renderer modules below and only
//! ever sees an [`ArtifactContext`]. Marker handling is left entirely to the
//! [`Emitter`](crate::codegen::emitter::Emitter); this module only decides
//! the path, block key and merge strategy of each artifact.
//!
//! Artifacts come out in dependency order: the form modal before the list
//! that includes it, handlers before the routes that point at them.

mod confirm_delete_html;
mod context;
mod filters_py;
mod form_html;
mod form_modal_html;
mod list_html;
mod urls_py;
mod views_py;

pub use context::{ArtifactContext, TemplateNames};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codegen::emitter::{Emission, Insertion, LineMerge, Policy, Strategy};
use crate::error::{Error, Result};

/// Where generated templates live inside the application directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,
    #[serde(default = "default_modals_dir")]
    pub modals_dir: String,
    /// Module name of the generated template filter library
    #[serde(default = "default_filters_library")]
    pub filters_library: String,
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_modals_dir() -> String {
    "modals".to_string()
}

fn default_filters_library() -> String {
    "page_filters".to_string()
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            templates_dir: default_templates_dir(),
            modals_dir: default_modals_dir(),
            filters_library: default_filters_library(),
        }
    }
}

/// Named templates a renderer must provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    ListHtml,
    FormModalHtml,
    FormHtml,
    ConfirmDeleteHtml,
    ViewsPy,
    SharedViewsPy,
    UrlsPy,
    FiltersPy,
    TemplatetagsInitPy,
}

impl Template {
    pub fn name(&self) -> &'static str {
        match self {
            Template::ListHtml => "list.html",
            Template::FormModalHtml => "form_modal.html",
            Template::FormHtml => "form.html",
            Template::ConfirmDeleteHtml => "confirm_delete.html",
            Template::ViewsPy => "views.py",
            Template::SharedViewsPy => "shared_views.py",
            Template::UrlsPy => "urls.py",
            Template::FiltersPy => "filters.py",
            Template::TemplatetagsInitPy => "templatetags_init.py",
        }
    }
}

/// Turns a structured context into artifact text
pub trait TemplateRenderer {
    fn render(&self, template: Template, ctx: &ArtifactContext) -> Result<String>;
}

/// Renderer with the stock Django/Bootstrap templates compiled in
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRenderer;

impl TemplateRenderer for BuiltinRenderer {
    fn render(&self, template: Template, ctx: &ArtifactContext) -> Result<String> {
        let rendered = match template {
            Template::ListHtml => list_html::render(ctx),
            Template::FormModalHtml => form_modal_html::render(ctx),
            Template::FormHtml => form_html::render(ctx),
            Template::ConfirmDeleteHtml => confirm_delete_html::render(ctx),
            Template::ViewsPy => views_py::render(ctx),
            Template::SharedViewsPy => views_py::render_shared(ctx),
            Template::UrlsPy => urls_py::render(ctx),
            Template::FiltersPy => filters_py::render(ctx),
            Template::TemplatetagsInitPy => Ok(String::new()),
        };
        rendered.map_err(|e| Error::Render {
            template: template.name().to_string(),
            reason: e.to_string(),
        })
    }
}

/// One renderable output of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    TemplatetagsInit,
    Filters,
    FormModal,
    List,
    Form,
    ConfirmDelete,
    Handlers,
    SharedHandlers,
    Routes,
}

impl ArtifactKind {
    pub fn template(&self) -> Template {
        match self {
            ArtifactKind::TemplatetagsInit => Template::TemplatetagsInitPy,
            ArtifactKind::Filters => Template::FiltersPy,
            ArtifactKind::FormModal => Template::FormModalHtml,
            ArtifactKind::List => Template::ListHtml,
            ArtifactKind::Form => Template::FormHtml,
            ArtifactKind::ConfirmDelete => Template::ConfirmDeleteHtml,
            ArtifactKind::Handlers => Template::ViewsPy,
            ArtifactKind::SharedHandlers => Template::SharedViewsPy,
            ArtifactKind::Routes => Template::UrlsPy,
        }
    }
}

/// A rendered artifact ready for the emitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub emission: Emission,
}

/// Route list merge rules for one table's block in the shared routes file.
/// A route belongs to the table whose name is its whole first path segment,
/// so `facturas` never claims `facturas_det/...`.
pub fn routes_merge(table: &str) -> LineMerge {
    LineMerge {
        owner_tokens: vec![format!("path('{}/", table)],
        shared_tokens: vec![urls_py::SHARED_ROUTE_TOKEN.to_string()],
        open_line: urls_py::OPEN_LINE.to_string(),
        close_line: urls_py::CLOSE_LINE.to_string(),
    }
}

/// Paths of the files one table's artifacts land in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub list: PathBuf,
    pub form_modal: PathBuf,
    pub form: PathBuf,
    pub confirm_delete: PathBuf,
    pub views: PathBuf,
    pub urls: PathBuf,
    pub templatetags_init: PathBuf,
    pub filters: PathBuf,
}

impl ArtifactPaths {
    /// `app_dir` is the application package directory (`<base>/<app>`)
    pub fn new(app_dir: &Path, ctx: &ArtifactContext, layout: &Layout) -> Self {
        let templates = app_dir.join(&layout.templates_dir);
        let templatetags = app_dir.join("templatetags");
        ArtifactPaths {
            list: templates.join(&ctx.templates.list),
            form_modal: templates.join(&ctx.templates.form_modal),
            form: templates.join(&ctx.templates.form),
            confirm_delete: templates.join(&ctx.templates.confirm_delete),
            views: app_dir.join("views.py"),
            urls: app_dir.join("urls.py"),
            templatetags_init: templatetags.join("__init__.py"),
            filters: templatetags.join(format!("{}.py", layout.filters_library)),
        }
    }
}

/// Render every artifact of one table, in emission order
pub fn plan_artifacts(
    ctx: &ArtifactContext,
    app_dir: &Path,
    layout: &Layout,
    renderer: &dyn TemplateRenderer,
    overwrite: bool,
) -> Result<Vec<Artifact>> {
    let paths = ArtifactPaths::new(app_dir, ctx, layout);
    let t = &ctx.table;

    let mut plan: Vec<(ArtifactKind, PathBuf, String)> = vec![
        (ArtifactKind::TemplatetagsInit, paths.templatetags_init, "templatetags".to_string()),
        (ArtifactKind::Filters, paths.filters, "filters".to_string()),
    ];
    if ctx.modal.is_some() {
        plan.push((ArtifactKind::FormModal, paths.form_modal, format!("modal:{}", t)));
    }
    plan.extend([
        (ArtifactKind::List, paths.list, format!("list:{}", t)),
        (ArtifactKind::Form, paths.form, format!("form:{}", t)),
        (ArtifactKind::ConfirmDelete, paths.confirm_delete, format!("confirm_delete:{}", t)),
        (ArtifactKind::Handlers, paths.views.clone(), format!("views:{}", t)),
        (ArtifactKind::SharedHandlers, paths.views, "views:shared".to_string()),
        (ArtifactKind::Routes, paths.urls, "urls".to_string()),
    ]);

    plan.into_iter()
        .map(|(kind, path, key)| {
            let content = renderer.render(kind.template(), ctx)?;
            let emission = match kind {
                ArtifactKind::TemplatetagsInit | ArtifactKind::Filters => {
                    Emission::new(path, key, content).policy(Policy::CreateOnly)
                }
                ArtifactKind::Routes => Emission::new(path, key, content)
                    .overwrite(overwrite)
                    .strategy(Strategy::LineMerge(routes_merge(t)))
                    .insertion(Insertion::AfterListLiteral {
                        name: "urlpatterns".to_string(),
                    }),
                _ => Emission::new(path, key, content).overwrite(overwrite),
            };
            Ok(Artifact { kind, emission })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::codegen::defaults::{ColumnDescriptor, FieldDescriptor, SelectOption};
    use crate::codegen::effective_config::{
        FormDescriptor, ModalDescriptor, PageDescriptor, TableDescriptor,
    };
    use crate::schema::{
        Alignment, ColumnFormat, FormMode, InputKind, ModalSize, PageSource, SortSpec,
        Validation, WidthFraction,
    };

    pub(crate) fn column(name: &str, title: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_string(),
            title: title.to_string(),
            alignment: Alignment::Left,
            format: None,
            visible: true,
            is_toggle: false,
            order_index: 0,
            width_px: None,
            action: None,
            link_template: None,
            fk_table: None,
        }
    }

    pub(crate) fn field(name: &str, input: InputKind) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            label: name.to_string(),
            placeholder: format!("Ingrese {}", name),
            input,
            required: true,
            width: WidthFraction::Half,
            step: None,
            validations: Vec::new(),
            accept: None,
            preview: false,
            help_text: None,
            default_value: None,
            visible: true,
            order_index: 0,
            fk_table: None,
            options: Vec::new(),
        }
    }

    /// Context shaped like the `facturas` page of the sample catalog
    pub(crate) fn facturas_context() -> ArtifactContext {
        let mut monto = column("monto", "Monto");
        monto.alignment = Alignment::Right;
        monto.format = Some(ColumnFormat::Number { decimals: 2 });
        let mut cliente = column("id_clientes", "id_clientes");
        cliente.fk_table = Some("clientes".to_string());
        let mut activo = column("activo", "Activo");
        activo.is_toggle = true;
        activo.alignment = Alignment::Center;

        let mut id_clientes = field("id_clientes", InputKind::Select);
        id_clientes.fk_table = Some("clientes".to_string());
        id_clientes.options = vec![SelectOption {
            value: "1".to_string(),
            label: "ACME".to_string(),
        }];
        let mut monto_f = field("monto", InputKind::Number);
        monto_f.step = Some("0.01".to_string());
        let mut numero = field("numero", InputKind::Text);
        numero.validations = vec![Validation::MaxLength(20)];
        let mut activo_f = field("activo", InputKind::Checkbox);
        activo_f.required = false;

        let fields = vec![numero, id_clientes, monto_f, activo_f];
        let page = PageDescriptor {
            slug: "facturas".to_string(),
            title: "Facturas".to_string(),
            description: String::new(),
            source: PageSource::DbTable,
            icon: None,
            route_path: "/facturas/".to_string(),
        };
        let list = TableDescriptor {
            table: "facturas".to_string(),
            title: "Facturas".to_string(),
            searchable: true,
            export_csv: true,
            export_xlsx: true,
            export_pdf: false,
            page_size: 25,
            default_sort: SortSpec::default(),
            show_inactive: false,
        };
        let modal = ModalDescriptor {
            id: "facturas_form".to_string(),
            title: "Facturas".to_string(),
            size: ModalSize::Lg,
            icon: None,
            close_on_backdrop: false,
            close_on_escape: true,
            prevent_close_on_enter: true,
            prevent_close_on_space: false,
            submit_label: "Guardar".to_string(),
            cancel_label: "Cancelar".to_string(),
            form_mode: FormMode::Auto,
            external_template: None,
            form: Some(FormDescriptor {
                table: Some("facturas".to_string()),
                columns_per_row: 2,
                fields: fields.clone(),
            }),
        };
        let layout = Layout::default();
        ArtifactContext {
            app: "ventas".to_string(),
            table: "facturas".to_string(),
            model_class: "Facturas".to_string(),
            page,
            list: Some(list),
            columns: vec![column("numero", "Numero"), cliente, monto, activo],
            modal: Some(modal),
            fields,
            columns_per_row: 2,
            shortcuts: Vec::new(),
            templates: TemplateNames::new("ventas", "facturas", &layout),
            filters_library: layout.filters_library.clone(),
            audit_user_column: "id_auth_user".to_string(),
        }
    }

    #[test]
    fn test_plan_order_and_keys() {
        let ctx = facturas_context();
        let artifacts = plan_artifacts(
            &ctx,
            Path::new("/srv/app/ventas"),
            &Layout::default(),
            &BuiltinRenderer,
            true,
        )
        .unwrap();
        let kinds: Vec<ArtifactKind> = artifacts.iter().map(|a| a.kind).collect();
        let pos = |k| kinds.iter().position(|x| *x == k).unwrap();
        assert!(pos(ArtifactKind::FormModal) < pos(ArtifactKind::List));
        assert!(pos(ArtifactKind::Handlers) < pos(ArtifactKind::Routes));

        let list = &artifacts[pos(ArtifactKind::List)].emission;
        assert_eq!(
            list.path,
            PathBuf::from("/srv/app/ventas/templates/ventas/facturas_list.html")
        );
        assert_eq!(list.key, "list:facturas");
        assert!(list.overwrite);

        let modal = &artifacts[pos(ArtifactKind::FormModal)].emission;
        assert_eq!(
            modal.path,
            PathBuf::from("/srv/app/ventas/templates/ventas/modals/facturas_form_modal.html")
        );

        let filters = &artifacts[pos(ArtifactKind::Filters)].emission;
        assert_eq!(filters.policy, Policy::CreateOnly);
        assert_eq!(
            filters.path,
            PathBuf::from("/srv/app/ventas/templatetags/page_filters.py")
        );
    }

    #[test]
    fn test_no_modal_artifact_without_modals() {
        let mut ctx = facturas_context();
        ctx.modal = None;
        let artifacts =
            plan_artifacts(&ctx, Path::new("x"), &Layout::default(), &BuiltinRenderer, false).unwrap();
        assert!(artifacts.iter().all(|a| a.kind != ArtifactKind::FormModal));
        let list = artifacts.iter().find(|a| a.kind == ArtifactKind::List).unwrap();
        assert!(!list.emission.content.contains("{% include"));
    }
}
